//! ASCIIHexDecode implementation.
//!
//! Pairs of hex digits become bytes. Whitespace is ignored, `>` ends the
//! data, and an odd trailing digit is padded with an implicit `0`.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use crate::object::Object;
use std::collections::HashMap;

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8], _params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut high: Option<u8> = None;

        for &c in input {
            if c == b'>' {
                break;
            }
            if c.is_ascii_whitespace() || c == 0 {
                continue;
            }
            let nibble = hex_value(c).ok_or_else(|| {
                Error::Decode(format!("ASCIIHexDecode: invalid hex digit '{}'", c as char))
            })?;
            match high.take() {
                Some(h) => output.push((h << 4) | nibble),
                None => high = Some(nibble),
            }
        }

        // odd digit count: trailing nibble padded with 0
        if let Some(h) = high {
            output.push(h << 4);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

/// Value of a hexadecimal ASCII digit.
fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        AsciiHexDecoder.decode(input, None)
    }

    #[test]
    fn test_simple() {
        assert_eq!(decode(b"48656C6C6F").unwrap(), b"Hello");
    }

    #[test]
    fn test_whitespace_tolerated() {
        assert_eq!(decode(b"48 65\n6C\t6C 6F").unwrap(), b"Hello");
    }

    #[test]
    fn test_end_marker_stops_decoding() {
        assert_eq!(decode(b"4865>6C6C").unwrap(), b"He");
    }

    #[test]
    fn test_odd_length_padded_with_zero() {
        // "486" -> 0x48 0x60
        assert_eq!(decode(b"486").unwrap(), b"H`");
        assert_eq!(decode(b"7>").unwrap(), vec![0x70]);
    }

    #[test]
    fn test_mixed_case() {
        assert_eq!(decode(b"48656c6C6f").unwrap(), b"Hello");
    }

    #[test]
    fn test_empty() {
        assert_eq!(decode(b"").unwrap(), b"");
        assert_eq!(decode(b">").unwrap(), b"");
    }

    #[test]
    fn test_invalid_digit() {
        assert!(decode(b"4G").is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(AsciiHexDecoder.name(), "ASCIIHexDecode");
    }
}
