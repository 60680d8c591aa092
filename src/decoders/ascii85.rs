//! ASCII85Decode (Base85) implementation.
//!
//! Five characters in `!`..`u` encode four bytes base-85. `z` is shorthand
//! for four NUL bytes, `~>` terminates the data, and a trailing partial
//! group of N characters is padded with `u` and yields its first N-1
//! bytes.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use crate::object::Object;
use std::collections::HashMap;

/// ASCII85Decode filter implementation.
pub struct Ascii85Decoder;

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8], _params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut acc: u32 = 0;
        let mut count = 0usize;

        for &byte in input {
            match byte {
                b'~' => break,
                b'z' if count == 0 => output.extend_from_slice(&[0, 0, 0, 0]),
                b'z' => {
                    return Err(Error::Decode(
                        "ASCII85Decode: 'z' inside a group".to_string(),
                    ));
                },
                b'!'..=b'u' => {
                    acc = acc
                        .checked_mul(85)
                        .and_then(|v| v.checked_add((byte - b'!') as u32))
                        .ok_or_else(|| {
                            Error::Decode("ASCII85Decode: group value overflow".to_string())
                        })?;
                    count += 1;
                    if count == 5 {
                        output.extend_from_slice(&acc.to_be_bytes());
                        acc = 0;
                        count = 0;
                    }
                },
                _ if byte.is_ascii_whitespace() || byte == 0 => {},
                _ => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid character 0x{:02x}",
                        byte
                    )));
                },
            }
        }

        // trailing partial group: pad with 'u', emit count-1 bytes
        if count > 0 {
            if count == 1 {
                return Err(Error::Decode(
                    "ASCII85Decode: a final group of one character is invalid".to_string(),
                ));
            }
            for _ in count..5 {
                acc = acc
                    .checked_mul(85)
                    .and_then(|v| v.checked_add(84))
                    .ok_or_else(|| {
                        Error::Decode("ASCII85Decode: padding overflow".to_string())
                    })?;
            }
            output.extend_from_slice(&acc.to_be_bytes()[..count - 1]);
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}
