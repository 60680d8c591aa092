//! PDF object parser.
//!
//! Combines lexer tokens into complete objects using recursive descent:
//! read a token, decide the object type, recurse for composites. Stream
//! payloads are captured here (by /Length when available, by scanning for
//! `endstream` as a recovery path), but never decoded.

use crate::error::{Error, Result};
use crate::lexer::{Token, token};
use crate::object::{Object, ObjectRef, StringFormat};
use nom::IResult;
use std::collections::HashMap;

/// Callback used to resolve an indirect /Length once the xref exists.
///
/// The document supplies this when it parses objects out of the file;
/// standalone `parse_object` calls run without one.
pub type LengthResolver<'r> = &'r dyn Fn(ObjectRef) -> Option<i64>;

/// Decode escape sequences in a PDF literal string.
///
/// Handles the single-character escapes `\n \r \t \b \f \( \) \\`, octal
/// `\ddd` (one to three digits, value truncated to a byte), and
/// line-continuation (backslash before a line ending is removed together
/// with the line ending). An unrecognized escape keeps its backslash.
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 >= raw.len() {
            result.push(raw[i]);
            i += 1;
            continue;
        }

        match raw[i + 1] {
            b'n' => {
                result.push(b'\n');
                i += 2;
            },
            b'r' => {
                result.push(b'\r');
                i += 2;
            },
            b't' => {
                result.push(b'\t');
                i += 2;
            },
            b'b' => {
                result.push(0x08);
                i += 2;
            },
            b'f' => {
                result.push(0x0C);
                i += 2;
            },
            b'(' => {
                result.push(b'(');
                i += 2;
            },
            b')' => {
                result.push(b')');
                i += 2;
            },
            b'\\' => {
                result.push(b'\\');
                i += 2;
            },
            // line continuation: swallow backslash + EOL
            b'\n' => {
                i += 2;
            },
            b'\r' => {
                i += 2;
                if i < raw.len() && raw[i] == b'\n' {
                    i += 1;
                }
            },
            c if (b'0'..b'8').contains(&c) => {
                let mut value = 0u32;
                let mut len = 0;
                while len < 3 && i + 1 + len < raw.len() {
                    let digit = raw[i + 1 + len];
                    if !(b'0'..b'8').contains(&digit) {
                        break;
                    }
                    value = value * 8 + (digit - b'0') as u32;
                    len += 1;
                }
                result.push((value & 0xFF) as u8);
                i += 1 + len;
            },
            _ => {
                result.push(b'\\');
                i += 1;
            },
        }
    }

    result
}

/// Decode a hex string body to bytes.
///
/// Whitespace is skipped; an odd trailing nibble is padded with `0`.
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(hex_bytes.len() / 2 + 1);
    let mut high: Option<u8> = None;

    for &c in hex_bytes {
        if crate::lexer::is_pdf_whitespace(c) {
            continue;
        }
        let nibble = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => {
                return Err(Error::ParseError {
                    offset: 0,
                    reason: format!("invalid hex digit '{}'", c as char),
                });
            },
        };
        match high.take() {
            Some(h) => result.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }

    // odd count: final nibble padded with 0
    if let Some(h) = high {
        result.push(h << 4);
    }

    Ok(result)
}

/// Parse one PDF object from input bytes.
///
/// Entry point for direct objects: primitives, arrays, dictionaries,
/// references and streams. A stream's /Length must be a direct integer
/// here; use [`parse_object_with`] when indirect lengths can occur.
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_object_with(input, None)
}

/// Parse one PDF object, resolving indirect stream /Length entries
/// through `resolver`.
pub fn parse_object_with<'a>(
    input: &'a [u8],
    resolver: Option<LengthResolver<'_>>,
) -> IResult<&'a [u8], Object> {
    let (rest, tok) = token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::Name(name) => Ok((rest, Object::Name(name))),

        Token::Integer(i) => {
            // `n g R` is a lexical three-token sequence; two integers not
            // followed by R stay two integers.
            if let Ok((rest2, Token::Integer(gen))) = token(rest) {
                if let Ok((rest3, Token::R)) = token(rest2) {
                    if i >= 0 && (0..=u16::MAX as i64).contains(&gen) {
                        return Ok((rest3, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                    }
                }
            }
            Ok((rest, Object::Integer(i)))
        },

        Token::LiteralString(raw) => {
            let decoded = decode_literal_string_escapes(raw);
            Ok((rest, Object::String(decoded, StringFormat::Literal)))
        },

        Token::HexString(raw) => match decode_hex(raw) {
            Ok(decoded) => Ok((rest, Object::String(decoded, StringFormat::Hexadecimal))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Fail,
            ))),
        },

        Token::ArrayStart => parse_array(rest, resolver),

        Token::DictStart => {
            let (after_dict, mut dict) = parse_dictionary(rest, resolver)?;

            // A dictionary directly followed by `stream` is a stream object
            if let Ok((body_input, Token::StreamStart)) = token(after_dict) {
                let (final_input, data, recovered_len) =
                    parse_stream_data(body_input, &dict, resolver)?;
                if let Some(len) = recovered_len {
                    log::warn!(
                        "stream /Length unusable; recovered {} bytes by scanning for endstream",
                        len
                    );
                    dict.insert("Length".to_string(), Object::Integer(len));
                }
                return Ok((
                    final_input,
                    Object::Stream {
                        dict,
                        data: bytes::Bytes::from(data),
                    },
                ));
            }

            Ok((after_dict, Object::Dictionary(dict)))
        },

        _ => Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))),
    }
}

/// Parse an indirect object `n g obj ... endobj` at `offset` in `data`.
///
/// Returns the reference from the header, the contained object, and the
/// byte offset just past the consumed input.
pub fn parse_indirect_object(
    data: &[u8],
    offset: usize,
    resolver: Option<LengthResolver<'_>>,
) -> Result<(ObjectRef, Object, usize)> {
    let input = data.get(offset..).ok_or(Error::UnexpectedEof)?;

    let parse_err = |reason: &str| Error::ParseError {
        offset,
        reason: reason.to_string(),
    };

    let (rest, id_tok) = token(input).map_err(|_| parse_err("expected object number"))?;
    let (rest, gen_tok) = token(rest).map_err(|_| parse_err("expected generation number"))?;
    let (rest, obj_tok) = token(rest).map_err(|_| parse_err("expected 'obj' keyword"))?;

    let (id, gen) = match (id_tok, gen_tok, obj_tok) {
        (Token::Integer(id), Token::Integer(gen), Token::ObjStart)
            if id >= 0 && (0..=u16::MAX as i64).contains(&gen) =>
        {
            (id as u32, gen as u16)
        },
        _ => return Err(parse_err("malformed indirect object header")),
    };

    let (rest, obj) = parse_object_with(rest, resolver).map_err(|_| Error::ParseError {
        offset,
        reason: format!("failed to parse body of object {} {}", id, gen),
    })?;

    // Tolerate a missing endobj; consume it when present
    let rest = match token(rest) {
        Ok((after, Token::ObjEnd)) => after,
        _ => {
            log::warn!("object {} {} has no endobj keyword", id, gen);
            rest
        },
    };

    let next_offset = data.len() - rest.len();
    Ok((ObjectRef::new(id, gen), obj, next_offset))
}

/// Capture stream payload bytes after the `stream` keyword.
///
/// The keyword is followed by one CRLF or LF (CR alone and a missing EOL
/// are tolerated with a warning). The payload runs for /Length bytes;
/// when /Length is missing, indirect-and-unresolvable, or points past the
/// end of input, the payload is recovered by scanning for `endstream` and
/// the recovered length is returned for the caller to record.
fn parse_stream_data<'a>(
    input: &'a [u8],
    dict: &HashMap<String, Object>,
    resolver: Option<LengthResolver<'_>>,
) -> std::result::Result<(&'a [u8], Vec<u8>, Option<i64>), nom::Err<nom::error::Error<&'a [u8]>>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") {
        &input[1..]
    } else if input.starts_with(b"\r") {
        log::warn!("stream keyword followed by bare CR");
        &input[1..]
    } else {
        log::warn!("no line ending after stream keyword");
        input
    };

    let length = match dict.get("Length") {
        Some(Object::Integer(n)) if *n >= 0 => Some(*n as usize),
        Some(Object::Reference(r)) => resolver
            .and_then(|resolve| resolve(*r))
            .filter(|n| *n >= 0)
            .map(|n| n as usize),
        _ => None,
    };

    if let Some(length) = length {
        if input.len() >= length {
            let payload = input[..length].to_vec();
            let mut remaining = &input[length..];

            // Expect endstream after optional whitespace; fall through to
            // the recovery scan if it is not there (bad /Length value).
            while let Some((&c, rest)) = remaining.split_first() {
                if crate::lexer::is_pdf_whitespace(c) {
                    remaining = rest;
                } else {
                    break;
                }
            }
            if let Ok((after, Token::StreamEnd)) = token(remaining) {
                return Ok((after, payload, None));
            }
            log::warn!("/Length {} not followed by endstream, rescanning", length);
        }
    }

    // Recovery: scan for the endstream keyword
    if let Some(pos) = find_keyword(input, b"endstream") {
        // the EOL before endstream belongs to the marker, not the payload
        let mut end = pos;
        if end > 0 && input[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && input[end - 1] == b'\r' {
            end -= 1;
        }
        let payload = input[..end].to_vec();
        let remaining = &input[pos + b"endstream".len()..];
        let recovered = payload.len() as i64;
        return Ok((remaining, payload, Some(recovered)));
    }

    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)))
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_keyword(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse array elements up to the closing `]`.
///
/// Lenient at EOF: an unclosed array returns the elements collected.
fn parse_array<'a>(
    input: &'a [u8],
    resolver: Option<LengthResolver<'_>>,
) -> IResult<&'a [u8], Object> {
    let mut objects = Vec::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::ArrayEnd)) => return Ok((rest, Object::Array(objects))),
            Ok(_) => match parse_object_with(remaining, resolver) {
                Ok((rest, obj)) => {
                    objects.push(obj);
                    remaining = rest;
                },
                Err(e) => {
                    if remaining.is_empty() {
                        return Ok((remaining, Object::Array(objects)));
                    }
                    return Err(e);
                },
            },
            Err(_) if remaining.is_empty() => {
                return Ok((remaining, Object::Array(objects)));
            },
            Err(e) => return Err(e),
        }
    }
}

/// Parse dictionary entries up to the closing `>>`.
///
/// Keys must be names; one value per key, later duplicates win. Lenient
/// at EOF like arrays.
fn parse_dictionary<'a>(
    input: &'a [u8],
    resolver: Option<LengthResolver<'_>>,
) -> IResult<&'a [u8], HashMap<String, Object>> {
    let mut dict = HashMap::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::DictEnd)) => return Ok((rest, dict)),
            Ok((rest, Token::Name(key))) => match parse_object_with(rest, resolver) {
                Ok((rest, value)) => {
                    dict.insert(key, value);
                    remaining = rest;
                },
                Err(e) => {
                    if rest.is_empty() {
                        return Ok((rest, dict));
                    }
                    return Err(e);
                },
            },
            Ok(_) => {
                if remaining.is_empty() {
                    return Ok((remaining, dict));
                }
                return Err(nom::Err::Error(nom::error::Error::new(
                    remaining,
                    nom::error::ErrorKind::Tag,
                )));
            },
            Err(_) if remaining.is_empty() => return Ok((remaining, dict)),
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Object {
        let (rest, obj) = parse_object(input).unwrap();
        assert!(rest.is_empty(), "unconsumed input: {:?}", rest);
        obj
    }

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b"true"), Object::Boolean(true));
        assert_eq!(parse(b"false"), Object::Boolean(false));
        assert_eq!(parse(b"42"), Object::Integer(42));
        assert_eq!(parse(b"-2.5"), Object::Real(-2.5));
        assert_eq!(parse(b"/Kids"), Object::Name("Kids".to_string()));
    }

    #[test]
    fn test_parse_literal_string() {
        assert_eq!(
            parse(b"(Hello World)"),
            Object::String(b"Hello World".to_vec(), StringFormat::Literal)
        );
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(decode_literal_string_escapes(b"a\\nb"), b"a\nb");
        assert_eq!(decode_literal_string_escapes(b"a\\tb"), b"a\tb");
        assert_eq!(decode_literal_string_escapes(b"\\(\\)"), b"()");
        assert_eq!(decode_literal_string_escapes(b"\\\\"), b"\\");
        assert_eq!(decode_literal_string_escapes(b"\\b\\f"), b"\x08\x0C");
    }

    #[test]
    fn test_octal_escapes_decoded_not_dropped() {
        // \247 = 0xA7 (section sign)
        assert_eq!(decode_literal_string_escapes(b"\\247 71.01"), b"\xa7 71.01");
        // one and two digit forms
        assert_eq!(decode_literal_string_escapes(b"\\7"), b"\x07");
        assert_eq!(decode_literal_string_escapes(b"\\53"), b"+");
        // stops at the first non-octal digit: \12 then literal '8'
        assert_eq!(decode_literal_string_escapes(b"\\128"), b"\n8");
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(decode_literal_string_escapes(b"long \\\nline"), b"long line");
        assert_eq!(decode_literal_string_escapes(b"long \\\r\nline"), b"long line");
    }

    #[test]
    fn test_unknown_escape_keeps_backslash() {
        assert_eq!(decode_literal_string_escapes(b"\\q"), b"\\q");
    }

    #[test]
    fn test_parse_hex_string() {
        assert_eq!(
            parse(b"<48656C6C6F>"),
            Object::String(b"Hello".to_vec(), StringFormat::Hexadecimal)
        );
        // interior whitespace ignored
        assert_eq!(
            parse(b"<48 65 6C 6C 6F>"),
            Object::String(b"Hello".to_vec(), StringFormat::Hexadecimal)
        );
    }

    #[test]
    fn test_hex_string_odd_length_padded() {
        assert_eq!(decode_hex(b"ABC").unwrap(), vec![0xAB, 0xC0]);
        assert_eq!(
            parse(b"<ABC>"),
            Object::String(vec![0xAB, 0xC0], StringFormat::Hexadecimal)
        );
    }

    #[test]
    fn test_hex_string_roundtrip() {
        let obj = parse(b"<48656C6C6F>");
        assert_eq!(obj.serialize(), b"<48656c6c6f>");
    }

    #[test]
    fn test_literal_string_roundtrip() {
        let original = Object::String(b"mixed (bytes) \\ here".to_vec(), StringFormat::Literal);
        let serialized = original.serialize();
        let (rest, reparsed) = parse_object(&serialized).unwrap();
        assert!(rest.is_empty());
        assert_eq!(reparsed, original);
    }

    #[test]
    fn test_reference_vs_two_integers() {
        assert_eq!(parse(b"10 0 R"), Object::Reference(ObjectRef::new(10, 0)));

        // two integers without R stay separate
        let (rest, first) = parse_object(b"10 0").unwrap();
        assert_eq!(first, Object::Integer(10));
        let (rest, second) = parse_object(rest).unwrap();
        assert_eq!(second, Object::Integer(0));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_array() {
        assert_eq!(parse(b"[]"), Object::Array(vec![]));
        assert_eq!(
            parse(b"[ 1 /Two (three) ]"),
            Object::Array(vec![
                Object::Integer(1),
                Object::Name("Two".to_string()),
                Object::String(b"three".to_vec(), StringFormat::Literal),
            ])
        );
    }

    #[test]
    fn test_parse_array_of_references() {
        assert_eq!(
            parse(b"[3 0 R 4 0 R]"),
            Object::Array(vec![
                Object::Reference(ObjectRef::new(3, 0)),
                Object::Reference(ObjectRef::new(4, 0)),
            ])
        );
    }

    #[test]
    fn test_parse_dictionary() {
        let obj = parse(b"<< /Type /Page /Count 3 >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Page"));
        assert_eq!(dict.get("Count").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn test_parse_nested_structures() {
        let obj = parse(b"<< /MediaBox [0 0 612 792] /Inner << /K /V >> >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("MediaBox").unwrap().as_array().unwrap().len(), 4);
        let inner = dict.get("Inner").unwrap().as_dict().unwrap();
        assert_eq!(inner.get("K").unwrap().as_name(), Some("V"));
    }

    #[test]
    fn test_parse_stream_with_length() {
        let input = b"<< /Length 5 >>\nstream\nHello\nendstream";
        let (rest, obj) = parse_object(input).unwrap();
        assert!(rest.is_empty());
        let (dict, data) = obj.as_stream().unwrap();
        assert_eq!(dict.get("Length").unwrap().as_integer(), Some(5));
        assert_eq!(&data[..], b"Hello");
    }

    #[test]
    fn test_parse_stream_crlf_after_keyword() {
        let input = b"<< /Length 2 >>\nstream\r\nokendstream";
        let (_, obj) = parse_object(input).unwrap();
        let (_, data) = obj.as_stream().unwrap();
        assert_eq!(&data[..], b"ok");
    }

    #[test]
    fn test_parse_stream_length_recovery() {
        // no /Length at all: payload recovered by endstream scan
        let input = b"<< /Kind /Test >>\nstream\nrecovered body\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        let (dict, data) = obj.as_stream().unwrap();
        assert_eq!(&data[..], b"recovered body");
        // recovered length is written back into the dictionary
        assert_eq!(dict.get("Length").unwrap().as_integer(), Some(14));
    }

    #[test]
    fn test_parse_stream_indirect_length_resolved() {
        let input = b"<< /Length 9 0 R >>\nstream\n12345\nendstream";
        let resolve = |r: ObjectRef| if r.id == 9 { Some(5) } else { None };
        let (_, obj) = parse_object_with(input, Some(&resolve)).unwrap();
        let (_, data) = obj.as_stream().unwrap();
        assert_eq!(&data[..], b"12345");
    }

    #[test]
    fn test_parse_stream_indirect_length_unresolvable_recovers() {
        let input = b"<< /Length 9 0 R >>\nstream\n12345\nendstream";
        let resolve = |_: ObjectRef| None;
        let (_, obj) = parse_object_with(input, Some(&resolve)).unwrap();
        let (dict, data) = obj.as_stream().unwrap();
        assert_eq!(&data[..], b"12345");
        assert_eq!(dict.get("Length").unwrap().as_integer(), Some(5));
    }

    #[test]
    fn test_parse_indirect_object() {
        let data = b"junk 4 0 obj << /Type /Page >> endobj tail";
        let (id, obj, next) = parse_indirect_object(data, 5, None).unwrap();
        assert_eq!(id, ObjectRef::new(4, 0));
        assert_eq!(obj.as_dict().unwrap().get("Type").unwrap().as_name(), Some("Page"));
        assert_eq!(&data[next..], b" tail");
    }

    #[test]
    fn test_parse_indirect_object_bad_header() {
        assert!(parse_indirect_object(b"<< >>", 0, None).is_err());
        assert!(parse_indirect_object(b"4 0 notobj null endobj", 0, None).is_err());
    }

    #[test]
    fn test_unclosed_array_is_lenient() {
        let (_, obj) = parse_object(b"[ 1 2 3").unwrap();
        assert_eq!(obj.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_unclosed_dictionary_is_lenient() {
        let (_, obj) = parse_object(b"<< /Type /Page").unwrap();
        assert_eq!(obj.as_dict().unwrap().get("Type").unwrap().as_name(), Some("Page"));
    }

    #[test]
    fn test_dictionary_non_name_key_is_error() {
        assert!(parse_object(b"<< 1 /Value >>").is_err());
    }
}
