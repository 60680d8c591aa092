//! Object stream parsing (PDF 1.5+).
//!
//! Object streams (`/Type /ObjStm`) pack several non-stream objects into
//! one compressed stream. The decoded payload starts with `/N` pairs of
//! integers `obj_num offset`, the offsets being relative to `/First`,
//! followed by the serialized objects themselves.

use crate::error::{Error, Result};
use crate::object::Object;
use crate::parser::parse_object;
use std::collections::HashMap;

/// Parse an object stream and extract every object it contains.
///
/// Returns a map from object number to parsed object. Individual objects
/// that fail to parse are skipped with a warning so one bad entry does not
/// take down its siblings.
pub fn parse_object_stream(stream_obj: &Object) -> Result<HashMap<u32, Object>> {
    let dict = match stream_obj {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            });
        },
    };

    if let Some(type_name) = dict.get("Type").and_then(|o| o.as_name()) {
        if type_name != "ObjStm" {
            return Err(Error::InvalidObjectType {
                expected: "ObjStm".to_string(),
                found: type_name.to_string(),
            });
        }
    }

    let n = dict
        .get("N")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: "object stream missing /N".to_string(),
        })?;
    let first = dict
        .get("First")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: "object stream missing /First".to_string(),
        })?;

    if !(0..=1_000_000).contains(&n) || !(0..=10_000_000).contains(&first) {
        return Err(Error::ParseError {
            offset: 0,
            reason: format!("implausible object stream header: /N {} /First {}", n, first),
        });
    }
    let n = n as usize;
    let first = first as usize;

    let decoded = stream_obj.decode_stream_data()?;
    if decoded.len() < first {
        return Err(Error::ParseError {
            offset: 0,
            reason: format!(
                "object stream data is {} bytes, /First claims {}",
                decoded.len(),
                first
            ),
        });
    }

    let pairs = parse_offset_pairs(&decoded[..first], n)?;
    let bodies = &decoded[first..];

    let mut objects = HashMap::with_capacity(n);
    for (obj_num, offset) in pairs {
        if offset >= bodies.len() {
            log::warn!(
                "object {} offset {} is beyond the stream body ({} bytes)",
                obj_num,
                offset,
                bodies.len()
            );
            continue;
        }
        match parse_object(&bodies[offset..]) {
            Ok((_, obj)) => {
                objects.insert(obj_num, obj);
            },
            Err(e) => {
                log::warn!("failed to parse object {} at stream offset {}: {:?}", obj_num, offset, e);
            },
        }
    }

    Ok(objects)
}

/// Parse the `/N` leading `obj_num offset` integer pairs.
fn parse_offset_pairs(data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count);
    let mut rest = data;

    for i in 0..count {
        let (r, obj_num) = read_uint(rest).ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("missing object number in pair {}", i),
        })?;
        let (r, offset) = read_uint(r).ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("missing offset in pair {}", i),
        })?;
        pairs.push((obj_num as u32, offset as usize));
        rest = r;
    }

    Ok(pairs)
}

/// Skip whitespace, then read a run of decimal digits.
fn read_uint(data: &[u8]) -> Option<(&[u8], u64)> {
    let mut i = 0;
    while i < data.len() && crate::lexer::is_pdf_whitespace(data[i]) {
        i += 1;
    }
    let start = i;
    while i < data.len() && data[i].is_ascii_digit() {
        i += 1;
    }
    if i == start {
        return None;
    }
    let value: u64 = String::from_utf8_lossy(&data[start..i]).parse().ok()?;
    Some((&data[i..], value))
}
