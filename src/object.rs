//! PDF object types.
//!
//! The tagged sum every other module works in terms of, plus typed
//! accessors, stream decoding and the byte serializer used by the
//! round-trip tests.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::Write;

/// How a string object was written in the file.
///
/// Carried through parsing so that re-serialization keeps the original
/// syntax (`(..)` vs `<..>`). Callers may also use it as a charset hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// Literal syntax: `(Hello)`
    Literal,
    /// Hexadecimal syntax: `<48656c6c6f>`
    Hexadecimal,
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String bytes plus the syntax they were written in
    String(Vec<u8>, StringFormat),
    /// Name, stored with # escapes decoded; equality is on these bytes
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (name-keyed values, one value per key)
    Dictionary(HashMap<String, Object>),
    /// Stream: dictionary plus raw (still encoded) payload
    Stream {
        /// Stream dictionary (/Length, /Filter, /DecodeParms, ...)
        dict: HashMap<String, Object>,
        /// Raw stream payload
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(..) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to a number, widening integers to f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to string bytes.
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s, _) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream.
    pub fn as_dict(&self) -> Option<&HashMap<String, Object>> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to a stream's parts.
    pub fn as_stream(&self) -> Option<(&HashMap<String, Object>, &bytes::Bytes)> {
        match self {
            Object::Stream { dict, data } => Some((dict, data)),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode stream data by running the /Filter chain.
    ///
    /// Each filter receives its matching /DecodeParms entry. Returns the
    /// fully decoded payload, or an error if this is not a stream or a
    /// filter fails.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        match self {
            Object::Stream { dict, data } => {
                let chain = filter_chain(dict);
                crate::decoders::decode_stream(data, &chain)
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }

    /// Serialize this object to PDF syntax bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // writes to a Vec never fail
        self.write_to(&mut buf).unwrap();
        buf
    }

    /// Write this object in PDF syntax to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        match self {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => write_real(w, *r),
            Object::String(s, StringFormat::Literal) => write_literal_string(w, s),
            Object::String(s, StringFormat::Hexadecimal) => write_hex_string(w, s),
            Object::Name(n) => write_name(w, n),
            Object::Array(arr) => {
                write!(w, "[")?;
                for (i, obj) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(w, " ")?;
                    }
                    obj.write_to(w)?;
                }
                write!(w, "]")
            },
            Object::Dictionary(dict) => write_dictionary(w, dict),
            Object::Stream { dict, data } => {
                write_dictionary(w, dict)?;
                write!(w, "\nstream\n")?;
                w.write_all(data)?;
                write!(w, "\nendstream")
            },
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }
}

/// Extract the filter chain from a stream dictionary.
///
/// /Filter may be a single name or an array of names; /DecodeParms (if
/// present) pairs up positionally, with null standing for "no parameters".
pub fn filter_chain(dict: &HashMap<String, Object>) -> Vec<crate::decoders::FilterSpec> {
    let names: Vec<String> = match dict.get("Filter") {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|obj| obj.as_name().map(|s| s.to_string()))
            .collect(),
        _ => vec![],
    };

    let parms: Vec<Option<&HashMap<String, Object>>> = match dict.get("DecodeParms") {
        Some(Object::Dictionary(d)) => vec![Some(d)],
        Some(Object::Array(arr)) => arr.iter().map(|obj| obj.as_dict()).collect(),
        _ => vec![],
    };

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| crate::decoders::FilterSpec {
            name,
            params: parms.get(i).copied().flatten().cloned(),
        })
        .collect()
}

/// Write a real number with at most 5 decimal places, trailing zeros
/// trimmed.
fn write_real<W: Write>(w: &mut W, value: f64) -> std::io::Result<()> {
    if value.fract() == 0.0 {
        write!(w, "{}", value as i64)
    } else {
        let formatted = format!("{:.5}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        write!(w, "{}", trimmed)
    }
}

/// Write a literal string with `\`-escapes for delimiters and control
/// characters.
fn write_literal_string<W: Write>(w: &mut W, data: &[u8]) -> std::io::Result<()> {
    write!(w, "(")?;
    for &byte in data {
        match byte {
            b'(' => write!(w, "\\(")?,
            b')' => write!(w, "\\)")?,
            b'\\' => write!(w, "\\\\")?,
            b'\n' => write!(w, "\\n")?,
            b'\r' => write!(w, "\\r")?,
            b'\t' => write!(w, "\\t")?,
            0x08 => write!(w, "\\b")?,
            0x0C => write!(w, "\\f")?,
            _ => w.write_all(&[byte])?,
        }
    }
    write!(w, ")")
}

/// Write a hex string, lowercase digits.
fn write_hex_string<W: Write>(w: &mut W, data: &[u8]) -> std::io::Result<()> {
    write!(w, "<")?;
    for byte in data {
        write!(w, "{:02x}", byte)?;
    }
    write!(w, ">")
}

/// Write a name, escaping delimiters, `#`, and non-regular bytes as #HH.
fn write_name<W: Write>(w: &mut W, name: &str) -> std::io::Result<()> {
    write!(w, "/")?;
    for byte in name.bytes() {
        let needs_escape = byte == b'#'
            || crate::lexer::is_pdf_whitespace(byte)
            || crate::lexer::is_pdf_delimiter(byte)
            || !(0x21..=0x7E).contains(&byte);
        if needs_escape {
            write!(w, "#{:02X}", byte)?;
        } else {
            w.write_all(&[byte])?;
        }
    }
    Ok(())
}

/// Write a dictionary with deterministically ordered keys.
fn write_dictionary<W: Write>(w: &mut W, dict: &HashMap<String, Object>) -> std::io::Result<()> {
    write!(w, "<<")?;
    let mut keys: Vec<_> = dict.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(value) = dict.get(key) {
            write!(w, " ")?;
            write_name(w, key)?;
            write!(w, " ")?;
            value.write_to(w)?;
        }
    }
    write!(w, " >>")
}
