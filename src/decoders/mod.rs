//! Stream decoder implementations for PDF filters.
//!
//! Filters are applied left-to-right in the order the /Filter entry lists
//! them, each paired with its /DecodeParms dictionary:
//! - FlateDecode (zlib/deflate, with PNG/TIFF predictors) - most common
//! - ASCIIHexDecode, ASCII85Decode - text encodings
//! - RunLengthDecode - byte-oriented RLE
//! - CCITTFaxDecode - Group 3/4 fax, decoded by the ccitt core
//! - DCTDecode, JBIG2Decode, JPXDecode - pass-through image payloads
//! - LZWDecode - recognized but unsupported

use crate::error::{Error, Result};
use crate::object::Object;
use std::collections::HashMap;

mod ascii85;
mod ascii_hex;
mod ccitt;
mod dct;
mod flate;
mod jbig2;
mod jpx;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Decoder;
pub use ascii_hex::AsciiHexDecoder;
pub use ccitt::CcittFaxDecoder;
pub use dct::DctDecoder;
pub use flate::FlateDecoder;
pub use jbig2::Jbig2Decoder;
pub use jpx::JpxDecoder;
pub use predictor::{PredictorParams, decode_predictor};
pub use runlength::RunLengthDecoder;

/// One step of a stream's filter chain: the filter name plus its matching
/// /DecodeParms entry, if any.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    /// Filter name as written in the file (e.g. "FlateDecode")
    pub name: String,
    /// The matching /DecodeParms dictionary
    pub params: Option<HashMap<String, Object>>,
}

impl FilterSpec {
    /// A spec with no parameters, mostly for tests and internal callers.
    pub fn plain(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: None,
        }
    }
}

/// Guard against decompression bombs. PDF sets no limit; 512 MiB of
/// decoded output per stream is far beyond any legitimate document core.
const MAX_DECODED_SIZE: usize = 512 * 1024 * 1024;

/// Trait for PDF stream decoders.
pub trait StreamDecoder {
    /// Decode `input`, honoring the filter's /DecodeParms if given.
    fn decode(&self, input: &[u8], params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>>;

    /// The filter name this decoder handles.
    fn name(&self) -> &str;
}

/// Look up the decoder for a filter name.
fn decoder_for(name: &str) -> Result<Box<dyn StreamDecoder>> {
    match name {
        "FlateDecode" | "Fl" => Ok(Box::new(FlateDecoder)),
        "ASCIIHexDecode" | "AHx" => Ok(Box::new(AsciiHexDecoder)),
        "ASCII85Decode" | "A85" => Ok(Box::new(Ascii85Decoder)),
        "RunLengthDecode" | "RL" => Ok(Box::new(RunLengthDecoder)),
        "CCITTFaxDecode" | "CCF" => Ok(Box::new(CcittFaxDecoder)),
        "DCTDecode" | "DCT" => Ok(Box::new(DctDecoder)),
        "JBIG2Decode" => Ok(Box::new(Jbig2Decoder)),
        "JPXDecode" => Ok(Box::new(JpxDecoder)),
        // explicitly unimplemented
        "LZWDecode" | "LZW" => Err(Error::UnsupportedFilter("LZWDecode".to_string())),
        other => Err(Error::UnsupportedFilter(other.to_string())),
    }
}

/// Run a filter chain over raw stream data.
///
/// Applies each filter in order, feeding the output of one into the next.
/// The decoded length is checked against a hard ceiling after every step.
pub fn decode_stream(data: &[u8], chain: &[FilterSpec]) -> Result<Vec<u8>> {
    let mut current = data.to_vec();

    for spec in chain {
        let decoder = decoder_for(&spec.name)?;
        current = decoder.decode(&current, spec.params.as_ref())?;

        if current.len() > MAX_DECODED_SIZE {
            return Err(Error::Decode(format!(
                "{} produced {} bytes, over the {} byte limit",
                spec.name,
                current.len(),
                MAX_DECODED_SIZE
            )));
        }
    }

    Ok(current)
}

/// Fetch an integer entry from a /DecodeParms dictionary with a default.
pub(crate) fn params_int(
    params: Option<&HashMap<String, Object>>,
    key: &str,
    default: i64,
) -> i64 {
    params
        .and_then(|p| p.get(key))
        .and_then(|o| o.as_integer())
        .unwrap_or(default)
}

/// Fetch a boolean entry from a /DecodeParms dictionary with a default.
pub(crate) fn params_bool(
    params: Option<&HashMap<String, Object>>,
    key: &str,
    default: bool,
) -> bool {
    params
        .and_then(|p| p.get(key))
        .and_then(|o| o.as_bool())
        .unwrap_or(default)
}
