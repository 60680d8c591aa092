//! FlateDecode (zlib/deflate) implementation.
//!
//! The most common PDF compression filter. Decompression is zlib first;
//! raw deflate is tried as a recovery path because some generators write
//! deflate data with a corrupt or missing zlib header. PNG/TIFF
//! predictors from /DecodeParms are reversed after inflation.

use crate::decoders::predictor::{PredictorParams, decode_predictor};
use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use crate::object::Object;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::collections::HashMap;
use std::io::Read;

/// FlateDecode filter implementation.
pub struct FlateDecoder;

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8], params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        let inflated = inflate(input)?;

        let predictor = PredictorParams::from_dict(params);
        if predictor.predictor == 1 {
            Ok(inflated)
        } else {
            decode_predictor(&inflated, &predictor)
        }
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

/// Inflate zlib data, falling back to raw deflate.
fn inflate(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    match ZlibDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => return Ok(output),
        Err(e) => {
            // partial output before the error is still usable content
            if !output.is_empty() {
                log::warn!("FlateDecode: kept {} bytes before zlib error: {}", output.len(), e);
                return Ok(output);
            }
            log::debug!("zlib decode failed ({}), trying raw deflate", e);
        },
    }

    output.clear();
    match DeflateDecoder::new(input).read_to_end(&mut output) {
        Ok(_) if !output.is_empty() => {
            log::debug!("raw deflate recovery produced {} bytes", output.len());
            Ok(output)
        },
        Err(_) if !output.is_empty() => {
            log::warn!("raw deflate partial recovery: {} bytes", output.len());
            Ok(output)
        },
        _ => Err(Error::Decode("FlateDecode: data is neither zlib nor raw deflate".to_string())),
    }
}
