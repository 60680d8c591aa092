//! CCITTFaxDecode filter: /DecodeParms mapping onto the fax core.
//!
//! Parameter names and defaults follow the CCITTFaxDecode parameter
//! dictionary: K (0), Columns (1728), Rows (0), EndOfLine (false),
//! EncodedByteAlign (false), EndOfBlock (true), BlackIs1 (false),
//! DamagedRowsBeforeError (0).

use crate::ccitt::{self, Params};
use crate::decoders::{StreamDecoder, params_bool, params_int};
use crate::error::Result;
use crate::object::Object;
use std::collections::HashMap;

/// CCITTFaxDecode filter implementation.
pub struct CcittFaxDecoder;

impl CcittFaxDecoder {
    /// Build fax parameters from a /DecodeParms dictionary.
    fn params(dict: Option<&HashMap<String, Object>>) -> Params {
        let defaults = Params::default();
        Params {
            k: params_int(dict, "K", defaults.k as i64) as i32,
            columns: params_int(dict, "Columns", defaults.columns as i64).max(1) as u32,
            rows: params_int(dict, "Rows", defaults.rows as i64).max(0) as u32,
            end_of_line: params_bool(dict, "EndOfLine", defaults.end_of_line),
            encoded_byte_align: params_bool(dict, "EncodedByteAlign", defaults.encoded_byte_align),
            end_of_block: params_bool(dict, "EndOfBlock", defaults.end_of_block),
            black_is_1: params_bool(dict, "BlackIs1", defaults.black_is_1),
            damaged_rows_before_error: params_int(
                dict,
                "DamagedRowsBeforeError",
                defaults.damaged_rows_before_error as i64,
            )
            .max(0) as u32,
        }
    }
}

impl StreamDecoder for CcittFaxDecoder {
    fn decode(&self, input: &[u8], params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        let fax = Self::params(params);
        let mut output = Vec::with_capacity(fax.stride() * fax.rows as usize);
        ccitt::decode_to_stream(&fax, input, &mut output)?;
        Ok(output)
    }

    fn name(&self) -> &str {
        "CCITTFaxDecode"
    }
}
