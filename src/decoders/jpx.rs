//! JPXDecode (JPEG 2000) pass-through.
//!
//! JPEG 2000 decoding is out of scope; the payload is returned unchanged.

use crate::decoders::StreamDecoder;
use crate::error::Result;
use crate::object::Object;
use std::collections::HashMap;

/// JPXDecode filter implementation (pass-through).
pub struct JpxDecoder;

impl StreamDecoder for JpxDecoder {
    fn decode(&self, input: &[u8], _params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn name(&self) -> &str {
        "JPXDecode"
    }
}
