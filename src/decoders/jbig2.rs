//! JBIG2Decode pass-through.
//!
//! JBIG2 decoding is out of scope; the compressed payload is returned
//! unchanged for callers that want the raw image data.

use crate::decoders::StreamDecoder;
use crate::error::Result;
use crate::object::Object;
use std::collections::HashMap;

/// JBIG2Decode filter implementation (pass-through).
pub struct Jbig2Decoder;

impl StreamDecoder for Jbig2Decoder {
    fn decode(&self, input: &[u8], _params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn name(&self) -> &str {
        "JBIG2Decode"
    }
}
