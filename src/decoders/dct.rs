//! DCTDecode (JPEG) pass-through.
//!
//! JPEG payloads are already in their final interchange format; this core
//! hands them to callers unchanged.

use crate::decoders::StreamDecoder;
use crate::error::Result;
use crate::object::Object;
use std::collections::HashMap;

/// DCTDecode filter implementation (pass-through).
pub struct DctDecoder;

impl StreamDecoder for DctDecoder {
    fn decode(&self, input: &[u8], _params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn name(&self) -> &str {
        "DCTDecode"
    }
}
