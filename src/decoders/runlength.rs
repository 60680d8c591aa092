//! RunLengthDecode implementation.
//!
//! Each length byte selects the action: `0..=127` copies the next N+1
//! bytes literally, `129..=255` repeats the next byte 257-N times, and
//! `128` ends the stream regardless of what follows.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use crate::object::Object;
use std::collections::HashMap;

/// RunLengthDecode filter implementation.
pub struct RunLengthDecoder;

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8], _params: Option<&HashMap<String, Object>>) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut i = 0;

        while i < input.len() {
            let length = input[i];
            i += 1;

            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    if i + count > input.len() {
                        return Err(Error::Decode(format!(
                            "RunLengthDecode: literal run needs {} bytes, {} left",
                            count,
                            input.len() - i
                        )));
                    }
                    output.extend_from_slice(&input[i..i + count]);
                    i += count;
                },
                128 => break,
                129..=255 => {
                    let count = 257 - length as usize;
                    let byte = *input.get(i).ok_or_else(|| {
                        Error::Decode("RunLengthDecode: repeat run missing its byte".to_string())
                    })?;
                    i += 1;
                    output.resize(output.len() + count, byte);
                },
            }
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}
