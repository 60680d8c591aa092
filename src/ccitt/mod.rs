//! CCITT Group 3 / Group 4 fax decoding.
//!
//! A from-scratch implementation of the T.4 (Group 3, 1D and mixed
//! 1D/2D) and T.6 (Group 4) decoders: an MSB-first bit reader, the
//! standard Huffman run tables, the reference-line state machine, and a
//! 1bpp packer. The decoder is single-use and consumes its input once;
//! it holds at most the current and reference lines in memory, so the
//! streaming path works on images of any height.
//!
//! Input is anything `io::Read` (a `&[u8]` slice works as-is). Output is
//! either per-row change positions or packed rows pushed to a sink:
//!
//! ```
//! use pdfax::ccitt::{Params, decode_to_lines};
//!
//! // an 18-wide all-white G4 image: eighteen V(0) codes
//! let params = Params { k: -1, columns: 18, rows: 18, ..Params::default() };
//! let rows = decode_to_lines(&params, &[0xFF, 0xFF, 0xC0][..]).unwrap();
//! assert_eq!(rows.len(), 18);
//! assert_eq!(rows[0], vec![0, 18]);
//! ```

mod bitmap;
mod bits;
mod decoder;
mod tables;

pub use bitmap::{pack_row, row_stride};
pub use bits::BitReader;
pub use tables::{Color, Mode, ModeCode, RunCode, black_table, lookup_mode, lookup_run, white_table};

use crate::error::Result;
use decoder::FaxDecoder;
use std::io::{Read, Write};

/// CCITT decoding parameters, mirroring the CCITTFaxDecode parameter
/// dictionary.
#[derive(Debug, Clone)]
pub struct Params {
    /// Coding scheme: < 0 = Group 4 (T.6), 0 = Group 3 pure 1D,
    /// > 0 = Group 3 mixed with at most k-1 consecutive 2D lines
    pub k: i32,
    /// Pixels per row
    pub columns: u32,
    /// Row count; 0 = unknown, decode until RTC/EOFB or end of input
    pub rows: u32,
    /// EOL markers precede each line
    pub end_of_line: bool,
    /// Each line starts on a byte boundary
    pub encoded_byte_align: bool,
    /// Expect a trailing RTC/EOFB
    pub end_of_block: bool,
    /// Complement the packed output (see [`pack_row`])
    pub black_is_1: bool,
    /// Rows to silently replace with the reference line before a damaged
    /// stream becomes a fatal error
    pub damaged_rows_before_error: u32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            k: 0,
            columns: 1728,
            rows: 0,
            end_of_line: false,
            encoded_byte_align: false,
            end_of_block: true,
            black_is_1: false,
            damaged_rows_before_error: 0,
        }
    }
}

impl Params {
    /// Bytes per packed output row.
    pub fn stride(&self) -> usize {
        row_stride(self.columns)
    }
}

/// Decode an image to per-row change positions.
///
/// Each row is its run boundaries: `[0, ..., columns]`, alternating
/// white-first, so `rows[i]` pairs directly with [`pack_row`].
pub fn decode_to_lines<R: Read>(params: &Params, input: R) -> Result<Vec<Vec<u32>>> {
    let mut rows = Vec::new();
    FaxDecoder::new(params.clone(), input)?.run(|boundaries| {
        rows.push(boundaries.to_vec());
        Ok(())
    })?;
    Ok(rows)
}

/// Decode an image, streaming each packed 1bpp row to `sink`.
///
/// Rows are written in increasing row order, `stride` bytes each.
/// Returns the total bytes written, always `rows * stride`.
pub fn decode_to_stream<R: Read, W: Write>(
    params: &Params,
    input: R,
    sink: &mut W,
) -> Result<usize> {
    let columns = params.columns;
    let black_is_1 = params.black_is_1;
    let mut written = 0usize;

    FaxDecoder::new(params.clone(), input)?.run(|boundaries| {
        let row = pack_row(boundaries, columns, black_is_1);
        sink.write_all(&row)?;
        written += row.len();
        Ok(())
    })?;

    Ok(written)
}
