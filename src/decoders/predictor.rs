//! PNG and TIFF predictor reversal.
//!
//! Flate-compressed streams are frequently predictor-filtered first so
//! that similar rows compress better. Decoding reverses the row filters:
//! TIFF predictor 2 adds the left neighbor; PNG predictors 10-15 carry a
//! per-row tag byte selecting None/Sub/Up/Average/Paeth.

use crate::error::{Error, Result};
use crate::object::Object;
use std::collections::HashMap;

/// Predictor settings from a /DecodeParms dictionary.
#[derive(Debug, Clone)]
pub struct PredictorParams {
    /// 1 = none, 2 = TIFF, 10-15 = PNG
    pub predictor: i64,
    /// Samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl PredictorParams {
    /// Read predictor settings out of a /DecodeParms dictionary.
    pub fn from_dict(params: Option<&HashMap<String, Object>>) -> Self {
        use crate::decoders::params_int;
        Self {
            predictor: params_int(params, "Predictor", 1),
            columns: params_int(params, "Columns", 1).max(1) as usize,
            colors: params_int(params, "Colors", 1).max(1) as usize,
            bits_per_component: params_int(params, "BitsPerComponent", 8).max(1) as usize,
        }
    }

    /// Bytes of sample data per row (excluding any PNG tag byte).
    pub fn pixel_bytes_per_row(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Bytes per encoded row, including the PNG predictor tag.
    pub fn encoded_bytes_per_row(&self) -> usize {
        if self.predictor >= 10 {
            self.pixel_bytes_per_row() + 1
        } else {
            self.pixel_bytes_per_row()
        }
    }

    /// Bytes per pixel, rounded up; the left-neighbor distance.
    fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Reverse a predictor over decoded (inflated) data.
pub fn decode_predictor(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => decode_tiff(data, params),
        10..=15 => decode_png(data, params),
        other => Err(Error::Decode(format!("unsupported predictor {}", other))),
    }
}

/// TIFF predictor 2: each sample is a delta from its left neighbor.
fn decode_tiff(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor only supported for 8 bits per component, got {}",
            params.bits_per_component
        )));
    }

    let row_len = params.pixel_bytes_per_row();
    if row_len == 0 || data.len() % row_len != 0 {
        return Err(Error::Decode(format!(
            "predictor data length {} is not a whole number of {}-byte rows",
            data.len(),
            row_len
        )));
    }

    let colors = params.colors;
    let mut output = Vec::with_capacity(data.len());

    for row in data.chunks(row_len) {
        let row_start = output.len();
        for (i, &byte) in row.iter().enumerate() {
            if i < colors {
                output.push(byte);
            } else {
                let left = output[row_start + i - colors];
                output.push(byte.wrapping_add(left));
            }
        }
    }

    Ok(output)
}

/// PNG predictors: per-row tag byte, then filtered samples.
fn decode_png(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let encoded_row = params.encoded_bytes_per_row();
    let pixel_row = params.pixel_bytes_per_row();

    if encoded_row == 0 || data.len() % encoded_row != 0 {
        return Err(Error::Decode(format!(
            "predictor data length {} is not a whole number of {}-byte rows",
            data.len(),
            encoded_row
        )));
    }

    let rows = data.len() / encoded_row;
    let bpp = params.bytes_per_pixel();
    let mut output: Vec<u8> = Vec::with_capacity(rows * pixel_row);

    for row_idx in 0..rows {
        let row = &data[row_idx * encoded_row..(row_idx + 1) * encoded_row];
        let tag = row[0];
        let samples = &row[1..];
        let row_start = output.len();

        for (i, &byte) in samples.iter().enumerate() {
            let left = if i >= bpp { output[row_start + i - bpp] } else { 0 };
            let up = if row_idx > 0 {
                output[row_start - pixel_row + i]
            } else {
                0
            };
            let up_left = if row_idx > 0 && i >= bpp {
                output[row_start - pixel_row + i - bpp]
            } else {
                0
            };

            let reconstructed = match tag {
                0 => byte,
                1 => byte.wrapping_add(left),
                2 => byte.wrapping_add(up),
                3 => byte.wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => byte.wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(Error::Decode(format!("invalid PNG row filter tag {}", other)));
                },
            };
            output.push(reconstructed);
        }
    }

    Ok(output)
}

/// Paeth predictor function from the PNG specification.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i16, b as i16, c as i16);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(predictor: i64, columns: usize) -> PredictorParams {
        PredictorParams {
            predictor,
            columns,
            colors: 1,
            bits_per_component: 8,
        }
    }

    #[test]
    fn test_no_predictor_is_identity() {
        let data = b"Hello";
        assert_eq!(decode_predictor(data, &params(1, 5)).unwrap(), data);
    }

    #[test]
    fn test_png_none() {
        let encoded = [0u8, 1, 2, 3];
        assert_eq!(decode_predictor(&encoded, &params(10, 3)).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_png_sub() {
        // deltas of 1 from an initial 10
        let encoded = [1u8, 10, 1, 1, 1];
        assert_eq!(decode_predictor(&encoded, &params(11, 4)).unwrap(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_png_up() {
        let encoded = [
            2u8, 10, 20, 30, 40, 50, // row 0, nothing above = raw
            2, 5, 5, 5, 5, 5, // row 1: +5 on the row above
        ];
        assert_eq!(
            decode_predictor(&encoded, &params(12, 5)).unwrap(),
            vec![10, 20, 30, 40, 50, 15, 25, 35, 45, 55]
        );
    }

    #[test]
    fn test_png_average() {
        // row 0: left-only average; 10, then 10 + avg(10,0)=15
        let encoded = [3u8, 10, 10];
        assert_eq!(decode_predictor(&encoded, &params(13, 2)).unwrap(), vec![10, 15]);
    }

    #[test]
    fn test_png_paeth_row() {
        // first row: paeth(left,0,0) = left
        let encoded = [4u8, 7, 3];
        assert_eq!(decode_predictor(&encoded, &params(14, 2)).unwrap(), vec![7, 10]);
    }

    #[test]
    fn test_png_per_row_tags() {
        // predictor 15 means "tag chosen per row"; mix None and Up
        let encoded = [
            0u8, 1, 2, // row 0: raw
            2, 10, 10, // row 1: +10 each
        ];
        assert_eq!(decode_predictor(&encoded, &params(15, 2)).unwrap(), vec![1, 2, 11, 12]);
    }

    #[test]
    fn test_tiff_predictor() {
        let p = params(2, 4);
        assert_eq!(decode_predictor(&[10, 1, 1, 1], &p).unwrap(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_ragged_length_is_error() {
        assert!(decode_predictor(&[0, 1, 2], &params(12, 4)).is_err());
    }

    #[test]
    fn test_invalid_tag_is_error() {
        assert!(decode_predictor(&[9, 1, 2], &params(12, 2)).is_err());
    }

    #[test]
    fn test_paeth_function() {
        assert_eq!(paeth(0, 0, 0), 0);
        assert_eq!(paeth(5, 0, 0), 5);
        assert_eq!(paeth(0, 7, 0), 7);
        // ties prefer a, then b
        assert_eq!(paeth(4, 4, 4), 4);
    }

    #[test]
    fn test_from_dict_defaults() {
        let p = PredictorParams::from_dict(None);
        assert_eq!(p.predictor, 1);
        assert_eq!(p.columns, 1);
        assert_eq!(p.colors, 1);
        assert_eq!(p.bits_per_component, 8);
    }
}
