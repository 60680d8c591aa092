//! CCITT Group 3 / Group 4 line decoder.
//!
//! Each decoded line is a vector of color-change positions. Internally a
//! line is its transitions only; callers receive run boundaries (a
//! leading 0 and a trailing `columns` added). The reference line for line
//! i is line i-1's transitions; the first reference line is all white.
//!
//! 2D decoding follows T.4/T.6: `b1` is the first reference transition
//! strictly right of `a0` with the color opposite the current color, `b2`
//! the one after it. Transitions to black sit at even indices because
//! every line starts white.

use crate::ccitt::Params;
use crate::ccitt::bits::BitReader;
use crate::ccitt::tables::{Color, Mode, lookup_mode, lookup_run};
use crate::error::{Error, Result};
use std::io::Read;

/// A run of make-up codes cannot meaningfully exceed this; used to stop
/// runaway accumulation on damaged input.
const MAX_RUN: u32 = 1 << 20;

/// One-shot decoder: consumes its input and emits rows in order.
pub(crate) struct FaxDecoder<R> {
    params: Params,
    bits: BitReader<R>,
    /// Transitions of the previously decoded line; empty = all white
    reference: Vec<u32>,
    /// Current row index
    row: usize,
    /// Damaged rows replaced so far
    damaged: u32,
    /// Consecutive 2D lines seen (K > 0 only)
    twod_run: u32,
}

impl<R: Read> FaxDecoder<R> {
    pub(crate) fn new(params: Params, input: R) -> Result<Self> {
        if params.columns == 0 || params.columns > MAX_RUN {
            return Err(Error::InvalidFaxParams(format!(
                "columns must be in 1..={}, got {}",
                MAX_RUN, params.columns
            )));
        }
        Ok(Self {
            params,
            bits: BitReader::new(input),
            reference: Vec::new(),
            row: 0,
            damaged: 0,
            twod_run: 0,
        })
    }

    /// Decode every row, handing each row's run boundaries to `on_row`.
    /// Returns the number of rows produced.
    pub(crate) fn run(mut self, mut on_row: impl FnMut(&[u32]) -> Result<()>) -> Result<usize> {
        let want_rows = self.params.rows as usize;

        loop {
            if want_rows > 0 && self.row == want_rows {
                break;
            }

            if self.params.encoded_byte_align {
                self.bits.align_to_byte()?;
            }

            // end-of-data checks at the row boundary
            if want_rows == 0 && self.bits.only_fill_left()? {
                break;
            }

            let transitions = match self.decode_next_line() {
                Ok(None) => break,
                Ok(Some(t)) => t,
                Err(e) if self.row_error_recoverable(&e) => {
                    self.damaged = self.damaged.saturating_add(1);
                    if self.damaged > self.params.damaged_rows_before_error {
                        return Err(Error::FaxDecodeFailed {
                            row: self.row,
                            damaged: self.damaged,
                        });
                    }
                    log::warn!("replacing damaged row {}: {}", self.row, e);
                    // resync to the next EOL when the format carries them
                    if self.params.k >= 0 {
                        self.seek_to_eol()?;
                    }
                    // damage recovery cannot outrun the input
                    if !self.bits.has_bits(1)? {
                        return Err(Error::UnexpectedEof);
                    }
                    // the replacement is a copy of the reference line
                    self.reference.clone()
                },
                Err(e) => return Err(e),
            };

            let boundaries = to_boundaries(&transitions, self.params.columns);
            on_row(&boundaries)?;

            self.reference = transitions;
            self.row += 1;
        }

        if self.params.end_of_block {
            self.consume_trailing_block_end()?;
        }

        Ok(self.row)
    }

    /// Per-line EOL/tag handling. Returns `EndOfBlock` when an RTC/EOFB
    /// terminates the image instead of another line.
    fn line_prologue(&mut self) -> Result<Prologue> {
        if self.params.k < 0 {
            // Group 4: no EOLs between lines; an EOL here starts EOFB
            if self.bits.peek(12)? == 1 {
                return Ok(Prologue::EndOfBlock);
            }
            return Ok(Prologue::TwoDim);
        }

        // Group 3: EOL before the line (required with end_of_line,
        // tolerated otherwise)
        let saw_eol = if self.params.end_of_line {
            self.bits.read_eol()?
        } else if self.bits.peek(12)? == 1 {
            self.bits.consume(12)?;
            true
        } else {
            false
        };

        if self.params.k == 0 {
            // a second EOL straight after the first means RTC
            if saw_eol && self.bits.peek(12)? == 1 {
                return Ok(Prologue::EndOfBlock);
            }
            return Ok(Prologue::OneDim);
        }

        // mixed mode: a tag bit after the EOL picks the coding of this
        // line; a missing tag bit is truncation
        if !self.bits.has_bits(1)? {
            return Err(Error::UnexpectedEof);
        }
        let tag = self.bits.peek(1)?;
        self.bits.consume(1)?;

        if tag == 1 {
            // RTC in 2D form is EOL+1 repeated; detect the next EOL
            if saw_eol && self.bits.peek(12)? == 1 {
                return Ok(Prologue::EndOfBlock);
            }
            self.twod_run = 0;
            Ok(Prologue::OneDim)
        } else {
            self.twod_run += 1;
            if self.params.k > 0 && self.twod_run > (self.params.k - 1) as u32 {
                return Err(Error::BadLine {
                    row: self.row,
                    total: self.twod_run,
                    columns: (self.params.k - 1) as u32,
                });
            }
            Ok(Prologue::TwoDim)
        }
    }

    /// Run the line prologue, then decode one line in the coding it
    /// picked. `None` means the block ended (RTC/EOFB) instead.
    fn decode_next_line(&mut self) -> Result<Option<Vec<u32>>> {
        match self.line_prologue()? {
            Prologue::EndOfBlock => Ok(None),
            Prologue::OneDim => self.decode_line_1d().map(Some),
            Prologue::TwoDim => self.decode_line_2d().map(Some),
        }
    }

    /// Pure 1D line: alternating white/black runs to the row width.
    fn decode_line_1d(&mut self) -> Result<Vec<u32>> {
        let columns = self.params.columns;
        let mut transitions = Vec::new();
        let mut pos = 0u32;
        let mut color = Color::White;

        while pos < columns {
            let run = self.decode_run(color)?;
            pos = pos.saturating_add(run);
            if pos > columns {
                return Err(Error::BadLine {
                    row: self.row,
                    total: pos,
                    columns,
                });
            }
            transitions.push(pos);
            color = color.flip();
        }

        Ok(transitions)
    }

    /// 2D line (T.6, and the 2D lines of mixed T.4).
    fn decode_line_2d(&mut self) -> Result<Vec<u32>> {
        let columns = self.params.columns;
        let mut transitions = Vec::new();
        let mut a0: i64 = -1;
        let mut color = Color::White;

        while a0 < columns as i64 {
            let window = self.bits.peek(8)? as u8;
            let mode = lookup_mode(window).ok_or(Error::BadModeCode { row: self.row })?;
            self.bits.consume(mode.bits as u32)?;

            match mode.mode {
                Mode::Pass => {
                    let (_, b2) = self.find_reference(a0, color);
                    a0 = b2 as i64;
                },
                Mode::Horizontal => {
                    let run1 = self.decode_run(color)?;
                    let run2 = self.decode_run(color.flip())?;
                    let start = a0.max(0) as u32;
                    let a1 = start.saturating_add(run1).min(columns);
                    let a2 = a1.saturating_add(run2).min(columns);
                    transitions.push(a1);
                    transitions.push(a2);
                    a0 = a2 as i64;
                },
                Mode::Vertical(delta) => {
                    let (b1, _) = self.find_reference(a0, color);
                    let a1 = (b1 as i64 + delta as i64).clamp(a0.max(0), columns as i64) as u32;
                    transitions.push(a1);
                    a0 = a1 as i64;
                    color = color.flip();
                },
                Mode::Extension => {
                    return Err(Error::UnsupportedExtension(self.row));
                },
            }
        }

        Ok(transitions)
    }

    /// Find `(b1, b2)`: the first reference transition strictly right of
    /// `a0` whose color opposes the current color, and the one after it.
    /// Positions past the end of the reference line read as `columns`.
    fn find_reference(&self, a0: i64, color: Color) -> (u32, u32) {
        let columns = self.params.columns;
        let r = &self.reference;

        let mut i = 0;
        while i < r.len() && (r[i] as i64) <= a0 {
            i += 1;
        }
        // even index = transition to black, wanted when coding white
        let want_even = color == Color::White;
        if (i % 2 == 0) != want_even {
            i += 1;
        }

        let b1 = r.get(i).copied().unwrap_or(columns).min(columns);
        let b2 = r.get(i + 1).copied().unwrap_or(columns).min(columns);
        (b1, b2)
    }

    /// Decode one run: any chain of make-up codes plus one terminating
    /// code, summed.
    fn decode_run(&mut self, color: Color) -> Result<u32> {
        let mut total = 0u32;
        loop {
            let window = self.bits.peek(16)?;
            let code = lookup_run(window, color).ok_or(Error::BadHorizontalCode { row: self.row })?;
            self.bits.consume(code.bits as u32)?;
            total += code.run as u32;
            if code.terminating {
                return Ok(total);
            }
            if total > MAX_RUN {
                return Err(Error::BadHorizontalCode { row: self.row });
            }
        }
    }

    /// Whether an error from one line can be absorbed by the damaged-row
    /// budget.
    fn row_error_recoverable(&self, e: &Error) -> bool {
        self.params.damaged_rows_before_error > 0
            && matches!(
                e,
                Error::BadLine { .. }
                    | Error::BadHorizontalCode { .. }
                    | Error::BadModeCode { .. }
            )
    }

    /// Advance to just before the next EOL marker (damage resync).
    fn seek_to_eol(&mut self) -> Result<()> {
        loop {
            if !self.bits.has_bits(12)? {
                return Ok(());
            }
            if self.bits.peek(12)? == 1 {
                return Ok(());
            }
            self.bits.consume(1)?;
        }
    }

    /// Consume a trailing RTC (G3) or EOFB (G4), if present.
    fn consume_trailing_block_end(&mut self) -> Result<()> {
        let mut eols = 0;
        while self.bits.read_eol()? {
            eols += 1;
            if eols >= 8 {
                break;
            }
            // in mixed mode each RTC EOL is followed by a 1 tag bit
            if self.params.k > 0 && self.bits.has_bits(1)? && self.bits.peek(1)? == 1 {
                self.bits.consume(1)?;
            }
        }
        if eols == 0 {
            log::debug!("no RTC/EOFB found after final row");
        }
        Ok(())
    }
}

/// What the line prologue decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prologue {
    /// Decode the next line with 1D codes
    OneDim,
    /// Decode the next line with 2D codes
    TwoDim,
    /// The image data ended (RTC/EOFB)
    EndOfBlock,
}

/// Convert a line's transitions into run boundaries: leading 0, trailing
/// `columns`, alternating white-first.
fn to_boundaries(transitions: &[u32], columns: u32) -> Vec<u32> {
    let mut boundaries = Vec::with_capacity(transitions.len() + 2);
    boundaries.push(0);
    boundaries.extend(transitions.iter().map(|&t| t.min(columns)));
    if *boundaries.last().unwrap() != columns {
        boundaries.push(columns);
    }
    boundaries
}
