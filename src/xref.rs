//! Cross-reference table parser.
//!
//! The xref maps object numbers to locations in the file, enabling random
//! access to indirect objects. Both formats are supported and may be mixed
//! within one (hybrid) document:
//!
//! - traditional `xref` tables (PDF 1.0-1.4): subsection headers
//!   `first count` followed by `offset generation n|f` rows
//! - cross-reference streams (PDF 1.5+): `/Type /XRef` streams with
//!   `/W [w1 w2 w3]` field widths and an optional `/Index`
//!
//! The `/Prev` chain is walked newest-first with a visited-offset set, so
//! a cyclic chain surfaces as an error instead of unbounded recursion, and
//! entries from newer sections override older ones.

use crate::error::{Error, Result};
use crate::object::Object;
use crate::parser::parse_indirect_object;
use std::collections::{HashMap, HashSet};

/// Location of one indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Object is free; `next` is the next free object number
    Free {
        /// Next free object number
        next: u32,
        /// Generation to use if the slot is reused
        gen: u16,
    },
    /// Object stored directly in the file at a byte offset
    Uncompressed {
        /// Byte offset of the `n g obj` header
        offset: u64,
        /// Generation number
        gen: u16,
    },
    /// Object stored inside an object stream
    Compressed {
        /// Object number of the containing /ObjStm stream
        container: u32,
        /// Index of the object within the stream
        index: u16,
    },
}

impl XrefEntry {
    /// Whether the entry points at a live object.
    pub fn in_use(&self) -> bool {
        !matches!(self, XrefEntry::Free { .. })
    }
}

/// Cross-reference table: object number to entry, plus the trailer.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    entries: HashMap<u32, XrefEntry>,
    trailer: Option<HashMap<String, Object>>,
}

impl XrefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the entry for an object number.
    pub fn get(&self, object_number: u32) -> Option<&XrefEntry> {
        self.entries.get(&object_number)
    }

    /// Insert an entry, replacing any existing one.
    pub fn insert(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Insert an entry only if the object number is still unknown.
    ///
    /// Used while walking `/Prev`: the newest section is read first, so
    /// older sections must not override it.
    fn insert_older(&mut self, object_number: u32, entry: XrefEntry) {
        self.entries.entry(object_number).or_insert(entry);
    }

    /// The trailer dictionary, once parsed.
    pub fn trailer(&self) -> Option<&HashMap<String, Object>> {
        self.trailer.as_ref()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all known object numbers.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}

/// Upper bound on rows in one classic subsection, against hostile counts.
const MAX_SUBSECTION_ROWS: u64 = 1_000_000;

/// Find the offset recorded by the final `startxref` keyword.
///
/// Scans the tail of the file (2 KiB is enough for any sane trailer) for
/// the last `startxref` and parses the integer on the following line.
pub fn find_startxref(data: &[u8]) -> Result<u64> {
    let tail_len = data.len().min(2048);
    let tail = &data[data.len() - tail_len..];

    let keyword = b"startxref";
    let pos = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| Error::InvalidXref("no startxref keyword".to_string()))?;

    let mut rest = &tail[pos + keyword.len()..];
    while let Some((&c, r)) = rest.split_first() {
        if crate::lexer::is_pdf_whitespace(c) {
            rest = r;
        } else {
            break;
        }
    }

    let digits: Vec<u8> = rest
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .copied()
        .collect();
    if digits.is_empty() {
        return Err(Error::InvalidXref("startxref not followed by an offset".to_string()));
    }

    String::from_utf8_lossy(&digits)
        .parse::<u64>()
        .map_err(|_| Error::InvalidXref("unparseable startxref offset".to_string()))
}

/// Parse the full xref chain starting at `offset`.
///
/// Walks `/Prev` links back through every incremental update, merging so
/// that later (newer) entries win. A revisited offset is reported as
/// [`Error::CyclicXref`].
pub fn parse_xref_chain(data: &[u8], offset: u64) -> Result<XrefTable> {
    let mut table = XrefTable::new();
    let mut visited: HashSet<u64> = HashSet::new();
    let mut next = Some(offset);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            return Err(Error::CyclicXref(offset));
        }

        let section = parse_xref_section(data, offset)?;

        for (num, entry) in section.entries {
            table.insert_older(num, entry);
        }

        // /Prev comes from the section just read
        next = section
            .trailer
            .as_ref()
            .and_then(|t| t.get("Prev"))
            .and_then(|o| o.as_integer())
            .map(|p| p as u64);

        // the newest trailer wins
        if table.trailer.is_none() {
            table.trailer = section.trailer;
        }
    }

    Ok(table)
}

/// Parse a single xref section (table or stream) at `offset`.
fn parse_xref_section(data: &[u8], offset: u64) -> Result<XrefTable> {
    let start = offset as usize;
    if start >= data.len() {
        return Err(Error::InvalidXref(format!("xref offset {} beyond end of file", offset)));
    }

    let mut head = &data[start..];
    while let Some((&c, rest)) = head.split_first() {
        if crate::lexer::is_pdf_whitespace(c) {
            head = rest;
        } else {
            break;
        }
    }

    if head.starts_with(b"xref") {
        log::debug!("classic xref table at offset {}", offset);
        parse_classic_table(data, start)
    } else if head.first().is_some_and(|c| c.is_ascii_digit()) {
        log::debug!("xref stream at offset {}", offset);
        parse_xref_stream(data, start)
    } else {
        Err(Error::InvalidXref(format!(
            "offset {} points at neither an xref table nor an xref stream",
            offset
        )))
    }
}

/// Parse a traditional cross-reference table plus its trailer.
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000018 00000 n
/// 0000000154 00000 n
/// trailer
/// << /Size 3 /Root 1 0 R >>
/// ```
fn parse_classic_table(data: &[u8], start: usize) -> Result<XrefTable> {
    let mut table = XrefTable::new();
    let mut lines = LineCursor::new(data, start);

    // first non-empty line must carry the xref keyword
    loop {
        let line = lines.next().ok_or_else(|| Error::InvalidXref("empty xref region".into()))?;
        let trimmed = trim_pdf_ws(line);
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with(b"xref") {
            break;
        }
        return Err(Error::InvalidXref("missing xref keyword".to_string()));
    }

    loop {
        let line_start = lines.position();
        let line = match lines.next() {
            Some(line) => line,
            None => break,
        };
        let trimmed = trim_pdf_ws(line);

        if trimmed.starts_with(b"trailer") {
            return parse_classic_trailer(data, line_start, table);
        }
        if trimmed.is_empty() || trimmed.starts_with(b"%") {
            continue;
        }

        // subsection header: "first count"
        let text = String::from_utf8_lossy(trimmed);
        let mut parts = text.split_whitespace();
        let (first, count) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => {
                let first: u32 = a
                    .parse()
                    .map_err(|_| Error::InvalidXref(format!("bad subsection start: {}", a)))?;
                let count: u64 = b
                    .parse()
                    .map_err(|_| Error::InvalidXref(format!("bad subsection count: {}", b)))?;
                (first, count)
            },
            _ => {
                log::warn!("skipping malformed xref line: {:?}", text);
                continue;
            },
        };

        if count > MAX_SUBSECTION_ROWS {
            return Err(Error::InvalidXref(format!("subsection count {} exceeds limit", count)));
        }

        let mut row = 0u32;
        while (row as u64) < count {
            let row_start = lines.position();
            let line = match lines.next() {
                Some(line) => line,
                None => {
                    return Err(Error::InvalidXref(format!(
                        "subsection truncated after {} of {} rows",
                        row, count
                    )));
                },
            };
            let trimmed = trim_pdf_ws(line);
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with(b"trailer") {
                // count overran the subsection
                log::warn!("xref subsection claims {} rows but only {} exist", count, row);
                return parse_classic_trailer(data, row_start, table);
            }

            match parse_table_row(trimmed) {
                Some(entry) => table.insert(first + row, entry),
                None => {
                    // placeholder keeps numbering aligned within the section
                    log::warn!("malformed xref row for object {}: {:?}", first + row, trimmed);
                    table.insert(first + row, XrefEntry::Free { next: 0, gen: 65535 });
                },
            }
            row += 1;
        }
    }

    Ok(table)
}

/// Parse one `offset generation flag` row.
fn parse_table_row(row: &[u8]) -> Option<XrefEntry> {
    let text = String::from_utf8_lossy(row);
    let mut parts = text.split_whitespace();

    let offset: u64 = parts.next()?.parse().ok()?;
    let gen: u16 = parts.next()?.parse().ok()?;
    match parts.next()? {
        "n" => Some(XrefEntry::Uncompressed { offset, gen }),
        "f" => Some(XrefEntry::Free {
            next: offset as u32,
            gen,
        }),
        _ => None,
    }
}

/// Parse the trailer dictionary that starts on the line at `line_start`.
fn parse_classic_trailer(data: &[u8], line_start: usize, mut table: XrefTable) -> Result<XrefTable> {
    let region = &data[line_start..];
    let pos = region
        .windows(7)
        .position(|w| w == b"trailer")
        .ok_or_else(|| Error::InvalidXref("trailer keyword lost".to_string()))?;

    let (_, obj) = crate::parser::parse_object(&region[pos + 7..])
        .map_err(|_| Error::InvalidXref("failed to parse trailer dictionary".to_string()))?;

    match obj {
        Object::Dictionary(dict) => {
            table.trailer = Some(dict);
            Ok(table)
        },
        _ => Err(Error::InvalidXref("trailer is not a dictionary".to_string())),
    }
}

/// Parse a cross-reference stream (`/Type /XRef`).
///
/// The stream dictionary doubles as the trailer. Entries are fixed-width
/// big-endian fields `[type, field2, field3]` with widths from `/W`:
/// type 0 = free, 1 = uncompressed at offset, 2 = compressed in stream.
fn parse_xref_stream(data: &[u8], start: usize) -> Result<XrefTable> {
    let (_, obj, _) = parse_indirect_object(data, start, None)
        .map_err(|e| Error::InvalidXref(format!("bad xref stream object: {}", e)))?;

    let (dict, _) = obj
        .as_stream()
        .ok_or_else(|| Error::InvalidXref("xref offset points at a non-stream object".into()))?;

    if let Some(type_name) = dict.get("Type").and_then(|o| o.as_name()) {
        if type_name != "XRef" {
            return Err(Error::InvalidXref(format!("expected /Type /XRef, got /{}", type_name)));
        }
    }

    let widths = dict
        .get("W")
        .and_then(|o| o.as_array())
        .ok_or_else(|| Error::InvalidXref("xref stream missing /W".into()))?;
    if widths.len() != 3 {
        return Err(Error::InvalidXref(format!("/W has {} fields, expected 3", widths.len())));
    }
    let w: Vec<usize> = widths
        .iter()
        .map(|o| o.as_integer().map(|n| n as usize))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::InvalidXref("non-integer /W field".into()))?;
    let entry_size = w[0] + w[1] + w[2];
    if entry_size == 0 {
        return Err(Error::InvalidXref("all /W fields are zero".into()));
    }

    let size = dict
        .get("Size")
        .and_then(|o| o.as_integer())
        .ok_or_else(|| Error::InvalidXref("xref stream missing /Size".into()))? as u32;

    let ranges: Vec<(u32, u32)> = match dict.get("Index").and_then(|o| o.as_array()) {
        Some(index) => {
            if index.len() % 2 != 0 {
                return Err(Error::InvalidXref("odd /Index length".into()));
            }
            index
                .chunks(2)
                .map(|pair| match (pair[0].as_integer(), pair[1].as_integer()) {
                    (Some(a), Some(b)) => Ok((a as u32, b as u32)),
                    _ => Err(Error::InvalidXref("non-integer /Index entry".into())),
                })
                .collect::<Result<Vec<_>>>()?
        },
        None => vec![(0, size)],
    };

    let decoded = obj
        .decode_stream_data()
        .map_err(|e| Error::InvalidXref(format!("xref stream decode failed: {}", e)))?;

    let mut table = XrefTable::new();
    let mut pos = 0usize;

    for (first, count) in ranges {
        for i in 0..count {
            if pos + entry_size > decoded.len() {
                return Err(Error::InvalidXref("truncated xref stream data".into()));
            }
            let fields = &decoded[pos..pos + entry_size];
            pos += entry_size;

            // a zero-width type field defaults to type 1
            let kind = if w[0] > 0 { read_be(&fields[..w[0]]) } else { 1 };
            let f2 = read_be(&fields[w[0]..w[0] + w[1]]);
            let f3 = read_be(&fields[w[0] + w[1]..]);

            let entry = match kind {
                0 => XrefEntry::Free {
                    next: f2 as u32,
                    gen: f3 as u16,
                },
                1 => XrefEntry::Uncompressed {
                    offset: f2,
                    gen: f3 as u16,
                },
                2 => XrefEntry::Compressed {
                    container: f2 as u32,
                    index: f3 as u16,
                },
                other => {
                    return Err(Error::InvalidXref(format!("unknown entry type {}", other)));
                },
            };
            table.insert(first + i, entry);
        }
    }

    table.trailer = Some(dict.clone());
    Ok(table)
}

/// Read a big-endian unsigned integer from up to 8 bytes.
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Trim PDF whitespace from both ends of a byte slice.
fn trim_pdf_ws(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|&c| !crate::lexer::is_pdf_whitespace(c))
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|&c| !crate::lexer::is_pdf_whitespace(c))
        .map(|p| p + 1)
        .unwrap_or(start);
    &line[start..end]
}

/// Iterator over lines that handles LF, CRLF and bare-CR endings.
struct LineCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(data: &'a [u8], start: usize) -> Self {
        Self { data, pos: start }
    }

    /// Absolute offset of the next line to be returned.
    fn position(&self) -> usize {
        self.pos
    }

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let mut end = start;
        while end < self.data.len() && self.data[end] != b'\r' && self.data[end] != b'\n' {
            end += 1;
        }
        self.pos = end;
        if self.pos < self.data.len() {
            if self.data[self.pos] == b'\r'
                && self.pos + 1 < self.data.len()
                && self.data[self.pos + 1] == b'\n'
            {
                self.pos += 2;
            } else {
                self.pos += 1;
            }
        }
        Some(&self.data[start..end])
    }
}
