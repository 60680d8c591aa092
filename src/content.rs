//! Content-stream tokenizer and text extraction facade.
//!
//! Content streams use postfix notation: operands come first, then the
//! operator. The tokenizer reuses the object parser for operands, so
//! literal strings get full escape decoding - octal `\ddd` escapes
//! included - and hex strings decode to their bytes.
//!
//! Text extraction walks the operator list and collects the strings
//! shown by `Tj`, `TJ`, `'` and `"`. It aims at search and indexing, not
//! layout reconstruction.

use crate::error::Result;
use crate::object::Object;
use crate::parser::parse_object;

/// One operator with its operands, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    /// Operands preceding the operator, in order
    pub operands: Vec<Object>,
    /// Operator name as written (`Tj`, `T*`, `'`, ...)
    pub operator: String,
}

/// Characters that may appear in an operator name.
///
/// Covers the alphabetic operators plus `T*`/`B*`/`W*`/`f*`, the quote
/// operators, and `d0`/`d1`.
fn is_operator_byte(c: u8) -> bool {
    c.is_ascii_alphabetic() || matches!(c, b'*' | b'\'' | b'"' | b'0' | b'1')
}

/// Parse a content stream into operators.
///
/// Lenient: an unparseable byte is skipped so one corrupt operand does
/// not discard the rest of the page.
pub fn parse_content_stream(data: &[u8]) -> Result<Vec<ContentOp>> {
    let mut ops = Vec::new();
    let mut operands = Vec::new();
    let mut input = data;

    loop {
        input = skip_ws_and_comments(input);
        if input.is_empty() {
            break;
        }

        // digits only appear inside operator names (d0/d1), never first
        let c = input[0];
        let starts_operator = c.is_ascii_alphabetic() || matches!(c, b'*' | b'\'' | b'"');
        if starts_operator
            && !input.starts_with(b"true")
            && !input.starts_with(b"false")
            && !input.starts_with(b"null")
        {
            let (rest, name) = read_operator(input);
            input = rest;

            if name == "BI" {
                // inline image: skip dictionary and binary body to EI
                input = skip_inline_image(input);
                operands.clear();
                continue;
            }
            if name.is_empty() {
                input = &input[1..];
                continue;
            }

            ops.push(ContentOp {
                operands: std::mem::take(&mut operands),
                operator: name,
            });
            continue;
        }

        match parse_object(input) {
            Ok((rest, obj)) => {
                operands.push(obj);
                input = rest;
            },
            Err(_) => {
                // resynchronize one byte further on
                input = &input[1..];
                operands.clear();
            },
        }
    }

    Ok(ops)
}

/// Extract shown text from decoded content-stream bytes.
pub fn extract_text(data: &[u8]) -> Result<String> {
    let ops = parse_content_stream(data)?;
    let mut text = String::new();

    for op in &ops {
        match op.operator.as_str() {
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    push_text(&mut text, bytes);
                }
            },
            "'" | "\"" => {
                // both move to the next line before showing
                end_line(&mut text);
                if let Some(Object::String(bytes, _)) = op.operands.last() {
                    push_text(&mut text, bytes);
                }
            },
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.last() {
                    for item in items {
                        if let Object::String(bytes, _) = item {
                            push_text(&mut text, bytes);
                        }
                    }
                }
            },
            // line-advancing positioning operators
            "Td" | "TD" | "T*" => end_line(&mut text),
            _ => {},
        }
    }

    Ok(text)
}

/// Append string bytes, replacing non-UTF8 sequences.
fn push_text(out: &mut String, bytes: &[u8]) {
    out.push_str(&String::from_utf8_lossy(bytes));
}

/// Terminate the current output line, once.
fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

/// Skip PDF whitespace and % comments.
fn skip_ws_and_comments(mut input: &[u8]) -> &[u8] {
    loop {
        if let Some((&c, rest)) = input.split_first() {
            if crate::lexer::is_pdf_whitespace(c) {
                input = rest;
                continue;
            }
            if c == b'%' {
                let end = input
                    .iter()
                    .position(|&c| c == b'\r' || c == b'\n')
                    .unwrap_or(input.len());
                input = &input[end..];
                continue;
            }
        }
        return input;
    }
}

/// Read an operator name.
fn read_operator(input: &[u8]) -> (&[u8], String) {
    let end = input
        .iter()
        .position(|&c| !is_operator_byte(c))
        .unwrap_or(input.len());
    (
        &input[end..],
        String::from_utf8_lossy(&input[..end]).to_string(),
    )
}

/// Skip an inline image: everything through the `EI` operator.
fn skip_inline_image(input: &[u8]) -> &[u8] {
    let mut i = 0;
    while i + 1 < input.len() {
        if input[i] == b'E'
            && input[i + 1] == b'I'
            && (i == 0 || crate::lexer::is_pdf_whitespace(input[i - 1]))
            && (i + 2 >= input.len() || crate::lexer::is_pdf_whitespace(input[i + 2]))
        {
            return &input[i + 2..];
        }
        i += 1;
    }
    &input[input.len()..]
}
