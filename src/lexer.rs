//! PDF lexer (tokenizer).
//!
//! Low-level tokenization of a PDF byte stream. The lexer recognizes the
//! atomic units of PDF syntax and nothing more; combining tokens into
//! objects is the parser's job, and filter content is never decoded here.
//!
//! Token inventory:
//! - Numbers: integers (42, -17) and reals (3.5, -.002)
//! - Strings: literal ((Hi)) and hexadecimal (<48656C>)
//! - Names: /Type, /Kids (with #HH escapes decoded)
//! - Keywords: true, false, null, obj, endobj, stream, endstream,
//!   xref, trailer, startxref, R, and the xref row flags n / f
//! - Delimiters: `[`, `]`, `<<`, `>>`
//!
//! Whitespace (`\0 \t \n \f \r SP`) and comments (% to EOL) are skipped
//! between tokens.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_till, take_while},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, value},
    sequence::{delimited, preceded},
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number
    Integer(i64),

    /// Real (floating-point) number
    Real(f64),

    /// Literal string content, escapes still raw (decoded by the parser)
    LiteralString(&'a [u8]),

    /// Hex string content, digits and interior whitespace still raw
    HexString(&'a [u8]),

    /// Name with #HH escapes already decoded
    Name(String),

    /// `true`
    True,

    /// `false`
    False,

    /// `null`
    Null,

    /// `[`
    ArrayStart,

    /// `]`
    ArrayEnd,

    /// `<<`
    DictStart,

    /// `>>`
    DictEnd,

    /// `obj`
    ObjStart,

    /// `endobj`
    ObjEnd,

    /// `stream`
    StreamStart,

    /// `endstream`
    StreamEnd,

    /// `xref`
    Xref,

    /// `trailer`
    Trailer,

    /// `startxref`
    StartXref,

    /// `R` reference marker (as in `10 0 R`)
    R,

    /// `n` xref-row flag (entry in use)
    InUse,

    /// `f` xref-row flag (entry free)
    Free,
}

/// PDF whitespace set (ISO 32000-1, Table 1).
#[inline]
pub(crate) fn is_pdf_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// PDF delimiter set. Delimiters terminate names and bare keywords.
#[inline]
pub(crate) fn is_pdf_delimiter(c: u8) -> bool {
    matches!(c, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

/// Consume at least one whitespace character.
fn whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    let (remaining, ws) = take_while(is_pdf_whitespace)(input)?;
    if ws.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Space)));
    }
    Ok((remaining, ()))
}

/// Consume a comment: `%` up to (but not including) the line ending.
fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip any run of whitespace and comments before a token.
fn skip_ws(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let mut remaining = input;
    loop {
        if let Ok((rest, _)) = whitespace(remaining) {
            remaining = rest;
            continue;
        }
        if let Ok((rest, _)) = comment(remaining) {
            remaining = rest;
            continue;
        }
        break;
    }
    Ok((remaining, input))
}

/// Parse an integer or real number.
///
/// PDF allows leading `+`/`-`, a bare leading or trailing decimal point
/// (`.5`, `5.`), but no exponent notation.
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    if int_part.is_none() && frac_part.is_none() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)));
    }

    let digits_err =
        || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit));

    if let Some(frac) = frac_part {
        // Real: rebuild "I.F" with missing halves defaulted to 0
        let mut text = String::new();
        if sign == Some('-') {
            text.push('-');
        }
        match int_part {
            Some(int) => text.push_str(std::str::from_utf8(int).map_err(|_| digits_err())?),
            None => text.push('0'),
        }
        text.push('.');
        match frac {
            Some(frac) => text.push_str(std::str::from_utf8(frac).map_err(|_| digits_err())?),
            None => text.push('0'),
        }
        let num: f64 = text.parse().map_err(|_| digits_err())?;
        Ok((input, Token::Real(num)))
    } else {
        let int = int_part.ok_or_else(digits_err)?;
        let text = std::str::from_utf8(int).map_err(|_| digits_err())?;
        let mut num: i64 = text.parse().map_err(|_| digits_err())?;
        if sign == Some('-') {
            num = -num;
        }
        Ok((input, Token::Integer(num)))
    }
}

/// Parse a literal string: `( ... )` with balanced nesting.
///
/// The scan tracks parenthesis depth and steps over escape sequences so
/// that `\(` and `\)` do not affect the depth. Content is returned raw;
/// escape decoding happens at the parser level.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (remaining, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0usize;

    while depth > 0 && pos < remaining.len() {
        match remaining[pos] {
            b'\\' => {
                pos += 1;
                if pos < remaining.len() {
                    if remaining[pos].is_ascii_digit() {
                        // octal escape, up to three digits
                        let mut digits = 0;
                        while digits < 3
                            && pos < remaining.len()
                            && remaining[pos].is_ascii_digit()
                        {
                            pos += 1;
                            digits += 1;
                        }
                    } else {
                        pos += 1;
                    }
                }
            },
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    if depth != 0 {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    let content = &remaining[..pos - 1];
    Ok((&remaining[pos..], Token::LiteralString(content)))
}

/// Parse a hex string: `< ... >` of hex digits, interior whitespace allowed.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    // `<<` is a dictionary, not a hex string
    if input.len() >= 2 && input[0] == b'<' && input[1] == b'<' {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    delimited(
        char('<'),
        map(
            take_while(|c: u8| c.is_ascii_hexdigit() || is_pdf_whitespace(c)),
            Token::HexString,
        ),
        char('>'),
    )(input)
}

/// Decode #HH escape sequences inside a name.
///
/// A `#` followed by two hex digits stands for that byte; anything else
/// after `#` is preserved literally. Name equality throughout the crate is
/// on these decoded bytes.
pub fn decode_name_escapes(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '#' {
            result.push(ch);
            continue;
        }
        match (chars.next(), chars.next()) {
            (Some(h1), Some(h2)) => {
                let mut hex = String::with_capacity(2);
                hex.push(h1);
                hex.push(h2);
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                } else {
                    result.push('#');
                    result.push(h1);
                    result.push(h2);
                }
            },
            (Some(h1), None) => {
                result.push('#');
                result.push(h1);
            },
            _ => result.push('#'),
        }
    }

    result
}

/// Parse a name: `/` followed by regular characters, #HH decoded.
fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(
            take_while(|c: u8| !is_pdf_whitespace(c) && !is_pdf_delimiter(c)),
            |bytes| {
                let raw = std::str::from_utf8(bytes).unwrap_or("");
                Token::Name(decode_name_escapes(raw))
            },
        ),
    )(input)
}

/// Parse keywords and delimiters.
///
/// Order matters: longer keywords before their prefixes (`endstream`
/// before `stream`, `false` before the bare `f` flag, `null` before `n`,
/// `startxref` before `xref`), and `<<`/`>>` before single angle brackets.
fn parse_keyword(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::False, tag(b"false")),
        value(Token::True, tag(b"true")),
        value(Token::Null, tag(b"null")),
        value(Token::ObjEnd, tag(b"endobj")),
        value(Token::StreamEnd, tag(b"endstream")),
        value(Token::StreamStart, tag(b"stream")),
        value(Token::ObjStart, tag(b"obj")),
        value(Token::StartXref, tag(b"startxref")),
        value(Token::Xref, tag(b"xref")),
        value(Token::Trailer, tag(b"trailer")),
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
        value(Token::R, tag(b"R")),
        value(Token::InUse, tag(b"n")),
        value(Token::Free, tag(b"f")),
    ))(input)
}

/// Parse a single token, skipping leading whitespace and comments.
///
/// Alternatives are tried keyword-first so that `true`/`null`/`obj` are
/// never mistaken for anything else, then names, numbers and strings.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, _) = skip_ws(input)?;

    alt((
        parse_keyword,
        parse_name,
        parse_number,
        parse_literal_string,
        parse_hex_string,
    ))(input)
}
