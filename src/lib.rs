//! # pdfax
//!
//! PDF object-graph parser and CCITT Group 3/4 fax decoder.
//!
//! Two loosely coupled cores share nothing but the error type:
//!
//! - **PDF parsing**: byte-level lexer, recursive-descent object parser,
//!   xref resolution (classic tables and xref streams, incremental
//!   updates, object streams), a navigable page tree, and a stream
//!   filter pipeline (Flate with predictors, ASCIIHex, ASCII85,
//!   RunLength, CCITT).
//! - **CCITT fax decoding**: a from-scratch T.4/T.6 decoder (Group 3 1D,
//!   mixed 1D/2D, Group 4) producing raw 1bpp bitmaps, in memory or
//!   streamed row by row.
//!
//! ## Reading a document
//!
//! ```no_run
//! use pdfax::Document;
//!
//! # fn main() -> pdfax::Result<()> {
//! let doc = Document::open("sample.pdf")?;
//! println!("{} pages", doc.page_count()?);
//! for page in doc.pages()? {
//!     let text = page.extract_text()?;
//!     println!("--- page {} ---\n{}", page.number(), text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Decoding CCITT data
//!
//! ```
//! use pdfax::ccitt::{Params, decode_to_stream};
//!
//! # fn main() -> pdfax::Result<()> {
//! let params = Params { k: -1, columns: 18, rows: 18, ..Params::default() };
//! let mut bitmap = Vec::new();
//! decode_to_stream(&params, &[0xFF, 0xFF, 0xC0][..], &mut bitmap)?;
//! assert_eq!(bitmap.len(), 18 * params.stride());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod document;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod xref;

// Stream decoders
pub mod decoders;

// CCITT fax core
pub mod ccitt;

// Content-stream text extraction
pub mod content;

// Re-exports
pub use document::{Document, Page, parse_document};
pub use error::{Error, Result};
pub use object::{Object, ObjectRef, StringFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }
}
