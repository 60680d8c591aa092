//! Error types for the library.
//!
//! One crate-wide error enum covers both the PDF parsing path and the
//! CCITT decoding path; the two subsystems share nothing else.

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF parsing or CCITT decoding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-' near the start of the file)
    #[error("Not a PDF: {0}")]
    InvalidHeader(String),

    /// Unexpected end of input
    #[error("End of input reached unexpectedly")]
    UnexpectedEof,

    /// Malformed token or object at a specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where parsing failed
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table or stream
    #[error("Invalid cross-reference table: {0}")]
    InvalidXref(String),

    /// The xref /Prev chain revisited a byte offset
    #[error("Cyclic xref chain: offset {0} visited twice")]
    CyclicXref(u64),

    /// Trailer has no usable /Root entry
    #[error("Trailer has no /Root catalog")]
    MissingRoot,

    /// Referenced object not found in the cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has the wrong type for the requested operation
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Stream filter is recognized but not implemented
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// A stream filter failed while decoding
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Invalid CCITT decoding parameters
    #[error("Invalid fax parameters: {0}")]
    InvalidFaxParams(String),

    /// No white/black run code matched the bit window
    #[error("Bad horizontal code in row {row}")]
    BadHorizontalCode {
        /// Row being decoded when the lookup failed
        row: usize,
    },

    /// No 2D mode code matched the bit window
    #[error("Bad 2D mode code in row {row}")]
    BadModeCode {
        /// Row being decoded when the lookup failed
        row: usize,
    },

    /// A decoded row did not land exactly on the column count
    #[error("Damaged row {row}: runs total {total} of {columns} columns")]
    BadLine {
        /// Row index
        row: usize,
        /// Accumulated run total when the row went wrong
        total: u32,
        /// Expected column count
        columns: u32,
    },

    /// 2D extension mode codes are not supported
    #[error("Unsupported 2D extension code in row {0}")]
    UnsupportedExtension(usize),

    /// Damaged-row budget exhausted
    #[error("Fax decode failed at row {row} after {damaged} damaged rows")]
    FaxDecodeFailed {
        /// Row where the budget ran out
        row: usize,
        /// Damaged rows seen so far
        damaged: u32,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
