//! Error types for the mathcell crate

use thiserror::Error;

/// Errors that can occur while exporting cell content
#[derive(Error, Debug)]
pub enum CellError {
    /// Error writing the structured XML form
    #[error("XML writing error: {0}")]
    XmlWrite(String),

    /// UTF-8 decoding error
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type for cell operations
pub type CellResult<T> = Result<T, CellError>;
