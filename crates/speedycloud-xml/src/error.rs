//! XML error types.

use std::io;

/// Errors that can occur during XML serialization or deserialization.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// An I/O error during XML writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An error from the underlying quick-xml library.
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    /// The document ended inside an element.
    #[error("unexpected end of document: {0}")]
    UnexpectedEof(String),

    /// Text content could not be decoded.
    #[error("failed to parse value: {0}")]
    ParseError(String),
}
