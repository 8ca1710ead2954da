//! Error types for the snapshot pipeline

use thiserror::Error;

/// Result type alias for snapshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a snapshot
///
/// Only `RenderError` aborts a snapshot. The resource-level variants are
/// caught at the reference, sheet or image that produced them and handed back
/// through `Snapshot::failures`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A resource responded with a non-success status
    #[error("Failed to fetch resource: {0}")]
    FetchError(String),

    /// Transport-level failure while talking to the resource host
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The resource payload could not be read or encoded
    #[error("Failed to decode resource: {0}")]
    DecodeError(String),

    /// A style sheet refused to expose its rules
    #[error("Style sheet not readable: {0}")]
    StyleSheetError(String),

    /// An inlined image reported a load error
    #[error("Image failed to load: {0}")]
    ImageLoadError(String),

    /// Failed to load a document
    #[error("Failed to load document: {0}")]
    LoadError(String),

    /// Failed to produce the snapshot itself
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::FetchError(format!("invalid reference: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::StyleSheetError("https://cdn.example/a.css".into());
        assert_eq!(err.to_string(), "Style sheet not readable: https://cdn.example/a.css");
    }

    #[test]
    fn url_errors_become_fetch_errors() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::FetchError(_)));
    }
}
