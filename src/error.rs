//! Error types for the enpdf library.

use thiserror::Error;

use crate::engine::EngineError;

/// Result type alias for enpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while driving the document engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The engine rejected a primitive call.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine reported a scope name this library does not know.
    #[error("Engine reported unknown scope '{0}'")]
    UnknownScope(String),

    /// A resource was used after it was closed or released.
    #[error("{0} has already been closed")]
    Closed(&'static str),

    /// A resource was used before the engine issued a handle for it.
    #[error("{0} has no engine handle yet")]
    Unissued(&'static str),

    /// A resume was requested for a page that is not suspended.
    #[error("Page {0} is not suspended")]
    PageNotSuspended(u32),

    /// A resume was requested while the suspended set is empty.
    #[error("No pages are suspended")]
    NoSuspendedPages,

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// A block was filled with content of the wrong kind.
    #[error("Block '{name}' takes {actual} content, not {supplied}")]
    BlockMismatch {
        /// Block name as declared in the template page.
        name: String,
        /// Kind of the block on the page.
        actual: String,
        /// Kind of the content supplied to the fill.
        supplied: String,
    },

    /// A block definition lacks a property the model requires.
    #[error("Block '{0}' is missing required property '{1}'")]
    MissingBlockProperty(String, String),

    /// A color specification could not be parsed.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Closed("image");
        assert_eq!(err.to_string(), "image has already been closed");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::BlockMismatch {
            name: "logo".into(),
            actual: "image".into(),
            supplied: "text".into(),
        };
        assert_eq!(err.to_string(), "Block 'logo' takes image content, not text");
    }

    #[test]
    fn test_engine_error_conversion() {
        let engine_err = EngineError::new(2100, "end_page_ext", "no page open");
        let err: Error = engine_err.into();
        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(
            err.to_string(),
            "end_page_ext: no page open (engine error 2100)"
        );
    }
}
