//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding caller-supplied values.
#[derive(Debug, Error)]
pub enum Error {
    /// A JSON value has no scalar representation.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// A value could not be converted to the requested column type.
    #[error("cannot convert {value} to {target}")]
    Conversion {
        /// Display form of the offending value.
        value: String,
        /// Name of the target type.
        target: &'static str,
    },

    /// JSON decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
