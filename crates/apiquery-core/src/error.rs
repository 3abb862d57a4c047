//! Core error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown option key, unknown field, malformed filter shape or unknown
    /// sort field.
    #[error("invalid option '{option}': {reason}")]
    InvalidOption {
        /// The offending option or field name.
        option: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The caller may not perform a mutating operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// No descriptor is registered under this name.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

impl Error {
    /// Build an `InvalidOption` error.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_option("sortfield", "unknown sort field 'dns'");
        assert_eq!(
            err.to_string(),
            "invalid option 'sortfield': unknown sort field 'dns'"
        );

        let err = Error::PermissionDenied("no access to dservice".into());
        assert!(err.to_string().contains("dservice"));
    }
}
