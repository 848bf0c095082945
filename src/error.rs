//! Error types for tag operations.

use std::time::Duration;

use thiserror::Error;

use crate::engine::StatusCode;

/// Result type alias for tag operations.
pub type Result<T> = std::result::Result<T, TagError>;

/// The tag operation that produced a non-OK status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Status check performed right after creation.
    Setup,
    /// Read round-trip from the controller.
    Read,
    /// Write round-trip to the controller.
    Write,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Setup => write!(f, "setup"),
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
        }
    }
}

/// Errors that can occur while creating or exchanging tags.
#[derive(Debug, Error)]
pub enum TagError {
    /// The engine refused to create the tag.
    #[error("could not create tag \"{tag}\": {reason} ({code})")]
    Create {
        /// Name of the tag.
        tag: String,
        /// Status code reported by the engine.
        code: StatusCode,
        /// Reason text decoded by the engine, unmodified.
        reason: String,
    },

    /// A tag reported a non-OK status after setup, read or write.
    #[error("{operation} failed on tag \"{tag}\": error code {code}: {reason}")]
    Status {
        /// Name of the tag.
        tag: String,
        /// Operation that failed.
        operation: Operation,
        /// Status code reported by the engine.
        code: StatusCode,
        /// Reason text decoded by the engine.
        reason: String,
    },

    /// A read or write did not complete within the configured timeout.
    #[error("{operation} timed out on tag \"{tag}\" after {timeout:?}")]
    Timeout {
        /// Name of the tag.
        tag: String,
        /// Operation that timed out.
        operation: Operation,
        /// Timeout that was applied.
        timeout: Duration,
    },

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// The same tag name was registered twice.
    #[error("tag \"{name}\" is registered more than once")]
    DuplicateTag {
        /// The repeated name.
        name: String,
    },
}

impl TagError {
    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plctag_client::TagError;
    ///
    /// let err = TagError::invalid_parameter("element_size", "must be greater than 0");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Maps a non-OK status of `operation` on `tag` to an error.
    ///
    /// `ERR_TIMEOUT` becomes [`TagError::Timeout`]; every other code becomes
    /// [`TagError::Status`] carrying the decoded reason.
    pub fn from_status(
        tag: impl Into<String>,
        operation: Operation,
        code: StatusCode,
        reason: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        if code.is_timeout() {
            Self::Timeout {
                tag: tag.into(),
                operation,
                timeout,
            }
        } else {
            Self::Status {
                tag: tag.into(),
                operation,
                code,
                reason: reason.into(),
            }
        }
    }

    /// Returns the name of the tag involved, if any.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Create { tag, .. } | Self::Status { tag, .. } | Self::Timeout { tag, .. } => {
                Some(tag)
            }
            Self::DuplicateTag { name } => Some(name),
            Self::InvalidParameter { .. } => None,
        }
    }

    /// Returns the engine status code behind this error, if any.
    pub fn code(&self) -> Option<StatusCode> {
        match self {
            Self::Create { code, .. } | Self::Status { code, .. } => Some(*code),
            Self::Timeout { .. } => Some(StatusCode::ERR_TIMEOUT),
            Self::InvalidParameter { .. } | Self::DuplicateTag { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_display() {
        let err = TagError::Create {
            tag: "Mode".into(),
            code: StatusCode::ERR_NOT_FOUND,
            reason: "PLCTAG_ERR_NOT_FOUND".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not create tag \"Mode\": PLCTAG_ERR_NOT_FOUND (-19)"
        );
    }

    #[test]
    fn test_status_display_includes_name_code_and_reason() {
        let err = TagError::from_status(
            "State",
            Operation::Read,
            StatusCode::ERR_BAD_CONNECTION,
            "PLCTAG_ERR_BAD_CONNECTION",
            Duration::from_secs(5),
        );
        assert_eq!(
            err.to_string(),
            "read failed on tag \"State\": error code -3: PLCTAG_ERR_BAD_CONNECTION"
        );
        assert_eq!(err.tag(), Some("State"));
        assert_eq!(err.code(), Some(StatusCode::ERR_BAD_CONNECTION));
    }

    #[test]
    fn test_timeout_status_maps_to_timeout() {
        let err = TagError::from_status(
            "Mode",
            Operation::Write,
            StatusCode::ERR_TIMEOUT,
            "PLCTAG_ERR_TIMEOUT",
            Duration::from_millis(250),
        );
        assert!(matches!(
            err,
            TagError::Timeout {
                operation: Operation::Write,
                ..
            }
        ));
        assert_eq!(err.code(), Some(StatusCode::ERR_TIMEOUT));
        assert_eq!(err.to_string(), "write timed out on tag \"Mode\" after 250ms");
    }

    #[test]
    fn test_invalid_parameter_display() {
        let err = TagError::invalid_parameter("element_count", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'element_count': must be at least 1"
        );
        assert_eq!(err.tag(), None);
    }
}
