//! Common error types for sightbot
//!
//! One taxonomy shared by the gateway and the detection service. Each variant
//! names the stage that failed; [`Error::is_retryable`] decides whether the
//! bounded retry helper may try the stage again.

use std::time::Duration;
use thiserror::Error;

/// Common result type for sightbot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across sightbot services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Photo bytes could not be fetched from the chat transport
    #[error("Transport fetch error: {0}")]
    TransportFetch(String),

    /// Object store has no blob under the requested key
    #[error("Image not found in object store: {key}")]
    ImageNotFound { key: String },

    /// Object store read failed for a reason other than "not found"
    #[error("Object store read failed for {key}: {message}")]
    StoreRead { key: String, message: String },

    /// Object store write failed
    #[error("Object store write failed for {key}: {message}")]
    StoreWrite { key: String, message: String },

    /// Detection runner ran but produced no usable output
    #[error("Detection failure: {0}")]
    DetectionFailure(String),

    /// One raw label line could not be parsed
    #[error("Malformed label line {line:?}: {reason}")]
    MalformedLabelLine { line: String, reason: String },

    /// Inference endpoint answered with a non-success status or was unreachable
    #[error("Inference service failure: {message}")]
    InferenceService { message: String, transient: bool },

    /// Inference endpoint did not answer within the configured timeout
    #[error("Inference timed out after {0:?}")]
    InferenceTimeout(Duration),

    /// Prediction summary could not be durably stored
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Invalid request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the failure is transient and the same call may succeed later.
    ///
    /// `ImageNotFound`, `MalformedLabelLine` and `DetectionFailure` are terminal
    /// for the request: the image will never appear, and the detector output
    /// will not change on a second read.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::StoreRead { .. }
            | Error::StoreWrite { .. }
            | Error::TransportFetch(_)
            | Error::Io(_) => true,
            Error::InferenceService { transient, .. } => *transient,
            Error::Config(_)
            | Error::ImageNotFound { .. }
            | Error::DetectionFailure(_)
            | Error::MalformedLabelLine { .. }
            | Error::InferenceTimeout(_)
            | Error::Persistence(_)
            | Error::InvalidInput(_) => false,
        }
    }

    /// Short machine-readable code used in logs and HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIGURATION_ERROR",
            Error::TransportFetch(_) => "TRANSPORT_FETCH_ERROR",
            Error::ImageNotFound { .. } => "IMAGE_NOT_FOUND",
            Error::StoreRead { .. } => "STORE_READ_FAILURE",
            Error::StoreWrite { .. } => "STORE_WRITE_FAILURE",
            Error::DetectionFailure(_) => "DETECTION_FAILURE",
            Error::MalformedLabelLine { .. } => "MALFORMED_LABEL_LINE",
            Error::InferenceService { .. } => "INFERENCE_SERVICE_FAILURE",
            Error::InferenceTimeout(_) => "INFERENCE_TIMEOUT",
            Error::Persistence(_) => "PERSISTENCE_FAILURE",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors_are_not_retryable() {
        assert!(!Error::ImageNotFound { key: "a.jpg".into() }.is_retryable());
        assert!(!Error::DetectionFailure("empty".into()).is_retryable());
        assert!(!Error::MalformedLabelLine {
            line: "x".into(),
            reason: "bad".into()
        }
        .is_retryable());
        assert!(!Error::InferenceTimeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_store_io_errors_are_retryable() {
        assert!(Error::StoreRead {
            key: "a.jpg".into(),
            message: "connection reset".into()
        }
        .is_retryable());
        assert!(Error::StoreWrite {
            key: "a.jpg".into(),
            message: "throttled".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_inference_service_retry_follows_transient_flag() {
        let refused = Error::InferenceService {
            message: "connection refused".into(),
            transient: true,
        };
        let rejected = Error::InferenceService {
            message: "HTTP 500".into(),
            transient: false,
        };
        assert!(refused.is_retryable());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_image_not_found_message_names_key() {
        let err = Error::ImageNotFound { key: "abc.jpg".into() };
        assert_eq!(err.code(), "IMAGE_NOT_FOUND");
        assert!(err.to_string().contains("abc.jpg"));
    }
}
