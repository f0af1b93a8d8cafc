//! Error types for ACL rule operations.
//!
//! [`HttpError`] is what a [`Transport`](crate::Transport) returns for a
//! non-2xx response or a failed round trip. [`AclError`] is the error of
//! every rule-store operation; remote failures are carried in it unchanged.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Result type alias for ACL rule operations.
pub type AclResult<T> = Result<T, AclError>;

/// Status used for failures where no HTTP response was received.
pub const NETWORK_FAILURE_STATUS: u16 = 0;

/// RESTCONF error container key (RFC 8040 section 7.1).
const RESTCONF_ERRORS_KEY: &str = "ietf-restconf:errors";

/// A failed HTTP exchange with the remote configuration API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    /// HTTP status code, or [`NETWORK_FAILURE_STATUS`] when the request never completed.
    pub status: u16,
    /// Reason phrase, or the transport error text for network failures.
    pub status_text: String,
    /// Response body, when it parsed as JSON.
    pub body: Option<Value>,
}

impl HttpError {
    /// Creates an error from a completed response with a non-2xx status.
    ///
    /// The raw body is kept only if it is valid JSON.
    pub fn from_response(status: u16, status_text: impl Into<String>, raw_body: &str) -> Self {
        let body = if raw_body.trim().is_empty() {
            None
        } else {
            serde_json::from_str(raw_body).ok()
        };
        Self {
            status,
            status_text: status_text.into(),
            body,
        }
    }

    /// Creates an error for a request that produced no response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: NETWORK_FAILURE_STATUS,
            status_text: message.into(),
            body: None,
        }
    }

    /// Returns true if no HTTP response was received.
    pub fn is_network(&self) -> bool {
        self.status == NETWORK_FAILURE_STATUS
    }

    /// Returns true for 404 responses.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Returns the first `error-message` of a RESTCONF error body, if any.
    pub fn message(&self) -> Option<&str> {
        self.body
            .as_ref()?
            .get(RESTCONF_ERRORS_KEY)?
            .get("error")?
            .as_array()?
            .iter()
            .find_map(|e| e.get("error-message").and_then(Value::as_str))
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_network() {
            return write!(f, "Request failed: {}", self.status_text);
        }
        write!(f, "HTTP {} {}", self.status, self.status_text)?;
        if let Some(message) = self.message() {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpError {}

/// Errors that can occur during ACL rule operations.
#[derive(Debug, Clone, Error)]
pub enum AclError {
    /// The remote API rejected the request or could not be reached.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A rule is malformed and was not sent to the remote API.
    #[error("Invalid rule field '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// Error message.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("Failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded (e.g., "rule list").
        what: String,
        /// Error message.
        message: String,
    },

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl AclError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the underlying HTTP error, if this is a remote failure.
    pub fn http(&self) -> Option<&HttpError> {
        match self {
            AclError::Http(e) => Some(e),
            _ => None,
        }
    }
}
