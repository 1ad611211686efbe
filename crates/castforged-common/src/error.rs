//! Common error types used throughout castforged.
//!
//! [`Error`] covers the soft failures raised by individual negotiation steps
//! (locator parsing, host queries, HTTP side calls). [`NegotiationError`] is
//! the only failure that crosses the interceptor boundary and aborts a load.

use serde::{Deserialize, Serialize};

/// Wire value of the host's generic load failure.
pub const LOAD_FAILED: &str = "LOAD_FAILED";

/// Wire value of the invalid parameter reason.
pub const INVALID_PARAM: &str = "INVALID_PARAM";

/// Common error type for castforged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A media descriptor could not be treated as a structured locator.
    #[error("Locator error: {0}")]
    Locator(String),

    /// The host runtime rejected or failed a call.
    #[error("Host error: {0}")]
    Host(String),

    /// An outbound HTTP call failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Locator error.
    pub fn locator<S: Into<String>>(msg: S) -> Self {
        Self::Locator(msg.into())
    }

    /// Create a new Host error.
    pub fn host<S: Into<String>>(msg: S) -> Self {
        Self::Host(msg.into())
    }

    /// Create a new Http error.
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Self::Http(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of a fatal negotiation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationErrorKind {
    /// The load request is malformed or incomplete.
    InvalidParam,
    /// Negotiation failed for a reason reported by a downstream step.
    LoadFailed {
        /// Reason forwarded verbatim to the host.
        reason: String,
    },
}

/// A load rejection returned to the host instead of a request.
///
/// Carries no partial result: the caller either receives the fully
/// negotiated request or one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("load rejected ({}): {detail}", self.reason())]
pub struct NegotiationError {
    pub kind: NegotiationErrorKind,
    pub detail: String,
}

impl NegotiationError {
    /// Reject a malformed request.
    pub fn invalid_param<S: Into<String>>(detail: S) -> Self {
        Self {
            kind: NegotiationErrorKind::InvalidParam,
            detail: detail.into(),
        }
    }

    /// Reject a load with a propagated downstream reason.
    pub fn load_failed<R: Into<String>, S: Into<String>>(reason: R, detail: S) -> Self {
        Self {
            kind: NegotiationErrorKind::LoadFailed {
                reason: reason.into(),
            },
            detail: detail.into(),
        }
    }

    /// The reason string reported on the wire.
    pub fn reason(&self) -> &str {
        match &self.kind {
            NegotiationErrorKind::InvalidParam => INVALID_PARAM,
            NegotiationErrorKind::LoadFailed { reason } => reason,
        }
    }

    /// Convert into the host's error value.
    pub fn to_error_data(&self) -> ErrorData {
        ErrorData {
            error_type: LOAD_FAILED.to_string(),
            reason: self.reason().to_string(),
        }
    }
}

/// Error value handed back to the host: `{ type: "LOAD_FAILED", reason }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reason: String,
}
