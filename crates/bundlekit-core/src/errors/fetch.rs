//! Transfer errors.

use thiserror::Error;

/// Out-of-band status code reported when a deadline expires.
pub const HTTP_TIMEOUT_CODE: i32 = -1;

/// Out-of-band status code reported when a transfer is cancelled.
pub const HTTP_CANCELLED_CODE: i32 = -2;

/// Failure of one package or document transfer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The deadline passed before the transfer finished.
    #[error("timeout")]
    Timeout,

    /// The transfer was aborted by its caller.
    #[error("cancelled")]
    Cancelled,

    /// The response classifier rejected the response, or the transport failed.
    #[error("rejected with code {code}: {reason}")]
    Rejected {
        /// HTTP status, or 0 for transport failures.
        code: i32,
        /// Reason preserved verbatim from the server or transport.
        reason: String,
    },

    /// A successful status arrived without a payload.
    #[error("downloaded package is null (status {status})")]
    EmptyBody {
        /// HTTP status of the empty response.
        status: i32,
    },

    /// The payload did not match the expected checksum.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum from the catalog.
        expected: String,
        /// Checksum of the received bytes.
        actual: String,
    },

    /// The payload arrived intact but could not be opened as a package.
    #[error("downloaded package is unreadable: {reason}")]
    Unreadable {
        /// Format error message.
        reason: String,
    },

    /// The disk cache failed to store or read the payload.
    #[error("cache error: {message}")]
    Cache {
        /// Cache error message.
        message: String,
    },

    /// The request URL could not be built.
    #[error("invalid url: {message}")]
    InvalidUrl {
        /// Parser message.
        message: String,
    },
}

impl FetchError {
    /// Create a rejection error.
    pub fn rejected(code: i32, reason: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            reason: reason.into(),
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Integer code reported to callbacks.
    pub const fn code(&self) -> i32 {
        match self {
            Self::Timeout => HTTP_TIMEOUT_CODE,
            Self::Cancelled => HTTP_CANCELLED_CODE,
            Self::Rejected { code, .. } => *code,
            Self::EmptyBody { status } => *status,
            Self::ChecksumMismatch { .. }
            | Self::Unreadable { .. }
            | Self::Cache { .. }
            | Self::InvalidUrl { .. } => 0,
        }
    }

    /// Whether this failure is a deadline expiry.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Human-readable reason without the code.
    pub fn reason(&self) -> String {
        match self {
            Self::Rejected { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}
