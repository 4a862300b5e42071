//! Response classification.

use bytes::Bytes;

use super::transport::HeaderList;

/// Everything known about a finished request.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    /// HTTP status, 0 when the transport failed.
    pub status: u16,
    /// Response headers.
    pub headers: &'a [(String, String)],
    /// Payload if any.
    pub body: Option<&'a Bytes>,
    /// Transport error message if the request never produced a response.
    pub error: Option<&'a str>,
}

impl<'a> ResponseContext<'a> {
    /// Context for a transport failure.
    pub const fn transport_failure(error: &'a str) -> Self {
        Self {
            status: 0,
            headers: &[],
            body: None,
            error: Some(error),
        }
    }

    /// Context for a received response.
    pub fn response(status: u16, headers: &'a HeaderList, body: Option<&'a Bytes>) -> Self {
        Self {
            status,
            headers,
            body,
            error: None,
        }
    }
}

/// Classifier outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseVerdict {
    /// Use the payload.
    Success,
    /// Fail with this code and reason.
    Failure {
        /// Status or custom code.
        code: i32,
        /// Reason, preserved verbatim.
        reason: String,
    },
}

/// Decides whether a response is usable.
///
/// Override to add custom handling such as a maintenance-mode response.
pub trait ResponseClassifier: Send + Sync {
    /// Classify one response.
    fn classify(&self, context: &ResponseContext<'_>) -> ResponseVerdict;
}

impl<F> ResponseClassifier for F
where
    F: Fn(&ResponseContext<'_>) -> ResponseVerdict + Send + Sync,
{
    fn classify(&self, context: &ResponseContext<'_>) -> ResponseVerdict {
        self(context)
    }
}

/// Any 2xx is success; everything else fails with the status and the body text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseClassifier;

impl ResponseClassifier for DefaultResponseClassifier {
    fn classify(&self, context: &ResponseContext<'_>) -> ResponseVerdict {
        if let Some(error) = context.error {
            return ResponseVerdict::Failure {
                code: 0,
                reason: error.to_string(),
            };
        }
        if (200..300).contains(&context.status) {
            return ResponseVerdict::Success;
        }
        let reason = context
            .body
            .map(|body| String::from_utf8_lossy(body).into_owned())
            .unwrap_or_default();
        ResponseVerdict::Failure {
            code: i32::from(context.status),
            reason,
        }
    }
}
