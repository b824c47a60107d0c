//! Rejection handling
//!
//! A [`FailureHandler`] turns a rejected request into a [`Halt`], the
//! response sent in place of the handler. Once a handler has produced a halt
//! the guard returns [`Verdict::Halt`](crate::Verdict::Halt) and the request
//! goes no further.

use crate::config::CsrfConfig;
use crate::extract::CsrfRequest;
use crate::validate::RejectReason;
use http::StatusCode;
use std::borrow::Cow;
use std::fmt;

/// Message sent to clients whose token was rejected.
///
/// The same text is used for every reason so responses do not reveal how the
/// comparison failed.
pub const REJECTION_MESSAGE: &str = "Invalid or missing CSRF token";

/// A terminal response produced on rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    status: StatusCode,
    content_type: Cow<'static, str>,
    body: String,
}

impl Halt {
    /// Create a halt with an explicit content type.
    pub fn new(
        status: StatusCode,
        content_type: impl Into<Cow<'static, str>>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }

    /// A plain-text halt.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain; charset=utf-8", body)
    }

    /// A JSON halt whose body is `message` encoded as a JSON string.
    pub fn json_message(status: StatusCode, message: &str) -> Self {
        let body = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string());
        Self::new(status, "application/json", body)
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The response body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Split into status, content type and body.
    pub fn into_parts(self) -> (StatusCode, Cow<'static, str>, String) {
        (self.status, self.content_type, self.body)
    }
}

/// Everything a failure handler may use to build its response.
pub struct RejectionContext<'a> {
    /// The rejected request.
    pub request: &'a dyn CsrfRequest,
    /// The active configuration.
    pub config: &'a CsrfConfig,
    /// Why the request was rejected.
    pub reason: RejectReason,
}

impl RejectionContext<'_> {
    /// Whether the `Accept` header asks for JSON.
    pub fn accepts_json(&self) -> bool {
        self.request
            .header("Accept")
            .map(|accept| accept.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false)
    }

    /// Whether `X-Requested-With: XMLHttpRequest` is present.
    pub fn is_xhr(&self) -> bool {
        self.request
            .header("X-Requested-With")
            .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
            .unwrap_or(false)
    }
}

impl fmt::Debug for RejectionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectionContext")
            .field("method", self.request.method())
            .field("config", self.config)
            .field("reason", &self.reason)
            .finish()
    }
}

/// Strategy invoked when a request is rejected.
///
/// Closures `Fn(&RejectionContext<'_>) -> Halt` implement this trait.
pub trait FailureHandler: Send + Sync {
    /// Build the response for a rejected request.
    fn on_rejected(&self, ctx: &RejectionContext<'_>) -> Halt;
}

impl<F> FailureHandler for F
where
    F: Fn(&RejectionContext<'_>) -> Halt + Send + Sync,
{
    fn on_rejected(&self, ctx: &RejectionContext<'_>) -> Halt {
        self(ctx)
    }
}

/// Responds `400 Bad Request` with [`REJECTION_MESSAGE`].
///
/// JSON clients (`Accept: application/json` or an XHR marker) get the message
/// as a JSON string, everyone else gets plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFailureHandler;

impl FailureHandler for DefaultFailureHandler {
    fn on_rejected(&self, ctx: &RejectionContext<'_>) -> Halt {
        if ctx.accepts_json() || ctx.is_xhr() {
            Halt::json_message(StatusCode::BAD_REQUEST, REJECTION_MESSAGE)
        } else {
            Halt::text(StatusCode::BAD_REQUEST, REJECTION_MESSAGE)
        }
    }
}
