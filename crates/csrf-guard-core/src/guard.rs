//! Per-request CSRF check

use crate::config::CsrfConfig;
use crate::double_submit::issue_cookie;
use crate::error::{CsrfError, Result};
use crate::extract::{extract_token, CsrfRequest};
use crate::failure::{Halt, RejectionContext};
use crate::method::MethodClass;
use crate::session::SessionStore;
use crate::token::{ensure_token, CsrfToken};
use crate::validate::{validate, ValidationOutcome};
use cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;

/// Values handed to the render layer.
///
/// Serializes with the keys `csrf_key`, `csrf_token`, `csrf_cookie` and
/// `csrf_header`; the last two are omitted when that channel is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrfContext {
    #[serde(rename = "csrf_key")]
    field_name: String,
    #[serde(rename = "csrf_token")]
    token: CsrfToken,
    #[serde(rename = "csrf_cookie", skip_serializing_if = "Option::is_none")]
    cookie_name: Option<String>,
    #[serde(rename = "csrf_header", skip_serializing_if = "Option::is_none")]
    header_name: Option<String>,
}

impl CsrfContext {
    fn new(config: &CsrfConfig, token: CsrfToken) -> Self {
        Self {
            field_name: config.field_name().to_string(),
            token,
            cookie_name: config.cookie_name().map(str::to_string),
            header_name: config.header_name().map(str::to_string),
        }
    }

    /// Name of the hidden form field.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The session token.
    pub fn token(&self) -> &CsrfToken {
        &self.token
    }

    /// Name of the double-submit cookie, if enabled.
    pub fn cookie_name(&self) -> Option<&str> {
        self.cookie_name.as_deref()
    }

    /// Name of the header client script should send, if enabled.
    pub fn header_name(&self) -> Option<&str> {
        self.header_name.as_deref()
    }
}

/// What the caller must do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Continue to the handler, exposing the context to it.
    Proceed(CsrfContext),
    /// Send the halt response; the handler must not run.
    Halt(Halt),
}

impl Verdict {
    /// Check if the request may proceed.
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }
}

/// CSRF protection for one configuration.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    config: Arc<CsrfConfig>,
}

impl CsrfGuard {
    /// Create a guard from a validated configuration.
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Check one request.
    ///
    /// Ensures the session holds a token, validates unsafe requests and
    /// refreshes the double-submit cookie in `jar` on safe ones.
    ///
    /// # Errors
    ///
    /// [`CsrfError::SessionUnavailable`] when `session` is `None`, plus any
    /// session backend or random source failure. A bad or missing token is
    /// not an error: it yields [`Verdict::Halt`].
    pub fn check(
        &self,
        session: Option<&dyn SessionStore>,
        request: &dyn CsrfRequest,
        jar: &mut CookieJar,
    ) -> Result<Verdict> {
        let Some(session) = session else {
            tracing::error!(
                method = %request.method(),
                "CSRF guard invoked without an active session"
            );
            return Err(CsrfError::SessionUnavailable);
        };

        let config = self.config.as_ref();
        let token = ensure_token(session, config.field_name())?;

        match config.classify(request.method()) {
            MethodClass::Unsafe => {
                let candidate = extract_token(request, config);
                if let ValidationOutcome::Rejected(reason) = validate(&token, candidate) {
                    tracing::warn!(
                        method = %request.method(),
                        reason = %reason,
                        "CSRF token validation failed"
                    );
                    let ctx = RejectionContext {
                        request,
                        config,
                        reason,
                    };
                    return Ok(Verdict::Halt(config.failure_handler().on_rejected(&ctx)));
                }
            }
            MethodClass::Safe => {
                if let Some(cookie) = config.cookie() {
                    issue_cookie(cookie, &token, jar);
                }
            }
        }

        Ok(Verdict::Proceed(CsrfContext::new(config, token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{FormFields, RequestView};
    use crate::session::MemorySession;
    use http::{HeaderMap, HeaderValue, Method, StatusCode};

    fn token_of(verdict: Verdict) -> CsrfToken {
        match verdict {
            Verdict::Proceed(ctx) => ctx.token().clone(),
            Verdict::Halt(halt) => panic!("unexpected halt: {:?}", halt),
        }
    }

    #[test]
    fn missing_session_is_fatal() {
        let guard = CsrfGuard::new(CsrfConfig::default());
        let headers = HeaderMap::new();
        let view = RequestView::new(&Method::GET, &headers, None);

        let err = guard.check(None, &view, &mut CookieJar::new()).unwrap_err();
        assert!(matches!(err, CsrfError::SessionUnavailable));
    }

    #[test]
    fn safe_request_issues_token_and_cookie() {
        let guard = CsrfGuard::new(CsrfConfig::default());
        let session = MemorySession::new();
        let headers = HeaderMap::new();
        let view = RequestView::new(&Method::GET, &headers, None);
        let mut jar = CookieJar::new();

        let token = token_of(guard.check(Some(&session), &view, &mut jar).unwrap());

        assert_eq!(token.as_str().len(), 64);
        assert_eq!(
            session.get("csrfmiddlewaretoken").unwrap().as_deref(),
            Some(token.as_str())
        );
        assert_eq!(
            jar.get("XSRF-TOKEN").map(|c| c.value()),
            Some(token.as_str())
        );
    }

    #[test]
    fn unsafe_request_does_not_set_cookie() {
        let guard = CsrfGuard::new(CsrfConfig::default());
        let session = MemorySession::new();
        session
            .set("csrfmiddlewaretoken", "t0k3n".to_string())
            .unwrap();

        let headers = HeaderMap::new();
        let form: FormFields = [("csrfmiddlewaretoken", "t0k3n")].into_iter().collect();
        let view = RequestView::new(&Method::POST, &headers, Some(&form));
        let mut jar = CookieJar::new();

        assert!(guard.check(Some(&session), &view, &mut jar).unwrap().is_proceed());
        assert_eq!(jar.delta().count(), 0);
    }

    #[test]
    fn rejection_runs_custom_handler() {
        let config = CsrfConfig::builder()
            .failure_handler(|ctx: &RejectionContext<'_>| {
                Halt::text(StatusCode::FORBIDDEN, ctx.reason.as_str())
            })
            .build()
            .unwrap();
        let guard = CsrfGuard::new(config);
        let session = MemorySession::new();

        let mut headers = HeaderMap::new();
        headers.insert("x-xsrf-token", HeaderValue::from_static("forged"));
        let view = RequestView::new(&Method::PATCH, &headers, None);

        match guard.check(Some(&session), &view, &mut CookieJar::new()).unwrap() {
            Verdict::Halt(halt) => {
                assert_eq!(halt.status(), StatusCode::FORBIDDEN);
                assert_eq!(halt.body(), "mismatch");
            }
            Verdict::Proceed(_) => panic!("forged token accepted"),
        }
    }

    #[test]
    fn context_serializes_with_view_keys() {
        let guard = CsrfGuard::new(CsrfConfig::builder().disable_header().build().unwrap());
        let session = MemorySession::new();
        session.set("csrfmiddlewaretoken", "abc".to_string()).unwrap();
        let headers = HeaderMap::new();
        let view = RequestView::new(&Method::GET, &headers, None);

        let verdict = guard
            .check(Some(&session), &view, &mut CookieJar::new())
            .unwrap();
        let Verdict::Proceed(ctx) = verdict else {
            panic!("expected proceed");
        };

        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "csrf_key": "csrfmiddlewaretoken",
                "csrf_token": "abc",
                "csrf_cookie": "XSRF-TOKEN",
            })
        );
    }
}
