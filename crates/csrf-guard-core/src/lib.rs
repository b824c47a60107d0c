//! # csrf-guard-core
//!
//! Cross-Site Request Forgery protection that does not depend on any web
//! framework.
//!
//! The guard issues a per-session secret token, hands it to the render layer
//! and validates it on state-changing requests. Two delivery channels are
//! supported:
//!
//! - a hidden form field (synchronizer token), read from the request body
//! - a double-submit cookie that client script copies into a request header
//!
//! Framework integrations implement [`CsrfRequest`] for their request type,
//! supply a [`SessionStore`] and turn the returned [`Verdict`] into a response.
//! See `csrf-guard-tower` for the `tower` integration.
//!
//! ## Example
//!
//! ```rust
//! use csrf_guard_core::{CsrfConfig, CsrfGuard, FormFields, MemorySession, RequestView, Verdict};
//! use cookie::CookieJar;
//! use http::{HeaderMap, Method};
//!
//! let guard = CsrfGuard::new(CsrfConfig::default());
//! let session = MemorySession::new();
//! let headers = HeaderMap::new();
//!
//! let mut jar = CookieJar::new();
//! let get = RequestView::new(&Method::GET, &headers, None);
//! let token = match guard.check(Some(&session), &get, &mut jar).unwrap() {
//!     Verdict::Proceed(context) => context.token().to_string(),
//!     Verdict::Halt(_) => unreachable!("safe methods are never rejected"),
//! };
//!
//! let form = FormFields::parse(format!("csrfmiddlewaretoken={}", token).as_bytes());
//! let post = RequestView::new(&Method::POST, &headers, Some(&form));
//! assert!(guard.check(Some(&session), &post, &mut jar).unwrap().is_proceed());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod config;
mod double_submit;
mod error;
mod extract;
mod failure;
mod guard;
mod method;
mod session;
pub mod settings;
mod token;
mod validate;

pub use config::{
    CookieSettings, CsrfConfig, CsrfConfigBuilder, DEFAULT_COOKIE_MAX_AGE, DEFAULT_COOKIE_NAME,
    DEFAULT_FIELD_NAME, DEFAULT_HEADER_NAME,
};
pub use double_submit::{build_cookie, issue_cookie};
pub use error::{ConfigError, CsrfError, Result};
pub use extract::{extract_token, CsrfRequest, FormFields, RequestView};
pub use failure::{
    DefaultFailureHandler, FailureHandler, Halt, RejectionContext, REJECTION_MESSAGE,
};
pub use guard::{CsrfContext, CsrfGuard, Verdict};
pub use method::{classify, default_unsafe_methods, MethodClass};
pub use session::{MemorySession, Session, SessionError, SessionStore};
pub use settings::{CsrfSettings, MethodList, NameSetting};
pub use token::{ensure_token, CsrfToken, TOKEN_BYTES};
pub use validate::{validate, RejectReason, ValidationOutcome};
