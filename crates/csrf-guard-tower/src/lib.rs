//! # csrf-guard-tower
//!
//! `tower` middleware for CSRF protection.
//!
//! [`CsrfLayer`] checks every request with a [`CsrfGuard`]:
//!
//! - safe requests get a session token and a refreshed double-submit cookie
//! - unsafe requests must carry the token in the form body or the configured
//!   header, or they are answered with `400 Bad Request`
//!
//! Url-encoded and multipart form bodies of unsafe requests are buffered, up
//! to [`DEFAULT_FORM_LIMIT`] unless [`CsrfLayer::max_form_bytes`] says
//! otherwise, and passed on unchanged. Larger bodies get
//! `413 Payload Too Large`.
//!
//! The session is read from request extensions as a [`Session`]; install your
//! session middleware outside this layer. A request without one fails with
//! [`CsrfError::SessionUnavailable`].
//!
//! Handlers find the [`CsrfContext`] and [`CsrfToken`] in request extensions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use csrf_guard_tower::{CsrfConfig, CsrfLayer};
//! use tower::ServiceBuilder;
//!
//! let config = CsrfConfig::builder()
//!     .cookie_name("XSRF-TOKEN")
//!     .header_name("X-Xsrf-Token")
//!     .build()?;
//!
//! let service = ServiceBuilder::new()
//!     .layer(session_layer)
//!     .layer(CsrfLayer::new(config))
//!     .service(app);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod form;
mod layer;
mod response;
mod service;

pub use csrf_guard_core::{
    CsrfConfig, CsrfContext, CsrfError, CsrfGuard, CsrfSettings, CsrfToken, FailureHandler, Halt,
    MemorySession, RejectionContext, Session, SessionStore,
};
pub use form::DEFAULT_FORM_LIMIT;
pub use layer::CsrfLayer;
pub use service::CsrfService;

/// Boxed error returned by [`CsrfService`].
pub type BoxError = tower::BoxError;
