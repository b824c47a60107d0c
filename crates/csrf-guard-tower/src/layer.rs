use crate::form::DEFAULT_FORM_LIMIT;
use crate::service::CsrfService;
use csrf_guard_core::{CsrfConfig, CsrfGuard};
use std::sync::Arc;
use tower::Layer;

/// Tower layer applying CSRF protection to the wrapped service.
#[derive(Clone, Debug)]
pub struct CsrfLayer {
    guard: Arc<CsrfGuard>,
    form_limit: usize,
}

impl CsrfLayer {
    /// Create a new CSRF middleware layer.
    pub fn new(config: CsrfConfig) -> Self {
        Self::with_guard(Arc::new(CsrfGuard::new(config)))
    }

    /// Create a layer sharing an existing guard.
    pub fn with_guard(guard: Arc<CsrfGuard>) -> Self {
        Self {
            guard,
            form_limit: DEFAULT_FORM_LIMIT,
        }
    }

    /// Set the largest form body read for the token field.
    ///
    /// Larger url-encoded or multipart bodies on unsafe requests are answered
    /// with `413 Payload Too Large` before reaching the handler.
    pub fn max_form_bytes(mut self, limit: usize) -> Self {
        self.form_limit = limit;
        self
    }

    /// The configured form body limit.
    pub fn form_limit(&self) -> usize {
        self.form_limit
    }

    /// The guard applied by this layer.
    pub fn guard(&self) -> &CsrfGuard {
        &self.guard
    }
}

impl Default for CsrfLayer {
    fn default() -> Self {
        Self::new(CsrfConfig::default())
    }
}

impl<S> Layer<S> for CsrfLayer {
    type Service = CsrfService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CsrfService::new(inner, Arc::clone(&self.guard), self.form_limit)
    }
}
