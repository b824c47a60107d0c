use crate::form::{buffer_body, content_length, BufferError, FormEncoding};
use crate::response::{append_cookies, halt_response, payload_too_large};
use bytes::Bytes;
use cookie::CookieJar;
use csrf_guard_core::{CsrfError, CsrfGuard, RequestView, Session, Verdict};
use http::{Request, Response};
use http_body::Body;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{BoxError, Service};

/// Middleware service created by [`CsrfLayer`](crate::CsrfLayer).
#[derive(Clone, Debug)]
pub struct CsrfService<S> {
    inner: S,
    guard: Arc<CsrfGuard>,
    form_limit: usize,
}

impl<S> CsrfService<S> {
    /// Wrap `inner` with `guard`, buffering at most `form_limit` bytes of
    /// form body.
    pub fn new(inner: S, guard: Arc<CsrfGuard>, form_limit: usize) -> Self {
        Self {
            inner,
            guard,
            form_limit,
        }
    }

    /// The guard applied by this service.
    pub fn guard(&self) -> &CsrfGuard {
        &self.guard
    }

    /// Maximum form body size read for token extraction.
    pub fn form_limit(&self) -> usize {
        self.form_limit
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CsrfService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    ReqBody: Body + From<Bytes> + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Into<BoxError>,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let guard = self.guard.clone();
        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(guarded_call(guard, self.form_limit, inner, req))
    }
}

async fn guarded_call<S, ReqBody, ResBody>(
    guard: Arc<CsrfGuard>,
    form_limit: usize,
    mut inner: S,
    req: Request<ReqBody>,
) -> Result<Response<ResBody>, BoxError>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Error: Into<BoxError>,
    ReqBody: Body + From<Bytes>,
    ReqBody::Error: Into<BoxError>,
    ResBody: From<String>,
{
    let Some(session) = req.extensions().get::<Session>().cloned() else {
        tracing::error!(
            method = %req.method(),
            path = req.uri().path(),
            "CSRF layer requires a Session in request extensions"
        );
        return Err(CsrfError::SessionUnavailable.into());
    };

    let (mut parts, body) = req.into_parts();

    let (form, body) = match FormEncoding::detect(&guard, &parts) {
        Some(encoding) => {
            let declared = content_length(&parts);
            let bytes = match buffer_body(body, declared, form_limit).await {
                Ok(bytes) => bytes,
                Err(BufferError::TooLarge) => {
                    tracing::warn!(
                        method = %parts.method,
                        limit = form_limit,
                        "form body exceeds CSRF read limit"
                    );
                    return Ok(payload_too_large(form_limit));
                }
                Err(BufferError::Body(e)) => return Err(e),
            };
            let fields = encoding.parse(bytes.clone()).await;
            (Some(fields), ReqBody::from(bytes))
        }
        None => (None, body),
    };

    let mut jar = CookieJar::new();
    let verdict = {
        let view = RequestView::new(&parts.method, &parts.headers, form.as_ref());
        guard.check(Some(session.store()), &view, &mut jar)?
    };

    match verdict {
        Verdict::Halt(halt) => Ok(halt_response(halt)),
        Verdict::Proceed(context) => {
            parts.extensions.insert(context.token().clone());
            parts.extensions.insert(context);

            let mut response = inner
                .call(Request::from_parts(parts, body))
                .await
                .map_err(Into::<BoxError>::into)?;
            append_cookies(&mut response, &jar);
            Ok(response)
        }
    }
}
