//! Request access and candidate token extraction

use crate::config::CsrfConfig;
use http::{HeaderMap, Method};

/// Read access to the parts of a request the guard looks at.
pub trait CsrfRequest {
    /// The request method.
    fn method(&self) -> &Method;

    /// A field of the submitted form body.
    fn body_field(&self, name: &str) -> Option<&str>;

    /// A request header, if present and valid UTF-8.
    fn header(&self, name: &str) -> Option<&str>;
}

/// Fields of an `application/x-www-form-urlencoded` body.
///
/// When a name repeats, the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    /// Parse a url-encoded body. Malformed input yields no fields.
    pub fn parse(body: &[u8]) -> Self {
        match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
            Ok(pairs) => Self(pairs),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed form body");
                Self::default()
            }
        }
    }

    /// Get the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Check if the body had no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A borrowed [`CsrfRequest`] over `http` types.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    method: &'a Method,
    headers: &'a HeaderMap,
    form: Option<&'a FormFields>,
}

impl<'a> RequestView<'a> {
    /// Create a view. `form` is `None` when the body was not read.
    pub fn new(method: &'a Method, headers: &'a HeaderMap, form: Option<&'a FormFields>) -> Self {
        Self {
            method,
            headers,
            form,
        }
    }
}

impl CsrfRequest for RequestView<'_> {
    fn method(&self) -> &Method {
        self.method
    }

    fn body_field(&self, name: &str) -> Option<&str> {
        self.form.and_then(|form| form.get(name))
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Pull the token the client submitted.
///
/// The body field named after the configured field comes first; the
/// configured header is only consulted when the field is absent or empty.
/// Query parameters are never read.
pub fn extract_token<'r>(request: &'r dyn CsrfRequest, config: &CsrfConfig) -> Option<&'r str> {
    if let Some(value) = request
        .body_field(config.field_name())
        .filter(|v| !v.is_empty())
    {
        return Some(value);
    }

    config
        .header_name()
        .and_then(|name| request.header(name))
        .filter(|v| !v.is_empty())
}
