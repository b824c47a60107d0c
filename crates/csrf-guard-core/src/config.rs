use crate::error::ConfigError;
use crate::failure::{DefaultFailureHandler, FailureHandler};
use crate::method::{classify, default_unsafe_methods, MethodClass};
use cookie::SameSite;
use http::Method;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default form field and session key name.
pub const DEFAULT_FIELD_NAME: &str = "csrfmiddlewaretoken";

/// Default double-submit cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Default header name read on AJAX-style requests.
pub const DEFAULT_HEADER_NAME: &str = "X-Xsrf-Token";

/// Default lifetime of the double-submit cookie: 2 days.
pub const DEFAULT_COOKIE_MAX_AGE: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Settings for the double-submit cookie.
///
/// The cookie is never `HttpOnly`: client script has to read it to copy the
/// token into the request header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieSettings {
    /// The cookie name.
    pub name: String,
    /// The lifetime of the cookie.
    pub max_age: Duration,
    /// The cookie path.
    pub path: String,
    /// The cookie domain.
    pub domain: Option<String>,
    /// Whether the cookie is restricted to HTTPS.
    pub secure: bool,
    /// The SameSite attribute.
    pub same_site: SameSite,
}

impl CookieSettings {
    fn named(name: String) -> Self {
        Self {
            name,
            max_age: DEFAULT_COOKIE_MAX_AGE,
            path: "/".to_string(),
            domain: None,
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// Validated configuration for CSRF protection.
///
/// Built through [`CsrfConfig::builder`] or [`CsrfConfig::with_field_name`];
/// immutable afterwards.
#[derive(Clone)]
pub struct CsrfConfig {
    field_name: String,
    cookie: Option<CookieSettings>,
    header_name: Option<String>,
    unsafe_methods: HashSet<Method>,
    failure_handler: Arc<dyn FailureHandler>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            field_name: DEFAULT_FIELD_NAME.to_string(),
            cookie: Some(CookieSettings::named(DEFAULT_COOKIE_NAME.to_string())),
            header_name: Some(DEFAULT_HEADER_NAME.to_string()),
            unsafe_methods: default_unsafe_methods(),
            failure_handler: Arc::new(DefaultFailureHandler),
        }
    }
}

impl CsrfConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> CsrfConfigBuilder {
        CsrfConfigBuilder::default()
    }

    /// Default configuration with a custom field name.
    pub fn with_field_name(name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::builder().field_name(name).build()
    }

    /// The form field name, also used as the session key.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The double-submit cookie settings, if the cookie is enabled.
    pub fn cookie(&self) -> Option<&CookieSettings> {
        self.cookie.as_ref()
    }

    /// The double-submit cookie name, if the cookie is enabled.
    pub fn cookie_name(&self) -> Option<&str> {
        self.cookie.as_ref().map(|c| c.name.as_str())
    }

    /// The header name checked when the body field is missing, if enabled.
    pub fn header_name(&self) -> Option<&str> {
        self.header_name.as_deref()
    }

    /// Methods that require validation.
    pub fn unsafe_methods(&self) -> &HashSet<Method> {
        &self.unsafe_methods
    }

    /// The handler invoked on rejection.
    pub fn failure_handler(&self) -> &dyn FailureHandler {
        self.failure_handler.as_ref()
    }

    /// Classify a request method against [`unsafe_methods`](Self::unsafe_methods).
    pub fn classify(&self, method: &Method) -> MethodClass {
        classify(method, &self.unsafe_methods)
    }
}

impl fmt::Debug for CsrfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfConfig")
            .field("field_name", &self.field_name)
            .field("cookie", &self.cookie)
            .field("header_name", &self.header_name)
            .field("unsafe_methods", &self.unsafe_methods)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CsrfConfig`].
///
/// Names are trimmed. An empty cookie or header name disables that channel.
#[derive(Clone)]
pub struct CsrfConfigBuilder {
    field_name: String,
    cookie_name: String,
    header_name: String,
    cookie_max_age: Duration,
    cookie_path: String,
    cookie_domain: Option<String>,
    cookie_secure: bool,
    cookie_same_site: SameSite,
    unsafe_methods: Option<Vec<String>>,
    failure_handler: Option<Arc<dyn FailureHandler>>,
}

impl Default for CsrfConfigBuilder {
    fn default() -> Self {
        let cookie = CookieSettings::named(DEFAULT_COOKIE_NAME.to_string());
        Self {
            field_name: DEFAULT_FIELD_NAME.to_string(),
            cookie_name: cookie.name,
            header_name: DEFAULT_HEADER_NAME.to_string(),
            cookie_max_age: cookie.max_age,
            cookie_path: cookie.path,
            cookie_domain: cookie.domain,
            cookie_secure: cookie.secure,
            cookie_same_site: cookie.same_site,
            unsafe_methods: None,
            failure_handler: None,
        }
    }
}

impl CsrfConfigBuilder {
    /// Set the form field / session key name.
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Set the cookie name. An empty name disables the cookie.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Never set the double-submit cookie.
    pub fn disable_cookie(self) -> Self {
        self.cookie_name("")
    }

    /// Set the header name. An empty name disables the header check.
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Only accept the token from the request body.
    pub fn disable_header(self) -> Self {
        self.header_name("")
    }

    /// Set the cookie lifetime.
    pub fn cookie_max_age(mut self, max_age: Duration) -> Self {
        self.cookie_max_age = max_age;
        self
    }

    /// Set the cookie path.
    pub fn cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Set the cookie domain.
    pub fn cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the secure flag.
    pub fn secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Set the SameSite attribute.
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = same_site;
        self
    }

    /// Replace the set of methods that require validation.
    ///
    /// The set must not be empty; [`build`](Self::build) rejects a list
    /// without any method.
    pub fn unsafe_methods<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        self.unsafe_methods = Some(
            methods
                .into_iter()
                .map(|m| m.as_ref().to_string())
                .collect(),
        );
        self
    }

    /// Set the handler invoked when validation fails.
    pub fn failure_handler(mut self, handler: impl FailureHandler + 'static) -> Self {
        self.failure_handler = Some(Arc::new(handler));
        self
    }

    /// Validate every setting and build the configuration.
    pub fn build(self) -> Result<CsrfConfig, ConfigError> {
        let field_name = self.field_name.trim();
        if !is_valid_name(field_name) {
            return Err(ConfigError::InvalidFieldName(field_name.to_string()));
        }

        let cookie = optional_name(&self.cookie_name, ConfigError::InvalidCookieName)?.map(
            |name| CookieSettings {
                name,
                max_age: self.cookie_max_age,
                path: self.cookie_path,
                domain: self.cookie_domain,
                secure: self.cookie_secure,
                same_site: self.cookie_same_site,
            },
        );

        let header_name = optional_name(&self.header_name, ConfigError::InvalidHeaderName)?;
        if let Some(name) = &header_name {
            http::HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(name.clone()))?;
        }

        let unsafe_methods = match self.unsafe_methods {
            Some(methods) => parse_methods(&methods)?,
            None => default_unsafe_methods(),
        };

        Ok(CsrfConfig {
            field_name: field_name.to_string(),
            cookie,
            header_name,
            unsafe_methods,
            failure_handler: self
                .failure_handler
                .unwrap_or_else(|| Arc::new(DefaultFailureHandler)),
        })
    }
}

/// Names are restricted to `[A-Za-z0-9_-]+`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn optional_name(
    raw: &str,
    invalid: fn(String) -> ConfigError,
) -> Result<Option<String>, ConfigError> {
    let name = raw.trim();
    if name.is_empty() {
        Ok(None)
    } else if is_valid_name(name) {
        Ok(Some(name.to_string()))
    } else {
        Err(invalid(name.to_string()))
    }
}

fn parse_methods(methods: &[String]) -> Result<HashSet<Method>, ConfigError> {
    let parsed = methods
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|_| ConfigError::InvalidMethod(m.to_string()))
        })
        .collect::<Result<HashSet<_>, _>>()?;

    if parsed.is_empty() {
        return Err(ConfigError::EmptyUnsafeMethods);
    }
    Ok(parsed)
}
