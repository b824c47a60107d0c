//! Deserializable settings for CSRF protection.
//!
//! [`CsrfSettings`] is the loosely-typed form of [`CsrfConfig`]: it can be
//! read from a config file or, with the `env` feature, from `CSRF_*`
//! environment variables, and is validated by [`CsrfSettings::into_config`].
//!
//! # Example
//!
//! ```ignore
//! use csrf_guard_core::CsrfSettings;
//!
//! // CSRF_FIELD=_token
//! // CSRF_COOKIE=false
//! // CSRF_UNSAFE_METHODS=POST,PUT,PATCH,DELETE
//! let config = CsrfSettings::from_env()?.into_config()?;
//! assert!(config.cookie_name().is_none());
//! ```

use crate::config::{CsrfConfig, CsrfConfigBuilder};
use crate::error::ConfigError;
use cookie::SameSite;
use serde::Deserialize;
use std::time::Duration;

/// A cookie or header name setting.
///
/// `false`, `"false"` and `""` disable the channel; `true` and `"true"` keep
/// the default name. Environment variables always arrive as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NameSetting {
    /// Enable with the default name, or disable.
    Toggle(bool),
    /// Use this name.
    Name(String),
}

impl NameSetting {
    fn apply(
        &self,
        builder: CsrfConfigBuilder,
        set: fn(CsrfConfigBuilder, String) -> CsrfConfigBuilder,
    ) -> CsrfConfigBuilder {
        match self {
            Self::Toggle(true) => builder,
            Self::Name(name) if name.trim().eq_ignore_ascii_case("true") => builder,
            Self::Toggle(false) => set(builder, String::new()),
            Self::Name(name) if name.trim().eq_ignore_ascii_case("false") => {
                set(builder, String::new())
            }
            Self::Name(name) => set(builder, name.clone()),
        }
    }
}

/// Unsafe methods given as a list or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MethodList {
    /// One method per entry.
    List(Vec<String>),
    /// Comma-separated methods, as read from the environment.
    Csv(String),
}

impl MethodList {
    /// The method names, unparsed.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(list) => list,
            Self::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        }
    }
}

/// Raw CSRF settings. Absent values fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CsrfSettings {
    /// Form field and session key name.
    pub field: Option<String>,
    /// Double-submit cookie name.
    pub cookie: Option<NameSetting>,
    /// Header name.
    pub header: Option<NameSetting>,
    /// Methods that require validation.
    pub unsafe_methods: Option<MethodList>,
    /// Cookie lifetime in seconds.
    pub cookie_max_age_secs: Option<u64>,
    /// Cookie path.
    pub cookie_path: Option<String>,
    /// Cookie domain.
    pub cookie_domain: Option<String>,
    /// Cookie secure flag.
    pub cookie_secure: Option<bool>,
    /// Cookie SameSite attribute: `lax`, `strict` or `none`.
    pub cookie_same_site: Option<String>,
}

impl CsrfSettings {
    /// Set the unsafe methods.
    pub fn with_unsafe_methods<I, M>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.unsafe_methods = Some(MethodList::List(
            methods.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// The configured unsafe method names, if any.
    pub fn unsafe_method_names(&self) -> Option<Vec<String>> {
        self.unsafe_methods.clone().map(MethodList::into_vec)
    }

    /// Validate the settings into a [`CsrfConfig`].
    pub fn into_config(self) -> Result<CsrfConfig, ConfigError> {
        let mut builder = CsrfConfig::builder();

        if let Some(field) = self.field {
            builder = builder.field_name(field);
        }
        if let Some(cookie) = &self.cookie {
            builder = cookie.apply(builder, |b, name| b.cookie_name(name));
        }
        if let Some(header) = &self.header {
            builder = header.apply(builder, |b, name| b.header_name(name));
        }
        if let Some(methods) = self.unsafe_methods {
            builder = builder.unsafe_methods(methods.into_vec());
        }
        if let Some(secs) = self.cookie_max_age_secs {
            builder = builder.cookie_max_age(Duration::from_secs(secs));
        }
        if let Some(path) = self.cookie_path {
            builder = builder.cookie_path(path);
        }
        if let Some(domain) = self.cookie_domain.filter(|d| !d.trim().is_empty()) {
            builder = builder.cookie_domain(domain);
        }
        if let Some(secure) = self.cookie_secure {
            builder = builder.secure(secure);
        }
        if let Some(same_site) = self.cookie_same_site {
            builder = builder.same_site(parse_same_site(&same_site)?);
        }

        builder.build()
    }
}

#[cfg(feature = "env")]
impl CsrfSettings {
    /// Load `.env` (if present) and read `CSRF_*` environment variables.
    ///
    /// `CSRF_FIELD`, `CSRF_COOKIE`, `CSRF_HEADER`, `CSRF_UNSAFE_METHODS`,
    /// `CSRF_COOKIE_MAX_AGE_SECS`, `CSRF_COOKIE_PATH`, `CSRF_COOKIE_DOMAIN`,
    /// `CSRF_COOKIE_SECURE`, `CSRF_COOKIE_SAME_SITE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env_prefixed("CSRF")
    }

    /// Read settings from variables starting with `{prefix}_`.
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, ConfigError> {
        envy::prefixed(format!("{}_", prefix))
            .from_env::<Self>()
            .map_err(|e| ConfigError::Settings(e.to_string()))
    }
}

fn parse_same_site(raw: &str) -> Result<SameSite, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "lax" => Ok(SameSite::Lax),
        "strict" => Ok(SameSite::Strict),
        "none" => Ok(SameSite::None),
        other => Err(ConfigError::Settings(format!(
            "unknown SameSite value \"{}\"",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_give_defaults() {
        let config = CsrfSettings::default().into_config().unwrap();
        assert_eq!(config.field_name(), "csrfmiddlewaretoken");
        assert_eq!(config.cookie_name(), Some("XSRF-TOKEN"));
        assert_eq!(config.header_name(), Some("X-Xsrf-Token"));
    }

    #[test]
    fn json_settings() {
        let settings: CsrfSettings = serde_json::from_value(serde_json::json!({
            "field": "_token",
            "cookie": false,
            "header": "X-CSRF",
            "unsafe_methods": ["post", "delete"],
            "cookie_same_site": "Strict",
        }))
        .unwrap();

        let config = settings.into_config().unwrap();
        assert_eq!(config.field_name(), "_token");
        assert!(config.cookie().is_none());
        assert_eq!(config.header_name(), Some("X-CSRF"));
        assert!(config.classify(&http::Method::DELETE).is_unsafe());
        assert!(!config.classify(&http::Method::PUT).is_unsafe());
    }

    #[test]
    fn toggle_true_keeps_default_name() {
        let settings: CsrfSettings =
            serde_json::from_value(serde_json::json!({ "cookie": true, "header": "" })).unwrap();
        let config = settings.into_config().unwrap();
        assert_eq!(config.cookie_name(), Some("XSRF-TOKEN"));
        assert!(config.header_name().is_none());
    }

    #[test]
    fn string_false_disables() {
        let settings = CsrfSettings {
            cookie: Some(NameSetting::Name("FALSE".to_string())),
            ..Default::default()
        };
        assert!(settings.into_config().unwrap().cookie().is_none());
    }

    #[test]
    fn string_true_keeps_default_name() {
        let settings = CsrfSettings {
            cookie: Some(NameSetting::Name("true".to_string())),
            header: Some(NameSetting::Name(" TRUE ".to_string())),
            ..Default::default()
        };
        let config = settings.into_config().unwrap();
        assert_eq!(config.cookie_name(), Some("XSRF-TOKEN"));
        assert_eq!(config.header_name(), Some("X-Xsrf-Token"));
    }

    #[test]
    fn blank_method_list_is_rejected() {
        let settings: CsrfSettings =
            serde_json::from_value(serde_json::json!({ "unsafe_methods": " , " })).unwrap();
        assert_eq!(
            settings.into_config().unwrap_err(),
            ConfigError::EmptyUnsafeMethods
        );
    }

    #[test]
    fn comma_separated_methods() {
        let settings: CsrfSettings =
            serde_json::from_value(serde_json::json!({ "unsafe_methods": "POST, PURGE" }))
                .unwrap();
        assert_eq!(
            settings.unsafe_method_names(),
            Some(vec!["POST".to_string(), " PURGE".to_string()])
        );

        let config = settings.into_config().unwrap();
        assert!(config
            .classify(&http::Method::from_bytes(b"PURGE").unwrap())
            .is_unsafe());
    }

    #[test]
    fn invalid_values_surface_config_errors() {
        let settings = CsrfSettings {
            field: Some("csrf token".to_string()),
            ..Default::default()
        };
        assert_eq!(
            settings.into_config().unwrap_err(),
            ConfigError::InvalidFieldName("csrf token".to_string())
        );

        let settings = CsrfSettings {
            cookie_same_site: Some("sometimes".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            settings.into_config(),
            Err(ConfigError::Settings(_))
        ));
    }

    #[cfg(feature = "env")]
    mod env {
        use super::*;
        use serial_test::serial;

        #[test]
        #[serial]
        fn reads_prefixed_variables() {
            std::env::set_var("CSRFTEST_FIELD", "_token");
            std::env::set_var("CSRFTEST_COOKIE", "false");
            std::env::set_var("CSRFTEST_UNSAFE_METHODS", "POST,PUT");
            std::env::set_var("CSRFTEST_COOKIE_MAX_AGE_SECS", "600");

            let settings = CsrfSettings::from_env_prefixed("CSRFTEST").unwrap();

            std::env::remove_var("CSRFTEST_FIELD");
            std::env::remove_var("CSRFTEST_COOKIE");
            std::env::remove_var("CSRFTEST_UNSAFE_METHODS");
            std::env::remove_var("CSRFTEST_COOKIE_MAX_AGE_SECS");

            assert_eq!(settings.field.as_deref(), Some("_token"));
            assert_eq!(settings.cookie_max_age_secs, Some(600));

            let config = settings.into_config().unwrap();
            assert!(config.cookie().is_none());
            assert!(config.classify(&http::Method::PUT).is_unsafe());
            assert!(!config.classify(&http::Method::DELETE).is_unsafe());
        }

        #[test]
        #[serial]
        fn true_variables_keep_default_names() {
            std::env::set_var("CSRFTRUE_COOKIE", "true");
            std::env::set_var("CSRFTRUE_HEADER", "true");

            let settings = CsrfSettings::from_env_prefixed("CSRFTRUE");

            std::env::remove_var("CSRFTRUE_COOKIE");
            std::env::remove_var("CSRFTRUE_HEADER");

            let config = settings.unwrap().into_config().unwrap();
            assert_eq!(config.cookie_name(), Some("XSRF-TOKEN"));
            assert_eq!(config.header_name(), Some("X-Xsrf-Token"));
        }

        #[test]
        #[serial]
        fn missing_variables_use_defaults() {
            let settings = CsrfSettings::from_env_prefixed("CSRFTEST_UNSET").unwrap();
            assert_eq!(settings, CsrfSettings::default());
        }

        #[test]
        #[serial]
        fn malformed_number_is_settings_error() {
            std::env::set_var("CSRFBAD_COOKIE_MAX_AGE_SECS", "soon");
            let result = CsrfSettings::from_env_prefixed("CSRFBAD");
            std::env::remove_var("CSRFBAD_COOKIE_MAX_AGE_SECS");

            assert!(matches!(result, Err(ConfigError::Settings(_))));
        }
    }
}
