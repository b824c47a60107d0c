//! Double-submit cookie issuance

use crate::config::CookieSettings;
use crate::token::CsrfToken;
use cookie::{time, Cookie, CookieJar};

/// Build the double-submit cookie carrying `token`.
pub fn build_cookie(settings: &CookieSettings, token: &CsrfToken) -> Cookie<'static> {
    let max_age = i64::try_from(settings.max_age.as_secs()).unwrap_or(i64::MAX);

    let mut cookie = Cookie::build((settings.name.clone(), token.as_str().to_owned()))
        .path(settings.path.clone())
        .max_age(time::Duration::seconds(max_age))
        .secure(settings.secure)
        .http_only(false)
        .same_site(settings.same_site);

    if let Some(domain) = &settings.domain {
        cookie = cookie.domain(domain.clone());
    }

    cookie.build()
}

/// Add the double-submit cookie to `jar`.
///
/// Called on every safe request, so the cookie is rewritten even when the
/// client already holds the current value.
pub fn issue_cookie(settings: &CookieSettings, token: &CsrfToken, jar: &mut CookieJar) {
    jar.add(build_cookie(settings, token));
    tracing::debug!(cookie = %settings.name, "refreshed CSRF cookie");
}
