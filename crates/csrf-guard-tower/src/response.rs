//! Conversions from guard results to HTTP responses

use cookie::CookieJar;
use csrf_guard_core::Halt;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderValue, Response, StatusCode};

/// Build the response sent in place of the handler.
pub(crate) fn halt_response<B: From<String>>(halt: Halt) -> Response<B> {
    let (status, content_type, body) = halt.into_parts();

    let mut response = Response::new(B::from(body));
    *response.status_mut() = status;
    match HeaderValue::from_str(&content_type) {
        Ok(value) => {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        Err(_) => tracing::warn!(%content_type, "dropping invalid halt content type"),
    }

    response
}

/// `413 Payload Too Large` for a form body over `limit` bytes.
pub(crate) fn payload_too_large<B: From<String>>(limit: usize) -> Response<B> {
    halt_response(Halt::text(
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("Request body exceeds limit of {} bytes", limit),
    ))
}

/// Append a `Set-Cookie` header for every cookie added to `jar`.
pub(crate) fn append_cookies<B>(response: &mut Response<B>, jar: &CookieJar) {
    for cookie in jar.delta() {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(cookie = cookie.name(), "dropping unencodable cookie"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookie::Cookie;

    #[test]
    fn halt_sets_status_and_content_type() {
        let halt = Halt::json_message(StatusCode::BAD_REQUEST, "bad");
        let response: Response<String> = halt_response(halt);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.body(), "\"bad\"");
    }

    #[test]
    fn invalid_content_type_is_dropped() {
        let halt = Halt::new(StatusCode::FORBIDDEN, "text/plain\n", "no");
        let response: Response<String> = halt_response(halt);

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn too_large_is_413_text() {
        let response: Response<String> = payload_too_large(1024);

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.body(), "Request body exceeds limit of 1024 bytes");
    }

    #[test]
    fn cookies_from_delta_only() {
        let mut jar = CookieJar::new();
        jar.add_original(Cookie::new("existing", "1"));
        jar.add(Cookie::new("a", "1"));
        jar.add(Cookie::new("b", "2"));

        let mut response = Response::new(());
        append_cookies(&mut response, &jar);

        let mut values: Vec<_> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        values.sort();
        assert_eq!(values, vec!["a=1".to_string(), "b=2".to_string()]);
    }
}
