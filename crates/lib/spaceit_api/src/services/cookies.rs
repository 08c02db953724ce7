//! Session cookie service.
//!
//! The cookie carries the server-side session key. Its `__Host-` prefix
//! pins it to this host: browsers only accept it with `Secure`, `Path=/`
//! and no `Domain` attribute.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use spaceit_core::auth::session::SessionKey;

/// Cookie name for the session key.
pub const SESSION_COOKIE: &str = "__Host-session";

/// Build the httpOnly session cookie for `key`.
pub fn session_cookie(key: &SessionKey, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), key.as_str().to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Build an expired cookie to clear the session.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE.to_string(), String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Session key presented in the request's `Cookie` headers, if any.
pub fn session_key_from_headers(headers: &HeaderMap) -> Option<SessionKey> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|value| !value.is_empty())
        .map(|value| SessionKey::from_cookie(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::COOKIE};

    #[test]
    fn session_cookie_is_host_locked() {
        let key = SessionKey::generate();
        let cookie = session_cookie(&key, 900, true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), key.as_str());
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert!(cookie.domain().is_none());
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(true);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn reads_session_key_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; __Host-session=abc123"),
        );
        let key = session_key_from_headers(&headers).unwrap();
        assert_eq!(key.as_str(), "abc123");
    }

    #[test]
    fn empty_or_missing_cookie_is_none() {
        assert!(session_key_from_headers(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("__Host-session="));
        assert!(session_key_from_headers(&headers).is_none());
    }
}
