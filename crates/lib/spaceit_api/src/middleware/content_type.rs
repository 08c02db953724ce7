//! Rejects POST bodies that are not JSON.

use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Axum middleware: a POST carrying a body must declare `application/json`.
///
/// Bodyless POSTs (login, for one) pass untouched.
pub async fn ensure_json(request: Request, next: Next) -> Result<Response, AppError> {
    if request.method() == Method::POST
        && has_body(request.body())
        && !is_json(request.headers())
    {
        return Err(AppError::UnsupportedMediaType(format!(
            "content type must be {JSON_MEDIA_TYPE}"
        )));
    }
    Ok(next.run(request).await)
}

fn has_body(body: &Body) -> bool {
    body.size_hint().exact() != Some(0)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn json_with_parameters_is_accepted() {
        assert!(is_json(&headers(&[(
            header::CONTENT_TYPE,
            "Application/JSON; charset=utf-8"
        )])));
        assert!(!is_json(&headers(&[(header::CONTENT_TYPE, "text/plain")])));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[test]
    fn body_detection() {
        assert!(!has_body(&Body::empty()));
        assert!(has_body(&Body::from("{}")));
    }
}
