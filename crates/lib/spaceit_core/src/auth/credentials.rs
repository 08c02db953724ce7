//! Basic credential parsing and verification.
//!
//! `Authorization: Basic base64(identifier:secret)`. Only the first colon
//! separates the pair, so secrets may contain colons.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::AuthError;
use super::password::verify_password;
use crate::models::auth::User;

/// Scheme name of the credential header.
pub const BASIC_SCHEME: &str = "Basic";

/// Decoded basic credential pair.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub identifier: String,
    pub secret: String,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Whether the header uses the basic scheme (case-insensitive).
pub fn is_basic_scheme(header: &str) -> bool {
    header
        .get(..BASIC_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(BASIC_SCHEME))
}

/// Parse a raw `Authorization` header value into a credential pair.
pub fn parse_basic_header(header: &str) -> Result<BasicCredentials, AuthError> {
    let (scheme, encoded) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::MalformedCredentials("missing authorization scheme".into()))?;

    if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
        return Err(AuthError::MalformedCredentials(
            "unsupported authorization scheme".into(),
        ));
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedCredentials("invalid base64 encoding".into()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| AuthError::MalformedCredentials("credentials are not utf-8".into()))?;

    let (identifier, secret) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::MalformedCredentials("invalid authorization header".into()))?;

    if identifier.is_empty() || secret.is_empty() {
        return Err(AuthError::MalformedCredentials("invalid credentials".into()));
    }

    Ok(BasicCredentials {
        identifier: identifier.to_string(),
        secret: secret.to_string(),
    })
}

/// Check a presented secret against the stored hash of `user`.
///
/// A wrong secret is `Ok(false)`; only a corrupt stored hash is an error.
pub fn check_secret(credentials: &BasicCredentials, user: &User) -> Result<bool, AuthError> {
    verify_password(&credentials.secret, &user.password_hash)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::auth::password::hash_password_with_cost;

    fn header(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    #[test]
    fn parses_well_formed_header() {
        let creds = parse_basic_header(&header("ada@example.com:s3cret")).unwrap();
        assert_eq!(creds.identifier, "ada@example.com");
        assert_eq!(creds.secret, "s3cret");
    }

    #[test]
    fn splits_on_first_colon_only() {
        let creds = parse_basic_header(&header("ada@example.com:pa:ss:word")).unwrap();
        assert_eq!(creds.secret, "pa:ss:word");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let raw = format!("basic {}", STANDARD.encode("a@b.c:pw"));
        assert!(is_basic_scheme(&raw));
        assert!(parse_basic_header(&raw).is_ok());
    }

    #[test]
    fn rejects_malformed_headers() {
        let cases = [
            "Basic".to_string(),
            "Bearer abc".to_string(),
            "Basic !!!not-base64!!!".to_string(),
            header("no-colon-here"),
            header(":secret"),
            header("ada@example.com:"),
            format!("Basic {}", STANDARD.encode([0xff, 0xfe, b':', b'x'])),
        ];
        for case in cases {
            let err = parse_basic_header(&case).unwrap_err();
            assert!(
                matches!(err, AuthError::MalformedCredentials(_)),
                "expected malformed for {case:?}"
            );
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = parse_basic_header(&header("ada@example.com:hunter22")).unwrap();
        assert!(!format!("{creds:?}").contains("hunter22"));
    }

    #[test]
    fn check_secret_compares_against_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            password_hash: hash_password_with_cost("hunter22", 4).unwrap(),
            created_at: Utc::now(),
        };
        let good = parse_basic_header(&header("ada@example.com:hunter22")).unwrap();
        let bad = parse_basic_header(&header("ada@example.com:hunter23")).unwrap();
        assert!(check_secret(&good, &user).unwrap());
        assert!(!check_secret(&bad, &user).unwrap());
    }
}
