//! API server configuration.

use std::str::FromStr;

use chrono::Duration;
use spaceit_core::rate::RateGateConfig;
use tracing::warn;

/// Longest session lifetime accepted from the environment: 30 days.
pub const MAX_SESSION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Origins allowed to make credentialed cross-origin requests.
    pub allowed_origins: Vec<String>,
    /// Session token lifetime in seconds.
    pub session_ttl_secs: i64,
    /// Whether the session cookie is marked `Secure`.
    pub cookie_secure: bool,
    /// Rate gate bucket parameters.
    pub rate_limit: RateGateConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            database_url: "postgres://localhost:5432/spaceit".into(),
            allowed_origins: vec!["http://localhost:5173".into()],
            session_ttl_secs: 15 * 60,
            cookie_secure: true,
            rate_limit: RateGateConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                    | Default                               |
    /// |-----------------------------|---------------------------------------|
    /// | `BIND_ADDR`                 | `127.0.0.1:8080`                      |
    /// | `DATABASE_URL`              | `postgres://localhost:5432/spaceit`   |
    /// | `ALLOWED_ORIGINS`           | `http://localhost:5173`               |
    /// | `SESSION_TTL_SECS`          | `900` (1 to 2592000)                  |
    /// | `COOKIE_SECURE`             | `true`                                |
    /// | `RATE_LIMIT_CAPACITY`       | `2`                                   |
    /// | `RATE_LIMIT_REFILL_PER_SEC` | `2`                                   |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or(defaults.allowed_origins),
            session_ttl_secs: session_ttl_or(
                env_or("SESSION_TTL_SECS", defaults.session_ttl_secs),
                defaults.session_ttl_secs,
            ),
            cookie_secure: env_or("COOKIE_SECURE", defaults.cookie_secure),
            rate_limit: RateGateConfig {
                capacity: env_or("RATE_LIMIT_CAPACITY", defaults.rate_limit.capacity),
                refill_per_sec: env_or(
                    "RATE_LIMIT_REFILL_PER_SEC",
                    defaults.rate_limit.refill_per_sec,
                ),
            },
        }
    }

    /// Session token lifetime, capped at [`MAX_SESSION_TTL_SECS`].
    ///
    /// A non-positive value comes back as is and is rejected when a token
    /// is issued.
    pub fn session_ttl(&self) -> Duration {
        Duration::try_seconds(self.session_ttl_secs.min(MAX_SESSION_TTL_SECS))
            .unwrap_or_else(Duration::zero)
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == origin)
    }
}

/// Split a comma separated origin list, dropping blanks and trailing slashes.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keep `secs` if it is a usable session lifetime, otherwise warn and use
/// `default`.
fn session_ttl_or(secs: i64, default: i64) -> i64 {
    if (1..=MAX_SESSION_TTL_SECS).contains(&secs) {
        secs
    } else {
        warn!(
            value = secs,
            max = MAX_SESSION_TTL_SECS,
            "SESSION_TTL_SECS out of range, using default"
        );
        default
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparsable environment value");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ttl_outside_range_falls_back() {
        assert_eq!(session_ttl_or(3600, 900), 3600);
        assert_eq!(session_ttl_or(MAX_SESSION_TTL_SECS, 900), MAX_SESSION_TTL_SECS);
        assert_eq!(session_ttl_or(0, 900), 900);
        assert_eq!(session_ttl_or(-5, 900), 900);
        assert_eq!(session_ttl_or(i64::MAX, 900), 900);
    }

    #[test]
    fn session_ttl_never_panics_on_huge_values() {
        let config = ApiConfig {
            session_ttl_secs: i64::MAX,
            ..ApiConfig::default()
        };
        assert_eq!(config.session_ttl(), Duration::seconds(MAX_SESSION_TTL_SECS));
    }

    #[test]
    fn origins_are_trimmed_and_filtered() {
        assert_eq!(
            parse_origins(" http://a.test/ ,, https://b.test "),
            vec!["http://a.test".to_string(), "https://b.test".to_string()]
        );
    }

    #[test]
    fn default_allows_local_frontend_only() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("http://localhost:5173"));
        assert!(!config.is_origin_allowed("http://evil.test"));
        assert_eq!(config.session_ttl(), Duration::minutes(15));
    }
}
