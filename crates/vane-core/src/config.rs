//! Service configuration loaded from environment variables.
//!
//! Every knob has a sensible default so the service starts with an empty
//! environment; anything explicitly set is validated up front. Invalid
//! configuration is a startup failure, not something to limp along with.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Runtime configuration for the weather service.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the HTTP server binds to.
    pub port: u16,

    /// Redis connection URL backing the job queue.
    pub redis_url: String,

    /// Name of the Redis list holding pending lookup jobs.
    pub queue_name: String,

    /// Upstream weather endpoint. `None` selects the static fetcher.
    pub upstream_url: Option<String>,

    /// Per-request timeout for upstream HTTP calls.
    pub request_timeout: Duration,

    /// Total fetch attempts per lookup (attempts, not retries).
    pub fetch_max_attempts: u32,

    /// Delay before the second fetch attempt; doubles each failure.
    pub fetch_initial_delay: Duration,

    /// Result-cache entry lifetime. `None` means entries never expire.
    pub cache_ttl: Option<Duration>,

    /// How often the backlog reporter samples queue length.
    pub reporter_interval: Duration,

    /// How long the queue worker pauses after a failed pop.
    pub worker_retry_pause: Duration,
}

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_QUEUE_NAME: &str = "weather:jobs";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_FETCH_INITIAL_DELAY_MS: u64 = 500;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_REPORTER_INTERVAL_SECS: u64 = 2;
const DEFAULT_WORKER_RETRY_PAUSE_SECS: u64 = 2;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            upstream_url: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            fetch_max_attempts: DEFAULT_FETCH_MAX_ATTEMPTS,
            fetch_initial_delay: Duration::from_millis(DEFAULT_FETCH_INITIAL_DELAY_MS),
            cache_ttl: Some(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            reporter_interval: Duration::from_secs(DEFAULT_REPORTER_INTERVAL_SECS),
            worker_retry_pause: Duration::from_secs(DEFAULT_WORKER_RETRY_PAUSE_SECS),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Exists so tests can exercise parsing and validation without mutating
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_number(&lookup, "PORT", DEFAULT_PORT)?;
        if port == 0 {
            return Err(ConfigError::invalid("PORT", "port must be non-zero"));
        }

        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        Url::parse(&redis_url).map_err(|e| ConfigError::invalid("REDIS_URL", e.to_string()))?;

        let queue_name =
            lookup("REDIS_QUEUE_NAME").unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string());
        if queue_name.is_empty() {
            return Err(ConfigError::invalid(
                "REDIS_QUEUE_NAME",
                "queue name must not be empty",
            ));
        }

        let upstream_url = match lookup("UPSTREAM_URL") {
            Some(raw) if !raw.is_empty() => {
                Url::parse(&raw).map_err(|e| ConfigError::invalid("UPSTREAM_URL", e.to_string()))?;
                Some(raw)
            }
            _ => None,
        };

        let request_timeout = Duration::from_secs(parse_number(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        let fetch_max_attempts = parse_number(
            &lookup,
            "FETCH_MAX_ATTEMPTS",
            DEFAULT_FETCH_MAX_ATTEMPTS,
        )?;
        if fetch_max_attempts == 0 {
            return Err(ConfigError::invalid(
                "FETCH_MAX_ATTEMPTS",
                "at least one attempt is required",
            ));
        }

        let fetch_initial_delay = Duration::from_millis(parse_number(
            &lookup,
            "FETCH_INITIAL_DELAY_MS",
            DEFAULT_FETCH_INITIAL_DELAY_MS,
        )?);

        // 0 disables expiry entirely.
        let cache_ttl = match parse_number(&lookup, "CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let reporter_interval = Duration::from_secs(parse_number(
            &lookup,
            "REPORTER_INTERVAL_SECS",
            DEFAULT_REPORTER_INTERVAL_SECS,
        )?);

        let worker_retry_pause = Duration::from_secs(parse_number(
            &lookup,
            "WORKER_RETRY_PAUSE_SECS",
            DEFAULT_WORKER_RETRY_PAUSE_SECS,
        )?);

        Ok(Self {
            port,
            redis_url,
            queue_name,
            upstream_url,
            request_timeout,
            fetch_max_attempts,
            fetch_initial_delay,
            cache_ttl,
            reporter_interval,
            worker_retry_pause,
        })
    }
}

fn parse_number<T>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_with_empty_environment() {
        let config = Config::from_lookup(empty).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.queue_name, "weather:jobs");
        assert!(config.upstream_url.is_none());
        assert_eq!(config.fetch_max_attempts, 3);
        assert_eq!(config.fetch_initial_delay, Duration::from_millis(500));
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_defaults_match_default_impl() {
        let from_lookup = Config::from_lookup(empty).unwrap();
        let default = Config::default();

        assert_eq!(from_lookup.port, default.port);
        assert_eq!(from_lookup.redis_url, default.redis_url);
        assert_eq!(from_lookup.cache_ttl, default.cache_ttl);
        assert_eq!(from_lookup.reporter_interval, default.reporter_interval);
    }

    #[test]
    fn test_custom_values() {
        let config = Config::from_lookup(|key| match key {
            "PORT" => Some("9090".to_string()),
            "REDIS_QUEUE_NAME" => Some("weather:test".to_string()),
            "UPSTREAM_URL" => Some("https://api.open-meteo.com/v1/forecast".to_string()),
            "FETCH_MAX_ATTEMPTS" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.queue_name, "weather:test");
        assert_eq!(
            config.upstream_url.as_deref(),
            Some("https://api.open-meteo.com/v1/forecast")
        );
        assert_eq!(config.fetch_max_attempts, 5);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = Config::from_lookup(|key| match key {
            "PORT" => Some("not-a-port".to_string()),
            _ => None,
        });
        assert!(result.is_err());

        let result = Config::from_lookup(|key| match key {
            "PORT" => Some("0".to_string()),
            _ => None,
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
    }

    #[test]
    fn test_invalid_redis_url_rejected() {
        let result = Config::from_lookup(|key| match key {
            "REDIS_URL" => Some("not a url".to_string()),
            _ => None,
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "REDIS_URL", .. })
        ));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = Config::from_lookup(|key| match key {
            "FETCH_MAX_ATTEMPTS" => Some("0".to_string()),
            _ => None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = Config::from_lookup(|key| match key {
            "CACHE_TTL_SECS" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();
        assert!(config.cache_ttl.is_none());
    }

    #[test]
    fn test_empty_upstream_url_selects_static_fetcher() {
        let config = Config::from_lookup(|key| match key {
            "UPSTREAM_URL" => Some(String::new()),
            _ => None,
        })
        .unwrap();
        assert!(config.upstream_url.is_none());
    }
}
