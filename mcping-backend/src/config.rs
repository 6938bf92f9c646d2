use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;
use mcping_store::{CacheConfig, RateLimitConfig};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryConfig;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 65536 = 64KB)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,

    /// Server port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Requests per minute allowed from one IP (0 = unlimited)
    /// Env: REQUESTS_PER_MINUTE (default: 10)
    pub requests_per_minute: u32,

    /// Seconds before the same hostname can be checked again (0 = no cooldown)
    /// Env: COOLDOWN_SECONDS (default: 40)
    pub cooldown_seconds: u64,

    /// Env: CACHE_ENABLED (default: true)
    pub cache_enabled: bool,

    /// How long a status answer is served from cache
    /// Env: CACHE_DURATION_SECS (default: 60)
    pub cache_duration: Duration,

    /// Timeout for one upstream status lookup
    /// Env: QUERY_TIMEOUT_SECS (default: 10)
    pub query_timeout: Duration,

    /// Base URL of the upstream status API
    /// Env: STATUS_API_URL (default: "https://api.mcsrvstat.us")
    pub status_api_url: String,

    /// Require a Turnstile token on status checks
    /// Env: TURNSTILE_ENABLED (default: false)
    pub turnstile_enabled: bool,

    /// Env: TURNSTILE_SECRET_KEY (required when Turnstile is enabled)
    pub turnstile_secret_key: Option<String>,

    /// Env: RETRY_MAX_ATTEMPTS (default: 3)
    pub retry_max_attempts: u32,

    /// Env: RETRY_INITIAL_DELAY_MS (default: 1000)
    pub retry_initial_delay: Duration,

    /// Env: RETRY_MAX_DELAY_MS (default: 10000)
    pub retry_max_delay: Duration,

    /// Wrap the upstream lookup in a circuit breaker
    /// Env: CIRCUIT_BREAKER_ENABLED (default: false)
    pub circuit_breaker_enabled: bool,

    /// Env: CIRCUIT_BREAKER_THRESHOLD (default: 5)
    pub circuit_breaker_threshold: u32,

    /// Env: CIRCUIT_BREAKER_TIMEOUT_SECS (default: 60)
    pub circuit_breaker_timeout: Duration,

    /// Interval of the background cache/limiter sweep
    /// Env: SWEEP_INTERVAL_SECS (default: 60)
    pub sweep_interval: Duration,

    /// Soft visible width per MOTD line in editor validation
    /// Env: MOTD_MAX_LINE_WIDTH (default: 60)
    pub motd_max_line_width: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        let defaults = Self::default();
        Self {
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", defaults.request_body_limit),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
            port: env_or_default("PORT", defaults.port),
            requests_per_minute: env_or_default("REQUESTS_PER_MINUTE", defaults.requests_per_minute),
            cooldown_seconds: env_or_default("COOLDOWN_SECONDS", defaults.cooldown_seconds),
            cache_enabled: env_or_default("CACHE_ENABLED", defaults.cache_enabled),
            cache_duration: Duration::from_secs(env_or_default("CACHE_DURATION_SECS", 60)),
            query_timeout: Duration::from_secs(env_or_default("QUERY_TIMEOUT_SECS", 10)),
            status_api_url: env_or_default_string("STATUS_API_URL", &defaults.status_api_url),
            turnstile_enabled: env_or_default("TURNSTILE_ENABLED", defaults.turnstile_enabled),
            turnstile_secret_key: var("TURNSTILE_SECRET_KEY").ok().filter(|s| !s.is_empty()),
            retry_max_attempts: env_or_default("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
            retry_initial_delay: Duration::from_millis(env_or_default("RETRY_INITIAL_DELAY_MS", 1000)),
            retry_max_delay: Duration::from_millis(env_or_default("RETRY_MAX_DELAY_MS", 10_000)),
            circuit_breaker_enabled: env_or_default(
                "CIRCUIT_BREAKER_ENABLED",
                defaults.circuit_breaker_enabled,
            ),
            circuit_breaker_threshold: env_or_default(
                "CIRCUIT_BREAKER_THRESHOLD",
                defaults.circuit_breaker_threshold,
            ),
            circuit_breaker_timeout: Duration::from_secs(env_or_default(
                "CIRCUIT_BREAKER_TIMEOUT_SECS",
                60,
            )),
            sweep_interval: Duration::from_secs(env_or_default("SWEEP_INTERVAL_SECS", 60)),
            motd_max_line_width: env_or_default("MOTD_MAX_LINE_WIDTH", defaults.motd_max_line_width),
        }
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: self.requests_per_minute,
            cooldown_seconds: self.cooldown_seconds,
        }
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache_enabled,
            duration: self.cache_duration,
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_max_attempts,
            initial_delay: self.retry_initial_delay,
            max_delay: self.retry_max_delay,
            ..RetryConfig::default()
        }
    }

    /// Budget for one lookup with all its retries, four fifths of the request
    /// timeout so the pipeline answers before the HTTP layer gives up.
    pub fn lookup_deadline(&self) -> Duration {
        self.request_timeout * 4 / 5
    }

    /// `None` when the breaker is switched off.
    pub fn circuit_breaker(&self) -> Option<CircuitBreakerConfig> {
        self.circuit_breaker_enabled.then(|| CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_threshold,
            timeout: self.circuit_breaker_timeout,
        })
    }
}

impl Default for Config {
    /// Create configuration with all default values
    fn default() -> Self {
        Self {
            request_body_limit: 64 * 1024, // 64 KB
            request_timeout: Duration::from_secs(30),
            port: 3000,
            requests_per_minute: 10,
            cooldown_seconds: 40,
            cache_enabled: true,
            cache_duration: Duration::from_secs(60),
            query_timeout: Duration::from_secs(10),
            status_api_url: "https://api.mcsrvstat.us".to_string(),
            turnstile_enabled: false,
            turnstile_secret_key: None,
            retry_max_attempts: 3,
            retry_initial_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_millis(10_000),
            circuit_breaker_enabled: false,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
            motd_max_line_width: mcping_motd::DEFAULT_LINE_WIDTH,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}
