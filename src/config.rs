use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_SESSION_FILE: &str = "data/sessions.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Path of the durable session store file
    #[serde(default = "default_session_file")]
    pub session_file: String,

    /// Artificial latency applied by the in-memory store, standing in for a
    /// real backend round trip. 0 disables it.
    #[serde(default)]
    pub simulated_latency_ms: u64,

    /// Whether to load the demo dataset on startup
    #[serde(default = "default_true_bool")]
    pub seed_demo_data: bool,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_session_file() -> String {
    DEFAULT_SESSION_FILE.to_string()
}
fn default_true_bool() -> bool {
    true
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new("invalid_log_level")),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            session_file: default_session_file(),
            simulated_latency_ms: 0,
            seed_demo_data: true,
            request_timeout_secs: default_request_timeout_secs(),
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
        }
    }
}

impl AppConfig {
    /// Minimal constructor used by tests.
    pub fn new(host: impl Into<String>, port: u16, environment: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            environment: environment.into(),
            ..Self::default()
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Loads configuration from `config/default.toml`, `config/{RUN_MODE}.toml`,
/// and `APP__`-prefixed environment variables, in that order of precedence.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let settings = Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_mode}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app: AppConfig = settings.try_deserialize()?;
    app.validate()
        .map_err(|e| ConfigError::Message(e.to_string()))?;
    Ok(app)
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured
/// level. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.is_development());
        assert!(cfg.should_allow_permissive_cors());
        assert_eq!(cfg.simulated_latency(), Duration::ZERO);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bad_log_level_fails_validation() {
        let cfg = AppConfig {
            log_level: "loud".into(),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_constructor_overrides_address() {
        let cfg = AppConfig::new("0.0.0.0", 18_080, "test");
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 18_080);
        assert!(!cfg.is_development());
        assert!(!cfg.should_allow_permissive_cors());
    }
}
