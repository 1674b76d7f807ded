use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use thiserror::Error;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_FREE_SHIPPING_THRESHOLD: &str = "45.00";
const DEFAULT_ORDER_ID_PREFIX: &str = "CC";
const DEFAULT_CURRENCY: &str = "GBP";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_PAYMENT_SESSION_EXPIRY_MINS: i64 = 30;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Configuration loading error: {0}")]
    LoadError(#[from] ConfigError),

    #[error("Configuration validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Application configuration, layered from `config/{default,<env>}.toml`
/// and `CACAO__`-prefixed environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

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
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Currency code quoted to the payment processor
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Cart subtotal at or above which standard shipping is free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: Decimal,

    /// Two-character prefix for human-readable order references
    #[serde(default = "default_order_id_prefix")]
    #[validate(length(min = 2, max = 2))]
    pub order_id_prefix: String,

    /// Payment processor API base URL
    #[serde(default = "default_payment_api_base")]
    pub payment_api_base: String,

    /// Payment processor secret key
    #[serde(default)]
    pub payment_secret_key: String,

    /// Shared secret for verifying inbound payment webhooks
    #[serde(default)]
    pub payment_webhook_secret: Option<String>,

    /// Max accepted age of a webhook signature timestamp
    #[serde(default = "default_webhook_tolerance_secs")]
    pub payment_webhook_tolerance_secs: u64,

    /// Minutes until an external payment session expires
    #[serde(default = "default_payment_session_expiry_mins")]
    pub payment_session_expiry_mins: i64,

    /// Frontend base URL for success/cancel redirects
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// From-address for transactional email
    #[serde(default = "default_email_from")]
    pub email_from: String,
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
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
fn default_free_shipping_threshold() -> Decimal {
    DEFAULT_FREE_SHIPPING_THRESHOLD.parse().unwrap_or(Decimal::ZERO)
}
fn default_order_id_prefix() -> String {
    DEFAULT_ORDER_ID_PREFIX.to_string()
}
fn default_payment_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_webhook_tolerance_secs() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}
fn default_payment_session_expiry_mins() -> i64 {
    DEFAULT_PAYMENT_SESSION_EXPIRY_MINS
}
fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_email_from() -> String {
    "orders@cacaoand.co".to_string()
}

impl AppConfig {
    /// Minimal constructor used by tests and tools.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: default_host(),
            port: default_port(),
            environment: "test".to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: 1,
            db_min_connections: 1,
            cors_allowed_origins: None,
            currency: default_currency(),
            free_shipping_threshold: default_free_shipping_threshold(),
            order_id_prefix: default_order_id_prefix(),
            payment_api_base: default_payment_api_base(),
            payment_secret_key: String::new(),
            payment_webhook_secret: Some("whsec_test".to_string()),
            payment_webhook_tolerance_secs: default_webhook_tolerance_secs(),
            payment_session_expiry_mins: default_payment_session_expiry_mins(),
            frontend_url: default_frontend_url(),
            email_from: default_email_from(),
        }
    }
}

/// Load and validate configuration from files and environment.
pub fn load_config() -> Result<AppConfig, ConfigurationError> {
    let environment = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let builder = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, environment)).required(false))
        .add_source(Environment::with_prefix("CACAO").separator("__"));

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;

    info!(environment = %config.environment, "configuration loaded");
    Ok(config)
}

/// Initialize the tracing subscriber. Call once at startup.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_defaults() {
        let cfg = AppConfig::for_database("sqlite::memory:");
        assert_eq!(cfg.free_shipping_threshold, dec!(45.00));
        assert_eq!(cfg.order_id_prefix, "CC");
        assert_eq!(cfg.currency, "GBP");
        assert_eq!(cfg.payment_webhook_tolerance_secs, 300);
    }

    #[test]
    fn test_order_prefix_length_validated() {
        let mut cfg = AppConfig::for_database("sqlite::memory:");
        cfg.order_id_prefix = "CACAO".to_string();
        assert!(cfg.validate().is_err());
    }
}
