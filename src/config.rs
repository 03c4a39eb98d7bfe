use config::{Config, ConfigError, Environment, File};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::pricing::{AmountPolicy, PricingPolicy};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_CURRENCY_PRECISION: u32 = 2;
const MAX_CURRENCY_PRECISION: u32 = 8;

/// Line-item arithmetic settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// ISO 4217 currency code used when rendering amounts
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be 3 characters"))]
    pub currency: String,

    /// Round line totals to `currency_precision` places
    #[serde(default = "default_true_bool")]
    pub round_amounts: bool,

    /// Decimal places kept when `round_amounts` is on
    #[serde(default = "default_currency_precision")]
    #[validate(custom = "validate_currency_precision")]
    pub currency_precision: u32,

    /// What to do with negative quantities or unit prices: "accept" or "reject"
    #[serde(default)]
    pub negative_amounts: AmountPolicy,

    /// Tax rate applied to new quotes, as a percentage (8.5 = 8.5%)
    #[serde(default = "default_tax_rate_percent")]
    #[validate(custom = "validate_tax_rate_percent")]
    pub default_tax_rate_percent: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            round_amounts: true,
            currency_precision: default_currency_precision(),
            negative_amounts: AmountPolicy::default(),
            default_tax_rate_percent: default_tax_rate_percent(),
        }
    }
}

impl PricingConfig {
    pub fn policy(&self) -> PricingPolicy {
        PricingPolicy {
            currency_precision: self.round_amounts.then_some(self.currency_precision),
            negative_amounts: self.negative_amounts,
        }
    }

    pub fn default_tax_rate(&self) -> Decimal {
        Decimal::from_f64(self.default_tax_rate_percent)
            .map(|rate| rate.normalize())
            .unwrap_or(Decimal::ZERO)
    }
}

/// Warehouse dashboard settings
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FulfillmentConfig {
    /// Reject a second save for an order while the first is still in flight
    #[serde(default = "default_true_bool")]
    pub dedupe_in_flight_commits: bool,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            dedupe_in_flight_commits: true,
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
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

    /// Base URL of the order/quote backend used by the CLI and HTTP gateway
    #[serde(default = "default_backend_url")]
    #[validate(url)]
    pub backend_url: String,

    /// Timeout applied to each backend request
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// Seed the in-memory backend with sample quotes, orders and contracts
    #[serde(default = "default_true_bool")]
    pub seed_sample_data: bool,

    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default)]
    pub fulfillment: FulfillmentConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            backend_url: default_backend_url(),
            request_timeout_secs: default_request_timeout_secs(),
            seed_sample_data: true,
            pricing: PricingConfig::default(),
            fulfillment: FulfillmentConfig::default(),
        }
    }
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.is_production() && self.seed_sample_data {
            let mut err = ValidationError::new("seed_sample_data_in_production");
            err.message = Some(
                "Sample data must not be seeded in production. Set APP__SEED_SAMPLE_DATA=false"
                    .into(),
            );
            errors.add("seed_sample_data", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Runs derived and cross-field validation for the whole tree.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        self.pricing.validate()?;
        self.validate_additional_constraints()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_true_bool() -> bool {
    true
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_currency_precision() -> u32 {
    DEFAULT_CURRENCY_PRECISION
}

fn default_tax_rate_percent() -> f64 {
    8.5
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_currency_precision(precision: u32) -> Result<(), ValidationError> {
    if precision > MAX_CURRENCY_PRECISION {
        let mut err = ValidationError::new("currency_precision");
        err.message = Some(format!("currency_precision must be at most {}", MAX_CURRENCY_PRECISION).into());
        return Err(err);
    }
    Ok(())
}

fn validate_tax_rate_percent(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
        let mut err = ValidationError::new("default_tax_rate_percent");
        err.message =
            Some("default_tax_rate_percent must be a finite value between 0 and 100".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("supplydesk={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration from the `config/` directory
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (`{dir}/default.toml`)
/// 3. Environment-specific config (`{dir}/{env}.toml`)
/// 4. Environment variables (`APP__*`, nested sections split on `__`)
pub fn load_config_from(dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
        .add_source(File::with_name(&dir.join(&run_env).to_string_lossy()).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate_all().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
