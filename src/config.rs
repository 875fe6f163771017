use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub fetcher: FetcherConfig,
    pub monitor: MonitorConfig,
    pub scheduler: SchedulerConfig,
    pub telegram: TelegramConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub request_timeout: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub user_agent: String,
    pub max_concurrent_checks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub alert_threshold_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub check_interval: String, // Cron expression
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub endpoint: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "PRICEWATCH_"
            .add_source(Environment::with_prefix("PRICEWATCH").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate database configuration
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "Database min_connections cannot exceed max_connections".into(),
            ));
        }

        // Validate fetcher configuration
        if self.fetcher.max_concurrent_checks == 0 {
            return Err(ConfigError::Message(
                "Fetcher max_concurrent_checks must be greater than 0".into(),
            ));
        }

        if self.fetcher.request_timeout == 0 {
            return Err(ConfigError::Message(
                "Fetcher request_timeout must be greater than 0".into(),
            ));
        }

        // Validate monitor configuration
        if self.monitor.alert_threshold_percent <= 0.0 {
            return Err(ConfigError::Message(
                "Monitor alert_threshold_percent must be greater than 0".into(),
            ));
        }

        // Validate scheduler configuration - basic cron validation
        if !self.is_valid_cron(&self.scheduler.check_interval) {
            return Err(ConfigError::Message(
                "Invalid cron expression in scheduler.check_interval".into(),
            ));
        }

        // Validate telegram configuration
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::Message(
                "Telegram bot_token is required".into(),
            ));
        }

        if Url::parse(&self.telegram.api_base).is_err() {
            return Err(ConfigError::Message(
                "Invalid Telegram api_base URL format".into(),
            ));
        }

        // Validate metrics configuration
        if self.metrics.port == 0 {
            return Err(ConfigError::Message(
                "Metrics port must be greater than 0".into(),
            ));
        }

        if !self.metrics.endpoint.starts_with('/') {
            return Err(ConfigError::Message(
                "Metrics endpoint must start with '/'".into(),
            ));
        }

        Ok(())
    }

    fn is_valid_cron(&self, cron_expr: &str) -> bool {
        // Basic cron validation - should have 5 parts (minute hour day month weekday)
        let parts: Vec<&str> = cron_expr.split_whitespace().collect();
        if parts.len() != 5 {
            return false;
        }

        // Each part should be valid
        for part in parts {
            if part.is_empty() {
                return false;
            }
            // Allow numbers, ranges, lists, and wildcards
            if !part
                .chars()
                .all(|c| c.is_ascii_digit() || c == '*' || c == '-' || c == ',' || c == '/')
            {
                return false;
            }
        }

        true
    }
}
