use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::models::{DEFAULT_ALERT_DISTANCE, DEFAULT_LATITUDE, DEFAULT_LONGITUDE};
use crate::position::Fix;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub database_access_key: String,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub default_alert_distance: f64,
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub initial_fix_timeout_ms: u64,
    pub report_fix_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源构建配置，测试里用 HashMap 代替进程环境变量
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let config = Config {
            database_url: required("DATABASE_URL")?,
            database_access_key: required("DATABASE_ACCESS_KEY")?,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            run_migrations: lookup("RUN_MIGRATIONS")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            api_base_uri: lookup("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            default_alert_distance: parse_or("DEFAULT_ALERT_DISTANCE", &lookup, DEFAULT_ALERT_DISTANCE)?,
            default_latitude: parse_or("DEFAULT_LATITUDE", &lookup, DEFAULT_LATITUDE)?,
            default_longitude: parse_or("DEFAULT_LONGITUDE", &lookup, DEFAULT_LONGITUDE)?,
            initial_fix_timeout_ms: lookup("INITIAL_FIX_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000),
            report_fix_timeout_ms: lookup("REPORT_FIX_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(15_000),
        };

        // 告警距离必须为正数
        if config.default_alert_distance <= 0.0 {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_ALERT_DISTANCE",
                value: config.default_alert_distance.to_string(),
            });
        }

        if !config.api_base_uri.starts_with('/') {
            return Err(ConfigError::Invalid {
                var: "API_BASE_URI",
                value: config.api_base_uri,
            });
        }

        Ok(config)
    }

    pub fn default_location(&self) -> Fix {
        Fix {
            latitude: self.default_latitude,
            longitude: self.default_longitude,
        }
    }

    pub fn initial_fix_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_fix_timeout_ms)
    }

    pub fn report_fix_timeout(&self) -> Duration {
        Duration::from_millis(self.report_fix_timeout_ms)
    }
}

fn parse_or<F>(var: &'static str, lookup: &F, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(ConfigError::Invalid { var, value: raw }),
    }
}
