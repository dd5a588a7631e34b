//! Process configuration, read from the environment.
//!
//! Every variable is optional. Unset variables fall back to the defaults
//! below; set but malformed ones are an error so a typo never silently
//! reverts to a default.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use crate::engine::settings::EngineSettings;

pub const SERVICE_NAME: &str = "safetrack-server";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Without a database the engine keeps state in memory only.
    pub database_url: Option<String>,
    pub identity_header: String,
    pub cors_origin: Option<String>,
    pub seed_sample_data: bool,
    pub engine: EngineSettings,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Read the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = EngineSettings::default();

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let log_format = match var("RUST_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "RUST_LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected \"text\" or \"json\"".into(),
                })
            }
        };

        let engine = EngineSettings {
            refill_interval: positive_days(
                "REFILL_INTERVAL_DAYS",
                var("REFILL_INTERVAL_DAYS"),
                defaults.refill_interval,
            )?,
            pressure_test_interval: positive_days(
                "PRESSURE_TEST_INTERVAL_DAYS",
                var("PRESSURE_TEST_INTERVAL_DAYS"),
                defaults.pressure_test_interval,
            )?,
            due_lead_days: parse_or("DUE_LEAD_DAYS", var("DUE_LEAD_DAYS"), defaults.due_lead_days)?,
            dashboard_alert_limit: parse_or(
                "DASHBOARD_ALERT_LIMIT",
                var("DASHBOARD_ALERT_LIMIT"),
                defaults.dashboard_alert_limit,
            )?,
        };
        if engine.due_lead_days < 0 {
            return Err(ConfigError::Invalid {
                var: "DUE_LEAD_DAYS",
                value: engine.due_lead_days.to_string(),
                reason: "must not be negative".into(),
            });
        }

        Ok(Self {
            bind_addr,
            database_url: var("DATABASE_URL"),
            identity_header: var("IDENTITY_HEADER")
                .unwrap_or_else(|| "x-forwarded-user".to_string())
                .to_ascii_lowercase(),
            cors_origin: var("CORS_ORIGIN"),
            seed_sample_data: parse_or("SEED_SAMPLE_DATA", var("SEED_SAMPLE_DATA"), false)?,
            engine,
            telemetry: TelemetryConfig {
                service_name: SERVICE_NAME.to_string(),
                // Keep DB driver chatter at warn unless asked otherwise.
                log_filter: var("RUST_LOG")
                    .unwrap_or_else(|| "info,safetrack_server=info,sqlx=warn,sea_orm=warn".into()),
                log_format,
                otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            },
        })
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive_days(
    var: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let days: i64 = parse_or(var, raw, default.num_days())?;
    if days <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: days.to_string(),
            reason: "must be a positive number of days".into(),
        });
    }
    Ok(Duration::days(days))
}
