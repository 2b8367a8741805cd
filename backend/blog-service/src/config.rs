/// Configuration management for Blog Service
///
/// Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// gRPC configuration
    pub grpc: GrpcConfig,
    /// Post event channel configuration
    pub events: EventsConfig,
    /// Log output configuration
    pub logging: LoggingConfig,
    /// Distributed tracing (OTLP export)
    pub tracing: TracingConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port for health checks and metrics
    pub http_port: u16,
}

/// gRPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Capacity of the bounded channel between the store and the event logger
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("Invalid log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

/// Distributed tracing configuration
///
/// OTLP export is enabled only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    /// OTLP collector endpoint, e.g. "http://jaeger:4317"
    pub otlp_endpoint: Option<String>,
    /// Fraction of traces sampled, clamped to 0.0..=1.0
    pub sample_rate: f64,
    /// Service version reported in the trace resource
    pub service_version: String,
    /// Deployment environment reported in the trace resource
    pub environment: String,
}

impl TracingConfig {
    /// Load tracing settings from environment variables
    ///
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint (unset or empty disables export)
    /// - `TRACING_SAMPLE_RATE`: sample rate (default 1.0)
    /// - `SERVICE_VERSION`: service version (default: crate version)
    /// - `APP_ENV`: deployment environment (default: development)
    pub fn from_env() -> Result<Self> {
        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let sample_rate: f64 = parse_env_or_default("TRACING_SAMPLE_RATE", 1.0)?;

        Ok(Self {
            otlp_endpoint,
            sample_rate: sample_rate.clamp(0.0, 1.0),
            service_version: std::env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        })
    }

    pub fn enabled(&self) -> bool {
        self.otlp_endpoint.is_some()
    }
}

// Default values
fn default_http_port() -> u16 {
    8080
}

fn default_grpc_port() -> u16 {
    50051
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_or_default("HTTP_PORT", default_http_port())?,
        };

        let grpc = GrpcConfig {
            port: parse_env_or_default("GRPC_PORT", default_grpc_port())?,
        };

        let events = EventsConfig {
            channel_capacity: parse_env_or_default(
                "EVENT_CHANNEL_CAPACITY",
                default_event_channel_capacity(),
            )?,
        };

        let logging = LoggingConfig {
            format: parse_env_or_default("LOG_FORMAT", LogFormat::Json)
                .context("LOG_FORMAT must be 'json' or 'pretty'")?,
        };

        let tracing = TracingConfig::from_env()?;

        let config = Config {
            app,
            grpc,
            events,
            logging,
            tracing,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.events.channel_capacity == 0 {
            bail!("EVENT_CHANNEL_CAPACITY must be greater than zero");
        }
        if self.app.http_port == self.grpc.port {
            bail!(
                "HTTP_PORT and GRPC_PORT must differ (both set to {})",
                self.grpc.port
            );
        }
        Ok(())
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.grpc.port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.http_port)
    }
}
