use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use super::security::SecurityConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};
use super::timeout::TimeoutConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:4000" or "127.0.0.1:8080"
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Deployment environment, reported by logs and the health check
    /// Example: "development", "staging", "production"
    /// Default: "development"
    #[serde(default = "default_env")]
    pub env: String,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Timeout configuration
    #[serde(default)]
    pub timeout: TimeoutConfig,
    /// Security configuration (rate limiting, CORS, connection limit)
    #[serde(default)]
    pub security: SecurityConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            env: default_env(),
            logging: LoggingConfig::default(),
            timeout: TimeoutConfig::default(),
            security: SecurityConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.timeout.shutdown_grace_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.security.rate_limit.sweep_interval_secs)
    }

    pub fn stale_threshold(&self) -> Duration {
        Duration::from_secs(self.security.rate_limit.stale_threshold_secs)
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 4000))
}

fn default_env() -> String {
    "development".to_string()
}
