use serde::Deserialize;

/// Timeout configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    /// Grace period given to in-flight requests once shutdown starts, in seconds
    /// Connections still open afterwards are closed forcibly
    /// Default: 5
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    /// Maximum time to receive the request head on HTTP/1 connections, in seconds
    /// Default: 10
    #[serde(default = "default_read_header")]
    pub read_header_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: default_shutdown_grace(),
            read_header_secs: default_read_header(),
        }
    }
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_read_header() -> u64 {
    10
}
