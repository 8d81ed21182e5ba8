use ipnet::IpNet;
use serde::Deserialize;

/// Security configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Maximum number of concurrent connections allowed
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Per-client rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Cross-origin request configuration
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_max_connections() -> usize {
    512
}

/// Rate limiting configuration
///
/// Every client identity gets its own token bucket built from
/// `requests_per_second` and `burst`. Buckets of clients that stay idle for
/// longer than `stale_threshold_secs` are evicted by a background sweep that
/// runs every `sweep_interval_secs`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Sustained rate, in tokens refilled per second
    /// Default: 2.0
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
    /// Bucket capacity (maximum requests admitted at once)
    /// Default: 4
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Key extraction strategy
    /// Default: "ip"
    #[serde(default = "default_limit_by")]
    pub limit_by: LimitBy,
    /// Custom header name for "header" limit_by mode
    /// Required when limit_by = "header"
    pub limit_by_header: Option<String>,
    /// Seconds between two eviction sweeps
    /// Default: 60
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Idle time after which a client's bucket is evicted
    /// Default: 180 (3 sweep intervals)
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_secs: u64,
    /// Peers whose X-Forwarded-For / X-Real-IP headers are trusted
    /// Supports CIDR notation: ["10.0.0.0/8", "::1/128"]
    /// Default: [] (always use the socket peer address)
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_ip_networks")]
    pub trusted_proxies: Vec<IpNet>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            requests_per_second: default_requests_per_second(),
            burst: default_burst(),
            limit_by: default_limit_by(),
            limit_by_header: None,
            sweep_interval_secs: default_sweep_interval(),
            stale_threshold_secs: default_stale_threshold(),
            trusted_proxies: vec![],
        }
    }
}

/// Rate limiting key extraction strategy
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LimitBy {
    /// Rate limit by client IP address
    /// Forwarded headers are only honoured for trusted proxies
    Ip,
    /// Rate limit by custom header value
    /// Requires limit_by_header to be specified, falls back to IP
    Header,
}

/// CORS configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CorsConfig {
    /// Origins allowed to make credentialed cross-origin requests
    /// Example: ["https://app.example.com"]
    /// Default: [] (no Access-Control-Allow-Origin is ever sent)
    #[serde(default)]
    pub trusted_origins: Vec<String>,
}

/// Custom deserializer for IP networks that handles parsing errors gracefully
fn deserialize_ip_networks<'de, D>(deserializer: D) -> Result<Vec<IpNet>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let strings: Vec<String> = Vec::deserialize(deserializer)?;
    let mut networks = Vec::new();

    for s in strings {
        match s.parse::<IpNet>() {
            Ok(net) => networks.push(net),
            Err(e) => {
                return Err(serde::de::Error::custom(format!("Invalid IP network '{}': {}", s, e)));
            }
        }
    }

    Ok(networks)
}

fn default_true() -> bool {
    true
}

fn default_requests_per_second() -> f64 {
    2.0
}

fn default_burst() -> u32 {
    4
}

fn default_limit_by() -> LimitBy {
    LimitBy::Ip
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_stale_threshold() -> u64 {
    180
}
