mod loader;
mod root;
mod security;
mod telemetry;
mod timeout;

pub use loader::{load_from_path, load_from_str, validate_config};
pub use root::Config;
pub use security::{CorsConfig, LimitBy, RateLimitConfig, SecurityConfig};
pub use telemetry::{LoggingConfig, TelemetryConfig};
pub use timeout::TimeoutConfig;
