use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use tollgate_lib::config::{load_from_path, load_from_str, LimitBy};
use tollgate_lib::GateError;

#[test]
fn test_loads_full_file() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
listen = "127.0.0.1:8080"
env = "staging"

[security]
max_connections = 64

[security.rate_limit]
requests_per_second = 5.5
burst = 10
limit_by = "header"
limit_by_header = "X-Api-Key"
sweep_interval_secs = 30
stale_threshold_secs = 90
trusted_proxies = ["10.0.0.0/8", "::1/128"]

[security.cors]
trusted_origins = ["https://app.example.com"]

[timeout]
shutdown_grace_secs = 12

[telemetry]
metrics_port = 9191
"#
    )?;

    let cfg = load_from_path(file.path())?;
    assert_eq!(cfg.listen.to_string(), "127.0.0.1:8080");
    assert_eq!(cfg.env, "staging");
    assert_eq!(cfg.security.max_connections, 64);

    let rl = &cfg.security.rate_limit;
    assert!(rl.enabled);
    assert_eq!(rl.requests_per_second, 5.5);
    assert_eq!(rl.burst, 10);
    assert_eq!(rl.limit_by, LimitBy::Header);
    assert_eq!(rl.limit_by_header.as_deref(), Some("X-Api-Key"));
    assert_eq!(rl.trusted_proxies.len(), 2);

    assert_eq!(cfg.sweep_interval(), Duration::from_secs(30));
    assert_eq!(cfg.stale_threshold(), Duration::from_secs(90));
    assert_eq!(cfg.shutdown_grace(), Duration::from_secs(12));
    assert_eq!(cfg.timeout.read_header_secs, 10);
    assert_eq!(cfg.security.cors.trusted_origins, vec!["https://app.example.com"]);
    assert_eq!(cfg.telemetry.metrics_port, Some(9191));
    Ok(())
}

#[test]
fn test_empty_file_uses_defaults() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = load_from_str("")?;
    assert_eq!(cfg.listen.to_string(), "0.0.0.0:4000");
    assert_eq!(cfg.env, "development");
    assert_eq!(cfg.security.rate_limit.requests_per_second, 2.0);
    assert_eq!(cfg.security.rate_limit.burst, 4);
    assert_eq!(cfg.security.rate_limit.limit_by, LimitBy::Ip);
    assert_eq!(cfg.sweep_interval(), Duration::from_secs(60));
    assert_eq!(cfg.stale_threshold(), Duration::from_secs(180));
    assert_eq!(cfg.shutdown_grace(), Duration::from_secs(5));
    assert_eq!(cfg.logging.level, "info");
    assert!(cfg.telemetry.metrics_port.is_none());
    Ok(())
}

#[test]
fn test_missing_file_is_config_error() {
    let result = load_from_path("/nonexistent/tollgate.toml");
    assert!(matches!(result, Err(GateError::Config(_))));
}

#[test]
fn test_rejects_invalid_values() {
    let cases = [
        ("[security.rate_limit]\nrequests_per_second = 0.0", "requests_per_second"),
        ("[security.rate_limit]\nburst = 0", "burst"),
        ("[security.rate_limit]\nlimit_by = \"header\"", "limit_by_header"),
        ("[security.rate_limit]\nsweep_interval_secs = 0", "sweep_interval_secs"),
        (
            "[security.rate_limit]\nsweep_interval_secs = 60\nstale_threshold_secs = 30",
            "stale_threshold_secs",
        ),
        ("[timeout]\nshutdown_grace_secs = 0", "shutdown_grace_secs"),
        ("[security]\nmax_connections = 0", "max_connections"),
        ("[security.rate_limit]\ntrusted_proxies = [\"not-a-cidr\"]", "Invalid IP network"),
        ("[security.rate_limit]\nlimit_by = \"cookie\"", "unknown variant"),
    ];

    for (toml, needle) in cases {
        match load_from_str(toml) {
            Err(GateError::Config(msg)) => {
                assert!(msg.contains(needle), "error for {toml:?} should mention {needle}: {msg}")
            }
            other => panic!("expected config error for {toml:?}, got {other:?}"),
        }
    }
}

#[test]
fn test_disabled_rate_limit_skips_rate_validation(
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cfg = load_from_str("[security.rate_limit]\nenabled = false\nrequests_per_second = 0.0")?;
    assert!(!cfg.security.rate_limit.enabled);
    Ok(())
}
