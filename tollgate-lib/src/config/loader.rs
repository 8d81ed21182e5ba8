use std::fs;
use std::path::Path;

use crate::config::{Config, LimitBy};
use crate::error::{GateError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| GateError::Config(format!("Failed to read config file: {e}")))?;
    load_from_str(&txt)
}

pub fn load_from_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| GateError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    let rl = &cfg.security.rate_limit;

    if rl.enabled {
        if !rl.requests_per_second.is_finite() || rl.requests_per_second <= 0.0 {
            return Err(GateError::Config(format!(
                "requests_per_second must be > 0 (got {})",
                rl.requests_per_second
            )));
        }
        if rl.burst == 0 {
            return Err(GateError::Config("burst must be >= 1".into()));
        }
        if rl.limit_by == LimitBy::Header && rl.limit_by_header.is_none() {
            return Err(GateError::Config(
                "limit_by_header is required when limit_by = \"header\"".into(),
            ));
        }
    }

    if rl.sweep_interval_secs == 0 {
        return Err(GateError::Config("sweep_interval_secs must be > 0".into()));
    }
    if rl.stale_threshold_secs < rl.sweep_interval_secs {
        return Err(GateError::Config(format!(
            "stale_threshold_secs ({}) must be >= sweep_interval_secs ({})",
            rl.stale_threshold_secs, rl.sweep_interval_secs
        )));
    }

    if cfg.timeout.shutdown_grace_secs == 0 {
        return Err(GateError::Config("shutdown_grace_secs must be > 0".into()));
    }
    if cfg.security.max_connections == 0 {
        return Err(GateError::Config("max_connections must be > 0".into()));
    }

    Ok(())
}
