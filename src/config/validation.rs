//! Node configuration validation rules.

use super::NodeConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate a node configuration against the fixed rule set.
///
/// Pure function: no side effects, stable diagnostics.
pub fn validate_node_config(config: &NodeConfig) -> Result<(), String> {
    if config.sync_period_secs == 0 {
        return Err("sync_period_secs must be at least 1".to_string());
    }

    if config.heartbeat_period_secs == 0 {
        return Err("heartbeat_period_secs must be at least 1".to_string());
    }

    if config.max_parallel_ops == 0 {
        return Err("max_parallel_ops must be at least 1".to_string());
    }

    if !LOG_LEVELS.contains(&config.log_level.as_str()) {
        return Err(format!(
            "log_level '{}' is not one of {}",
            config.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    for key in config.labels.keys() {
        if key.trim().is_empty() {
            return Err("label keys cannot be empty".to_string());
        }
    }

    Ok(())
}
