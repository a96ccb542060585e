use crate::config::types::{AuthConfig, BrowserConfig, Config, EngineConfig, OutputConfig};
use crate::{ConfigError, ConfigResult};

/// Upper bound accepted for the per-job page cap
const MAX_PAGE_CAP: usize = 100_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_engine_config(&config.engine)?;
    validate_auth_config(&config.auth)?;
    validate_browser_config(&config.browser)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates engine limits and timeouts
fn validate_engine_config(config: &EngineConfig) -> ConfigResult<()> {
    if config.max_pages < 1 || config.max_pages > MAX_PAGE_CAP {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            MAX_PAGE_CAP, config.max_pages
        )));
    }

    for (name, value) in [
        ("navigation_timeout_secs", config.navigation_timeout_secs),
        ("setup_timeout_secs", config.setup_timeout_secs),
        ("asset_timeout_secs", config.asset_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

/// Validates login form timings
fn validate_auth_config(config: &AuthConfig) -> ConfigResult<()> {
    if config.selector_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "selector_timeout_secs must be > 0".to_string(),
        ));
    }

    if config.success_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "success_timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates the browser identity
fn validate_browser_config(config: &BrowserConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    // Must be usable as an HTTP header value
    if config.user_agent.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user_agent cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output root cannot be empty".to_string(),
        ));
    }

    Ok(())
}
