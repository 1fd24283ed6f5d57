use crate::app_config::AppConfig;
use crate::ConfigError;

pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every setting has a default, so the only failure mode is a value that
/// does not parse.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u32>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("GIGDB_LOG_LEVEL", "info");
    let sites_path = PathBuf::from(or_default("GIGDB_SITES_PATH", "./config/sites.yaml"));
    let output_dir = PathBuf::from(or_default("GIGDB_OUTPUT_DIR", "./output"));

    let page_load_timeout_secs = parse_u64("GIGDB_PAGE_LOAD_TIMEOUT_SECS", "60")?;
    let settle_delay_ms = parse_u64("GIGDB_SETTLE_DELAY_MS", "3000")?;
    let detail_cooldown_ms = parse_u64("GIGDB_DETAIL_COOLDOWN_MS", "2000")?;
    let max_load_more_clicks = parse_u32("GIGDB_MAX_LOAD_MORE_CLICKS", "20")?;
    let user_agent = or_default("GIGDB_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("GIGDB_MAX_RETRIES", "2")?;
    let retry_backoff_base_secs = parse_u64("GIGDB_RETRY_BACKOFF_BASE_SECS", "2")?;

    if page_load_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "GIGDB_PAGE_LOAD_TIMEOUT_SECS".to_string(),
            reason: "page-load timeout must be greater than zero".to_string(),
        });
    }

    Ok(AppConfig {
        log_level,
        sites_path,
        output_dir,
        page_load_timeout_secs,
        settle_delay_ms,
        detail_cooldown_ms,
        max_load_more_clicks,
        user_agent,
        max_retries,
        retry_backoff_base_secs,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
