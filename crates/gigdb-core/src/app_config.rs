use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings shared by every listing and detail run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub sites_path: PathBuf,
    pub output_dir: PathBuf,
    pub page_load_timeout_secs: u64,
    pub settle_delay_ms: u64,
    /// Pause between two consecutive detail-page fetches.
    pub detail_cooldown_ms: u64,
    /// Safety cap on "load more" clicks per listing session.
    pub max_load_more_clicks: u32,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn detail_cooldown(&self) -> Duration {
        Duration::from_millis(self.detail_cooldown_ms)
    }
}
