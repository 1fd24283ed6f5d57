//! Shared value types and configuration for the gigdb workspace.

mod app_config;
mod config;
mod records;
mod sites;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{
    DetailRecord, EnrichedRecord, GeoPoint, ListingRecord, TicketOffer, TrustTier,
};
pub use sites::{load_sites, SiteConfig, SitesFile, DEFAULT_ENTITY_PREFIX};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sites file {path}: {source}")]
    SitesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sites file: {0}")]
    SitesFileParse(#[source] serde_yaml::Error),

    #[error("invalid sites configuration: {0}")]
    Validation(String),
}
