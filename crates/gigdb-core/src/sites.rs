use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Key prefix of event entries in a normalized embedded cache.
pub const DEFAULT_ENTITY_PREFIX: &str = "Event:";

fn default_entity_prefix() -> String {
    DEFAULT_ENTITY_PREFIX.to_string()
}

/// One target listing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    /// Path of the listing page relative to `base_url`. May contain
    /// `{city}` and `{category}` placeholders.
    pub listing_path: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Cutoff for the incremental-load controller. Without one the listing
    /// page is snapshotted once and never clicked.
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default = "default_entity_prefix")]
    pub entity_prefix: String,
    /// Card selectors tried in order; the first that matches anything wins.
    #[serde(default)]
    pub card_selectors: Vec<String>,
    #[serde(default)]
    pub genre_keywords: Vec<String>,
    /// Venue names matched verbatim in card text as a low-trust probe.
    #[serde(default)]
    pub known_venues: Vec<String>,
}

impl SiteConfig {
    /// Generate a URL-safe slug from the site name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' || c == '.' || c == '_' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Absolute listing URL with scope placeholders substituted.
    #[must_use]
    pub fn listing_url(&self) -> String {
        let path = self
            .listing_path
            .replace("{city}", self.city.as_deref().unwrap_or_default())
            .replace("{category}", self.category.as_deref().unwrap_or_default());
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<SiteConfig>,
}

impl SitesFile {
    /// Find a site by exact name or by slug.
    #[must_use]
    pub fn find(&self, name_or_slug: &str) -> Option<&SiteConfig> {
        let wanted = name_or_slug.trim();
        self.sites
            .iter()
            .find(|s| s.name == wanted || s.slug() == wanted.to_lowercase())
    }
}

/// Load and validate the sites configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sites_file: SitesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::SitesFileParse)?;

    validate_sites(&sites_file)?;

    Ok(sites_file)
}

fn validate_sites(sites_file: &SitesFile) -> Result<(), ConfigError> {
    if sites_file.sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one site must be configured".to_string(),
        ));
    }

    let mut seen_slugs = HashSet::new();

    for site in &sites_file.sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site name must be non-empty".to_string(),
            ));
        }

        let base = site.base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "site '{}' has invalid base_url '{}'; must start with http:// or https://",
                site.name, site.base_url
            )));
        }

        if site.entity_prefix.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has an empty entity_prefix",
                site.name
            )));
        }

        let slug = site.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "site name '{}' produces an empty slug",
                site.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site slug: '{}' (from site '{}')",
                slug, site.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sites_test.rs"]
mod tests;
