//! Engine configuration.
//!
//! Every section is defaulted, so an empty file (or no file) yields the
//! production values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Score formula coefficients.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Slot selection policy.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Local ad cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Remote campaign store.
    #[serde(default)]
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: display.clone(),
            source,
        })?;

        let config: Self = if is_json(path) {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content).map_err(|source| CoreError::Toml {
                path: display,
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to a file, choosing the format by extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let path = path.as_ref();
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.selection.national_slot_interval == 0 {
            return Err(CoreError::Invalid(
                "selection.national_slot_interval must be at least 1".to_string(),
            ));
        }
        if self.cache.stale_ttl_secs < self.cache.fresh_ttl_secs {
            return Err(CoreError::Invalid(format!(
                "cache.stale_ttl_secs ({}) is shorter than cache.fresh_ttl_secs ({})",
                self.cache.stale_ttl_secs, self.cache.fresh_ttl_secs
            )));
        }
        for (name, value) in [
            ("scoring.match_bonus", self.scoring.match_bonus),
            ("scoring.no_location_factor", self.scoring.no_location_factor),
            ("scoring.mismatch_factor", self.scoring.mismatch_factor),
            ("scoring.impression_penalty", self.scoring.impression_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::Invalid(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

/// Coefficients of the score formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Fraction of base score added when a targeted local ad matches.
    pub match_bonus: f64,
    /// Multiplier for targeted local ads when the user location is unknown.
    pub no_location_factor: f64,
    /// Multiplier for targeted local ads when the location does not match.
    pub mismatch_factor: f64,
    /// Impressions per session served without a penalty.
    pub free_impressions: u32,
    /// Fraction of score removed per impression beyond the free ones.
    pub impression_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            match_bonus: 0.5,
            no_location_factor: 0.7,
            mismatch_factor: 0.3,
            free_impressions: 2,
            impression_penalty: 0.4,
        }
    }
}

/// Slot selection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Every Nth slot is reserved for the best national ad.
    pub national_slot_interval: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            national_slot_interval: 4,
        }
    }
}

/// Local ad cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age below which cached ads are fresh.
    pub fresh_ttl_secs: u64,
    /// Age up to which cached ads are served stale.
    pub stale_ttl_secs: u64,
    /// Storage key prefix; the placement slug is appended after `_`.
    pub key_prefix: String,
    /// Refetch in the background when a stale entry is served.
    pub revalidate_on_stale: bool,
    /// Directory for file-backed storage (CLI only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl CacheConfig {
    pub fn fresh_ttl(&self) -> Duration {
        Duration::from_secs(self.fresh_ttl_secs)
    }

    pub fn stale_ttl(&self) -> Duration {
        Duration::from_secs(self.stale_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_ttl_secs: 15 * 60,
            stale_ttl_secs: 60 * 60,
            key_prefix: "ad_auction_cache".to_string(),
            revalidate_on_stale: true,
            dir: None,
        }
    }
}

/// Remote campaign store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the hosted database REST endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Anonymous API key sent as `apikey` and bearer token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Campaign table name.
    pub campaigns_table: String,
    /// Placement table joined into campaign reads.
    pub placements_table: String,
    /// Optional request timeout. None means the HTTP client default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            campaigns_table: "ad_campaigns".to_string(),
            placements_table: "ad_placements".to_string(),
            timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.selection.national_slot_interval, 4);
        assert_eq!(config.cache.fresh_ttl(), Duration::from_secs(900));
        assert_eq!(config.cache.stale_ttl(), Duration::from_secs(3600));
        assert_eq!(config.cache.key_prefix, "ad_auction_cache");
        assert_eq!(config.scoring.free_impressions, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [selection]
            national_slot_interval = 6

            [store]
            base_url = "https://db.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.selection.national_slot_interval, 6);
        assert_eq!(config.store.base_url.as_deref(), Some("https://db.example.com"));
        assert_eq!(config.store.campaigns_table, "ad_campaigns");
        assert_eq!(config.scoring.match_bonus, 0.5);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = EngineConfig::default();
        config.selection.national_slot_interval = 0;
        assert!(matches!(config.validate(), Err(CoreError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_ttls() {
        let mut config = EngineConfig::default();
        config.cache.stale_ttl_secs = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adslot.toml");

        let mut config = EngineConfig::default();
        config.cache.fresh_ttl_secs = 120;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adslot.json");
        std::fs::write(&path, r#"{"selection":{"national_slot_interval":3}}"#).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.selection.national_slot_interval, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/adslot.toml").unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
