use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cache::DEFAULT_TTL_HOURS;
use crate::error::Result;
use crate::loader::DEFAULT_LISTING_LIMIT;

pub const SETTINGS_FILE: &str = "mercari_analyzer.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub cache_ttl_hours: i64,
    pub max_listings: usize,
    pub auto_suggest_price: bool,
    pub show_shipping_calc: bool,
    // Used when `RUST_LOG` is not set.
    pub log_level: String,
    // Search dump opened at startup, if any.
    pub search_dump: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("mercari_cache.db"),
            cache_ttl_hours: DEFAULT_TTL_HOURS,
            max_listings: DEFAULT_LISTING_LIMIT,
            auto_suggest_price: true,
            show_shipping_calc: true,
            log_level: "info".to_string(),
            search_dump: None,
        }
    }
}

impl Settings {
    // Missing file means defaults, a broken one is an error
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::hours(self.cache_ttl_hours.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(dir.path().join("nope.json")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{ "cache_ttl_hours": 6, "show_shipping_calc": false }"#).unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.cache_ttl_hours, 6);
        assert!(!s.show_shipping_calc);
        assert_eq!(s.max_listings, DEFAULT_LISTING_LIMIT);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let s = Settings {
            max_listings: 40,
            ..Settings::default()
        };
        s.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), s);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
