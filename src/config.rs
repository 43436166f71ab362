use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::{FsError, Result};

/// Site and storage settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub site_name: String,
    pub site_title: String,
    pub site_motto: String,
    pub site_description: String,
    pub site_keywords: String,

    /// Posts per listing page; also caps `recent` and `random`
    pub posts_per_page: usize,

    /// Directory holding the catalog and every content file
    pub posts_dir: PathBuf,

    /// Catalog file name inside `posts_dir`
    pub catalog_file: String,

    /// Legacy export file name inside `posts_dir`, if any
    pub legacy_feed_file: Option<String>,

    /// Legacy posts dated on or before this day are served from the feed
    pub legacy_end_date: NaiveDate,

    /// Keep only the last legacy entry among those sharing a post date
    pub legacy_dedupe_by_date: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_name: "A New Filestack Website".to_string(),
            site_title: "Website Title".to_string(),
            site_motto: "A pithy statement or mantra".to_string(),
            site_description: String::new(),
            site_keywords: String::new(),
            posts_per_page: 10,
            posts_dir: PathBuf::from("posts"),
            catalog_file: "catalog.xml".to_string(),
            legacy_feed_file: None,
            legacy_end_date: NaiveDate::from_ymd_opt(1910, 1, 13).unwrap_or_default(),
            legacy_dedupe_by_date: true,
        }
    }
}

impl Config {
    /// Loads a JSON config file; keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let raw = fs::read_to_string(path).map_err(|e| {
            error!("Failed to read config file {}: {}", path.display(), e);
            FsError::ConfigError {
                message: format!("cannot read {}: {}", path.display(), e),
            }
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.posts_per_page == 0 {
            return Err(FsError::ConfigError {
                message: "posts_per_page must be at least 1".to_string(),
            });
        }
        if self.catalog_file.trim().is_empty() {
            return Err(FsError::ConfigError {
                message: "catalog_file must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.posts_dir.join(&self.catalog_file)
    }

    /// Path of the legacy export, or `None` when no feed is configured.
    pub fn legacy_feed_path(&self) -> Option<PathBuf> {
        self.legacy_feed_file
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .map(|f| self.posts_dir.join(f))
    }
}
