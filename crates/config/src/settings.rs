// Host settings
// Loaded from ~/.config/fieldcalc/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use fieldcalc_engine::parser::DEFAULT_MAX_DEPTH;
use fieldcalc_engine::EngineOptions;

use crate::{config_dir, strip_comments, ConfigError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Catalog
    #[serde(rename = "catalog.path")]
    pub catalog_path: Option<PathBuf>,  // None = <config dir>/catalog.json

    // Engine
    #[serde(rename = "engine.maxNestingDepth")]
    pub max_nesting_depth: usize,

    // Suggestions
    #[serde(rename = "suggest.maxResults")]
    pub max_suggestions: Option<usize>,  // None = no limit
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: None,
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            max_suggestions: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        config_dir().join("settings.json")
    }

    /// Catalog used when `catalog.path` is unset
    pub fn default_catalog_path() -> PathBuf {
        config_dir().join("catalog.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from a specific file. A missing file gives defaults;
    /// an unreadable or invalid one is logged and also gives defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&strip_comments(&contents)) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}", path.display(), e);
                    log::warn!("using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::parse(path, e))?;
        fs::write(path, json).map_err(|e| ConfigError::io(path, e))
    }

    /// Catalog file to load: explicit setting, else the default location
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path.clone().unwrap_or_else(Self::default_catalog_path)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_depth: self.max_nesting_depth,
            max_suggestions: self.max_suggestions,
        }
    }

    /// Default settings file with comments, written by `init`
    pub fn default_file_contents() -> &'static str {
        r#"{
    // Catalog file (JSON or TOML); null = catalog.json next to this file
    "catalog.path": null,

    // Deepest allowed nesting of brackets, calls and unary chains
    "engine.maxNestingDepth": 64,

    // Cap on autocomplete suggestions; null = no limit
    "suggest.maxResults": null
}
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.max_nesting_depth, 64);
    }

    #[test]
    fn test_default_file_parses_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, Settings::default_file_contents()).unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "suggest.maxResults": 5, "catalog.path": "/tmp/cat.toml" }"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.max_suggestions, Some(5));
        assert_eq!(settings.catalog_path(), PathBuf::from("/tmp/cat.toml"));
        assert_eq!(settings.max_nesting_depth, 64);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            catalog_path: Some(PathBuf::from("fields.toml")),
            max_nesting_depth: 16,
            max_suggestions: Some(8),
        };
        settings.save_to(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"engine.maxNestingDepth\": 16"));
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_engine_options() {
        let settings = Settings { max_nesting_depth: 10, max_suggestions: Some(3), ..Default::default() };
        let options = settings.engine_options();
        assert_eq!(options.max_depth, 10);
        assert_eq!(options.max_suggestions, Some(3));
    }
}
