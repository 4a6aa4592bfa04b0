// Configuration loading

pub mod catalog_file;
pub mod settings;

pub use catalog_file::{CatalogFile, CatalogFormat};
pub use settings::Settings;

use std::path::{Path, PathBuf};

use fieldcalc_engine::CatalogError;

/// Directory holding settings.json and the default catalog.
/// `FIELDCALC_CONFIG_DIR` overrides the platform config dir.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("FIELDCALC_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldcalc")
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    Catalog(CatalogError),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, err: impl std::fmt::Display) -> Self {
        ConfigError::Io { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn parse(path: &Path, err: impl std::fmt::Display) -> Self {
        ConfigError::Parse { path: path.to_path_buf(), message: err.to_string() }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "{}: {}", path.display(), message),
            ConfigError::Parse { path, message } => {
                write!(f, "invalid config in {}: {}", path.display(), message)
            }
            ConfigError::Catalog(err) => write!(f, "invalid catalog: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<CatalogError> for ConfigError {
    fn from(err: CatalogError) -> Self {
        ConfigError::Catalog(err)
    }
}

/// Drop `//` comment lines so hand-edited JSON config files still parse.
pub(crate) fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        let cleaned = strip_comments("{\n  // note\n  \"a\": 1\n    // trailing\n}");
        assert_eq!(cleaned, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::parse(Path::new("cat.toml"), "expected `=`");
        assert_eq!(err.to_string(), "invalid config in cat.toml: expected `=`");

        let err = ConfigError::from(CatalogError::DuplicateField("revenue".into()));
        assert_eq!(err.to_string(), "invalid catalog: duplicate field id: revenue");
    }
}
