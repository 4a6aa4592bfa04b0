// Catalog files - the host-side description of fields (and optionally which
// built-in functions to expose), in JSON or TOML.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use fieldcalc_engine::{Catalog, Field};

use crate::{strip_comments, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Json,
    Toml,
}

impl CatalogFormat {
    /// `.toml` is TOML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => CatalogFormat::Toml,
            _ => CatalogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Built-in functions to expose, in suggestion order. Absent = all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<String>>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl CatalogFile {
    /// The starter catalog written by `fcalc init`.
    pub fn sample() -> Self {
        Self {
            functions: None,
            fields: vec![
                Field::new("revenue", "Revenue", 1000.0),
                Field::new("costs", "Costs", 400.0),
                Field::new("profit_margin", "Profit Margin", 0.35),
                Field::new("tax_rate", "Tax Rate", 0.21),
            ],
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let file = Self::parse(&contents, CatalogFormat::from_path(path))
            .map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })?;
        log::debug!("loaded {} fields from {}", file.fields.len(), path.display());
        Ok(file)
    }

    pub fn parse(contents: &str, format: CatalogFormat) -> Result<Self, String> {
        match format {
            CatalogFormat::Json => serde_json::from_str(&strip_comments(contents)).map_err(|e| e.to_string()),
            CatalogFormat::Toml => toml::from_str(contents).map_err(|e| e.to_string()),
        }
    }

    pub fn render(&self, format: CatalogFormat) -> Result<String, String> {
        match format {
            CatalogFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
            CatalogFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
        }
    }

    /// Write the catalog, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self
            .render(CatalogFormat::from_path(path))
            .map_err(|message| ConfigError::Parse { path: path.to_path_buf(), message })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| ConfigError::io(path, e))
    }

    /// Validate and build the engine catalog.
    pub fn into_catalog(self) -> Result<Catalog, ConfigError> {
        let mut builder = Catalog::builder().fields(self.fields);
        if let Some(names) = self.functions {
            builder = builder.functions(names);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcalc_engine::CatalogError;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(CatalogFormat::from_path(Path::new("a/fields.toml")), CatalogFormat::Toml);
        assert_eq!(CatalogFormat::from_path(Path::new("fields.TOML")), CatalogFormat::Toml);
        assert_eq!(CatalogFormat::from_path(Path::new("fields.json")), CatalogFormat::Json);
        assert_eq!(CatalogFormat::from_path(Path::new("fields")), CatalogFormat::Json);
    }

    #[test]
    fn test_parse_json_with_comments() {
        let json = r#"{
            // sales inputs
            "fields": [
                { "id": "revenue", "name": "Revenue", "value": 1000 },
                { "id": "costs", "name": "Costs", "value": 400.5 }
            ]
        }"#;
        let file = CatalogFile::parse(json, CatalogFormat::Json).unwrap();
        assert_eq!(file.fields.len(), 2);
        assert_eq!(file.fields[1].value, 400.5);
        assert!(file.functions.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
functions = ["SUM", "ROUND"]

[[fields]]
id = "revenue"
name = "Revenue"
value = 1000.0
"#;
        let file = CatalogFile::parse(toml, CatalogFormat::Toml).unwrap();
        assert_eq!(file.functions, Some(vec!["SUM".to_string(), "ROUND".to_string()]));
        assert_eq!(file.fields[0].id, "revenue");

        let catalog = file.into_catalog().unwrap();
        assert_eq!(catalog.functions().len(), 2);
        assert!(catalog.function("MAX").is_none());
    }

    #[test]
    fn test_parse_error_message() {
        let err = CatalogFile::parse(r#"{ "fields": [ { "id": 3 } ] }"#, CatalogFormat::Json).unwrap_err();
        assert!(err.contains("invalid type"), "{}", err);
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = tempdir().unwrap();
        for name in ["catalog.json", "catalog.toml"] {
            let path = dir.path().join("sub").join(name);
            CatalogFile::sample().save(&path).unwrap();
            assert_eq!(CatalogFile::load(&path).unwrap(), CatalogFile::sample());
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = CatalogFile::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "fields = 3").unwrap();
        let err = CatalogFile::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_into_catalog_rejects_bad_fields() {
        let file = CatalogFile {
            functions: None,
            fields: vec![Field::new("gross margin", "Gross Margin", 1.0)],
        };
        match file.into_catalog() {
            Err(ConfigError::Catalog(CatalogError::InvalidFieldId(id))) => assert_eq!(id, "gross margin"),
            other => panic!("Expected InvalidFieldId, got {:?}", other),
        }
    }

    #[test]
    fn test_sample_catalog_evaluates() {
        let catalog = CatalogFile::sample().into_catalog().unwrap();
        let value = fieldcalc_engine::evaluate("revenue - costs", &catalog).unwrap();
        assert_eq!(value.as_number(), Some(600.0));
    }
}
