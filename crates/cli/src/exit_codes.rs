//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `fcalc` exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success                                               |
//! | 1    | Formula error (structural, syntax, resolution, domain) |
//! | 2    | Usage error (bad arguments, refusing to overwrite)    |
//! | 3    | I/O error (catalog or settings file unreadable)       |
//! | 4    | Configuration error (invalid catalog or settings)     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use fieldcalc_config::ConfigError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// The formula failed validation, parsing or evaluation.
pub const EXIT_FORMULA: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// A file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// A catalog or settings file was read but is invalid.
pub const EXIT_CONFIG: u8 = 4;

/// Map a configuration error to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Io { .. } => EXIT_IO,
        ConfigError::Parse { .. } | ConfigError::Catalog(_) => EXIT_CONFIG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcalc_engine::CatalogError;
    use std::path::PathBuf;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_FORMULA, EXIT_USAGE, EXIT_IO, EXIT_CONFIG];
        for (i, a) in codes.iter().enumerate() {
            assert!(codes[i + 1..].iter().all(|b| a != b));
        }
    }

    #[test]
    fn test_config_exit_code() {
        let io = ConfigError::Io { path: PathBuf::from("x"), message: "gone".into() };
        let parse = ConfigError::Parse { path: PathBuf::from("x"), message: "bad".into() };
        let catalog = ConfigError::Catalog(CatalogError::DuplicateField("a".into()));
        assert_eq!(config_exit_code(&io), EXIT_IO);
        assert_eq!(config_exit_code(&parse), EXIT_CONFIG);
        assert_eq!(config_exit_code(&catalog), EXIT_CONFIG);
    }
}
