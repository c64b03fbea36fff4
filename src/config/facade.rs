//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::SqlFsConfig;
use crate::error::FsError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file, `explicit` (if given) and environment.
    pub fn load(explicit: Option<&Path>) -> Result<SqlFsConfig, FsError> {
        Ok(MergeService::load(explicit)?)
    }

    /// Load configuration from one file plus environment, skipping the global file.
    pub fn load_from_file(path: &Path) -> Result<SqlFsConfig, FsError> {
        Ok(MergeService::load_from_file(path)?)
    }

    pub fn default() -> SqlFsConfig {
        SqlFsConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NameCase;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[store]\nlabel = \"archive\"\nname_case = \"insensitive\"\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.store.label, "archive");
        assert_eq!(config.store.name_case, NameCase::Insensitive);
        assert!(config.store.backup_partial_store);
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = ConfigLoader::load_from_file(&missing).unwrap_err();
        assert!(matches!(err, FsError::Config(_)));
    }

    #[test]
    fn test_malformed_value_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[store]\nname_case = \"sideways\"").unwrap();
        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
