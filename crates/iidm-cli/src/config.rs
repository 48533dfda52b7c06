//! CLI configuration file.
//!
//! Stored in `~/.iidm/config.toml` unless `--config` points elsewhere. Both sections are
//! optional and partial; missing values keep the codec defaults.
//!
//! ```toml
//! [export]
//! version = "1.10"
//! format = "json"
//! topology_level = "BUS_BREAKER"
//! sorted = true
//!
//! [import]
//! throw_if_extension_not_found = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use iidm_io::{ExportOptions, ImportOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IidmConfig {
    pub export: ExportOptions,
    pub import: ImportOptions,
}

impl IidmConfig {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".iidm"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Configuration from `explicit`, otherwise from the default location when it exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing configuration {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iidm_io::{IidmVersion, TopologyLevel, TreeDataFormat};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_config_parsing() {
        let toml = r#"
            [export]
            version = "1.10"
            format = "json"
            topology_level = "BUS_BREAKER"

            [import]
            throw_if_extension_not_found = true
        "#;
        let config: IidmConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.export.version, IidmVersion::V_1_10);
        assert_eq!(config.export.format, TreeDataFormat::Json);
        assert_eq!(config.export.topology_level, TopologyLevel::BusBreaker);
        // unspecified values keep their defaults
        assert!(config.export.indent);
        assert!(config.import.throw_if_extension_not_found);
        assert!(config.import.format.is_none());
    }

    #[test]
    fn test_empty_config() {
        let config: IidmConfig = toml::from_str("").unwrap();
        assert_eq!(config, IidmConfig::default());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[export]\nsorted = true").unwrap();
        let config = IidmConfig::load(Some(file.path())).unwrap();
        assert!(config.export.sorted);
        assert!(IidmConfig::load(Some(Path::new("/nonexistent/iidm.toml"))).is_err());
    }
}
