//! Catalogue location and verification settings.
//!
//! Defines the YAML-serializable configuration that tells the tools where a
//! catalogue lives on disk and how strictly it is verified.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! aaz_path: /src/aaz
//! commands_dir: Commands
//! index_file: tree.json
//! readme_file: readme.md
//! verify:
//!   require_group_help: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Settings for [`CommandTreeManager::verify`](crate::CommandTreeManager::verify).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Require a short summary on every group, not only on commands.
    #[serde(default = "default_true")]
    pub require_group_help: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            require_group_help: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_commands_dir() -> String {
    "Commands".to_string()
}

fn default_index_file() -> String {
    "tree.json".to_string()
}

fn default_readme_file() -> String {
    "readme.md".to_string()
}

/// Top-level catalogue configuration.
///
/// Loaded from a YAML file (typically `.catalog.yml` next to the catalogue)
/// by the CLI and by [`FsDocumentStore::from_config`](crate::FsDocumentStore::from_config).
///
/// # Examples
///
/// ```
/// use command_catalog_db::CatalogConfig;
///
/// let config: CatalogConfig = serde_yaml::from_str("version: \"1.0\"\naaz_path: /src/aaz\n").unwrap();
/// assert_eq!(config.index_uri(), "/Commands/tree.json");
/// assert!(config.verify.require_group_help);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Catalogue root directory.
    pub aaz_path: PathBuf,
    /// Directory under the root holding the command documents.
    #[serde(default = "default_commands_dir")]
    pub commands_dir: String,
    /// Authoritative index file name inside `commands_dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,
    /// Group document file name.
    #[serde(default = "default_readme_file")]
    pub readme_file: String,
    #[serde(default)]
    pub verify: VerifyConfig,
}

impl CatalogConfig {
    /// Default configuration for a catalogue rooted at `aaz_path`.
    pub fn new(aaz_path: impl Into<PathBuf>) -> Self {
        Self {
            version: "1.0".to_string(),
            aaz_path: aaz_path.into(),
            commands_dir: default_commands_dir(),
            index_file: default_index_file(),
            readme_file: default_readme_file(),
            verify: VerifyConfig::default(),
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CatalogError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::CatalogError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::CatalogError::Io) if the file cannot be written,
    /// or [`Yaml`](crate::CatalogError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Store-relative uri of the authoritative index.
    pub fn index_uri(&self) -> String {
        format!("/{}/{}", self.commands_dir, self.index_file)
    }

    /// Store-relative uri of the root group document.
    pub fn root_readme_uri(&self) -> String {
        format!("/{}/{}", self.commands_dir, self.readme_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
aaz_path: /src/aaz
commands_dir: Cmds
index_file: index.json
readme_file: README.md
verify:
  require_group_help: false
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: CatalogConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.aaz_path, PathBuf::from("/src/aaz"));
        assert_eq!(config.index_uri(), "/Cmds/index.json");
        assert_eq!(config.root_readme_uri(), "/Cmds/README.md");
        assert!(!config.verify.require_group_help);
    }

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: CatalogConfig = serde_yaml::from_str("version: \"1.0\"\naaz_path: aaz\n").unwrap();
        assert_eq!(config, CatalogConfig::new("aaz"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yml");

        let original: CatalogConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = CatalogConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }
}
