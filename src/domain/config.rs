use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for degree plan tooling.
///
/// This struct holds settings that control how requirement labels are
/// derived and where catalog data is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Names that denote top-level program nodes.
    ///
    /// Matched exactly (case-insensitive) against a node's bare name.
    /// For example, 'Core' or 'PE'.
    top_level_names: Vec<String>,

    /// Prefixes that denote top-level program nodes.
    ///
    /// For example, 'Major -' or 'Minor -'.
    top_level_prefixes: Vec<String>,

    /// Directory holding the catalog datasets, relative to the root.
    ///
    /// Defaults to the root itself.
    pub data_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            top_level_names: default_top_level_names(),
            top_level_prefixes: default_top_level_prefixes(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the exact top-level node names.
    #[must_use]
    pub fn top_level_names(&self) -> &[String] {
        &self.top_level_names
    }

    /// Returns the top-level node name prefixes.
    #[must_use]
    pub fn top_level_prefixes(&self) -> &[String] {
        &self.top_level_prefixes
    }

    /// Adds a top-level name.
    ///
    /// Returns `true` if the name was added, `false` if it already existed
    /// (compared case-insensitively).
    pub fn add_top_level_name(&mut self, name: String) -> bool {
        if self
            .top_level_names
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&name))
        {
            false
        } else {
            self.top_level_names.push(name);
            true
        }
    }

    /// Adds a top-level prefix.
    ///
    /// Returns `true` if the prefix was added, `false` if it already existed.
    pub fn add_top_level_prefix(&mut self, prefix: String) -> bool {
        if self
            .top_level_prefixes
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(&prefix))
        {
            false
        } else {
            self.top_level_prefixes.push(prefix);
            true
        }
    }
}

fn default_top_level_names() -> Vec<String> {
    vec!["Core".to_string(), "PE".to_string()]
}

fn default_top_level_prefixes() -> Vec<String> {
    vec!["Major -".to_string(), "Minor -".to_string()]
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_top_level_names")]
        top_level_names: Vec<String>,

        #[serde(default = "default_top_level_prefixes")]
        top_level_prefixes: Vec<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        data_dir: Option<String>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                top_level_names,
                top_level_prefixes,
                data_dir,
            } => Self {
                top_level_names,
                top_level_prefixes,
                data_dir,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            top_level_names: config.top_level_names,
            top_level_prefixes: config.top_level_prefixes,
            data_dir: config.data_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\ntop_level_names = [\"Core\", \"PE\", \"Foundations\"]\ndata_dir = \"data\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.top_level_names(), &["Core", "PE", "Foundations"]);
        assert_eq!(config.top_level_prefixes(), &["Major -", "Minor -"]);
        assert_eq!(config.data_dir.as_deref(), Some("data"));
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\ntop_level_names = \"Core\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let mut config = Config::default();
        assert!(config.add_top_level_prefix("Track -".to_string()));
        assert!(!config.add_top_level_name("core".to_string()));

        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
