use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = ".dslint.toml";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Glob patterns excluded from directory walks.
    pub ignore: Vec<String>,
    pub rules: RuleConfig,
    pub style: StyleConfig,
    pub autofix: AutofixConfig,
    pub performance: PerformanceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RuleConfig {
    pub check_constructor_length: bool,
    pub check_unread_fields: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub max_line_length: usize,
    pub indent_size: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AutofixConfig {
    pub enabled: bool,
    /// Upper bound on analyse-and-fix rounds per file in fix-all mode.
    pub max_passes: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PerformanceConfig {
    pub parallel_analysis: bool,
    pub memory_mapped_io: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore: vec!["bin/**".to_string(), "obj/**".to_string()],
            rules: RuleConfig::default(),
            style: StyleConfig::default(),
            autofix: AutofixConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            check_constructor_length: true,
            check_unread_fields: true,
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            max_line_length: 100,
            indent_size: 4,
        }
    }
}

impl Default for AutofixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_passes: 32,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_analysis: true,
            memory_mapped_io: true,
        }
    }
}

impl Config {
    /// Reads `.dslint.toml` from `dir`. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|e| Error::io(&config_path, e))?;
        toml::from_str(&content).map_err(|e| Error::Config {
            path: config_path,
            message: e.message().to_string(),
        })
    }

    pub fn load_or_default(dir: &Path) -> Self {
        match Self::load(dir) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "using default configuration");
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config {
            path: CONFIG_FILE_NAME.into(),
            message: e.to_string(),
        })
    }
}

pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Writes the default configuration into `dir`, refusing to overwrite an
    /// existing file.
    pub fn create_default_config(&self, dir: &Path) -> Result<std::path::PathBuf> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(Error::Config {
                path: config_path,
                message: "file already exists".to_string(),
            });
        }
        let toml = Config::default().to_toml()?;
        std::fs::write(&config_path, toml).map_err(|e| Error::io(&config_path, e))?;
        Ok(config_path)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.style.max_line_length, 100);
        assert!(config.rules.check_unread_fields);
        assert_eq!(config.autofix.max_passes, 32);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[style]\nmax_line_length = 120\n\n[rules]\ncheck_unread_fields = false\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.style.max_line_length, 120);
        assert_eq!(config.style.indent_size, 4);
        assert!(!config.rules.check_unread_fields);
        assert!(config.rules.check_constructor_length);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[style]\nmax_line_length = \"x\"\n")
            .unwrap();

        assert!(matches!(Config::load(dir.path()), Err(Error::Config { .. })));
        assert_eq!(Config::load_or_default(dir.path()).style.max_line_length, 100);
    }

    #[test]
    fn test_create_default_config_round_trips() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::new();
        let path = manager.create_default_config(dir.path()).unwrap();
        assert!(path.ends_with(CONFIG_FILE_NAME));

        let config = Config::load(dir.path()).unwrap();
        assert!(config.autofix.enabled);
        assert!(manager.create_default_config(dir.path()).is_err());
    }
}
