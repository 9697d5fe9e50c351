//! Application configuration for Compositor.
//!
//! User config lives at `~/.compositor/compositor.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompositeError, Result};
use crate::types::OutputType;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "compositor.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".compositor";

// ---------------------------------------------------------------------------
// Config structs (matching compositor.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Render defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Remote document fetching.
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Output format builders write.
    #[serde(default)]
    pub output: OutputType,

    /// Validate each component after building it.
    #[serde(default = "default_true")]
    pub validate: bool,

    /// Path or URL of the catalog configuration document.
    #[serde(default = "default_catalog_config")]
    pub catalog_config: String,

    /// Path or URL of the composite configuration document.
    #[serde(default = "default_composite_config")]
    pub composite_config: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output: OutputType::default(),
            validate: true,
            catalog_config: default_catalog_config(),
            composite_config: default_composite_config(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_catalog_config() -> String {
    "catalog.yaml".into()
}
fn default_composite_config() -> String {
    "catalog/config.yaml".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed for a remote document.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.compositor/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CompositeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.compositor/compositor.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CompositeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CompositeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CompositeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CompositeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CompositeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("catalog_config"));
        assert!(toml_str.contains("output = \"json\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fetch.timeout_secs, 30);
        assert!(parsed.defaults.validate);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
output = "yaml"
validate = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output, OutputType::Yaml);
        assert!(!config.defaults.validate);
        assert_eq!(config.defaults.catalog_config, "catalog.yaml");
        assert_eq!(config.fetch.max_redirects, 5);
    }

    #[test]
    fn load_config_from_reports_bad_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("compositor.toml");
        std::fs::write(&path, "[defaults\noutput = ").expect("write");
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
