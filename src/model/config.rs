use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_CONFIG_PATH: &str = "BOWTIE_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const ENV_INCIDENT_DIR: &str = "BOWTIE_INCIDENT_DIR";
const ENV_OUT_DIR: &str = "BOWTIE_OUT_DIR";

const DEFAULT_INCIDENT_DIR: &str = "data/structured/incidents/schema_v2_3";
const DEFAULT_OUT_DIR: &str = "data/structured/incidents/normalized";

/// Data directory configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding extracted incident JSON files
    pub incident_dir: PathBuf,
    /// Destination directory for normalized JSON
    pub out_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            incident_dir: PathBuf::from(DEFAULT_INCIDENT_DIR),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from environment and config file
    ///
    /// Environment variables win over the config file, which wins over the
    /// built-in defaults.
    pub fn from_env() -> Self {
        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut paths = Self::load_config_file(&config_path)
            .map(|cf| cf.paths)
            .unwrap_or_default();

        if let Ok(dir) = std::env::var(ENV_INCIDENT_DIR) {
            paths.incident_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var(ENV_OUT_DIR) {
            paths.out_dir = PathBuf::from(dir);
        }

        Self { paths }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Handle empty file
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }
}
