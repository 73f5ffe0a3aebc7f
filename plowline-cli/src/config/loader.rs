use super::types::{DEFAULT_TABLE, PlowlineConfig, RawConfigFile, RawEnvConfig};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name looked up in the working directory and in `~/.config`
pub const CONFIG_FILE_NAME: &str = "plowline.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `env` from the first existing candidate file
    ///
    /// Candidates are `explicit` followed by the user config path.
    pub fn load(explicit: &Path, env: Option<&str>) -> Result<PlowlineConfig> {
        match Self::candidate_paths(explicit)
            .into_iter()
            .find(|path| path.exists())
        {
            Some(path) => Self::load_from_path(&path, env),
            None => {
                info!("No config file found, using defaults");
                Ok(PlowlineConfig::default())
            }
        }
    }

    /// Paths searched for a config file, in priority order
    pub fn candidate_paths(explicit: &Path) -> Vec<PathBuf> {
        let mut paths = vec![explicit.to_path_buf()];
        if let Some(user_path) = Self::user_config_path() {
            paths.push(user_path);
        }
        paths
    }

    /// Get user config path (`~/.config/plowline.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join(CONFIG_FILE_NAME))
    }

    /// Load and finalize a specific config file
    pub fn load_from_path(path: &Path, env: Option<&str>) -> Result<PlowlineConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&contents, env)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse TOML contents and resolve the requested environment
    pub fn parse(contents: &str, env: Option<&str>) -> Result<PlowlineConfig> {
        let mut file: RawConfigFile = toml::from_str(contents)?;

        let mut raw = file.remove(DEFAULT_TABLE).unwrap_or_default();
        if let Some(name) = env.filter(|name| *name != DEFAULT_TABLE) {
            match file.remove(name) {
                Some(overlay) => {
                    debug!(env = name, "Applying environment overrides");
                    raw = Self::merge_raw(raw, overlay);
                }
                None => warn!(env = name, "Unknown environment, using default settings"),
            }
        }

        Self::finalize(raw)
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawEnvConfig, overlay: RawEnvConfig) -> RawEnvConfig {
        RawEnvConfig {
            port: overlay.port.or(base.port),
            host: overlay.host.or(base.host),
            max_messages: overlay.max_messages.or(base.max_messages),
            events_endpoint: overlay.events_endpoint.or(base.events_endpoint),
            allowed_origins: overlay.allowed_origins.or(base.allowed_origins),
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawEnvConfig) -> Result<PlowlineConfig> {
        let defaults = PlowlineConfig::default();
        let config = PlowlineConfig {
            port: raw.port.unwrap_or(defaults.port),
            host: raw.host.unwrap_or(defaults.host),
            max_messages: raw.max_messages.unwrap_or(defaults.max_messages),
            events_endpoint: raw.events_endpoint.unwrap_or(defaults.events_endpoint),
            allowed_origins: raw.allowed_origins.unwrap_or(defaults.allowed_origins),
        };

        if config.max_messages == 0 {
            bail!("max_messages must be greater than zero");
        }

        Ok(config)
    }
}
