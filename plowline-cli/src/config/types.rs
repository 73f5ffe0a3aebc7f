use std::collections::BTreeMap;

use serde::Deserialize;

/// Table holding values shared by every environment
pub const DEFAULT_TABLE: &str = "default";

/// Default port for the plowline server
pub const DEFAULT_PORT: u16 = 8081;

/// Default bind host
pub const DEFAULT_HOST: &str = "localhost";

/// Default number of retained events
pub const DEFAULT_MAX_MESSAGES: usize = 100;

/// Default origins allowed to post events from a browser
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";

/// A config file: `[default]` plus named environment tables
pub type RawConfigFile = BTreeMap<String, RawEnvConfig>;

/// One environment table as stored in TOML (optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct RawEnvConfig {
    /// Port for the plowline server
    pub port: Option<u16>,

    /// Host to bind to
    pub host: Option<String>,

    /// Maximum number of retained events
    pub max_messages: Option<usize>,

    /// Path trackers post events to
    pub events_endpoint: Option<String>,

    /// Comma-separated CORS origins for the ingestion routes
    pub allowed_origins: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlowlineConfig {
    pub port: u16,
    pub host: String,
    pub max_messages: usize,
    pub events_endpoint: String,
    pub allowed_origins: String,
}

impl Default for PlowlineConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            max_messages: DEFAULT_MAX_MESSAGES,
            events_endpoint: plowline_server::DEFAULT_EVENTS_ENDPOINT.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
        }
    }
}

impl From<PlowlineConfig> for plowline_server::ServerConfig {
    fn from(config: PlowlineConfig) -> Self {
        Self {
            host: config.host,
            port: config.port,
            max_events: config.max_messages,
            events_endpoint: config.events_endpoint,
            allowed_origins: config.allowed_origins,
        }
    }
}
