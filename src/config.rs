//! Configuration System
//!
//! Loads configuration from a TOML file with `KODIGO_*` environment variable
//! overrides. Every key has a default, so an empty file (or no file) works.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::collections;
use crate::store::MemoryStoreConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Write documents to `data_dir`; off keeps the store purely in memory
    #[serde(default = "default_persist")]
    pub persist: bool,

    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    /// Collections clients may read and write; empty allows any
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("kodigo").to_string_lossy().to_string())
        .unwrap_or_else(|| "./kodigo_data".to_string())
}

fn default_persist() -> bool {
    true
}

fn default_flush_interval() -> u64 {
    5000
}

fn default_collections() -> Vec<String> {
    collections::ALL.iter().map(|c| c.to_string()).collect()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist: default_persist(),
            flush_interval_ms: default_flush_interval(),
            collections: default_collections(),
        }
    }
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    }
}

impl StoreConfig {
    /// Data directory with `~` expanded
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    pub fn memory_store_config(&self) -> MemoryStoreConfig {
        MemoryStoreConfig {
            data_dir: self.persist.then(|| self.data_path()),
            flush_interval_ms: self.flush_interval_ms,
            collections: self.collections.clone(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Empty allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_connections")]
    pub max_ws_connections: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> usize {
    1000
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
            request_timeout_secs: default_request_timeout(),
            max_ws_connections: default_max_connections(),
        }
    }
}

/// Remote client configuration, used by the CLI
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default = "default_client_timeout")]
    pub request_timeout_ms: u64,
}

fn default_server_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_client_timeout() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_ms: default_client_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Also append plain-text logs here
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl LoggingConfig {
    /// Open the log file for appending, creating its directory
    pub fn open_file(&self) -> std::io::Result<Option<std::fs::File>> {
        let Some(file) = &self.file else {
            return Ok(None);
        };
        let path = expand_home(file);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map(Some)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Defaults plus environment variable overrides
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("kodigo").join("config.toml")),
            Some(PathBuf::from("/etc/kodigo/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = var("KODIGO_DATA_DIR") {
            self.store.data_dir = data_dir;
        }
        if let Some(persist) = var("KODIGO_PERSIST").and_then(|v| v.parse().ok()) {
            self.store.persist = persist;
        }

        if let Some(host) = var("KODIGO_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("KODIGO_API_PORT").and_then(|v| v.parse().ok()) {
            self.api.port = port;
        }

        if let Some(url) = var("KODIGO_SERVER_URL") {
            self.client.server_url = url;
        }

        if let Some(level) = var("KODIGO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("KODIGO_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(file) = var("KODIGO_LOG_FILE") {
            self.logging.file = Some(file);
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Kodigo Configuration
#
# Environment variables override these settings:
# - KODIGO_DATA_DIR
# - KODIGO_PERSIST
# - KODIGO_API_HOST
# - KODIGO_API_PORT
# - KODIGO_SERVER_URL
# - KODIGO_LOG_LEVEL
# - KODIGO_LOG_FORMAT
# - KODIGO_LOG_FILE

[store]
# Directory holding documents.json (a leading ~ is the home directory)
data_dir = "~/.local/share/kodigo"

# Keep documents across restarts
persist = true

# How often to flush documents to disk (ms)
flush_interval_ms = 5000

# Collections clients may use (empty allows any)
collections = ["todos", "appointments", "messages"]

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins (empty allows any)
cors_origins = ["http://localhost:3000", "http://127.0.0.1:3000"]

# Request timeout in seconds
request_timeout_secs = 30

# Maximum concurrent WebSocket connections
max_ws_connections = 1000

[client]
# Server the CLI talks to
server_url = "http://localhost:8090"

# Request timeout in milliseconds
request_timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file, appended to in plain text
# file = "/var/log/kodigo/kodigo.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_template_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.port, 8090);
        assert_eq!(config.store.collections.len(), 3);
        assert!(config.store.persist);
        assert_eq!(config.client.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.store.collections, vec!["todos", "appointments", "messages"]);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nport = 1").unwrap();

        match Config::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("KODIGO_API_PORT", "9000"),
            ("KODIGO_PERSIST", "false"),
            ("KODIGO_SERVER_URL", "http://example:1"),
            ("KODIGO_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.port, 9000);
        assert!(!config.store.persist);
        assert_eq!(config.client.server_url, "http://example:1");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_bad_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "KODIGO_API_PORT").then(|| "nope".to_string()));
        assert_eq!(config.api.port, 8090);
    }

    #[test]
    fn test_memory_store_config() {
        let mut store = StoreConfig {
            data_dir: "/tmp/kodigo".into(),
            ..Default::default()
        };
        let memory = store.memory_store_config();
        assert_eq!(memory.data_dir, Some(PathBuf::from("/tmp/kodigo")));
        assert_eq!(memory.collections.len(), 3);

        store.persist = false;
        assert!(store.memory_store_config().data_dir.is_none());
    }

    #[test]
    fn test_default_template_data_dir_is_absolute() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let data_dir = config.store.memory_store_config().data_dir.unwrap();
        assert!(data_dir.is_absolute());
        assert!(!data_dir.starts_with("~"));
        assert!(data_dir.ends_with(".local/share/kodigo"));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("~/kodigo"), home.join("kodigo"));
        assert_eq!(expand_home("/srv/kodigo"), PathBuf::from("/srv/kodigo"));
        assert_eq!(expand_home("~other/kodigo"), PathBuf::from("~other/kodigo"));
    }

    #[test]
    fn test_api_table_keeps_default_cors_origins() {
        let config = Config::parse("[api]\nport = 9000\n").unwrap();
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.cors_origins, ApiConfig::default().cors_origins);
        assert!(!config.api.cors_origins.is_empty());

        let open = Config::parse("[api]\ncors_origins = []\n").unwrap();
        assert!(open.api.cors_origins.is_empty());
    }

    #[test]
    fn test_log_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("kodigo.log");
        let logging = LoggingConfig {
            file: Some(path.to_string_lossy().to_string()),
            ..Default::default()
        };

        assert!(logging.open_file().unwrap().is_some());
        assert!(path.exists());
        assert!(LoggingConfig::default().open_file().unwrap().is_none());
    }
}
