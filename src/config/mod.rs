//! Configuration management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// E-utilities settings
    #[serde(default)]
    pub entrez: EntrezConfig,

    /// Snapshot/export file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Fetch behavior
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// NCBI E-utilities settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrezConfig {
    /// Base URL of the E-utilities endpoints
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Contact email sent with every request (NCBI usage policy)
    #[serde(default = "default_email")]
    pub email: String,

    /// API key (optional, raises the permitted request rate)
    #[serde(default = "default_api_key")]
    pub api_key: Option<String>,

    /// Tool name sent with every request
    #[serde(default = "default_tool")]
    pub tool: String,
}

impl Default for EntrezConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            email: default_email(),
            api_key: default_api_key(),
            tool: default_tool(),
        }
    }
}

/// Snapshot and derived-CSV file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot path
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Derived CSV path
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            csv_path: default_csv_path(),
        }
    }
}

/// Fetch behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// How many identifiers to request per search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Upstream request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

fn default_email() -> String {
    std::env::var("ENTREZ_EMAIL").unwrap_or_default()
}

fn default_api_key() -> Option<String> {
    std::env::var("NCBI_API_KEY").ok()
}

fn default_tool() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("papers.json")
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("exported_papers.csv")
}

fn default_max_results() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    10
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("PUBMED_FETCHER"))
        .build()?;

    settings.try_deserialize()
}

/// Search the default locations for a configuration file.
///
/// Checks `./pubmed-fetcher.toml` first, then the user config directory.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("pubmed-fetcher.toml");
    if local.exists() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("pubmed-fetcher").join("config.toml");
    user.exists().then_some(user)
}
