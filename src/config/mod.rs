//! Configuration module

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub discord: Option<DiscordConfig>,
    /// Legacy static account block, imported once into a config entry
    pub seventeentrack: Option<LegacyPlatformConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
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

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_user_url")]
    pub user_url: String,
    #[serde(default = "default_buyer_url")]
    pub buyer_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            user_url: default_user_url(),
            buyer_url: default_buyer_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_entries_path")]
    pub entries_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            entries_path: default_entries_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPlatformConfig {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub show_archived: bool,
    #[serde(default)]
    pub show_delivered: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8123
}

fn default_user_url() -> String {
    "https://user.17track.net/userapi/call".to_string()
}

fn default_buyer_url() -> String {
    "https://buyer.17track.net/orderapi/call".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// 10 minutes
fn default_scan_interval() -> u64 {
    600
}

fn default_entries_path() -> String {
    "data/entries.json".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("SEVENTEENTRACK").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;

        if config.polling.scan_interval_secs == 0 {
            anyhow::bail!("polling.scan_interval_secs must be greater than zero");
        }

        Ok(config)
    }

    pub fn scan_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.polling.scan_interval_secs)
    }
}
