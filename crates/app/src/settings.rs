//! Handles settings for the application. Configuration is written in
//! `settings.toml`.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

/// Remote balance-document store; omit the section to keep balances local.
#[derive(Debug, Deserialize)]
pub struct Remote {
    pub base_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Ingestion {
    #[serde(default)]
    pub allowed_senders: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    #[serde(default = "default_balance_file")]
    pub balance_file: String,
    pub remote: Option<Remote>,
    #[serde(default)]
    pub ingestion: Ingestion,
}

fn default_balance_file() -> String {
    "balance.json".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
