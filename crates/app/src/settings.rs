//! Handles settings for the application.
//!
//! Values are read from an optional `settings.toml` in the working directory
//! and then from `CALC__<SECTION>__<KEY>` environment variables, e.g.
//! `CALC__SERVER__PORT=9000` or `CALC__AUTH__SECRET=...`.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub bind: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: Database,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: None,
            port: default_port(),
            database: default_database(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Auth {
    pub secret: String,
    #[serde(default = "default_access_minutes")]
    pub access_token_expire_minutes: i64,
    #[serde(default = "default_refresh_days")]
    pub refresh_token_expire_days: i64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub auth: Auth,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(Environment::with_prefix("CALC").separator("__")),
        )
    }

    fn from_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        if settings.auth.secret.is_empty() {
            return Err(ConfigError::Message("auth.secret must not be empty".into()));
        }
        if settings.auth.access_token_expire_minutes <= 0
            || settings.auth.refresh_token_expire_days <= 0
        {
            return Err(ConfigError::Message(
                "token lifetimes must be positive".into(),
            ));
        }
        Ok(settings)
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_database() -> Database {
    Database::Memory
}

fn default_access_minutes() -> i64 {
    30
}

fn default_refresh_days() -> i64 {
    7
}
