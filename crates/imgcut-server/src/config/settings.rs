use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use imgcut_core::RegistryConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// One sub-directory per session is created under this root
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// 0 disables idle expiry
    pub idle_timeout_secs: u64,
    pub cookie_name: String,
    pub cookie_max_age_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_upload_bytes: 32 * 1024 * 1024,
            },
            storage: StorageConfig {
                root: PathBuf::from("temp"),
            },
            session: SessionConfig {
                idle_timeout_secs: 300,
                cookie_name: "SESSID".to_string(),
                cookie_max_age_secs: 300,
            },
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Settings::default();
        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", u64::from(defaults.server.port))?
            .set_default("server.max_upload_bytes", defaults.server.max_upload_bytes as u64)?
            .set_default("storage.root", defaults.storage.root.to_string_lossy().into_owned())?
            .set_default("session.idle_timeout_secs", defaults.session.idle_timeout_secs)?
            .set_default("session.cookie_name", defaults.session.cookie_name)?
            .set_default("session.cookie_max_age_secs", defaults.session.cookie_max_age_secs)?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        let config = RegistryConfig::new(self.storage.root.clone());
        match self.session.idle_timeout_secs {
            0 => config,
            secs => config.with_idle_timeout(Duration::from_secs(secs)),
        }
    }
}
