use std::{net::SocketAddr, path::PathBuf};

use config::{Config, ConfigError};
use serde::Deserialize;

use crate::domain::customer::IdPolicy;

pub mod domain;
pub mod infrastructure;
pub mod service;

#[derive(Clone, Debug, Deserialize)]
pub struct ClientesConfig {
    pub server: Server,
    pub store: Store,
    pub logger: Logger,
}

impl ClientesConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(config::File::with_name("clientes.toml").required(false))
            .add_source(config::Environment::with_prefix("CLIENTES").separator("__"))
            .build()?
            .try_deserialize::<ClientesConfig>()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.addr", "0.0.0.0:3001")?
            .set_default("store.path", "clientes.json")?
            .set_default("store.id_policy", "sequence")?
            .set_default("logger.level", "INFO")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    pub addr: SocketAddr,
    pub tls: Option<Tls>,
}

/// PEM形式の証明書と秘密鍵
#[derive(Clone, Debug, Deserialize)]
pub struct Tls {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Store {
    pub path: PathBuf,
    pub id_policy: IdPolicy,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}
