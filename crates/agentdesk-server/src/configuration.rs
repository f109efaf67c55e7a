use crate::error::{to_env_var, ConfigError};
use agentdesk::offload::DEFAULT_OFFLOAD_CAPACITY;
use agentdesk::Settings;
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Variables read from the process environment. Anything under `SERVER__`
/// is accepted as well.
const AGENT_ENV_VARS: &[&str] = &[
    "ELEVENLABS_API_KEY",
    "ELEVENLABS_AGENT_ID",
    "ELEVENLABS_BASE_URL",
    "ELEVENLABS_STT_MODEL",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "OPENAI_MODEL",
];

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default = "default_offload_capacity")]
    pub offload_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            offload_capacity: default_offload_capacity(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

#[derive(Debug)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub agent: Settings,
}

impl AppSettings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let source: config::Map<String, String> = vars
            .into_iter()
            .filter(|(key, _)| {
                AGENT_ENV_VARS.contains(&key.as_str()) || key.starts_with("SERVER__")
            })
            .collect();

        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("server.offload_capacity", DEFAULT_OFFLOAD_CAPACITY as i64)?
            .add_source(
                Environment::default()
                    .separator("__")
                    .source(Some(source)),
            )
            .build()?;

        let server: ServerSettings = config.get("server").map_err(explain)?;
        let agent: Settings = config.try_deserialize().map_err(explain)?;

        Ok(Self {
            server,
            agent: agent.normalized(),
        })
    }
}

fn explain(err: config::ConfigError) -> ConfigError {
    tracing::debug!("Configuration error: {:?}", &err);
    match err {
        config::ConfigError::NotFound(field) => ConfigError::InvalidEnvVar {
            env_var: to_env_var(&field),
        },
        config::ConfigError::Type {
            key: Some(key), ..
        } => ConfigError::InvalidEnvVar {
            env_var: to_env_var(&key),
        },
        other => ConfigError::Other(other),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_offload_capacity() -> usize {
    DEFAULT_OFFLOAD_CAPACITY
}
