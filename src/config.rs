use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::services::registry::{StorageStrategy, SweeperConfig};

pub const CONFIG_PATH_ENV: &str = "DISCOVERY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const ENV_PREFIX: &str = "DISCOVERY_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid environment override: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub grpc_addr: String,
    pub http_addr: String,
    pub enable_grpc: bool,
    pub enable_http: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: "0.0.0.0:7654".to_string(),
            http_addr: "0.0.0.0:7655".to_string(),
            enable_grpc: true,
            enable_http: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub strategy: StorageStrategy,
    /// 心跳超时秒数
    pub heartbeat_ttl: u64,
    /// 清理间隔秒数，未设置时等于 heartbeat_ttl
    pub sweep_interval: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strategy: StorageStrategy::default(),
            heartbeat_ttl: 90,
            sweep_interval: None,
        }
    }
}

// DISCOVERY_* 环境变量覆盖项
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    grpc_addr: Option<String>,
    http_addr: Option<String>,
    strategy: Option<StorageStrategy>,
    heartbeat_ttl: Option<u64>,
    sweep_interval: Option<u64>,
}

impl Config {
    /// 加载 .env、配置文件和环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }

    /// 应用带 DISCOVERY_ 前缀的变量
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_iter(vars)?;

        if let Some(grpc_addr) = overrides.grpc_addr {
            self.server.grpc_addr = grpc_addr;
        }
        if let Some(http_addr) = overrides.http_addr {
            self.server.http_addr = http_addr;
        }
        if let Some(strategy) = overrides.strategy {
            self.registry.strategy = strategy;
        }
        if let Some(ttl) = overrides.heartbeat_ttl {
            self.registry.heartbeat_ttl = ttl;
        }
        if overrides.sweep_interval.is_some() {
            self.registry.sweep_interval = overrides.sweep_interval;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.heartbeat_ttl == 0 {
            return Err(ConfigError::Invalid("heartbeat_ttl must be greater than 0".into()));
        }
        if self.registry.sweep_interval == Some(0) {
            return Err(ConfigError::Invalid("sweep_interval must be greater than 0".into()));
        }
        if !self.server.enable_grpc && !self.server.enable_http {
            return Err(ConfigError::Invalid("at least one of gRPC or HTTP must be enabled".into()));
        }
        Ok(())
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.heartbeat_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        self.registry
            .sweep_interval
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.heartbeat_timeout())
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            ttl: self.heartbeat_timeout(),
            interval: self.sweep_interval(),
        }
    }
}
