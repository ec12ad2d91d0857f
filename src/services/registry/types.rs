use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const HTTPS: &str = "https://";
pub const HTTP: &str = "http://";

/// 服务实例的唯一标识，由注册表在创建时分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(Uuid);

impl ServiceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// 注册表中存储的服务实例
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEntity {
    id: ServiceId,
    name: String,
    address: String,
    last_heartbeat: DateTime<Utc>,
}

impl ServiceEntity {
    /// 以当前时间作为首次心跳创建新实例，地址需已带协议前缀
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self::with_heartbeat(name, address, Utc::now())
    }

    pub fn with_heartbeat(
        name: impl Into<String>,
        address: impl Into<String>,
        last_heartbeat: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ServiceId::new(),
            name: name.into(),
            address: address.into(),
            last_heartbeat,
        }
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn last_heartbeat(&self) -> DateTime<Utc> {
        self.last_heartbeat
    }

    // 心跳时间只进不退
    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_heartbeat {
            self.last_heartbeat = at;
        }
    }

    /// 当前时刻下距离上次心跳的时长，时钟回拨时视为 0
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.last_heartbeat).to_std().unwrap_or_default()
    }

    pub fn is_expired(&self, ttl: std::time::Duration, now: DateTime<Utc>) -> bool {
        self.age(now) >= ttl
    }
}

/// 对外暴露的服务视图，不包含内部 ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    #[serde(rename = "url")]
    pub address: String,
    #[serde(rename = "lastHeartBeat")]
    pub last_heartbeat: DateTime<Utc>,
}

impl From<ServiceEntity> for ServiceRecord {
    fn from(entity: ServiceEntity) -> Self {
        Self {
            name: entity.name,
            address: entity.address,
            last_heartbeat: entity.last_heartbeat,
        }
    }
}

/// 根据 secure 标志为地址加上协议前缀
pub fn prepare_url(address: &str, secure: bool) -> String {
    if secure {
        format!("{HTTPS}{address}")
    } else {
        format!("{HTTP}{address}")
    }
}

/// 注册表错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Service {name} already registered at {address}")]
    DuplicateRegistration { name: String, address: String },

    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("No live instances registered for service: {name}")]
    EmptyGroup { name: String },

    #[error("Registry is empty")]
    EmptyRegistry,
}

impl RegistryError {
    /// 查询未命中类错误，传输层统一映射为 404 / NOT_FOUND
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotFound(_) | RegistryError::EmptyGroup { .. } | RegistryError::EmptyRegistry
        )
    }
}
