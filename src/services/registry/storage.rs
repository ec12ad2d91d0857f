use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::multi_instance::MultiInstanceStorage;
use super::single_instance::SingleInstanceStorage;
use super::types::{RegistryError, ServiceEntity, ServiceId};

/// 注册表存储能力集，两种策略共用
///
/// 所有写操作（add / remove / update_heartbeat / evict_expired）持有写锁，
/// 读操作持有读锁并返回快照副本。
pub trait ServiceStorage: Send + Sync + Debug {
    /// 插入实例，违反唯一性约束时返回 `DuplicateRegistration`
    fn add(&self, entity: ServiceEntity) -> Result<(), RegistryError>;

    /// 删除同时匹配服务名和 ID 的实例
    fn remove(&self, name: &str, id: ServiceId) -> Result<ServiceEntity, RegistryError>;

    /// 按服务名解析一个实例
    fn get(&self, name: &str) -> Result<ServiceEntity, RegistryError>;

    fn get_by_id(&self, id: ServiceId) -> Result<ServiceEntity, RegistryError>;

    fn get_by_url(&self, address: &str) -> Result<ServiceEntity, RegistryError>;

    /// 注册表快照，每个服务名一个代表实例
    fn list(&self) -> Result<Vec<ServiceEntity>, RegistryError>;

    /// 在服务名范围内按地址定位实例并刷新心跳
    fn update_heartbeat(
        &self,
        name: &str,
        address: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError>;

    /// 一次写锁内移除所有心跳年龄 >= ttl 的实例，返回被移除的实例
    fn evict_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Vec<ServiceEntity>;

    /// 存活实例总数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 存储策略，在构建注册表时选定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageStrategy {
    /// 同一服务名下允许多个地址
    #[default]
    MultiInstance,
    /// 每个服务名只允许一个地址
    SingleInstance,
}

impl StorageStrategy {
    pub fn build(self) -> Arc<dyn ServiceStorage> {
        match self {
            StorageStrategy::MultiInstance => Arc::new(MultiInstanceStorage::default()),
            StorageStrategy::SingleInstance => Arc::new(SingleInstanceStorage::default()),
        }
    }
}

// 锁中毒不影响数据结构一致性（所有修改都在单步内完成），直接取回内部值
pub(super) fn read_state<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(super) fn write_state<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
