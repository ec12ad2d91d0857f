use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::storage::{ServiceStorage, StorageStrategy};
use super::sweeper::{LivenessSweeper, SweeperConfig};
use super::types::{RegistryError, ServiceEntity, ServiceId};

/// 服务注册表：存储策略 + 存活清理任务
///
/// 首次 `add` 时启动清理任务，`shutdown` 或析构时停止。
#[derive(Debug)]
pub struct ServiceRegistry {
    strategy: StorageStrategy,
    storage: Arc<dyn ServiceStorage>,
    sweeper: LivenessSweeper,
}

impl ServiceRegistry {
    pub fn new(strategy: StorageStrategy, sweeper_config: SweeperConfig) -> Self {
        Self {
            strategy,
            storage: strategy.build(),
            sweeper: LivenessSweeper::new(sweeper_config),
        }
    }

    pub fn strategy(&self) -> StorageStrategy {
        self.strategy
    }

    pub fn sweeper(&self) -> &LivenessSweeper {
        &self.sweeper
    }

    // 注册服务
    pub fn add(&self, entity: ServiceEntity) -> Result<ServiceId, RegistryError> {
        let id = entity.id();
        let name = entity.name().to_string();
        let address = entity.address().to_string();

        self.storage.add(entity)?;
        self.sweeper.ensure_started(self.storage.clone());

        tracing::info!(
            service_name = %name,
            address = %address,
            service_id = %id,
            "Registered service"
        );
        Ok(id)
    }

    // 注销服务
    pub fn remove(&self, name: &str, id: ServiceId) -> Result<ServiceEntity, RegistryError> {
        let removed = self.storage.remove(name, id)?;
        tracing::info!(
            service_name = %name,
            service_id = %id,
            address = %removed.address(),
            "Unregistered service"
        );
        Ok(removed)
    }

    pub fn get(&self, name: &str) -> Result<ServiceEntity, RegistryError> {
        self.storage.get(name)
    }

    pub fn get_by_id(&self, id: ServiceId) -> Result<ServiceEntity, RegistryError> {
        self.storage.get_by_id(id)
    }

    pub fn get_by_url(&self, address: &str) -> Result<ServiceEntity, RegistryError> {
        self.storage.get_by_url(address)
    }

    pub fn list(&self) -> Result<Vec<ServiceEntity>, RegistryError> {
        self.storage.list()
    }

    pub fn update_heartbeat(
        &self,
        name: &str,
        address: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        self.storage.update_heartbeat(name, address, at)
    }

    /// 立即执行一次清理，返回被移除的实例数
    pub fn sweep_now(&self) -> usize {
        LivenessSweeper::sweep(self.storage.as_ref(), self.sweeper.config().ttl)
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// 停止清理任务并等待其退出
    pub async fn shutdown(&self) {
        self.sweeper.shutdown().await;
    }
}
