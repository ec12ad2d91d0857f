use std::sync::Arc;

use chrono::Utc;

use crate::services::registry::{
    RegistryError, ServiceEntity, ServiceId, ServiceRecord, ServiceRegistry, prepare_url,
};

/// 注册表门面：将调用方的 (name, address, secure) 转换为注册表操作
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    registry: Arc<ServiceRegistry>,
}

impl DiscoveryService {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// 注册服务实例，返回新分配的 ID
    pub fn add_service(
        &self,
        name: &str,
        address: &str,
        secure: bool,
    ) -> Result<ServiceId, RegistryError> {
        let entity = ServiceEntity::new(name, prepare_url(address, secure));
        self.registry.add(entity).inspect_err(|e| {
            tracing::warn!(service_name = %name, address = %address, error = %e, "Registration rejected");
        })
    }

    /// 刷新 (name, address) 对应实例的心跳
    pub fn heart_beat(&self, name: &str, address: &str, secure: bool) -> Result<(), RegistryError> {
        let url = prepare_url(address, secure);
        self.registry
            .update_heartbeat(name, &url, Utc::now())
            .inspect_err(|e| {
                tracing::warn!(service_name = %name, address = %url, error = %e, "Heartbeat for unknown service");
            })
    }

    /// 每个服务名一个存活实例，按 (name, address) 排序
    pub fn list_services(&self) -> Result<Vec<ServiceRecord>, RegistryError> {
        let mut services: Vec<ServiceRecord> = self
            .registry
            .list()?
            .into_iter()
            .map(ServiceRecord::from)
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));
        Ok(services)
    }

    pub fn get_service(&self, name: &str) -> Result<ServiceRecord, RegistryError> {
        self.registry.get(name).map(ServiceRecord::from)
    }

    /// 停止注册表的后台清理任务
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}
