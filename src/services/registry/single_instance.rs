use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::storage::{ServiceStorage, read_state, write_state};
use super::types::{RegistryError, ServiceEntity, ServiceId};

/// 单实例存储：每个服务名只保留一个地址
#[derive(Debug, Default)]
pub struct SingleInstanceStorage {
    services: RwLock<HashMap<String, ServiceEntity>>,
}

impl ServiceStorage for SingleInstanceStorage {
    fn add(&self, entity: ServiceEntity) -> Result<(), RegistryError> {
        let mut services = write_state(&self.services);
        if let Some(saved) = services.get(entity.name()) {
            return Err(RegistryError::DuplicateRegistration {
                name: saved.name().to_string(),
                address: saved.address().to_string(),
            });
        }
        services.insert(entity.name().to_string(), entity);
        Ok(())
    }

    fn remove(&self, name: &str, id: ServiceId) -> Result<ServiceEntity, RegistryError> {
        let mut services = write_state(&self.services);
        if !services.get(name).is_some_and(|saved| saved.id() == id) {
            return Err(RegistryError::NotFound(format!("{name} with id {id}")));
        }
        services
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(format!("{name} with id {id}")))
    }

    fn get(&self, name: &str) -> Result<ServiceEntity, RegistryError> {
        read_state(&self.services)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    fn get_by_id(&self, id: ServiceId) -> Result<ServiceEntity, RegistryError> {
        read_state(&self.services)
            .values()
            .find(|entity| entity.id() == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("id {id}")))
    }

    fn get_by_url(&self, address: &str) -> Result<ServiceEntity, RegistryError> {
        read_state(&self.services)
            .values()
            .find(|entity| entity.address() == address)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("url {address}")))
    }

    fn list(&self) -> Result<Vec<ServiceEntity>, RegistryError> {
        let services: Vec<ServiceEntity> = read_state(&self.services).values().cloned().collect();
        if services.is_empty() {
            return Err(RegistryError::EmptyRegistry);
        }
        Ok(services)
    }

    fn update_heartbeat(
        &self,
        name: &str,
        address: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let mut services = write_state(&self.services);
        match services.get_mut(name) {
            Some(entity) if entity.address() == address => {
                entity.touch(at);
                tracing::debug!(
                    service_name = %name,
                    address = %address,
                    service_id = %entity.id(),
                    "Updated heartbeat"
                );
                Ok(())
            }
            _ => Err(RegistryError::NotFound(format!("{name} at {address}"))),
        }
    }

    fn evict_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Vec<ServiceEntity> {
        let mut services = write_state(&self.services);
        let expired: Vec<String> = services
            .iter()
            .filter(|(_, entity)| entity.is_expired(ttl, now))
            .map(|(name, _)| name.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|name| services.remove(&name))
            .collect()
    }

    fn len(&self) -> usize {
        read_state(&self.services).len()
    }
}
