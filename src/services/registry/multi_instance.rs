use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;

use super::storage::{ServiceStorage, read_state, write_state};
use super::types::{RegistryError, ServiceEntity, ServiceId};

#[derive(Debug, Default)]
struct MultiInstanceState {
    // 服务名 -> 实例列表
    buckets: HashMap<String, Vec<ServiceEntity>>,
    // 服务 ID -> 服务名
    names_by_id: HashMap<ServiceId, String>,
}

impl MultiInstanceState {
    fn take(&mut self, name: &str, id: ServiceId) -> Option<ServiceEntity> {
        let bucket = self.buckets.get_mut(name)?;
        let index = bucket.iter().position(|entity| entity.id() == id)?;
        let entity = bucket.swap_remove(index);
        if bucket.is_empty() {
            self.buckets.remove(name);
        }
        self.names_by_id.remove(&id);
        Some(entity)
    }
}

/// 多实例存储：服务名 -> 实例列表，`(name, address)` 唯一
#[derive(Debug, Default)]
pub struct MultiInstanceStorage {
    state: RwLock<MultiInstanceState>,
}

impl ServiceStorage for MultiInstanceStorage {
    fn add(&self, entity: ServiceEntity) -> Result<(), RegistryError> {
        let mut state = write_state(&self.state);
        let duplicate = state
            .buckets
            .get(entity.name())
            .is_some_and(|bucket| bucket.iter().any(|saved| saved.address() == entity.address()));
        if duplicate {
            return Err(RegistryError::DuplicateRegistration {
                name: entity.name().to_string(),
                address: entity.address().to_string(),
            });
        }

        state
            .names_by_id
            .insert(entity.id(), entity.name().to_string());
        state
            .buckets
            .entry(entity.name().to_string())
            .or_default()
            .push(entity);
        Ok(())
    }

    fn remove(&self, name: &str, id: ServiceId) -> Result<ServiceEntity, RegistryError> {
        write_state(&self.state)
            .take(name, id)
            .ok_or_else(|| RegistryError::NotFound(format!("{name} with id {id}")))
    }

    fn get(&self, name: &str) -> Result<ServiceEntity, RegistryError> {
        let state = read_state(&self.state);
        state
            .buckets
            .get(name)
            .and_then(|bucket| bucket.choose(&mut rand::thread_rng()))
            .cloned()
            .ok_or_else(|| RegistryError::EmptyGroup {
                name: name.to_string(),
            })
    }

    fn get_by_id(&self, id: ServiceId) -> Result<ServiceEntity, RegistryError> {
        let state = read_state(&self.state);
        state
            .names_by_id
            .get(&id)
            .and_then(|name| state.buckets.get(name))
            .and_then(|bucket| bucket.iter().find(|entity| entity.id() == id))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("id {id}")))
    }

    fn get_by_url(&self, address: &str) -> Result<ServiceEntity, RegistryError> {
        let state = read_state(&self.state);
        state
            .buckets
            .values()
            .flatten()
            .find(|entity| entity.address() == address)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(format!("url {address}")))
    }

    fn list(&self) -> Result<Vec<ServiceEntity>, RegistryError> {
        let state = read_state(&self.state);
        let mut rng = rand::thread_rng();
        let services: Vec<ServiceEntity> = state
            .buckets
            .values()
            .filter_map(|bucket| bucket.choose(&mut rng).cloned())
            .collect();

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
        let mut state = write_state(&self.state);
        let entity = state
            .buckets
            .get_mut(name)
            .and_then(|bucket| bucket.iter_mut().find(|entity| entity.address() == address))
            .ok_or_else(|| RegistryError::NotFound(format!("{name} at {address}")))?;

        entity.touch(at);
        tracing::debug!(
            service_name = %name,
            address = %address,
            service_id = %entity.id(),
            "Updated heartbeat"
        );
        Ok(())
    }

    fn evict_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Vec<ServiceEntity> {
        let mut state = write_state(&self.state);
        let mut evicted = Vec::new();

        for bucket in state.buckets.values_mut() {
            let (expired, alive): (Vec<_>, Vec<_>) = bucket
                .drain(..)
                .partition(|entity| entity.is_expired(ttl, now));
            *bucket = alive;
            evicted.extend(expired);
        }

        state.buckets.retain(|_, bucket| !bucket.is_empty());
        for entity in &evicted {
            state.names_by_id.remove(&entity.id());
        }
        evicted
    }

    fn len(&self) -> usize {
        read_state(&self.state).names_by_id.len()
    }
}
