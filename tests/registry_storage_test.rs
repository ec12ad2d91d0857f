use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use discovery_server::services::registry::{
    RegistryError, ServiceEntity, ServiceStorage, StorageStrategy,
};

fn multi() -> Arc<dyn ServiceStorage> {
    StorageStrategy::MultiInstance.build()
}

fn single() -> Arc<dyn ServiceStorage> {
    StorageStrategy::SingleInstance.build()
}

#[test]
fn test_multi_instance_allows_shared_name() {
    let storage = multi();
    let first = ServiceEntity::new("orders", "http://host1:8080");
    let second = ServiceEntity::new("orders", "http://host2:8080");
    let first_id = first.id();
    let second_id = second.id();

    storage.add(first).expect("first instance should register");
    storage.add(second).expect("second instance should register");

    assert_eq!(storage.len(), 2);
    assert_ne!(first_id, second_id);
    assert_eq!(storage.get_by_id(first_id).unwrap().address(), "http://host1:8080");
    assert_eq!(storage.get_by_id(second_id).unwrap().address(), "http://host2:8080");
}

#[test]
fn test_multi_instance_rejects_duplicate_pair() {
    let storage = multi();
    storage
        .add(ServiceEntity::new("orders", "http://host1:8080"))
        .unwrap();

    let result = storage.add(ServiceEntity::new("orders", "http://host1:8080"));
    assert_eq!(
        result,
        Err(RegistryError::DuplicateRegistration {
            name: "orders".to_string(),
            address: "http://host1:8080".to_string(),
        })
    );
    assert_eq!(storage.len(), 1);

    // 同一地址注册到其他服务名是允许的
    storage
        .add(ServiceEntity::new("billing", "http://host1:8080"))
        .unwrap();
    assert_eq!(storage.len(), 2);
}

#[test]
fn test_multi_instance_get_selects_randomly() {
    let storage = multi();
    storage.add(ServiceEntity::new("orders", "http://host1:8080")).unwrap();
    storage.add(ServiceEntity::new("orders", "http://host2:8080")).unwrap();

    let seen: HashSet<String> = (0..200)
        .map(|_| storage.get("orders").unwrap().address().to_string())
        .collect();

    assert_eq!(seen.len(), 2, "both instances should be selected over repeated calls");
}

#[test]
fn test_multi_instance_get_unknown_name_is_empty_group() {
    let storage = multi();
    assert_eq!(
        storage.get("missing").unwrap_err(),
        RegistryError::EmptyGroup {
            name: "missing".to_string()
        }
    );
}

#[test]
fn test_multi_instance_list_one_per_name() {
    let storage = multi();
    assert_eq!(storage.list().unwrap_err(), RegistryError::EmptyRegistry);

    storage.add(ServiceEntity::new("orders", "http://host1:8080")).unwrap();
    storage.add(ServiceEntity::new("orders", "http://host2:8080")).unwrap();
    storage.add(ServiceEntity::new("billing", "http://host3:8080")).unwrap();

    let services = storage.list().unwrap();
    let names: HashSet<&str> = services.iter().map(|entity| entity.name()).collect();
    assert_eq!(services.len(), 2);
    assert_eq!(names, HashSet::from(["orders", "billing"]));
}

#[test]
fn test_remove_deletes_only_target() {
    let storage = multi();
    let keep = ServiceEntity::new("orders", "http://host1:8080");
    let target = ServiceEntity::new("orders", "http://host2:8080");
    let keep_id = keep.id();
    let target_id = target.id();
    storage.add(keep).unwrap();
    storage.add(target).unwrap();

    // 服务名不匹配时不删除
    assert!(matches!(
        storage.remove("billing", target_id),
        Err(RegistryError::NotFound(_))
    ));

    let removed = storage.remove("orders", target_id).unwrap();
    assert_eq!(removed.id(), target_id);
    assert_eq!(storage.len(), 1);
    assert!(storage.get_by_id(target_id).is_err());
    assert!(storage.get_by_id(keep_id).is_ok());

    let listed = storage.list().unwrap();
    assert!(listed.iter().all(|entity| entity.id() != target_id));

    assert!(matches!(
        storage.remove("orders", target_id),
        Err(RegistryError::NotFound(_))
    ));
}

#[test]
fn test_get_by_url() {
    for storage in [multi(), single()] {
        storage.add(ServiceEntity::new("orders", "https://host1:8443")).unwrap();

        let found = storage.get_by_url("https://host1:8443").unwrap();
        assert_eq!(found.name(), "orders");
        assert!(matches!(
            storage.get_by_url("http://host1:8443"),
            Err(RegistryError::NotFound(_))
        ));
    }
}

#[test]
fn test_heartbeat_is_monotonic() {
    for storage in [multi(), single()] {
        let entity = ServiceEntity::new("orders", "http://host1:8080");
        let id = entity.id();
        let registered_at = entity.last_heartbeat();
        storage.add(entity).unwrap();

        let later = registered_at + chrono::Duration::seconds(5);
        storage.update_heartbeat("orders", "http://host1:8080", later).unwrap();
        assert_eq!(storage.get_by_id(id).unwrap().last_heartbeat(), later);

        let earlier = registered_at - chrono::Duration::seconds(5);
        storage.update_heartbeat("orders", "http://host1:8080", earlier).unwrap();
        assert_eq!(storage.get_by_id(id).unwrap().last_heartbeat(), later);
    }
}

#[test]
fn test_heartbeat_resolves_by_address_within_name() {
    for storage in [multi(), single()] {
        storage.add(ServiceEntity::new("orders", "http://host1:8080")).unwrap();

        let now = Utc::now();
        assert!(matches!(
            storage.update_heartbeat("orders", "http://host9:8080", now),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            storage.update_heartbeat("billing", "http://host1:8080", now),
            Err(RegistryError::NotFound(_))
        ));
        assert!(storage.update_heartbeat("orders", "http://host1:8080", now).is_ok());
    }
}

#[test]
fn test_single_instance_rejects_same_name() {
    let storage = single();
    storage.add(ServiceEntity::new("orders", "http://host1:8080")).unwrap();

    let result = storage.add(ServiceEntity::new("orders", "http://host2:8080"));
    assert!(matches!(
        result,
        Err(RegistryError::DuplicateRegistration { ref name, .. }) if name == "orders"
    ));
    assert_eq!(storage.len(), 1);
    assert_eq!(storage.get("orders").unwrap().address(), "http://host1:8080");
    assert!(matches!(storage.get("billing"), Err(RegistryError::NotFound(_))));
}

#[test]
fn test_single_instance_remove_requires_matching_id() {
    let storage = single();
    let entity = ServiceEntity::new("orders", "http://host1:8080");
    let id = entity.id();
    storage.add(entity).unwrap();

    let other = ServiceEntity::new("orders", "http://host1:8080").id();
    assert!(storage.remove("orders", other).is_err());
    assert_eq!(storage.len(), 1);

    storage.remove("orders", id).unwrap();
    assert!(storage.is_empty());
    assert_eq!(storage.list().unwrap_err(), RegistryError::EmptyRegistry);
}

#[test]
fn test_evict_expired_uses_inclusive_ttl() {
    for storage in [multi(), single()] {
        let now = Utc::now();
        let ttl = Duration::from_secs(90);

        let stale = ServiceEntity::with_heartbeat("stale", "http://host1:8080", now - chrono::Duration::seconds(90));
        let fresh = ServiceEntity::with_heartbeat("fresh", "http://host2:8080", now - chrono::Duration::seconds(89));
        let future = ServiceEntity::with_heartbeat("skewed", "http://host3:8080", now + chrono::Duration::seconds(30));
        let stale_id = stale.id();
        storage.add(stale).unwrap();
        storage.add(fresh).unwrap();
        storage.add(future).unwrap();

        let evicted = storage.evict_expired(ttl, now);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id(), stale_id);
        assert_eq!(storage.len(), 2);
        assert!(storage.get_by_id(stale_id).is_err());

        // 再次清理不会重复移除
        assert!(storage.evict_expired(ttl, now).is_empty());
    }
}

#[test]
fn test_evict_drops_empty_buckets() {
    let storage = multi();
    let old = Utc::now() - chrono::Duration::seconds(120);
    storage
        .add(ServiceEntity::with_heartbeat("orders", "http://host1:8080", old))
        .unwrap();
    storage
        .add(ServiceEntity::with_heartbeat("orders", "http://host2:8080", old))
        .unwrap();

    let evicted = storage.evict_expired(Duration::from_secs(60), Utc::now());
    assert_eq!(evicted.len(), 2);
    assert!(storage.is_empty());
    assert_eq!(storage.list().unwrap_err(), RegistryError::EmptyRegistry);
    assert!(matches!(storage.get("orders"), Err(RegistryError::EmptyGroup { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_not_lost() {
    let storage = multi();
    let count = 64;

    let handles: Vec<_> = (0..count)
        .map(|i| {
            let storage = storage.clone();
            tokio::spawn(async move {
                storage.add(ServiceEntity::new("orders", format!("http://host{i}:8080")))
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task panicked").expect("add should succeed");
    }

    assert_eq!(storage.len(), count);
}
