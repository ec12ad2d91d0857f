//! Registry module
//!
//! In-memory service registry split into logical components:
//! - `types`: service entity, caller-facing record and error types
//! - `storage`: storage capability trait and strategy selection
//! - `multi_instance` / `single_instance`: the two storage strategies
//! - `sweeper`: heartbeat-driven liveness sweeper
//! - `service`: registry instance tying storage to the sweeper lifecycle

pub mod multi_instance;
pub mod service;
pub mod single_instance;
pub mod storage;
pub mod sweeper;
pub mod types;

// Re-export public types for easier access
pub use service::ServiceRegistry;
pub use storage::{ServiceStorage, StorageStrategy};
pub use sweeper::{LivenessSweeper, MIN_SWEEP_INTERVAL, SweeperConfig};
pub use types::{RegistryError, ServiceEntity, ServiceId, ServiceRecord, prepare_url};
