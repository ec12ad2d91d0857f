pub mod discovery;
pub mod registry;

pub use discovery::{DiscoveryGrpcService, DiscoveryService};
pub use registry::{ServiceRecord, ServiceRegistry, StorageStrategy};
