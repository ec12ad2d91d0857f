//! Discovery module
//!
//! Caller-facing surface of the registry:
//! - `service`: the `DiscoveryService` facade
//! - `types`: request payloads and wire formats
//! - `grpc_impl`: tonic `Discovery` implementation
//! - `http_impl`: axum routes

pub mod grpc_impl;
pub mod http_impl;
pub mod service;
pub mod types;

pub use grpc_impl::DiscoveryGrpcService;
pub use service::DiscoveryService;
pub use types::{RegistrationRequest, TIME_FORMAT};
