use tonic::{Request, Response, Status};

use super::service::DiscoveryService;
use super::types::{RegistrationRequest, TIME_FORMAT};
use crate::discovery::{
    Empty, GetServiceRequest, ListServiceResponse, Service, ServiceWithHeartBeat,
    discovery_server::Discovery,
};
use crate::services::registry::{RegistryError, ServiceRecord};

/// gRPC 传输层，仅负责请求转换与状态码映射
#[derive(Debug, Clone)]
pub struct DiscoveryGrpcService {
    discovery: DiscoveryService,
}

impl DiscoveryGrpcService {
    pub fn new(discovery: DiscoveryService) -> Self {
        Self { discovery }
    }
}

impl From<RegistryError> for Status {
    fn from(error: RegistryError) -> Self {
        if error.is_not_found() {
            Status::not_found(error.to_string())
        } else {
            Status::already_exists(error.to_string())
        }
    }
}

impl From<ServiceRecord> for ServiceWithHeartBeat {
    fn from(record: ServiceRecord) -> Self {
        Self {
            last_heart_beat: record.last_heartbeat.format(TIME_FORMAT).to_string(),
            name: record.name,
            url: record.address,
        }
    }
}

// 为结构体实现 gRPC 服务 trait
#[tonic::async_trait]
impl Discovery for DiscoveryGrpcService {
    async fn add_service(&self, request: Request<Service>) -> Result<Response<Empty>, Status> {
        let req = RegistrationRequest::from(request.into_inner());
        tracing::info!(
            service_name = %req.name,
            address = %req.url,
            secure = req.secure,
            "Processing service registration"
        );

        self.discovery.add_service(&req.name, &req.url, req.secure)?;
        Ok(Response::new(Empty {}))
    }

    async fn heart_beat(&self, request: Request<Service>) -> Result<Response<Empty>, Status> {
        let req = RegistrationRequest::from(request.into_inner());
        tracing::debug!(service_name = %req.name, address = %req.url, "Processing heartbeat");

        self.discovery.heart_beat(&req.name, &req.url, req.secure)?;
        Ok(Response::new(Empty {}))
    }

    async fn list_services(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<ListServiceResponse>, Status> {
        tracing::debug!("Processing list request for all registered services");

        let services = self
            .discovery
            .list_services()?
            .into_iter()
            .map(ServiceWithHeartBeat::from)
            .collect();
        Ok(Response::new(ListServiceResponse { services }))
    }

    async fn get_service(
        &self,
        request: Request<GetServiceRequest>,
    ) -> Result<Response<ServiceWithHeartBeat>, Status> {
        let service_name = request.into_inner().service_name;
        if service_name.is_empty() {
            return Err(Status::invalid_argument("service_name is mandatory"));
        }
        tracing::debug!(service_name = %service_name, "Processing service lookup");

        let record = self.discovery.get_service(&service_name)?;
        Ok(Response::new(record.into()))
    }
}
