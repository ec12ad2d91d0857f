use serde::{Deserialize, Serialize};

use crate::discovery;

/// gRPC 时间戳文本格式
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z %Z";

// 注册与心跳请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub secure: bool,
}

impl From<discovery::Service> for RegistrationRequest {
    fn from(service: discovery::Service) -> Self {
        Self {
            name: service.name,
            url: service.url,
            secure: service.secure,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceQuery {
    #[serde(rename = "serviceName", default)]
    pub service_name: Option<String>,
}
