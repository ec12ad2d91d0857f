use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::service::DiscoveryService;
use super::types::{RegistrationRequest, ServiceQuery};
use crate::services::registry::{RegistryError, ServiceRecord};

/// HTTP 层错误
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{0} parameter is mandatory")]
    MissingParameter(&'static str),
}

impl HttpError {
    fn status_code(&self) -> StatusCode {
        match self {
            HttpError::Registry(error) if error.is_not_found() => StatusCode::NOT_FOUND,
            HttpError::Registry(_) => StatusCode::CONFLICT,
            HttpError::MissingParameter(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// 构建 HTTP 路由
pub fn router(discovery: DiscoveryService) -> Router {
    Router::new()
        .route("/register", post(add_service))
        .route("/heartbeat", post(heart_beat))
        .route("/list", get(list_services))
        .route("/service", get(get_service))
        .layer(TraceLayer::new_for_http())
        .with_state(discovery)
}

async fn add_service(
    State(discovery): State<DiscoveryService>,
    Json(req): Json<RegistrationRequest>,
) -> Result<StatusCode, HttpError> {
    tracing::info!(service_name = %req.name, address = %req.url, "Registering service over HTTP");
    discovery.add_service(&req.name, &req.url, req.secure)?;
    Ok(StatusCode::CREATED)
}

async fn heart_beat(
    State(discovery): State<DiscoveryService>,
    Json(req): Json<RegistrationRequest>,
) -> Result<StatusCode, HttpError> {
    tracing::debug!(service_name = %req.name, address = %req.url, "Heartbeat over HTTP");
    discovery.heart_beat(&req.name, &req.url, req.secure)?;
    Ok(StatusCode::OK)
}

async fn list_services(
    State(discovery): State<DiscoveryService>,
) -> Result<Json<Vec<ServiceRecord>>, HttpError> {
    Ok(Json(discovery.list_services()?))
}

async fn get_service(
    State(discovery): State<DiscoveryService>,
    Query(query): Query<ServiceQuery>,
) -> Result<Json<ServiceRecord>, HttpError> {
    let service_name = query
        .service_name
        .filter(|name| !name.is_empty())
        .ok_or(HttpError::MissingParameter("serviceName"))?;

    let record = discovery.get_service(&service_name).inspect_err(|_| {
        tracing::debug!(service_name = %service_name, "Service isn't registered");
    })?;
    Ok(Json(record))
}
