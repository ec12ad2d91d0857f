use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

use crate::config::{Config, ConfigError};
use crate::discovery::discovery_server::DiscoveryServer;
use crate::services::discovery::{DiscoveryGrpcService, DiscoveryService, http_impl};
use crate::services::registry::ServiceRegistry;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid listen address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

pub async fn start(config: Config) -> Result<(), ServerError> {
    // 初始化服务注册表
    let registry = Arc::new(ServiceRegistry::new(
        config.registry.strategy,
        config.sweeper_config(),
    ));
    let discovery = DiscoveryService::new(registry.clone());

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    tracing::info!(
        strategy = ?config.registry.strategy,
        heartbeat_ttl_secs = config.heartbeat_timeout().as_secs(),
        sweep_interval_secs = config.sweep_interval().as_secs(),
        "Discovery registry initialised"
    );

    let grpc = serve_grpc(&config, discovery.clone(), shutdown.clone());
    let http = serve_http(&config, discovery.clone(), shutdown.clone());
    let result = tokio::try_join!(grpc, http);

    // 任一传输层失败时通知另一方退出
    shutdown.cancel();
    registry.shutdown().await;
    tracing::info!("Discovery server stopped");

    result.map(|_| ())
}

async fn serve_grpc(
    config: &Config,
    discovery: DiscoveryService,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    if !config.server.enable_grpc {
        return Ok(());
    }
    let addr: SocketAddr = config.server.grpc_addr.parse()?;
    tracing::info!(addr = %addr, "gRPC server listening");

    let result = Server::builder()
        .add_service(DiscoveryServer::new(DiscoveryGrpcService::new(discovery)))
        .serve_with_shutdown(addr, shutdown.clone().cancelled_owned())
        .await;
    result.inspect_err(|_| shutdown.cancel())?;
    Ok(())
}

async fn serve_http(
    config: &Config,
    discovery: DiscoveryService,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    if !config.server.enable_http {
        return Ok(());
    }
    let addr: SocketAddr = config.server.http_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.inspect_err(|_| shutdown.cancel())?;
    tracing::info!(addr = %addr, "HTTP server listening");

    let result = axum::serve(listener, http_impl::router(discovery))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await;
    result.inspect_err(|_| shutdown.cancel())?;
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        shutdown.cancel();
    });
}
