use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinSet;
use tonic::transport::Server;
use tonic_health::server::health_reporter;
use tracing::info;

use blog_service::config::Config;
use blog_service::events::{spawn_event_logger, ChannelEventSink};
use blog_service::grpc::blog::blog_service_server::BlogServiceServer;
use blog_service::grpc::{BlogServiceImpl, RequestLoggingLayer};
use blog_service::metrics::{serve_metrics, POSTS_STORED};
use blog_service::services::PostStore;
use blog_service::telemetry::{init_tracing, shutdown_tracing};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration before logging so LOG_FORMAT can shape the subscriber
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(
        "blog-service",
        "blog_service=info,info",
        config.logging.format,
        &config.tracing,
    )?;

    let result = run(config).await;

    // Flush buffered spans whether the servers stopped cleanly or not
    shutdown_tracing();
    result
}

async fn run(config: Config) -> Result<()> {
    info!(
        env = %config.app.env,
        http_port = config.app.http_port,
        grpc_port = config.grpc.port,
        "Starting blog-service"
    );

    // Post store with its event channel
    let (event_sink, event_rx) = ChannelEventSink::new(config.events.channel_capacity);
    let event_logger = spawn_event_logger(event_rx);
    let store = Arc::new(
        PostStore::new(Arc::new(event_sink)).with_size_gauge(POSTS_STORED.clone()),
    );
    info!("Post store initialized");

    let grpc_addr: SocketAddr = config
        .grpc_addr()
        .parse()
        .context("Invalid gRPC address")?;
    let http_addr = config.http_addr();

    let mut join_set = JoinSet::new();

    // HTTP health + metrics
    let http_server = HttpServer::new(|| {
        App::new()
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(|| async { "READY" }))
            .route("/metrics", web::get().to(serve_metrics))
    })
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .run();

    join_set.spawn(async move {
        http_server
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))
    });
    info!("HTTP health check server listening on http://{}", http_addr);

    // gRPC
    let grpc_service = BlogServiceImpl::new(store);
    join_set.spawn(async move {
        let (mut health, health_service) = health_reporter();
        health
            .set_serving::<BlogServiceServer<BlogServiceImpl>>()
            .await;

        Server::builder()
            .layer(RequestLoggingLayer)
            .add_service(health_service)
            .add_service(BlogServiceServer::new(grpc_service))
            .serve_with_shutdown(grpc_addr, shutdown_signal())
            .await
            .map_err(|e| anyhow::anyhow!("gRPC server error: {}", e))
    });
    info!("gRPC server listening on {}", grpc_addr);

    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(Ok(())) => {
                info!("Task completed successfully");
            }
            Ok(Err(e)) => {
                tracing::error!("Task failed: {:#}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::error!("Task panicked: {:#}", e);
                return Err(anyhow::anyhow!("Task panicked: {}", e));
            }
        }
    }

    // The gRPC server owned the last store handle, so the event channel is
    // closed by now and the logger drains whatever is left.
    if let Err(e) = event_logger.await {
        tracing::warn!("Event logger task failed: {}", e);
    }

    info!("blog-service shut down");
    Ok(())
}
