/// Blog Service Library
///
/// In-memory CRUD for blog posts exposed over gRPC.
///
/// # Modules
///
/// - `models`: the `Post` record
/// - `error`: domain error types
/// - `events`: post events and the sinks that receive them
/// - `services`: the concurrency-safe post store
/// - `grpc`: gRPC service implementation and request logging layer
/// - `metrics`: Prometheus collectors
/// - `config`: Configuration management
/// - `telemetry`: log subscriber and OpenTelemetry trace export
pub mod config;
pub mod error;
pub mod events;
pub mod grpc;
pub mod metrics;
pub mod models;
pub mod services;
pub mod telemetry;

pub use config::Config;
pub use error::{BlogError, BlogResult};
pub use models::Post;
pub use services::PostStore;
