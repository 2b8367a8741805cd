//! gRPC layer for blog-service
//!
//! - `server`: the `BlogService` implementation and generated proto code
//! - `logging`: tower layer logging every call

pub mod logging;
pub mod server;

pub use logging::RequestLoggingLayer;
pub use server::*;
