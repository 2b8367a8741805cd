/// Business logic layer for blog-service
pub mod posts;

pub use posts::PostStore;
