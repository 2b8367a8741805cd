// gRPC service implementation for blog service
use crate::error::BlogError;
use crate::metrics::record_operation;
use crate::models::Post;
use crate::services::PostStore;
use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use std::sync::Arc;
use tonic::{Request, Response, Status};

// Import generated proto code
pub mod blog {
    pub mod v1 {
        tonic::include_proto!("blog_service.v1");
    }
    pub use v1::*;
}

use blog::blog_service_server::BlogService;
use blog::*;

/// BlogService gRPC implementation
///
/// Every RPC maps onto exactly one store call. A missing post is reported in
/// the response `error` field; the RPC itself still succeeds.
#[derive(Clone)]
pub struct BlogServiceImpl {
    store: Arc<PostStore>,
}

impl BlogServiceImpl {
    pub fn new(store: Arc<PostStore>) -> Self {
        Self { store }
    }
}

pub fn timestamp_to_datetime(ts: &Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::<Utc>::from_timestamp(ts.seconds, nanos)
}

pub fn datetime_to_timestamp(dt: &DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

fn convert_post_to_proto(post: Post) -> BlogPost {
    BlogPost {
        post_id: post.id,
        title: post.title,
        content: post.content,
        author: post.author,
        publication_date: post.publication_date.as_ref().map(datetime_to_timestamp),
        tags: post.tags,
    }
}

fn post_response(operation: &str, result: Result<Post, BlogError>) -> PostResponse {
    match result {
        Ok(post) => {
            record_operation(operation, "ok");
            PostResponse {
                post: Some(convert_post_to_proto(post)),
                error: String::new(),
            }
        }
        Err(err) => {
            record_operation(operation, "not_found");
            PostResponse {
                post: None,
                error: err.to_string(),
            }
        }
    }
}

#[tonic::async_trait]
impl BlogService for BlogServiceImpl {
    /// Create a new post
    async fn create_post(
        &self,
        request: Request<CreatePostRequest>,
    ) -> Result<Response<PostResponse>, Status> {
        let req = request.into_inner();

        let post = Post {
            id: String::new(),
            title: req.title,
            content: req.content,
            author: req.author,
            publication_date: req.publication_date.as_ref().and_then(timestamp_to_datetime),
            tags: req.tags,
        };

        let created = self.store.create(post).await;
        Ok(Response::new(post_response("create", Ok(created))))
    }

    /// Get a post by ID
    async fn read_post(
        &self,
        request: Request<ReadPostRequest>,
    ) -> Result<Response<PostResponse>, Status> {
        let req = request.into_inner();

        let result = self.store.read(&req.post_id).await;
        Ok(Response::new(post_response("read", result)))
    }

    /// List every stored post
    async fn read_all(
        &self,
        _request: Request<ReadAllRequest>,
    ) -> Result<Response<ReadAllResponse>, Status> {
        let posts = self.store.read_all().await;
        record_operation("read_all", "ok");

        Ok(Response::new(ReadAllResponse {
            posts: posts.into_iter().map(convert_post_to_proto).collect(),
            error: String::new(),
        }))
    }

    /// Replace the contents of a post
    async fn update_post(
        &self,
        request: Request<UpdatePostRequest>,
    ) -> Result<Response<PostResponse>, Status> {
        let req = request.into_inner();

        let post = Post {
            id: String::new(),
            title: req.title,
            content: req.content,
            author: req.author,
            publication_date: req.publication_date.as_ref().and_then(timestamp_to_datetime),
            tags: req.tags,
        };

        let result = self.store.update(&req.post_id, post).await;
        Ok(Response::new(post_response("update", result)))
    }

    /// Delete a post
    async fn delete_post(
        &self,
        request: Request<DeletePostRequest>,
    ) -> Result<Response<DeletePostResponse>, Status> {
        let req = request.into_inner();

        let response = match self.store.delete(&req.post_id).await {
            Ok(()) => {
                record_operation("delete", "ok");
                DeletePostResponse {
                    success: true,
                    error: String::new(),
                }
            }
            Err(err) => {
                record_operation("delete", "not_found");
                DeletePostResponse {
                    success: false,
                    error: err.to_string(),
                }
            }
        };

        Ok(Response::new(response))
    }
}
