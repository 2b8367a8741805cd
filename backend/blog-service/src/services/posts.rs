/// Post store - in-memory CRUD over blog posts
use crate::error::{BlogError, BlogResult};
use crate::events::{EventSink, PostEvent};
use crate::models::Post;
use prometheus::IntGauge;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory post store.
///
/// One `RwLock` guards the whole mapping: create, update and delete take the
/// write lock, read and read_all share the read lock. Events are emitted after
/// the lock has been released.
pub struct PostStore {
    posts: RwLock<HashMap<String, Post>>,
    events: Arc<dyn EventSink>,
    size_gauge: Option<IntGauge>,
}

impl PostStore {
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        Self {
            posts: RwLock::new(HashMap::new()),
            events,
            size_gauge: None,
        }
    }

    /// Report the number of stored posts through `gauge` after every create
    /// and delete. Only stores given a gauge touch it.
    pub fn with_size_gauge(mut self, gauge: IntGauge) -> Self {
        self.size_gauge = Some(gauge);
        self
    }

    fn record_size(&self, len: usize) {
        if let Some(gauge) = &self.size_gauge {
            gauge.set(len as i64);
        }
    }

    /// Store a new post under a freshly generated id.
    ///
    /// Any id already set on `post` is overwritten.
    pub async fn create(&self, mut post: Post) -> Post {
        post.id = Uuid::new_v4().to_string();

        {
            let mut posts = self.posts.write().await;
            posts.insert(post.id.clone(), post.clone());
            self.record_size(posts.len());
        }

        self.events.emit(PostEvent::Created {
            post_id: post.id.clone(),
            author: post.author.clone(),
        });

        post
    }

    /// Get a post by id
    pub async fn read(&self, id: &str) -> BlogResult<Post> {
        let post = self
            .posts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| BlogError::not_found(id))?;

        self.events.emit(PostEvent::Read {
            post_id: post.id.clone(),
            author: post.author.clone(),
        });

        Ok(post)
    }

    /// Snapshot of every stored post, in no particular order.
    pub async fn read_all(&self) -> Vec<Post> {
        let posts: Vec<Post> = self.posts.read().await.values().cloned().collect();

        for post in &posts {
            self.events.emit(PostEvent::Read {
                post_id: post.id.clone(),
                author: post.author.clone(),
            });
        }

        posts
    }

    /// Replace the contents of an existing post, keeping its id.
    pub async fn update(&self, id: &str, mut post: Post) -> BlogResult<Post> {
        {
            let mut posts = self.posts.write().await;
            let stored = posts.get_mut(id).ok_or_else(|| BlogError::not_found(id))?;
            post.id = id.to_string();
            *stored = post.clone();
        }

        self.events.emit(PostEvent::Updated {
            post_id: post.id.clone(),
            author: post.author.clone(),
        });

        Ok(post)
    }

    /// Remove a post permanently
    pub async fn delete(&self, id: &str) -> BlogResult<()> {
        {
            let mut posts = self.posts.write().await;
            if posts.remove(id).is_none() {
                return Err(BlogError::not_found(id));
            }
            self.record_size(posts.len());
        }

        self.events.emit(PostEvent::Deleted {
            post_id: id.to_string(),
        });

        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }
}
