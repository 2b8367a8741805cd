/// Data models for blog-service
///
/// `Post` is the only record the service stores. The gRPC `BlogPost` message
/// is converted to and from this type at the transport boundary.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog post.
///
/// `id` is empty until the post has been stored. The store assigns it on
/// create and never changes it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub publication_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl Post {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    pub fn with_publication_date(mut self, date: DateTime<Utc>) -> Self {
        self.publication_date = Some(date);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
