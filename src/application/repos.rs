//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::PostRecord;
use crate::domain::error::DomainError;
use crate::domain::posts::{NewPost, PostPatch};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("invalid input: {message}")]
    Validation { message: String },
    #[error("resource not found")]
    NotFound,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Failures worth retrying by re-invoking the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepoError::Persistence(_) | RepoError::Timeout)
    }
}

impl From<DomainError> for RepoError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => RepoError::NotFound,
            DomainError::Validation { message } => RepoError::Validation { message },
        }
    }
}

/// The durable post collection.
///
/// Implementations validate field sets before touching storage, so a
/// `Validation` error never reaches the backend. Every successful mutation
/// is followed (asynchronously) by a change signal on the shared topic.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<PostRecord, RepoError>;

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<PostRecord, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    /// Every post, in no guaranteed order.
    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError>;

    /// Published posts, newest `created_at` first, ties by ascending `id`.
    async fn list_published(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}
