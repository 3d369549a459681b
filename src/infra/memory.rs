//! In-memory post collection.
//!
//! Behaves like the durable store as far as the engine can observe: ids are
//! assigned on create, validation happens before any write, and each
//! successful mutation publishes a change signal on the configured topic.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::application::repos::{PostsRepo, RepoError};
use crate::changefeed::lock::{rw_read, rw_write};
use crate::domain::entities::PostRecord;
use crate::domain::posts::{NewPost, PostPatch, sort_for_feed};
use crate::infra::changefeed::InMemoryChangeTransport;

const SOURCE: &str = "infra::memory";

#[derive(Default)]
pub struct InMemoryPostsRepo {
    posts: RwLock<HashMap<Uuid, PostRecord>>,
    change_feed: Option<(Arc<InMemoryChangeTransport>, String)>,
}

impl InMemoryPostsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish on `topic` after each successful mutation.
    pub fn with_change_feed(
        transport: Arc<InMemoryChangeTransport>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            posts: RwLock::new(HashMap::new()),
            change_feed: Some((transport, topic.into())),
        }
    }

    /// Insert a fully-formed record, e.g. when importing existing content.
    pub fn seed(&self, record: PostRecord) {
        rw_write(&self.posts, SOURCE, "seed").insert(record.id, record);
        self.notify();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.posts, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn notify(&self) {
        if let Some((transport, topic)) = &self.change_feed {
            transport.publish(topic);
        }
    }
}

#[async_trait]
impl PostsRepo for InMemoryPostsRepo {
    async fn create(&self, post: NewPost) -> Result<PostRecord, RepoError> {
        post.validate()?;

        let record = {
            let mut posts = rw_write(&self.posts, SOURCE, "create");
            let mut id = Uuid::new_v4();
            while posts.contains_key(&id) {
                id = Uuid::new_v4();
            }
            let record = post.into_record(id, OffsetDateTime::now_utc());
            posts.insert(id, record.clone());
            record
        };

        debug!(post_id = %record.id, "Post inserted");
        self.notify();
        Ok(record)
    }

    async fn update(&self, id: Uuid, patch: PostPatch) -> Result<PostRecord, RepoError> {
        patch.validate()?;

        let record = {
            let mut posts = rw_write(&self.posts, SOURCE, "update");
            let record = posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            patch.apply_to(record, OffsetDateTime::now_utc());
            record.clone()
        };

        debug!(post_id = %id, "Post updated");
        self.notify();
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let removed = rw_write(&self.posts, SOURCE, "delete").remove(&id);
        if removed.is_none() {
            return Err(RepoError::NotFound);
        }

        debug!(post_id = %id, "Post deleted");
        self.notify();
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        Ok(rw_read(&self.posts, SOURCE, "list_all")
            .values()
            .cloned()
            .collect())
    }

    async fn list_published(&self) -> Result<Vec<PostRecord>, RepoError> {
        let mut published: Vec<PostRecord> = rw_read(&self.posts, SOURCE, "list_published")
            .values()
            .filter(|post| post.published)
            .cloned()
            .collect();
        sort_for_feed(&mut published);
        Ok(published)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(rw_read(&self.posts, SOURCE, "find_by_id").get(&id).cloned())
    }
}
