//! The operator's full post list and the dashboard figures derived from it.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::repos::{PostsRepo, RepoError};
use crate::changefeed::lock::{rw_read, rw_write};
use crate::changefeed::{Lease, ReloadTarget};
use crate::domain::entities::PostRecord;
use crate::domain::posts::sort_for_feed;

const SOURCE: &str = "application::admin::list";
const METRIC_REFRESH_FAILED: &str = "pressroom_operator_list_refresh_failed_total";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostStatusCounts {
    pub total: usize,
    pub published: usize,
    pub drafts: usize,
}

impl PostStatusCounts {
    pub fn tally<'a>(posts: impl IntoIterator<Item = &'a PostRecord>) -> Self {
        posts
            .into_iter()
            .fold(Self::default(), |mut counts, post| {
                counts.total += 1;
                if post.published {
                    counts.published += 1;
                } else {
                    counts.drafts += 1;
                }
                counts
            })
    }
}

#[derive(Debug, Default)]
struct HeldList {
    posts: Vec<PostRecord>,
    version: u64,
}

/// Every post, newest first, as last read from the repository.
pub struct OperatorPostList {
    repo: Arc<dyn PostsRepo>,
    state: RwLock<HeldList>,
}

impl OperatorPostList {
    pub fn new(repo: Arc<dyn PostsRepo>) -> Self {
        Self {
            repo,
            state: RwLock::new(HeldList::default()),
        }
    }

    pub async fn refresh(&self) -> Result<usize, RepoError> {
        let posts = self.repo.list_all().await?;
        Ok(self.store(posts, None).unwrap_or_default())
    }

    pub async fn refresh_under(&self, lease: &Lease) -> Result<Option<usize>, RepoError> {
        let posts = self.repo.list_all().await?;
        Ok(self.store(posts, Some(lease)))
    }

    fn store(&self, mut posts: Vec<PostRecord>, lease: Option<&Lease>) -> Option<usize> {
        sort_for_feed(&mut posts);

        let mut state = rw_write(&self.state, SOURCE, "store");
        if lease.is_some_and(|lease| !lease.is_live()) {
            debug!("Discarded operator list read for a released view");
            return None;
        }
        let total = posts.len();
        state.posts = posts;
        state.version = state.version.wrapping_add(1);
        Some(total)
    }

    pub fn snapshot(&self) -> Vec<PostRecord> {
        rw_read(&self.state, SOURCE, "snapshot").posts.clone()
    }

    pub fn find(&self, id: Uuid) -> Option<PostRecord> {
        rw_read(&self.state, SOURCE, "find")
            .posts
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len").posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u64 {
        rw_read(&self.state, SOURCE, "version").version
    }

    pub fn stats(&self) -> PostStatusCounts {
        PostStatusCounts::tally(&rw_read(&self.state, SOURCE, "stats").posts)
    }

    /// Run `f` over the held list without cloning it.
    pub fn with_posts<R>(&self, f: impl FnOnce(&[PostRecord]) -> R) -> R {
        f(&rw_read(&self.state, SOURCE, "with_posts").posts)
    }
}

#[async_trait]
impl ReloadTarget for OperatorPostList {
    async fn reload(&self, lease: &Lease) {
        if let Err(err) = self.refresh_under(lease).await {
            counter!(METRIC_REFRESH_FAILED).increment(1);
            warn!(error = %err, "Operator list refresh failed; keeping last known list");
        }
    }
}
