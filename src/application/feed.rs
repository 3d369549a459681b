//! Reader-facing published feed.
//!
//! `PublicationListCache` owns the ordered list of published posts and is
//! rebuilt wholesale from the repository. `ReaderFeedView` binds one cache to
//! the change feed for as long as the reader is looking at it.

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::pagination::{Page, page_numbers};
use crate::application::repos::{PostsRepo, RepoError};
use crate::changefeed::lock::{rw_read, rw_write};
use crate::changefeed::{ChangeFeedListener, Lease, ListenerHandle, ReloadTarget};
use crate::domain::entities::PostRecord;

pub const DEFAULT_PAGE_SIZE: usize = 6;

const SOURCE: &str = "application::feed";
const METRIC_REFRESHES: &str = "pressroom_feed_refresh_total";
const METRIC_REFRESH_FAILED: &str = "pressroom_feed_refresh_failed_total";
const METRIC_REFRESH_DISCARDED: &str = "pressroom_feed_refresh_discarded_total";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Default)]
struct PublishedList {
    posts: Vec<PostRecord>,
    version: u64,
}

pub struct PublicationListCache {
    repo: Arc<dyn PostsRepo>,
    site_url: String,
    state: RwLock<PublishedList>,
}

impl PublicationListCache {
    pub fn new(repo: Arc<dyn PostsRepo>, site_url: impl Into<String>) -> Self {
        let site_url = site_url.into().trim_end_matches('/').to_string();
        Self {
            repo,
            site_url,
            state: RwLock::new(PublishedList::default()),
        }
    }

    /// Re-read the published list and replace the held one.
    pub async fn refresh(&self) -> Result<usize, RepoError> {
        let posts = self.repo.list_published().await?;
        Ok(self.store(posts, None).unwrap_or_default())
    }

    /// Like `refresh`, but the result is dropped if `lease` is revoked by the
    /// time the read completes. Returns `None` when the result was dropped.
    pub async fn refresh_under(&self, lease: &Lease) -> Result<Option<usize>, RepoError> {
        let posts = self.repo.list_published().await?;
        Ok(self.store(posts, Some(lease)))
    }

    fn store(&self, posts: Vec<PostRecord>, lease: Option<&Lease>) -> Option<usize> {
        let mut state = rw_write(&self.state, SOURCE, "store");
        if lease.is_some_and(|lease| !lease.is_live()) {
            counter!(METRIC_REFRESH_DISCARDED).increment(1);
            debug!("Discarded published list read for a released view");
            return None;
        }

        let total = posts.len();
        state.posts = posts;
        state.version = state.version.wrapping_add(1);
        counter!(METRIC_REFRESHES).increment(1);
        debug!(total, version = state.version, "Published list replaced");
        Some(total)
    }

    /// The 1-indexed `number`th page of the held list.
    pub fn page(&self, number: usize, size: NonZeroUsize) -> Page<PostRecord> {
        let state = rw_read(&self.state, SOURCE, "page");
        Page::from_slice(&state.posts, number, size)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len").posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Incremented on every wholesale replacement.
    pub fn version(&self) -> u64 {
        rw_read(&self.state, SOURCE, "version").version
    }

    pub fn snapshot(&self) -> Vec<PostRecord> {
        rw_read(&self.state, SOURCE, "snapshot").posts.clone()
    }

    /// Detail read for readers. Drafts are reported as missing.
    pub async fn published_post(&self, id: Uuid) -> Result<PostRecord, FeedError> {
        match self.repo.find_by_id(id).await? {
            Some(post) if post.is_visible_to_readers() => Ok(post),
            _ => Err(FeedError::NotFound),
        }
    }

    pub fn share_url(&self, id: Uuid) -> String {
        format!("{}/blog/{id}", self.site_url)
    }
}

#[async_trait]
impl ReloadTarget for PublicationListCache {
    async fn reload(&self, lease: &Lease) {
        if let Err(err) = self.refresh_under(lease).await {
            counter!(METRIC_REFRESH_FAILED).increment(1);
            warn!(error = %err, "Published list refresh failed; keeping last known list");
        }
    }
}

/// The paginated feed a reader is looking at.
pub struct ReaderFeedView {
    cache: Arc<PublicationListCache>,
    listener: ChangeFeedListener,
    handle: Option<ListenerHandle>,
    page_size: NonZeroUsize,
    current_page: usize,
}

impl ReaderFeedView {
    pub fn new(
        cache: Arc<PublicationListCache>,
        listener: ChangeFeedListener,
        page_size: NonZeroUsize,
    ) -> Self {
        Self {
            cache,
            listener,
            handle: None,
            page_size,
            current_page: 1,
        }
    }

    /// Subscribe, then load. Subscribing first means a write that lands
    /// during the initial read still triggers a follow-up refresh.
    pub async fn activate(&mut self) -> Result<(), RepoError> {
        if self.handle.is_some() {
            return Ok(());
        }

        let target: Arc<dyn ReloadTarget> = self.cache.clone();
        let handle = self.listener.activate(target).await;
        let lease = handle.lease().clone();
        self.handle = Some(handle);

        let loaded = self.cache.refresh_under(&lease).await?;
        info!(
            topic = self.listener.topic(),
            loaded = loaded.unwrap_or_default(),
            "Reader feed activated"
        );
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
            info!(topic = self.listener.topic(), "Reader feed deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_live(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(ListenerHandle::is_subscribed)
    }

    /// Move to page `number`. The number is kept as given, even when the
    /// list later shrinks below it.
    pub fn go_to(&mut self, number: usize) {
        self.current_page = number;
    }

    pub fn current_page_number(&self) -> usize {
        self.current_page
    }

    pub fn current_page(&self) -> Page<PostRecord> {
        self.cache.page(self.current_page, self.page_size)
    }

    pub fn page_numbers(&self) -> Vec<usize> {
        page_numbers(self.cache.len(), self.page_size)
    }

    pub fn cache(&self) -> &Arc<PublicationListCache> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use super::*;
    use crate::domain::posts::NewPost;
    use crate::infra::changefeed::InMemoryChangeTransport;
    use crate::infra::memory::InMemoryPostsRepo;

    fn size(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).unwrap()
    }

    fn seed(repo: &InMemoryPostsRepo, id: u128, offset: i64, published: bool) {
        let post = NewPost {
            title: format!("post {id}"),
            description: "d".into(),
            content: "c".into(),
            image_ref: None,
            author: "Alice".into(),
            author_id: Uuid::from_u128(99),
            published,
        };
        let created = OffsetDateTime::UNIX_EPOCH + Duration::minutes(offset);
        repo.seed(post.into_record(Uuid::from_u128(id), created));
    }

    #[tokio::test]
    async fn refresh_replaces_list_and_bumps_version() {
        let repo = Arc::new(InMemoryPostsRepo::new());
        seed(&repo, 1, 1, true);
        seed(&repo, 2, 2, false);
        let cache = PublicationListCache::new(repo.clone(), "https://example.test/");

        assert_eq!(cache.refresh().await.unwrap(), 1);
        assert_eq!(cache.version(), 1);

        seed(&repo, 3, 3, true);
        assert_eq!(cache.refresh().await.unwrap(), 2);
        assert_eq!(cache.version(), 2);
        assert_eq!(cache.snapshot()[0].id, Uuid::from_u128(3));
    }

    #[tokio::test]
    async fn revoked_lease_discards_completion() {
        let repo = Arc::new(InMemoryPostsRepo::new());
        seed(&repo, 1, 1, true);
        let cache = PublicationListCache::new(repo, "https://example.test");

        let lease = Lease::new();
        lease.revoke();

        assert_eq!(cache.refresh_under(&lease).await.unwrap(), None);
        assert!(cache.is_empty());
        assert_eq!(cache.version(), 0);
    }

    #[tokio::test]
    async fn pages_are_stable_between_refreshes() {
        let repo = Arc::new(InMemoryPostsRepo::new());
        for id in 1..=7 {
            seed(&repo, id, id as i64, true);
        }
        let cache = PublicationListCache::new(repo, "https://example.test");
        cache.refresh().await.unwrap();

        let first = cache.page(2, size(3));
        assert_eq!(first, cache.page(2, size(3)));
        assert_eq!(first.page_count, 3);
        assert!(cache.page(4, size(3)).is_empty());
    }

    #[tokio::test]
    async fn published_post_hides_drafts() {
        let repo = Arc::new(InMemoryPostsRepo::new());
        seed(&repo, 1, 1, true);
        seed(&repo, 2, 2, false);
        let cache = PublicationListCache::new(repo, "https://example.test");

        assert!(cache.published_post(Uuid::from_u128(1)).await.is_ok());
        assert!(matches!(
            cache.published_post(Uuid::from_u128(2)).await,
            Err(FeedError::NotFound)
        ));
        assert!(matches!(
            cache.published_post(Uuid::from_u128(3)).await,
            Err(FeedError::NotFound)
        ));
    }

    #[test]
    fn share_url_uses_site_root() {
        let repo = Arc::new(InMemoryPostsRepo::new());
        let cache = PublicationListCache::new(repo, "https://example.test/");
        let id = Uuid::from_u128(5);

        assert_eq!(cache.share_url(id), format!("https://example.test/blog/{id}"));
    }

    #[tokio::test]
    async fn current_page_is_not_clamped_when_list_shrinks() {
        let repo = Arc::new(InMemoryPostsRepo::new());
        for id in 1..=4 {
            seed(&repo, id, id as i64, true);
        }
        let transport = Arc::new(InMemoryChangeTransport::default());
        let cache = Arc::new(PublicationListCache::new(repo.clone(), "https://example.test"));
        let listener = ChangeFeedListener::new(transport, "posts_changed");
        let mut view = ReaderFeedView::new(cache.clone(), listener, size(2));

        view.activate().await.unwrap();
        view.go_to(2);
        assert_eq!(view.current_page().items.len(), 2);
        assert_eq!(view.page_numbers(), vec![1, 2]);

        for id in 3..=4 {
            repo.delete(Uuid::from_u128(id)).await.unwrap();
        }
        cache.refresh().await.unwrap();

        assert_eq!(view.current_page_number(), 2);
        assert!(view.current_page().is_empty());
        assert!(view.page_numbers().is_empty());
        view.deactivate();
    }

    #[tokio::test]
    async fn deactivate_releases_subscription() {
        let repo = Arc::new(InMemoryPostsRepo::new());
        let transport = Arc::new(InMemoryChangeTransport::default());
        let cache = Arc::new(PublicationListCache::new(repo, "https://example.test"));
        let listener = ChangeFeedListener::new(transport.clone(), "posts_changed");
        let mut view = ReaderFeedView::new(cache, listener, size(6));

        view.activate().await.unwrap();
        view.activate().await.unwrap();
        assert!(view.is_live());
        assert_eq!(transport.subscriber_count("posts_changed"), 1);

        view.deactivate();
        assert!(!view.is_active());
        assert_eq!(transport.subscriber_count("posts_changed"), 0);
    }
}
