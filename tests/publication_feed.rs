use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use pressroom::application::feed::{PublicationListCache, ReaderFeedView};
use pressroom::application::pagination::page_count;
use pressroom::application::repos::{PostsRepo, RepoError};
use pressroom::changefeed::ChangeFeedListener;
use pressroom::domain::entities::PostRecord;
use pressroom::domain::posts::{NewPost, PostPatch};
use pressroom::infra::changefeed::InMemoryChangeTransport;
use pressroom::infra::memory::InMemoryPostsRepo;
use time::OffsetDateTime;
use tokio::time::{sleep, timeout};
use uuid::Uuid;

const TOPIC: &str = "posts_changed";

fn new_post(title: &str, published: bool) -> NewPost {
    NewPost {
        title: title.to_string(),
        description: "d".to_string(),
        content: "c".to_string(),
        image_ref: None,
        author: "Alice".to_string(),
        author_id: Uuid::from_u128(1),
        published,
    }
}

fn size(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).expect("non-zero")
}

async fn wait_for_version(cache: &PublicationListCache, after: u64) -> u64 {
    timeout(Duration::from_secs(2), async {
        loop {
            let version = cache.version();
            if version > after {
                return version;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cache refreshed within timeout")
}

#[tokio::test]
async fn create_then_list_all_contains_exactly_one_new_post() {
    let repo = InMemoryPostsRepo::new();
    let before: Vec<Uuid> = repo.list_all().await.unwrap().iter().map(|p| p.id).collect();

    let created = repo.create(new_post("A", false)).await.unwrap();
    let all = repo.list_all().await.unwrap();

    assert!(!before.contains(&created.id));
    let matching: Vec<&PostRecord> = all.iter().filter(|post| post.id == created.id).collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].title, "A");
    assert_eq!(matching[0].author, "Alice");
    assert!(!matching[0].published);
}

#[tokio::test]
async fn publication_toggles_membership_regardless_of_prior_state() {
    let repo = InMemoryPostsRepo::new();

    for initially_published in [false, true] {
        let post = repo.create(new_post("t", initially_published)).await.unwrap();

        repo.update(post.id, PostPatch::publication(true)).await.unwrap();
        let published = repo.list_published().await.unwrap();
        assert!(published.iter().any(|p| p.id == post.id));

        repo.update(post.id, PostPatch::publication(false)).await.unwrap();
        let published = repo.list_published().await.unwrap();
        assert!(published.iter().all(|p| p.id != post.id));
    }
}

#[tokio::test]
async fn published_order_is_independent_of_insertion_order() {
    let created_at = |minutes: i64| OffsetDateTime::UNIX_EPOCH + time::Duration::minutes(minutes);
    let fixtures = [(4u128, 10), (2, 30), (1, 30), (3, 20), (5, 30)];
    let expected = vec![1u128, 2, 5, 3, 4];

    let orders: [[usize; 5]; 3] = [[0, 1, 2, 3, 4], [4, 3, 2, 1, 0], [2, 0, 4, 1, 3]];
    for order in orders {
        let repo = InMemoryPostsRepo::new();
        for index in order {
            let (id, minutes) = fixtures[index];
            repo.seed(new_post("t", true).into_record(Uuid::from_u128(id), created_at(minutes)));
        }

        let ids: Vec<u128> = repo
            .list_published()
            .await
            .unwrap()
            .iter()
            .map(|post| post.id.as_u128())
            .collect();
        assert_eq!(ids, expected);
    }
}

#[tokio::test]
async fn pages_partition_the_published_list() {
    let repo = Arc::new(InMemoryPostsRepo::new());
    for index in 0..13 {
        repo.create(new_post(&format!("p{index}"), index % 4 != 0))
            .await
            .unwrap();
    }
    let cache = PublicationListCache::new(repo.clone(), "https://example.test");
    let total = cache.refresh().await.unwrap();
    assert_eq!(total, 9);

    for page_size in 1..=10 {
        let pages = page_count(total, size(page_size));
        let sum: usize = (1..=pages)
            .map(|number| cache.page(number, size(page_size)).items.len())
            .sum();
        assert_eq!(sum, total);
        assert!(cache.page(pages + 1, size(page_size)).is_empty());
    }

    let whole = cache.page(1, size(9));
    assert_eq!(whole.items, cache.snapshot());
}

#[tokio::test]
async fn delete_removes_post_everywhere_and_second_delete_is_not_found() {
    let repo = InMemoryPostsRepo::new();
    let post = repo.create(new_post("A", true)).await.unwrap();

    repo.delete(post.id).await.unwrap();

    assert!(repo.list_all().await.unwrap().is_empty());
    assert!(repo.list_published().await.unwrap().is_empty());
    assert!(matches!(repo.delete(post.id).await, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn reader_feed_follows_repository_writes() {
    let transport = Arc::new(InMemoryChangeTransport::default());
    let repo = Arc::new(InMemoryPostsRepo::with_change_feed(transport.clone(), TOPIC));
    let cache = Arc::new(PublicationListCache::new(repo.clone(), "https://example.test"));
    let listener = ChangeFeedListener::new(transport.clone(), TOPIC);
    let mut view = ReaderFeedView::new(cache.clone(), listener, size(6));

    view.activate().await.unwrap();
    let version = cache.version();
    assert!(view.current_page().is_empty());

    let older = repo.create(new_post("older", true)).await.unwrap();
    let version = wait_for_version(&cache, version).await;

    let draft = repo.create(new_post("A", false)).await.unwrap();
    let version = wait_for_version(&cache, version).await;
    assert!(view.current_page().items.iter().all(|post| post.id != draft.id));

    repo.update(draft.id, PostPatch::publication(true)).await.unwrap();
    wait_for_version(&cache, version).await;

    let page = view.current_page();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, draft.id, "newest first");
    assert_eq!(page.items[1].id, older.id);

    view.deactivate();
    assert_eq!(transport.subscriber_count(TOPIC), 0);
}

#[tokio::test]
async fn writes_after_deactivation_leave_the_feed_untouched() {
    let transport = Arc::new(InMemoryChangeTransport::default());
    let repo = Arc::new(InMemoryPostsRepo::with_change_feed(transport.clone(), TOPIC));
    let cache = Arc::new(PublicationListCache::new(repo.clone(), "https://example.test"));
    let listener = ChangeFeedListener::new(transport.clone(), TOPIC);
    let mut view = ReaderFeedView::new(cache.clone(), listener, size(6));

    view.activate().await.unwrap();
    view.deactivate();
    let version = cache.version();

    repo.create(new_post("late", true)).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert_eq!(cache.version(), version);
    assert!(cache.is_empty());
}
