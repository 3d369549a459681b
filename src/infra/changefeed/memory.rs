//! In-process change transport.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::changefeed::lock::mutex_lock;
use crate::changefeed::{
    ChangeFeedConfig, ChangeSignal, ChangeTransport, Delivery, Subscription, SubscriptionId,
    TransportError, deliver,
};

const SOURCE: &str = "infra::changefeed::memory";

struct Subscriber {
    topic: String,
    sender: mpsc::Sender<ChangeSignal>,
}

/// Topic fan-out within a single process.
///
/// Pairs with [`crate::infra::memory::InMemoryPostsRepo`], which publishes
/// here after every successful mutation.
pub struct InMemoryChangeTransport {
    subscribers: Mutex<HashMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
    buffer: NonZeroUsize,
}

impl InMemoryChangeTransport {
    pub fn new(buffer: NonZeroUsize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer,
        }
    }

    /// Signal every subscriber of `topic`. Returns how many were reached.
    pub fn publish(&self, topic: &str) -> usize {
        let mut subscribers = mutex_lock(&self.subscribers, SOURCE, "publish");
        let mut reached = 0;
        subscribers.retain(|id, subscriber| {
            if subscriber.topic != topic {
                return true;
            }
            match deliver(&subscriber.sender) {
                Delivery::Delivered | Delivery::AlreadyPending => {
                    reached += 1;
                    true
                }
                Delivery::Closed => {
                    debug!(subscription = %id, topic, "Pruned closed subscriber");
                    false
                }
            }
        });
        debug!(topic, reached, "Change signal published");
        reached
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        mutex_lock(&self.subscribers, SOURCE, "subscriber_count")
            .values()
            .filter(|subscriber| subscriber.topic == topic)
            .count()
    }
}

impl Default for InMemoryChangeTransport {
    fn default() -> Self {
        Self::new(ChangeFeedConfig::default().signal_buffer_non_zero())
    }
}

#[async_trait]
impl ChangeTransport for InMemoryChangeTransport {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        if topic.trim().is_empty() {
            return Err(TransportError::InvalidTopic(topic.to_string()));
        }

        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, signals) = mpsc::channel(self.buffer.get());
        mutex_lock(&self.subscribers, SOURCE, "subscribe").insert(
            id,
            Subscriber {
                topic: topic.to_string(),
                sender,
            },
        );
        Ok(Subscription { id, signals })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        mutex_lock(&self.subscribers, SOURCE, "unsubscribe").remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_only_matching_topic() {
        let transport = InMemoryChangeTransport::default();
        let mut posts = transport.subscribe("posts_changed").await.unwrap();
        let mut other = transport.subscribe("other").await.unwrap();

        assert_eq!(transport.publish("posts_changed"), 1);

        assert_eq!(posts.signals.try_recv().ok(), Some(ChangeSignal::CollectionChanged));
        assert!(other.signals.try_recv().is_err());
    }

    #[tokio::test]
    async fn unsubscribe_closes_the_receiver() {
        let transport = InMemoryChangeTransport::default();
        let mut subscription = transport.subscribe("posts_changed").await.unwrap();

        transport.unsubscribe(subscription.id);

        assert_eq!(transport.subscriber_count("posts_changed"), 0);
        assert!(subscription.signals.recv().await.is_none());
    }

    #[tokio::test]
    async fn full_buffer_counts_as_pending() {
        let transport = InMemoryChangeTransport::new(NonZeroUsize::MIN);
        let mut subscription = transport.subscribe("posts_changed").await.unwrap();

        assert_eq!(transport.publish("posts_changed"), 1);
        assert_eq!(transport.publish("posts_changed"), 1);

        assert!(subscription.signals.try_recv().is_ok());
        assert!(subscription.signals.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_publish() {
        let transport = InMemoryChangeTransport::default();
        let subscription = transport.subscribe("posts_changed").await.unwrap();
        drop(subscription);

        assert_eq!(transport.publish("posts_changed"), 0);
        assert_eq!(transport.subscriber_count("posts_changed"), 0);
    }

    #[tokio::test]
    async fn blank_topic_is_rejected() {
        let transport = InMemoryChangeTransport::default();
        let err = transport.subscribe(" ").await.expect_err("blank topic");
        assert!(matches!(err, TransportError::InvalidTopic(_)));
    }
}
