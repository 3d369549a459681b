//! Change transport over Postgres `LISTEN` / `NOTIFY`.
//!
//! The `posts` table carries a statement trigger that runs
//! `pg_notify('posts_changed', '')` after every insert, update or delete;
//! each subscription holds its own `PgListener` connection.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPool};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::changefeed::lock::mutex_lock;
use crate::changefeed::{
    ChangeSignal, ChangeTransport, Delivery, Subscription, SubscriptionId, TransportError, deliver,
};

const SOURCE: &str = "infra::changefeed::postgres";

pub struct PgChangeTransport {
    pool: PgPool,
    tasks: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
    next_id: AtomicU64,
    buffer: NonZeroUsize,
}

impl PgChangeTransport {
    pub fn new(pool: PgPool, buffer: NonZeroUsize) -> Self {
        Self {
            pool,
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer,
        }
    }
}

#[async_trait]
impl ChangeTransport for PgChangeTransport {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError> {
        if !is_channel_name(topic) {
            return Err(TransportError::InvalidTopic(topic.to_string()));
        }

        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|err| TransportError::Unavailable(err.to_string()))?;
        listener
            .listen(topic)
            .await
            .map_err(|err| TransportError::Unavailable(err.to_string()))?;

        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, signals) = mpsc::channel(self.buffer.get());
        let task = tokio::spawn(forward_notifications(
            listener,
            sender,
            topic.to_string(),
            id,
        ));
        mutex_lock(&self.tasks, SOURCE, "subscribe").insert(id, task);

        Ok(Subscription { id, signals })
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(task) = mutex_lock(&self.tasks, SOURCE, "unsubscribe").remove(&id) {
            task.abort();
        }
    }
}

impl Drop for PgChangeTransport {
    fn drop(&mut self) {
        for (_, task) in mutex_lock(&self.tasks, SOURCE, "drop").drain() {
            task.abort();
        }
    }
}

async fn forward_notifications(
    mut listener: PgListener,
    sender: mpsc::Sender<ChangeSignal>,
    topic: String,
    id: SubscriptionId,
) {
    loop {
        let delivery = match listener.try_recv().await {
            Ok(Some(_notification)) => deliver(&sender),
            Ok(None) => {
                // Reconnected; anything sent meanwhile is lost, so force a re-read.
                warn!(topic = %topic, subscription = %id, "Listener connection lost; re-reading");
                deliver(&sender)
            }
            Err(err) => {
                warn!(topic = %topic, subscription = %id, error = %err, "Listener failed");
                break;
            }
        };

        if delivery == Delivery::Closed {
            break;
        }
    }
    debug!(topic = %topic, subscription = %id, "Listener task finished");
}

/// `LISTEN` takes an identifier; keep topics to a safe subset.
fn is_channel_name(topic: &str) -> bool {
    !topic.is_empty()
        && topic.len() <= 63
        && topic
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_are_plain_identifiers() {
        assert!(is_channel_name("posts_changed"));
        assert!(!is_channel_name(""));
        assert!(!is_channel_name("posts; DROP TABLE posts"));
        assert!(!is_channel_name(&"x".repeat(64)));
    }
}
