//! Change transport port.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::signal::ChangeSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A live subscription. The receiver closes once the transport releases it.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub signals: mpsc::Receiver<ChangeSignal>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid topic `{0}`")]
    InvalidTopic(String),
    #[error("change transport unavailable: {0}")]
    Unavailable(String),
}

/// Named-topic notification channel offered by the durable store.
#[async_trait]
pub trait ChangeTransport: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, TransportError>;

    /// Release a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Outcome of handing a signal to one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The subscriber already has signals queued; this one is redundant.
    AlreadyPending,
    /// The subscriber is gone and should be pruned.
    Closed,
}

/// Non-blocking delivery used by every transport.
pub fn deliver(sender: &mpsc::Sender<ChangeSignal>) -> Delivery {
    match sender.try_send(ChangeSignal::CollectionChanged) {
        Ok(()) => Delivery::Delivered,
        Err(TrySendError::Full(_)) => Delivery::AlreadyPending,
        Err(TrySendError::Closed(_)) => Delivery::Closed,
    }
}
