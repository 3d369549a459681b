//! Coalescing change feed listener.
//!
//! One listener activation holds exactly one subscription for the lifetime
//! of a view. Each signal triggers a re-read of the view's query; signals
//! that arrive while a re-read is in flight collapse into a single follow-up
//! re-read instead of queueing one refresh each.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::signal::ChangeSignal;
use super::transport::{ChangeTransport, SubscriptionId};

const METRIC_SIGNALS_COALESCED: &str = "pressroom_changefeed_coalesced_total";
const METRIC_SUBSCRIBE_FAILED: &str = "pressroom_changefeed_subscribe_failed_total";

/// Liveness token for one view activation.
///
/// Re-reads started under a lease must drop their results once it is
/// revoked, so a completion that lands after deactivation never touches
/// state that is no longer displayed.
#[derive(Debug, Clone)]
pub struct Lease {
    live: Arc<AtomicBool>,
}

impl Lease {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn revoke(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

impl Default for Lease {
    fn default() -> Self {
        Self::new()
    }
}

/// A view-owned list that can re-read its backing query.
#[async_trait]
pub trait ReloadTarget: Send + Sync + 'static {
    async fn reload(&self, lease: &Lease);
}

/// Binds a view to the change topic.
#[derive(Clone)]
pub struct ChangeFeedListener {
    transport: Arc<dyn ChangeTransport>,
    topic: String,
}

impl ChangeFeedListener {
    pub fn new(transport: Arc<dyn ChangeTransport>, topic: impl Into<String>) -> Self {
        Self {
            transport,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Subscribe on behalf of `target`.
    ///
    /// A failed subscription is not an error: the returned handle holds a
    /// live lease but no subscription, and the view keeps serving its last
    /// known data until the next activation retries.
    pub async fn activate(&self, target: Arc<dyn ReloadTarget>) -> ListenerHandle {
        let lease = Lease::new();

        let subscription = match self.transport.subscribe(&self.topic).await {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!(topic = %self.topic, error = %err, "Change feed subscription failed");
                counter!(METRIC_SUBSCRIBE_FAILED).increment(1);
                return ListenerHandle {
                    lease,
                    active: None,
                };
            }
        };

        let id = subscription.id;
        let task = tokio::spawn(refresh_loop(
            subscription.signals,
            target,
            lease.clone(),
            self.topic.clone(),
        ));
        info!(topic = %self.topic, subscription = %id, "Change feed subscribed");

        ListenerHandle {
            lease,
            active: Some(ActiveSubscription {
                id,
                topic: self.topic.clone(),
                task,
                transport: self.transport.clone(),
            }),
        }
    }
}

struct ActiveSubscription {
    id: SubscriptionId,
    topic: String,
    task: JoinHandle<()>,
    transport: Arc<dyn ChangeTransport>,
}

/// Scope guard for one activation; dropping it releases the subscription.
pub struct ListenerHandle {
    lease: Lease,
    active: Option<ActiveSubscription>,
}

impl ListenerHandle {
    pub fn lease(&self) -> &Lease {
        &self.lease
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.active.as_ref().map(|active| active.id)
    }

    pub fn release(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.lease.revoke();
        if let Some(active) = self.active.take() {
            active.task.abort();
            active.transport.unsubscribe(active.id);
            info!(topic = %active.topic, subscription = %active.id, "Change feed released");
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn refresh_loop(
    mut signals: mpsc::Receiver<ChangeSignal>,
    target: Arc<dyn ReloadTarget>,
    lease: Lease,
    topic: String,
) {
    while signals.recv().await.is_some() {
        let coalesced = drain_pending(&mut signals);
        if coalesced > 0 {
            counter!(METRIC_SIGNALS_COALESCED).increment(coalesced as u64);
            debug!(topic = %topic, coalesced, "Coalesced change signals");
        }

        if !lease.is_live() {
            break;
        }
        target.reload(&lease).await;
    }
    debug!(topic = %topic, "Change feed refresh loop finished");
}

fn drain_pending(signals: &mut mpsc::Receiver<ChangeSignal>) -> usize {
    let mut drained = 0;
    while signals.try_recv().is_ok() {
        drained += 1;
    }
    drained
}
