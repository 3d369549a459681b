//! Change feed: subscription to the "post collection changed" topic and
//! coalesced re-reads of the views that depend on it.

mod config;
mod listener;
pub(crate) mod lock;
mod signal;
mod transport;

pub use config::{ChangeFeedConfig, DEFAULT_TOPIC};
pub use listener::{ChangeFeedListener, Lease, ListenerHandle, ReloadTarget};
pub use signal::ChangeSignal;
pub use transport::{
    ChangeTransport, Delivery, Subscription, SubscriptionId, TransportError, deliver,
};
