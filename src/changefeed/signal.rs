//! Change signal emitted by the durable store.

/// "Something in the post collection changed."
///
/// Signals carry no payload. The only legal reaction is to schedule a
/// (coalesced) re-read of every query the view depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSignal {
    CollectionChanged,
}
