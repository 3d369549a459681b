//! Change feed configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

/// Channel the `posts` trigger in `migrations/0001_posts.sql` notifies on.
/// The two must change together.
pub const DEFAULT_TOPIC: &str = "posts_changed";
const DEFAULT_SIGNAL_BUFFER: usize = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChangeFeedConfig {
    /// Topic the durable store notifies on after each mutation.
    pub topic: String,
    /// Per-subscription queue depth; signals beyond it are coalesced.
    pub signal_buffer: usize,
}

impl Default for ChangeFeedConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            signal_buffer: DEFAULT_SIGNAL_BUFFER,
        }
    }
}

impl From<&crate::config::FeedSettings> for ChangeFeedConfig {
    fn from(settings: &crate::config::FeedSettings) -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            signal_buffer: settings.signal_buffer.get(),
        }
    }
}

impl ChangeFeedConfig {
    /// Returns the signal buffer as NonZeroUsize, clamping to 1 if zero.
    pub fn signal_buffer_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.signal_buffer).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = ChangeFeedConfig::default();
        assert_eq!(config.topic, "posts_changed");
        assert_eq!(config.signal_buffer, 16);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = ChangeFeedConfig {
            signal_buffer: 0,
            ..Default::default()
        };
        assert_eq!(config.signal_buffer_non_zero().get(), 1);
    }
}
