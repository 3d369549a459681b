//! Fixed-operator identity provider for the CLI.

use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::application::identity::IdentityProvider;
use crate::changefeed::lock::{rw_read, rw_write};
use crate::domain::entities::Operator;

/// Reports a configured operator until `sign_out` is called.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    current: RwLock<Option<Operator>>,
}

impl StaticIdentity {
    pub fn signed_in(operator: Operator) -> Self {
        Self {
            current: RwLock::new(Some(operator)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Option<Operator> {
        rw_read(&self.current, "infra::identity", "current_user").clone()
    }

    async fn sign_out(&self) {
        if let Some(operator) = rw_write(&self.current, "infra::identity", "sign_out").take() {
            info!(operator = %operator.id, "Session ended");
        }
    }
}
