//! Identity provider port.

use async_trait::async_trait;

use crate::domain::entities::Operator;

/// Session provider exposing the signed-in operator, if any.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Option<Operator>;

    async fn sign_out(&self);
}
