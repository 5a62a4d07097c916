//! Out-of-band delivery of password-reset tokens
//!
//! The reset endpoint never returns a token. Whatever was issued is handed to a
//! [`ResetTokenDelivery`] after the response is already decided.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use frontdesk_auth::IssuedToken;

/// Sends a freshly issued reset token to the account holder
#[async_trait]
pub trait ResetTokenDelivery: Send + Sync {
    async fn deliver(&self, email: &str, token: &IssuedToken) -> anyhow::Result<()>;
}

/// Drops issued tokens without sending them
///
/// Used when no mailer is configured. Staff then obtain a token with the
/// `frontdesk reset-token` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperatorDelivery;

#[async_trait]
impl ResetTokenDelivery for OperatorDelivery {
    async fn deliver(&self, email: &str, token: &IssuedToken) -> anyhow::Result<()> {
        info!(
            email = %email,
            expires_at = %token.expires_at,
            "Reset token issued; no delivery channel configured"
        );
        Ok(())
    }
}

/// Hand the token to `delivery` on a background task
///
/// Delivery latency and failures never reach the HTTP response.
pub(crate) fn dispatch(delivery: Arc<dyn ResetTokenDelivery>, email: String, token: IssuedToken) {
    tokio::spawn(async move {
        if let Err(e) = delivery.deliver(&email, &token).await {
            warn!(email = %email, "Reset token delivery failed: {:#}", e);
        }
    });
}
