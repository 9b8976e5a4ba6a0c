//! Identity providers: where a signed-in identity comes from.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::Identity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// External sign-in flow
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the sign-in flow and return whoever signed in
    async fn sign_in(&self) -> Result<Identity>;

    /// End the provider-side session
    async fn sign_out(&self) -> Result<()>;
}

/// Provider returning a fixed identity, for the command line and tests
#[derive(Clone)]
pub struct StaticIdentityProvider {
    identity: Option<Identity>,
    sign_outs: Arc<AtomicUsize>,
}

impl StaticIdentityProvider {
    pub fn new(email: Option<String>, display_name: Option<String>) -> Self {
        Self {
            identity: Some(Identity {
                email,
                display_name,
            }),
            sign_outs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_email(email: &str) -> Self {
        Self::new(Some(email.to_string()), None)
    }

    /// Provider whose sign-in always fails
    pub fn unavailable() -> Self {
        Self {
            identity: None,
            sign_outs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times `sign_out` was called
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn sign_in(&self) -> Result<Identity> {
        let identity = self
            .identity
            .clone()
            .ok_or_else(|| anyhow!("identity provider unavailable"))?;
        info!("Signed in as {}", identity.greeting_name());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
