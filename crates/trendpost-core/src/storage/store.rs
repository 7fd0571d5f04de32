use std::time::Duration;

use super::{Database, LeaseRepository, SubscriberRepository};
use crate::subscriber::Subscriber;
use crate::Result;

const DISPATCH_LEASE: &str = "digest-dispatch";

/// Store operations the dispatcher depends on
#[async_trait::async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Snapshot of all subscribers with the active flag set
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>>;

    /// Claim the right to dispatch for `ttl`. `false` means another dispatcher
    /// sharing this store is mid-tick.
    ///
    /// Stores that are not shared between processes have nobody to exclude.
    async fn try_acquire_dispatch(&self, _holder: &str, _ttl: Duration) -> Result<bool> {
        Ok(true)
    }

    /// Hand back a claim taken with `try_acquire_dispatch`
    async fn release_dispatch(&self, _holder: &str) -> Result<()> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriberStore for Database {
    async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        SubscriberRepository::new(self).list_active().await
    }

    async fn try_acquire_dispatch(&self, holder: &str, ttl: Duration) -> Result<bool> {
        LeaseRepository::new(self)
            .try_acquire(DISPATCH_LEASE, holder, ttl)
            .await
    }

    async fn release_dispatch(&self, holder: &str) -> Result<()> {
        if !LeaseRepository::new(self).release(DISPATCH_LEASE, holder).await? {
            tracing::warn!("Dispatch lease for {} had already expired or been taken over", holder);
        }
        Ok(())
    }
}
