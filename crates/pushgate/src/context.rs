// Application context.
//
// Built once at startup from `PushgateOptions`, an `Adapter` and a
// `PushProvider`, then shared across request handlers as `Arc<AppContext>`.

use std::sync::Arc;
use std::time::Instant;

use pushgate_core::db::adapter::Adapter;
use pushgate_core::db::schema::Schema;
use pushgate_core::error::PushgateError;
use pushgate_core::options::PushgateOptions;
use pushgate_core::push::PushProvider;

use crate::middleware::rate_limiter::RateLimiter;
use crate::store::{AccountStore, NotificationStore, SubscriptionStore};

/// The fully-initialized application context.
pub struct AppContext {
    /// The configuration options.
    pub options: PushgateOptions,

    /// Raw document store, shared by the typed stores below.
    pub adapter: Arc<dyn Adapter>,

    /// Injected push delivery backend.
    pub push: Arc<dyn PushProvider>,

    pub accounts: AccountStore,
    pub subscriptions: SubscriptionStore,
    pub notifications: NotificationStore,

    /// Ingress rate limiter (thread-safe).
    pub rate_limiter: Arc<RateLimiter>,

    /// Process start, reported as `uptime` by the health endpoint.
    pub started_at: Instant,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("options", &self.options)
            .field("adapter", &self.adapter)
            .field("push", &self.push.name())
            .field("rate_limiter", &self.rate_limiter)
            .finish()
    }
}

impl AppContext {
    pub fn new(
        options: PushgateOptions,
        adapter: Arc<dyn Adapter>,
        push: Arc<dyn PushProvider>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(&options.rate_limit));
        Self {
            accounts: AccountStore::new(adapter.clone()),
            subscriptions: SubscriptionStore::new(adapter.clone()),
            notifications: NotificationStore::new(adapter.clone()),
            options,
            adapter,
            push,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// Create the collections' indexes. Safe to call on every start.
    pub async fn init(&self) -> Result<(), PushgateError> {
        self.adapter.ensure_indexes(&Schema::default()).await?;
        tracing::info!(push = self.push.name(), "application context initialized");
        Ok(())
    }

    /// Seconds since the context was created.
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
