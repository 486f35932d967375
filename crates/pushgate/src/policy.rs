// Tier policy: who may call a tier-gated operation.
//
// Evaluated on every request from the freshly loaded account. Fails
// closed: an unsubscribed, free, expired or lower-tier account is refused.

use chrono::{DateTime, Utc};

use pushgate_core::db::models::{Account, Tier};
use pushgate_core::error::{ApiError, ErrorCode, HttpStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("{0} subscription required")]
    SubscriptionRequired(Tier),

    #[error("Subscription has expired")]
    SubscriptionExpired,
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        let code = match err {
            PolicyError::SubscriptionRequired(_) => ErrorCode::SubscriptionRequired,
            PolicyError::SubscriptionExpired => ErrorCode::SubscriptionExpired,
        };
        ApiError::with_message(HttpStatus::Forbidden, code, err.to_string())
    }
}

/// Grant iff `required` is free, or the account holds an active, unexpired
/// subscription whose tier ordinal is at least `required`'s.
pub fn require_tier(account: &Account, required: Tier, now: DateTime<Utc>) -> Result<(), PolicyError> {
    if required == Tier::Free {
        return Ok(());
    }

    if !account.is_subscribed || account.subscription_type == Tier::Free {
        return Err(PolicyError::SubscriptionRequired(required));
    }

    if account.subscription_expiry.is_some_and(|expiry| expiry < now) {
        return Err(PolicyError::SubscriptionExpired);
    }

    if account.subscription_type.ordinal() < required.ordinal() {
        return Err(PolicyError::SubscriptionRequired(required));
    }

    Ok(())
}
