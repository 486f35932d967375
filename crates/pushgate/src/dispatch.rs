// Notification dispatch: resolve an audience, persist one record per
// recipient, then deliver pushes with bounded concurrency.
//
// Delivery is best effort. Once the records exist the dispatch succeeds;
// provider failures only show up in the returned counts.

use chrono::Utc;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

use pushgate_core::db::adapter::WhereClause;
use pushgate_core::db::models::{Account, Notification, NotificationType, Tier};
use pushgate_core::error::{ApiError, ErrorCode};
use pushgate_core::push::{MulticastReport, PushMessage};

use crate::context::AppContext;
use crate::store::StoreError;

/// Who receives a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// One active account.
    Account(String),
    /// Every active account on the tier.
    Tier(Tier),
    /// Every active account.
    AllActive,
    /// Active, subscribed accounts with at least one push token.
    SubscribedWithTokens,
}

impl Audience {
    fn where_clauses(&self) -> Vec<WhereClause> {
        let mut clauses = vec![WhereClause::eq("isActive", true)];
        match self {
            Self::Account(id) => clauses.push(WhereClause::eq("id", id.as_str())),
            Self::Tier(tier) => clauses.push(WhereClause::eq("subscriptionType", tier.as_str())),
            Self::AllActive => {}
            Self::SubscribedWithTokens => clauses.push(WhereClause::eq("isSubscribed", true)),
        }
        clauses
    }

    fn admits(&self, account: &Account) -> bool {
        match self {
            Self::SubscribedWithTokens => !account.push_tokens.is_empty(),
            _ => true,
        }
    }
}

/// Content of a dispatch.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Per-recipient delivery result.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientOutcome {
    /// No tokens registered; the provider was not called.
    NoToken,
    /// At least one token accepted the message.
    Sent(MulticastReport),
    /// Provider error, or every token rejected.
    Failed(Option<MulticastReport>),
}

/// Aggregate counts returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    /// Records created.
    pub notifications: usize,
    pub target_users: usize,
    #[serde(rename = "pushNotificationsSent")]
    pub sent: usize,
    #[serde(rename = "pushNotificationsFailed")]
    pub failed: usize,
    #[serde(rename = "usersWithoutTokens")]
    pub without_tokens: usize,
    /// Token-level totals across all recipients.
    #[serde(skip)]
    pub token_successes: usize,
    #[serde(skip)]
    pub token_failures: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: &RecipientOutcome) {
        match outcome {
            RecipientOutcome::NoToken => self.without_tokens += 1,
            RecipientOutcome::Sent(report) => {
                self.sent += 1;
                self.token_successes += report.success_count;
                self.token_failures += report.failure_count;
            }
            RecipientOutcome::Failed(report) => {
                self.failed += 1;
                if let Some(report) = report {
                    self.token_failures += report.failure_count;
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no recipients matched the audience")]
    NoRecipients,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NoRecipients => ApiError::not_found(ErrorCode::NoRecipients),
            DispatchError::Store(e) => e.into(),
        }
    }
}

/// Resolve `audience`, persist a record per recipient and fan out pushes.
///
/// Fails only when nobody matched or a record could not be written.
pub async fn dispatch(
    ctx: &AppContext,
    audience: &Audience,
    request: &DispatchRequest,
) -> Result<DispatchSummary, DispatchError> {
    let recipients: Vec<Account> = ctx
        .accounts
        .find_all(audience.where_clauses())
        .await?
        .into_iter()
        .filter(|a| audience.admits(a))
        .collect();

    if recipients.is_empty() {
        return Err(DispatchError::NoRecipients);
    }

    let concurrency = ctx.options.dispatch.concurrency.max(1);

    let records: Vec<(Account, Notification)> = stream::iter(recipients)
        .map(|account| async move {
            let draft = Notification::new(
                request.title.clone(),
                request.message.clone(),
                request.kind,
                Some(account.id.clone()),
                request.data.clone(),
            );
            let record = ctx.notifications.create(&draft).await?;
            Ok::<_, StoreError>((account, record))
        })
        .buffered(concurrency)
        .try_collect()
        .await?;

    let mut summary = DispatchSummary {
        notifications: records.len(),
        target_users: records.len(),
        ..Default::default()
    };

    let outcomes: Vec<RecipientOutcome> = stream::iter(records)
        .map(|(account, record)| deliver(ctx, account, record))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    for outcome in &outcomes {
        summary.record(outcome);
    }

    tracing::info!(
        targets = summary.target_users,
        sent = summary.sent,
        failed = summary.failed,
        without_tokens = summary.without_tokens,
        "dispatch complete"
    );

    Ok(summary)
}

/// Build the provider message for one recipient's record.
pub fn push_message(record: &Notification) -> PushMessage {
    PushMessage::new(record.title.clone(), record.message.clone())
        .with_channel(record.kind.channel())
        .with_data("notificationId", record.id.clone())
        .with_data("type", record.kind.as_str())
        .with_json_data(&record.data)
}

async fn deliver(
    ctx: &AppContext,
    account: Account,
    record: Notification,
) -> RecipientOutcome {
    if account.push_tokens.is_empty() {
        return RecipientOutcome::NoToken;
    }

    match ctx.push.send_multicast(&account.push_tokens, &push_message(&record)).await {
        Ok(report) if report.success_count > 0 => {
            if let Err(e) = ctx.notifications.mark_sent(&record.id, Utc::now()).await {
                tracing::warn!(notification = %record.id, error = %e, "failed to mark notification sent");
            }
            RecipientOutcome::Sent(report)
        }
        Ok(report) => {
            if report.all_failed() {
                tracing::warn!(
                    user = %account.id,
                    tokens = report.failure_count,
                    "every push token rejected; removing them"
                );
                let tried = &account.push_tokens;
                if let Err(e) = ctx.accounts.remove_push_tokens(&account.id, tried).await {
                    tracing::warn!(user = %account.id, error = %e, "failed to remove push tokens");
                }
            }
            RecipientOutcome::Failed(Some(report))
        }
        Err(e) => {
            tracing::warn!(
                user = %account.id,
                provider = ctx.push.name(),
                error = %e,
                "push delivery failed"
            );
            RecipientOutcome::Failed(None)
        }
    }
}
