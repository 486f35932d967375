// Scripted push provider for tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use pushgate_core::push::{MulticastReport, PushError, PushMessage, PushProvider, TokenResponse};

/// One `send_multicast` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub tokens: Vec<String>,
    pub message: PushMessage,
}

/// Push provider whose per-token outcomes are set up front.
///
/// Tokens delivered successfully get a message id of `msg-<token>`. Tokens
/// registered with [`fail_token`](Self::fail_token) come back as
/// `UNREGISTERED`. [`fail_with`](Self::fail_with) makes every call return a
/// provider-level error instead. [`hold_sends`](Self::hold_sends) parks
/// sends until the test releases them.
#[derive(Debug, Default)]
pub struct ScriptedPushProvider {
    failing: Mutex<HashSet<String>>,
    provider_error: Mutex<Option<PushError>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Mutex<Option<Arc<SendGate>>>,
}

/// Pause point inside `send_multicast`.
#[derive(Debug, Default)]
pub struct SendGate {
    reached: Notify,
    release: Notify,
}

impl SendGate {
    /// Wait until a send is parked at the gate.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Let one parked send continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

impl ScriptedPushProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_token(&self, token: impl Into<String>) -> &Self {
        lock(&self.failing).insert(token.into());
        self
    }

    pub fn fail_with(&self, err: PushError) -> &Self {
        *lock(&self.provider_error) = Some(err);
        self
    }

    /// Park every later send until [`SendGate::release`] is called for it.
    pub fn hold_sends(&self) -> Arc<SendGate> {
        let gate = Arc::new(SendGate::default());
        *lock(&self.gate) = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Whether any call included `token`.
    pub fn was_sent_to(&self, token: &str) -> bool {
        lock(&self.calls)
            .iter()
            .any(|c| c.tokens.iter().any(|t| t == token))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl PushProvider for ScriptedPushProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushError> {
        lock(&self.calls).push(RecordedCall {
            tokens: tokens.to_vec(),
            message: message.clone(),
        });

        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }

        if let Some(err) = lock(&self.provider_error).clone() {
            return Err(err);
        }

        let failing = lock(&self.failing);
        let responses = tokens
            .iter()
            .map(|t| {
                if failing.contains(t) {
                    TokenResponse::failed(t.as_str(), "UNREGISTERED")
                } else {
                    TokenResponse::delivered(t.as_str(), format!("msg-{t}"))
                }
            })
            .collect();
        Ok(MulticastReport::from_responses(responses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_outcomes() {
        let provider = ScriptedPushProvider::new();
        provider.fail_token("bad");

        let report = provider
            .send_multicast(&["good".into(), "bad".into()], &PushMessage::new("t", "b"))
            .await
            .unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.responses[0].message_id.as_deref(), Some("msg-good"));
        assert!(provider.was_sent_to("bad"));

        provider.fail_with(PushError::Transport("down".into()));
        let err = provider
            .send_multicast(&["good".into()], &PushMessage::new("t", "b"))
            .await;
        assert!(err.is_err());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_held_send_waits_for_release() {
        let provider = ScriptedPushProvider::new();
        let gate = provider.hold_sends();
        let message = PushMessage::new("t", "b");
        let tokens = vec!["good".to_string()];

        let (report, ()) = tokio::join!(provider.send_multicast(&tokens, &message), async {
            gate.reached().await;
            gate.release();
        });
        assert_eq!(report.unwrap().success_count, 1);
    }
}
