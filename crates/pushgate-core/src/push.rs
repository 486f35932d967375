// Push provider abstraction.
//
// A provider turns a set of device tokens plus one message into a
// per-token delivery report. Implementations make a single attempt; the
// dispatch orchestrator decides what a failure means.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One push message, shared by every token in a multicast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Provider data payload. Values are strings on the wire.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Android notification channel.
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_channel() -> String {
    "default".to_string()
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
            channel: default_channel(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Merge a JSON object into the data payload. Strings are kept as-is;
    /// every other value is written as its JSON text.
    pub fn with_json_data(mut self, data: &serde_json::Map<String, serde_json::Value>) -> Self {
        for (key, value) in data {
            self.data.insert(key.clone(), stringify_value(value));
        }
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Render a JSON value as a provider data string.
pub fn stringify_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Outcome for a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenResponse {
    pub fn delivered(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(token: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Result of one multicast call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub responses: Vec<TokenResponse>,
}

impl MulticastReport {
    pub fn from_responses(responses: Vec<TokenResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.success).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }

    /// Merge another report (e.g. a later chunk) into this one.
    pub fn absorb(&mut self, other: MulticastReport) {
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.responses.extend(other.responses);
    }

    /// True when per-token results exist and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        !self.responses.is_empty() && self.success_count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("push provider is not configured")]
    NotConfigured,

    #[error("invalid push credentials: {0}")]
    Credentials(String),

    #[error("push provider authentication failed: {0}")]
    Auth(String),

    #[error("push transport error: {0}")]
    Transport(String),

    /// The provider refused the message itself. Device tokens are not at
    /// fault.
    #[error("push message rejected: {0}")]
    InvalidMessage(String),
}

/// Sends messages to device tokens.
#[async_trait]
pub trait PushProvider: Send + Sync + fmt::Debug {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Send `message` to every token. Per-token failures are reported in
    /// the returned report; `Err` means the provider could not be used at
    /// all.
    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushError>;
}

/// Provider used when no credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPushProvider;

#[async_trait]
impl PushProvider for DisabledPushProvider {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn send_multicast(
        &self,
        _tokens: &[String],
        _message: &PushMessage,
    ) -> Result<MulticastReport, PushError> {
        Err(PushError::NotConfigured)
    }
}
