// FcmProvider: PushProvider over the FCM HTTP v1 API.
//
// FCM v1 has no multicast endpoint, so every token is its own request.
// Tokens go out in chunks of at most 500, each chunk concurrently.
// Only errors that blame the token itself (UNREGISTERED, SENDER_ID_MISMATCH,
// 404, INVALID_ARGUMENT on `message.token`) count as per-token failures.
// When nothing was delivered and some request failed for another reason,
// the whole call is an error instead: an outage (network, auth, 429, 5xx)
// is `Transport`, a refused payload is `InvalidMessage`. Callers must never
// mistake either for dead tokens.

use async_trait::async_trait;
use futures_util::future::join_all;

use pushgate_core::push::{MulticastReport, PushError, PushMessage, PushProvider, TokenResponse};

use crate::auth::AccessTokenSource;
use crate::credentials::ServiceAccountKey;
use crate::message::{build_message, error_code, is_token_rejection};

pub const FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
pub const MAX_TOKENS_PER_BATCH: usize = 500;

#[derive(Debug)]
enum Outcome {
    Delivered(String),
    /// The token is invalid or no longer registered.
    Rejected(String),
    /// The message was refused; the token may be fine.
    Invalid(String),
    Unavailable(String),
}

#[derive(Debug)]
pub struct FcmProvider {
    http: reqwest::Client,
    send_url: String,
    auth: AccessTokenSource,
}

impl FcmProvider {
    pub fn new(key: &ServiceAccountKey) -> Result<Self, PushError> {
        Self::with_endpoint(key, FCM_ENDPOINT)
    }

    /// Use a different API host (tests, emulators).
    pub fn with_endpoint(key: &ServiceAccountKey, endpoint: &str) -> Result<Self, PushError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PushError::Transport(e.to_string()))?;
        let auth = AccessTokenSource::new(key, http.clone())?;
        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            endpoint.trim_end_matches('/'),
            key.project_id
        );
        tracing::info!(project = %key.project_id, "fcm: push provider initialized");
        Ok(Self {
            http,
            send_url,
            auth,
        })
    }

    async fn send_one(&self, access_token: &str, token: &str, message: &PushMessage) -> Outcome {
        let response = match self
            .http
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&build_message(token, message))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Outcome::Unavailable(e.to_string()),
        };

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();

        if status.is_success() {
            let name = body["name"].as_str().unwrap_or_default().to_string();
            return Outcome::Delivered(name);
        }

        let code = error_code(status.as_u16(), &body);
        if is_token_rejection(status.as_u16(), &body) {
            return Outcome::Rejected(code);
        }
        match status.as_u16() {
            401 | 403 | 429 | 500..=599 => Outcome::Unavailable(format!("{status}: {code}")),
            _ => {
                let detail = body["error"]["message"].as_str().unwrap_or_default();
                Outcome::Invalid(format!("{code}: {detail}"))
            }
        }
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    fn name(&self) -> &'static str {
        "fcm"
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastReport, PushError> {
        if tokens.is_empty() {
            return Ok(MulticastReport::default());
        }

        let access_token = self.auth.access_token().await?;
        let mut report = MulticastReport::default();
        let mut unavailable: Option<String> = None;
        let mut invalid: Option<String> = None;

        for chunk in tokens.chunks(MAX_TOKENS_PER_BATCH) {
            let outcomes = join_all(
                chunk
                    .iter()
                    .map(|token| self.send_one(&access_token, token, message)),
            )
            .await;

            let mut responses = Vec::with_capacity(chunk.len());
            for (token, outcome) in chunk.iter().zip(outcomes) {
                responses.push(match outcome {
                    Outcome::Delivered(id) => TokenResponse::delivered(token.as_str(), id),
                    Outcome::Rejected(code) => TokenResponse::failed(token.as_str(), code),
                    Outcome::Invalid(err) => {
                        invalid.get_or_insert_with(|| err.clone());
                        TokenResponse::failed(token.as_str(), err)
                    }
                    Outcome::Unavailable(err) => {
                        unavailable.get_or_insert_with(|| err.clone());
                        TokenResponse::failed(token.as_str(), err)
                    }
                });
            }
            report.absorb(MulticastReport::from_responses(responses));
        }

        if report.success_count == 0 {
            if let Some(err) = unavailable {
                tracing::warn!(tokens = tokens.len(), error = %err, "fcm: delivery unavailable");
                return Err(PushError::Transport(err));
            }
            if let Some(err) = invalid {
                tracing::warn!(tokens = tokens.len(), error = %err, "fcm: message rejected");
                return Err(PushError::InvalidMessage(err));
            }
        }

        tracing::debug!(
            success = report.success_count,
            failure = report.failure_count,
            "fcm: multicast complete"
        );
        Ok(report)
    }
}
