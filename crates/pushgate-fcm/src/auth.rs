// OAuth2 access tokens for the FCM API.
//
// A short-lived RS256 assertion signed with the service-account key is
// exchanged at the key's `token_uri`. The resulting access token is cached
// and reused until 60 seconds before it expires.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use pushgate_core::push::PushError;

use crate::credentials::ServiceAccountKey;

const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Mints and caches access tokens for one service account.
pub struct AccessTokenSource {
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    http: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for AccessTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenSource")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl AccessTokenSource {
    pub fn new(key: &ServiceAccountKey, http: reqwest::Client) -> Result<Self, PushError> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| PushError::Credentials(format!("private_key: {e}")))?;
        Ok(Self {
            client_email: key.client_email.clone(),
            token_uri: key.token_uri.clone(),
            signing_key,
            http,
            cache: Mutex::new(None),
        })
    }

    /// A valid access token, from cache when possible.
    pub async fn access_token(&self) -> Result<String, PushError> {
        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.exchange(now).await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, PushError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| PushError::Credentials(format!("signing assertion: {e}")))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, PushError> {
        let assertion = self.assertion(now)?;
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| PushError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let data: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| PushError::Auth(format!("invalid token response: {e}")))?;

        tracing::debug!(expires_in = data.expires_in, "fcm: obtained access token");
        Ok(CachedToken {
            token: data.access_token,
            expires_at: now + Duration::seconds(data.expires_in),
        })
    }
}
