// Access tokens: HS256 JWTs carrying the account id and email.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use pushgate_core::error::PushgateError;

/// Claims embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign an access token valid for `expires_in_secs`.
pub fn sign_access_token(
    user_id: &str,
    email: &str,
    secret: &str,
    expires_in_secs: u64,
) -> Result<String, PushgateError> {
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + expires_in_secs as i64,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| PushgateError::Crypto(format!("JWT signing failed: {e}")))
}

/// Verify signature and expiry. `None` for any invalid token.
pub fn verify_access_token(token: &str, secret: &str) -> Option<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    jsonwebtoken::decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .ok()
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let token = sign_access_token("u1", "a@x.io", "secret", 3600).unwrap();
        let claims = verify_access_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.email, "a@x.io");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_claims_use_camel_case() {
        let token = sign_access_token("u1", "a@x.io", "secret", 60).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        // base64url of `{"userId"` starts with eyJ1c2VySWQi
        assert!(payload.starts_with("eyJ1c2VySWQi"));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = sign_access_token("u1", "a@x.io", "right", 3600).unwrap();
        assert!(verify_access_token(&token, "wrong").is_none());
    }

    #[test]
    fn test_expired_token_fails() {
        let now = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            user_id: "u1".into(),
            email: "a@x.io".into(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(verify_access_token(&token, "secret").is_none());
    }

    #[test]
    fn test_garbage_fails() {
        assert!(verify_access_token("not.a.jwt", "secret").is_none());
    }
}
