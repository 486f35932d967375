// Service-account key loading.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use pushgate_core::options::PushOptions;
use pushgate_core::push::PushError;

/// The fields of a Google service-account JSON key that FCM needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, PushError> {
        serde_json::from_str(raw).map_err(|e| PushError::Credentials(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, PushError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PushError::Credentials(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Resolve the configured key: inline JSON first, then the key file.
    /// `Ok(None)` when neither is present.
    pub fn load(options: &PushOptions) -> Result<Option<Self>, PushError> {
        if let Some(raw) = &options.firebase_admin_key {
            return Self::from_json(raw).map(Some);
        }
        let path = Path::new(&options.firebase_admin_key_path);
        if path.exists() {
            return Self::from_file(path).map(Some);
        }
        Ok(None)
    }
}
