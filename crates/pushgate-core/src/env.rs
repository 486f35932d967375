// Environment detection and logger configuration.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Cached environment mode.
static ENV_MODE: OnceLock<EnvMode> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    Production,
    #[default]
    Development,
    Test,
}

impl EnvMode {
    /// Unknown or empty values fall back to development.
    pub fn parse_lossy(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" | "testing" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Detect the current environment mode from environment variables.
/// Checks `PUSHGATE_ENV`, then `RUST_ENV`.
pub fn detect_env_mode() -> EnvMode {
    *ENV_MODE.get_or_init(|| {
        let env_val = std::env::var("PUSHGATE_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        EnvMode::parse_lossy(&env_val)
    })
}

pub fn is_production() -> bool {
    detect_env_mode() == EnvMode::Production
}

/// Initialize the `tracing` subscriber. `RUST_LOG` wins over the
/// mode-based default.
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production() {
            EnvFilter::new("pushgate=info,tower_http=info")
        } else {
            EnvFilter::new("pushgate=debug,tower_http=debug")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lossy() {
        assert_eq!(EnvMode::parse_lossy("PRODUCTION"), EnvMode::Production);
        assert_eq!(EnvMode::parse_lossy("test"), EnvMode::Test);
        assert_eq!(EnvMode::parse_lossy(""), EnvMode::Development);
        assert_eq!(EnvMode::parse_lossy("staging"), EnvMode::Development);
    }
}
