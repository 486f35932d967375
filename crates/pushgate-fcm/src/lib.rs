// pushgate-fcm: Firebase Cloud Messaging push provider.
//
// Sends through the FCM HTTP v1 API. Access tokens come from the
// service-account OAuth2 JWT bearer flow and are cached until shortly
// before they expire.

pub mod auth;
pub mod credentials;
pub mod message;
pub mod provider;

pub use credentials::ServiceAccountKey;
pub use provider::FcmProvider;
