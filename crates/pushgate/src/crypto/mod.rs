// Crypto: password hashing, access tokens, random secrets.

pub mod jwt;
pub mod password;
pub mod random;

pub use jwt::{sign_access_token, verify_access_token, AccessClaims};
pub use password::{hash_password, verify_password};
pub use random::generate_secret;
