// Password hashing.
//
// scrypt (N=16384, r=16, p=1, dkLen=64) with a random 16-byte salt.
// Stored format: "hex(salt):hex(key)".

use rand::RngCore;
use scrypt::{scrypt, Params};
use subtle::ConstantTimeEq;

use pushgate_core::error::PushgateError;

/// Hash a password. Returns `salt:key`, both hex-encoded.
pub fn hash_password(password: &str) -> Result<String, PushgateError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt_hex = hex::encode(salt_bytes);

    let key = derive_key(password, &salt_hex)?;
    Ok(format!("{}:{}", salt_hex, hex::encode(key)))
}

/// Verify a password against a hash produced by `hash_password`.
pub fn verify_password(hash: &str, password: &str) -> Result<bool, PushgateError> {
    let (salt, key_hex) = hash
        .split_once(':')
        .ok_or_else(|| PushgateError::Crypto("Invalid password hash format".into()))?;

    let expected_key = hex::decode(key_hex)
        .map_err(|e| PushgateError::Crypto(format!("Invalid hex in password hash: {e}")))?;

    let derived_key = derive_key(password, salt)?;

    Ok(constant_time_equal(&derived_key, &expected_key))
}

/// Compare two byte slices in constant time.
pub fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

fn derive_key(password: &str, salt: &str) -> Result<Vec<u8>, PushgateError> {
    // log2(N)=14
    let params = Params::new(14, 16, 1, 64)
        .map_err(|e| PushgateError::Crypto(format!("Invalid scrypt params: {e}")))?;

    let mut output = vec![0u8; 64];
    scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut output)
        .map_err(|e| PushgateError::Crypto(format!("scrypt failed: {e}")))?;

    Ok(output)
}
