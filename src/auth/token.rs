//! Stateless remember-me tokens.
//!
//! `token = hex(HMAC-SHA256(secret, len(username) || username || material))`
//!
//! The same user and secret always yield the same token, so validation needs
//! no server-side storage.

use super::error::{AuthError, Result};
use super::traits::UserRecord;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Server-side key for token signing. `Debug` never prints the key.
#[derive(Clone)]
pub struct ServerSecret(Vec<u8>);

impl ServerSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self(secret.as_ref().to_vec())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerSecret(<redacted>)")
    }
}

/// Compute the remember-me token for `user`.
pub fn generate_token<U>(user: &U, secret: &ServerSecret) -> Result<String>
where
    U: UserRecord + ?Sized,
{
    if !user.supports_cookie_auth() {
        return Err(AuthError::UnsupportedUserKind {
            username: user.username().to_string(),
        });
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can accept any key length");
    let username = user.username().as_bytes();
    // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
    mac.update(&(username.len() as u64).to_be_bytes());
    mac.update(username);
    mac.update(&user.token_material());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// True iff `candidate` is exactly the token [`generate_token`] produces.
pub fn validate_token<U>(user: &U, secret: &ServerSecret, candidate: &str) -> Result<bool>
where
    U: UserRecord + ?Sized,
{
    let expected = generate_token(user, secret)?;
    Ok(constant_time_eq(expected.as_bytes(), candidate.as_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
