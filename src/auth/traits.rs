//! Capabilities the session consumes: user records, user lookup and cookie
//! transport. Concrete implementations live in [`super::store`] and
//! [`super::cookies`]; hosts can supply their own.

use super::error::Result;
use std::borrow::Cow;
use std::fmt;

// ── Identity ─────────────────────────────────────────────────────

/// Opaque key referencing a persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ── User record ──────────────────────────────────────────────────

/// A stored user as seen by the session.
pub trait UserRecord {
    /// Storage identity used to re-resolve the record on later requests.
    fn id(&self) -> UserId;

    fn username(&self) -> &str;

    /// Verify a plaintext password against the record's own credentials.
    fn check_password(&self, password: &str) -> bool;

    /// Whether this record can be remembered with a cookie pair.
    fn supports_cookie_auth(&self) -> bool {
        false
    }

    /// Per-user bytes mixed into the remember-me token. Changing them
    /// revokes every cookie issued for the user.
    fn token_material(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&[])
    }
}

// ── User repository ──────────────────────────────────────────────

/// Lookup of user records by username or identity.
pub trait UserRepository {
    type User: UserRecord;

    /// `Ok(None)` when nothing matches. More than one match must be
    /// reported as [`AuthError::MultipleMatchingUsers`](super::AuthError).
    fn find_by_username(&self, username: &str) -> Result<Option<Self::User>>;

    fn find_by_identity(&self, id: &UserId) -> Result<Option<Self::User>>;

    /// Whether the repository's user type supports cookie sign-in at all.
    /// When false, sessions never look at the remember-me cookies.
    fn supports_cookie_auth(&self) -> bool {
        true
    }
}

// ── Cookie transport ─────────────────────────────────────────────

/// Scope attributes shared by setting and clearing a cookie. Clearing only
/// works when the path matches the one the cookie was set with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieScope<'a> {
    pub path: &'a str,
    pub secure: bool,
}

/// Request/response cookie access for one request cycle.
pub trait CookieTransport {
    fn get_cookie(&self, name: &str) -> Option<String>;

    fn set_cookie(&mut self, name: &str, value: &str, max_age_secs: u64, scope: CookieScope<'_>);

    /// Remove a cookie. Clearing an absent cookie is not an error.
    fn clear_cookie(&mut self, name: &str, scope: CookieScope<'_>);
}
