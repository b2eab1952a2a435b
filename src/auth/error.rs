use super::traits::UserId;

pub type Result<T> = std::result::Result<T, AuthError>;

/// Failures surfaced to callers.
///
/// Wrong passwords, unknown usernames and bad cookies are not represented
/// here; those come back as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A lookup that must be unique matched several records.
    #[error("{count} users match username '{username}'")]
    MultipleMatchingUsers { username: String, count: usize },

    /// Cookie operation attempted for a user type without cookie auth.
    #[error("user '{username}' does not support cookie authentication")]
    UnsupportedUserKind { username: String },

    #[error("no user is signed in")]
    NotSignedIn,

    /// The cached identity no longer resolves to a stored user.
    #[error("signed-in user {0} no longer exists")]
    StaleIdentity(UserId),

    #[error("user repository failure: {0}")]
    Repository(#[from] anyhow::Error),
}
