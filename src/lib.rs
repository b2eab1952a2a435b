//! Session authentication with persistent "remember me" cookie sign-in.
//!
//! A per-session [`AuthSession`] decides whether a request belongs to a
//! signed-in user, either through explicit credentials or through a
//! username + token cookie pair issued on an earlier sign-in.

pub mod auth;
pub mod config;

pub use auth::{
    AuthError, AuthSession, CookieExchange, CookieNames, CookieScope, CookieTransport, Result,
    ServerSecret, StoredUser, UserId, UserRecord, UserRepository, UserStore,
};
pub use config::{AuthConfig, AuthSettings};
