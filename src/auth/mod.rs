//! Session authentication with remember-me cookies.
//!
//! Provides:
//! - Per-session sign-in state machine (credentials or cookie pair)
//! - Stateless remember-me tokens (HMAC-SHA256 over user data + server secret)
//! - Cookie transport over HTTP `Cookie` / `Set-Cookie` headers
//! - SQLite-backed user store
//!
//! ## Design Decisions
//! - No server-side token table. A token is recomputed on every cookie
//!   sign-in; rotating the server secret invalidates every outstanding cookie.
//! - Token material comes from the user record. The SQLite store uses the
//!   password hash, so changing a password revokes that user's cookies.
//! - Wrong credentials and bad cookies are `Ok(false)`, never errors.

pub mod cookies;
pub mod error;
pub mod session;
pub mod store;
pub mod token;
pub mod traits;

pub use cookies::{CookieExchange, CookieNames};
pub use error::{AuthError, Result};
pub use session::AuthSession;
pub use store::{StoredUser, UserStore};
pub use token::{generate_token, validate_token, ServerSecret};
pub use traits::{CookieScope, CookieTransport, UserId, UserRecord, UserRepository};
