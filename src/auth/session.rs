//! Per-session sign-in state.
//!
//! ## States
//! - signed out (initial): no identity cached
//! - signed in: a [`UserId`] is cached; the record itself is re-resolved
//!   from the repository whenever it is needed
//!
//! Credential sign-in always signs out first. Cookie sign-in happens lazily
//! the first time [`AuthSession::is_signed_in`] is asked while signed out.

use super::cookies::CookieNames;
use super::error::{AuthError, Result};
use super::token::{generate_token, validate_token};
use super::traits::{CookieTransport, UserId, UserRecord, UserRepository};
use crate::config::AuthSettings;
use parking_lot::Mutex;
use std::sync::Arc;

/// Authentication state of one client session.
///
/// Methods take `&self`; the identity sits behind a mutex that is only held
/// for the state change itself, never across repository calls.
pub struct AuthSession<R: UserRepository> {
    repo: Arc<R>,
    settings: Arc<AuthSettings>,
    user_id: Mutex<Option<UserId>>,
}

impl<R: UserRepository> AuthSession<R> {
    pub fn new(repo: Arc<R>, settings: Arc<AuthSettings>) -> Self {
        Self {
            repo,
            settings,
            user_id: Mutex::new(None),
        }
    }

    /// Cached identity, without attempting a cookie sign-in.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id.lock().clone()
    }

    pub fn cookie_names(&self) -> &CookieNames {
        &self.settings.cookie_names
    }

    /// Whether the repository's user type can be remembered with cookies.
    pub fn cookie_sign_in_supported(&self) -> bool {
        self.repo.supports_cookie_auth()
    }

    /// True if an identity is cached, or if the request carries a valid
    /// remember-me cookie pair (which then becomes the cached identity).
    pub fn is_signed_in(&self, cookies: &dyn CookieTransport) -> Result<bool> {
        if self.user_id.lock().is_some() {
            return Ok(true);
        }
        if !self.cookie_sign_in_supported() {
            return Ok(false);
        }
        self.cookie_sign_in(cookies)
    }

    /// Sign in with credentials. Any previous sign-in is cleared first,
    /// cookies included. Wrong credentials yield `Ok(false)`.
    pub fn sign_in(
        &self,
        cookies: &mut dyn CookieTransport,
        username: &str,
        password: &str,
        remember: bool,
    ) -> Result<bool> {
        self.sign_out(cookies);

        let Some(user) = self.repo.find_by_username(username)? else {
            tracing::debug!(username = username, "Sign-in failed: unknown user");
            return Ok(false);
        };
        if !user.check_password(password) {
            tracing::debug!(username = username, "Sign-in failed: bad password");
            return Ok(false);
        }

        self.sign_in_user(cookies, &user, remember)?;
        tracing::info!(user_id = %user.id(), remember = remember, "User signed in");
        Ok(true)
    }

    /// Sign in a user whose credentials were verified elsewhere. The record
    /// must already be persisted in the repository.
    ///
    /// With `remember`, a user type lacking cookie auth is rejected before
    /// any state changes.
    pub fn sign_in_user(
        &self,
        cookies: &mut dyn CookieTransport,
        user: &R::User,
        remember: bool,
    ) -> Result<()> {
        if remember {
            self.ensure_cookie_auth(user)?;
        }
        *self.user_id.lock() = Some(user.id());
        if remember {
            self.write_cookies_for(cookies, user)?;
        }
        Ok(())
    }

    /// Try to sign in from the remember-me cookie pair. Never modifies the
    /// cookies: a mismatch or an unknown user leaves them in place.
    ///
    /// A session already signed in as someone else keeps its identity and
    /// gets `Ok(false)`.
    pub fn cookie_sign_in(&self, cookies: &dyn CookieTransport) -> Result<bool> {
        let names = &self.settings.cookie_names;
        let (Some(raw_username), Some(token)) =
            (cookies.get_cookie(&names.user), cookies.get_cookie(&names.auth))
        else {
            return Ok(false);
        };

        let username = match urlencoding::decode(&raw_username) {
            Ok(name) => name.into_owned(),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable username cookie");
                return Ok(false);
            }
        };

        let Some(user) = self.repo.find_by_username(&username)? else {
            tracing::debug!(username = %username, "Cookie sign-in failed: unknown user");
            return Ok(false);
        };
        if !user.supports_cookie_auth() {
            return Ok(false);
        }
        if !validate_token(&user, &self.settings.secret, &token)? {
            tracing::debug!(username = %username, "Cookie sign-in failed: token mismatch");
            return Ok(false);
        }

        let user_id = user.id();
        {
            let mut state = self.user_id.lock();
            if let Some(current) = state.as_ref() {
                return Ok(*current == user_id);
            }
            *state = Some(user_id.clone());
        }
        tracing::info!(user_id = %user_id, "User signed in from cookie");
        Ok(true)
    }

    /// Issue the remember-me cookie pair for the signed-in user.
    pub fn write_cookies(&self, cookies: &mut dyn CookieTransport) -> Result<()> {
        let user_id = self.user_id().ok_or(AuthError::NotSignedIn)?;
        let user = self.resolve(&user_id)?;
        self.write_cookies_for(cookies, &user)
    }

    /// Forget the identity and clear both cookies. Safe to repeat.
    pub fn sign_out(&self, cookies: &mut dyn CookieTransport) {
        let previous = self.user_id.lock().take();
        let names = &self.settings.cookie_names;
        let scope = self.settings.cookie_scope();
        cookies.clear_cookie(&names.auth, scope);
        cookies.clear_cookie(&names.user, scope);

        if let Some(user_id) = previous {
            tracing::info!(user_id = %user_id, "User signed out");
        }
    }

    /// The signed-in user's record, or `None` when signed out.
    pub fn current_user(&self, cookies: &dyn CookieTransport) -> Result<Option<R::User>> {
        if !self.is_signed_in(cookies)? {
            return Ok(None);
        }
        let Some(user_id) = self.user_id() else {
            return Ok(None);
        };
        self.resolve(&user_id).map(Some)
    }

    /// Like [`Self::current_user`], but signed out is an error.
    pub fn require_user(&self, cookies: &dyn CookieTransport) -> Result<R::User> {
        self.current_user(cookies)?.ok_or(AuthError::NotSignedIn)
    }

    fn resolve(&self, user_id: &UserId) -> Result<R::User> {
        if let Some(user) = self.repo.find_by_identity(user_id)? {
            return Ok(user);
        }

        tracing::warn!(user_id = %user_id, "Signed-in user no longer exists; dropping identity");
        let mut state = self.user_id.lock();
        if state.as_ref() == Some(user_id) {
            *state = None;
        }
        Err(AuthError::StaleIdentity(user_id.clone()))
    }

    fn ensure_cookie_auth(&self, user: &R::User) -> Result<()> {
        if self.cookie_sign_in_supported() && user.supports_cookie_auth() {
            return Ok(());
        }
        Err(AuthError::UnsupportedUserKind {
            username: user.username().to_string(),
        })
    }

    fn write_cookies_for(&self, cookies: &mut dyn CookieTransport, user: &R::User) -> Result<()> {
        self.ensure_cookie_auth(user)?;
        let token = generate_token(user, &self.settings.secret)?;
        let username = urlencoding::encode(user.username());

        let names = &self.settings.cookie_names;
        let max_age = self.settings.cookie_max_age_secs;
        let scope = self.settings.cookie_scope();
        cookies.set_cookie(&names.user, &username, max_age, scope);
        cookies.set_cookie(&names.auth, &token, max_age, scope);
        Ok(())
    }
}
