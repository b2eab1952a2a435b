//! Authentication settings, loaded from TOML.
//!
//! ```toml
//! app_name = "Shop"
//! secret = "change-me"
//! cookie_max_age_days = 31
//! secure_cookies = true
//! ```

use crate::auth::cookies::{is_cookie_name, CookieNames, DEFAULT_COOKIE_PATH};
use crate::auth::token::ServerSecret;
use crate::auth::traits::CookieScope;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Default remember-me lifetime: 31 days.
const DEFAULT_COOKIE_MAX_AGE_DAYS: u32 = 31;

const SECS_PER_DAY: u64 = 24 * 3600;

/// Raw configuration as written by the operator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Cookie name prefix (`<app_name>_USER`, `<app_name>_AUTH`).
    pub app_name: String,
    /// Key for remember-me tokens. Rotating it signs every user out of
    /// their remembered sessions.
    pub secret: String,
    pub cookie_max_age_days: u32,
    pub cookie_path: String,
    /// Add the `Secure` attribute to issued cookies.
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_name: String::new(),
            secret: String::new(),
            cookie_max_age_days: DEFAULT_COOKIE_MAX_AGE_DAYS,
            cookie_path: DEFAULT_COOKIE_PATH.to_string(),
            secure_cookies: false,
        }
    }
}

impl AuthConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("Failed to parse auth config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read auth config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let app_name = self.app_name.trim();
        if !app_name.is_empty() && !is_cookie_name(app_name) {
            bail!("app_name '{app_name}' contains characters not allowed in cookie names");
        }
        if self.secret.trim().is_empty() {
            bail!("Auth secret cannot be empty");
        }
        if self.cookie_max_age_days == 0 {
            bail!("cookie_max_age_days must be at least 1");
        }
        if !self.cookie_path.starts_with('/') {
            bail!("cookie_path must start with '/'");
        }
        Ok(())
    }

    pub fn cookie_names(&self) -> CookieNames {
        CookieNames::for_app(&self.app_name)
    }

    pub fn cookie_max_age_secs(&self) -> u64 {
        u64::from(self.cookie_max_age_days) * SECS_PER_DAY
    }

    pub fn server_secret(&self) -> ServerSecret {
        ServerSecret::new(self.secret.as_bytes())
    }

    /// Validate and convert into the runtime form shared by sessions.
    pub fn into_settings(self) -> Result<AuthSettings> {
        self.validate()?;
        Ok(AuthSettings {
            cookie_names: self.cookie_names(),
            cookie_max_age_secs: self.cookie_max_age_secs(),
            secret: self.server_secret(),
            cookie_path: self.cookie_path,
            secure_cookies: self.secure_cookies,
        })
    }
}

/// Validated settings, shared by every session of an application.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub cookie_names: CookieNames,
    pub cookie_max_age_secs: u64,
    pub cookie_path: String,
    pub secure_cookies: bool,
    pub secret: ServerSecret,
}

impl AuthSettings {
    /// Settings with defaults for everything but the secret.
    pub fn new(secret: ServerSecret) -> Self {
        let defaults = AuthConfig::default();
        Self {
            cookie_names: defaults.cookie_names(),
            cookie_max_age_secs: defaults.cookie_max_age_secs(),
            cookie_path: defaults.cookie_path,
            secure_cookies: defaults.secure_cookies,
            secret,
        }
    }

    pub fn with_app_name(mut self, app_name: &str) -> Self {
        self.cookie_names = CookieNames::for_app(app_name);
        self
    }

    /// Path and `Secure` flag for both issuing and clearing the cookie pair.
    pub fn cookie_scope(&self) -> CookieScope<'_> {
        CookieScope {
            path: &self.cookie_path,
            secure: self.secure_cookies,
        }
    }
}
