//! Cookie transport over HTTP headers.
//!
//! [`CookieExchange`] wraps one request cycle: a `cookie::CookieJar` seeded
//! with the request's `Cookie` headers, whose delta becomes the response's
//! `Set-Cookie` headers.

use super::traits::{CookieScope, CookieTransport};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use cookie::time::Duration;
use cookie::{Cookie, CookieJar, SameSite};

/// Default cookie path scope.
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Names of the remember-me cookie pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    /// Carries the percent-encoded username.
    pub user: String,
    /// Carries the remember-me token.
    pub auth: String,
}

impl CookieNames {
    /// `<app>_USER` / `<app>_AUTH`, or plain `USER` / `AUTH` without an app name.
    pub fn for_app(app_name: &str) -> Self {
        let app_name = app_name.trim();
        if app_name.is_empty() {
            return Self {
                user: "USER".into(),
                auth: "AUTH".into(),
            };
        }
        Self {
            user: format!("{app_name}_USER"),
            auth: format!("{app_name}_AUTH"),
        }
    }
}

impl Default for CookieNames {
    fn default() -> Self {
        Self::for_app("")
    }
}

/// Whether `name` is an RFC 6265 token, usable as a cookie name.
pub fn is_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
}

/// Request cookies in, `Set-Cookie` headers out.
///
/// Reads observe changes made earlier in the same exchange, so a cookie
/// cleared by a sign-out reads as absent for the rest of the request.
#[derive(Debug, Clone, Default)]
pub struct CookieExchange {
    jar: CookieJar,
}

impl CookieExchange {
    /// Exchange with no request cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `Cookie` header of a request. Malformed pairs are skipped;
    /// for repeated names the first occurrence wins.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut exchange = Self::new();
        for raw in headers.get_all(COOKIE) {
            let Ok(raw) = raw.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(raw).flatten() {
                if exchange.jar.get(cookie.name()).is_none() {
                    exchange.jar.add_original(cookie.into_owned());
                }
            }
        }
        exchange
    }

    /// Add a request cookie, as if the client had sent it.
    pub fn with_request_cookie(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.jar.add_original(Cookie::new(name.into(), value.into()));
        self
    }

    /// Render changes made during this exchange as `Set-Cookie` header values.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.jar.delta().map(|cookie| cookie.to_string()).collect()
    }

    /// Append the `Set-Cookie` headers to a response header map.
    pub fn apply_to(&self, headers: &mut HeaderMap) {
        for cookie in self.set_cookie_headers() {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping cookie with invalid header characters");
                }
            }
        }
    }

    /// Request headers a client would send back after storing this
    /// exchange's cookies on top of the ones it already had.
    pub fn replay_headers(&self) -> HeaderMap {
        let mut pairs: Vec<String> = self
            .jar
            .iter()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect();
        pairs.sort();

        let mut headers = HeaderMap::new();
        if pairs.is_empty() {
            return headers;
        }
        if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
            headers.insert(COOKIE, value);
        }
        headers
    }
}

impl CookieTransport for CookieExchange {
    fn get_cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|cookie| cookie.value().to_string())
    }

    fn set_cookie(&mut self, name: &str, value: &str, max_age_secs: u64, scope: CookieScope<'_>) {
        let max_age = Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX));
        self.jar.add(
            scoped(name, value, scope)
                .max_age(max_age)
                .build()
                .into_owned(),
        );
    }

    fn clear_cookie(&mut self, name: &str, scope: CookieScope<'_>) {
        self.jar.remove(scoped(name, "", scope).build().into_owned());
    }
}

fn scoped<'c>(
    name: &'c str,
    value: &'c str,
    scope: CookieScope<'c>,
) -> cookie::CookieBuilder<'c> {
    Cookie::build((name, value))
        .path(scope.path)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(scope.secure)
}
