// common/src/store.rs
use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, CookieJar, SameSite};
use actix_web::{HttpRequest, HttpResponse};

use crate::error::SessionError;
use crate::token::SESSION_TTL_SECS;

/// Cookie name for the session token
pub const SESSION_COOKIE_NAME: &str = "session";

/// Where the current request's session token lives.
///
/// Implementations are scoped to a single request/response pair.
pub trait SessionStore {
    /// The stored token, or `None` for an anonymous visitor.
    fn read(&self) -> Option<String>;

    fn write(&mut self, token: &str) -> Result<(), SessionError>;

    /// Remove the token. Clearing an absent token is a no-op.
    fn clear(&mut self) -> Result<(), SessionError>;
}

/// Cookie-backed store over a per-request jar.
///
/// Reads see the request's cookies plus anything written since; writes are
/// collected as a delta and land on the response via [`apply_to`](Self::apply_to).
#[derive(Debug, Clone, Default)]
pub struct CookieSessionStore {
    jar: CookieJar,
    secure: bool,
}

impl CookieSessionStore {
    /// Seed from the request's `Cookie` header.
    pub fn from_request(req: &HttpRequest, secure: bool) -> Self {
        let cookies: Vec<Cookie<'static>> = match req.cookies() {
            Ok(cookies) => cookies.iter().map(|c| c.clone().into_owned()).collect(),
            Err(e) => {
                // Client-supplied garbage; treat the visitor as anonymous
                tracing::debug!("Ignoring malformed Cookie header: {}", e);
                Vec::new()
            }
        };

        Self::from_cookies(cookies, secure)
    }

    pub fn from_cookies<I>(cookies: I, secure: bool) -> Self
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        let mut jar = CookieJar::new();
        for cookie in cookies {
            jar.add_original(cookie);
        }
        Self { jar, secure }
    }

    /// Cookies that must be sent back with the response
    pub fn pending(&self) -> impl Iterator<Item = &Cookie<'static>> {
        self.jar.delta()
    }

    /// Write pending cookies onto `response` as `Set-Cookie` headers.
    pub fn apply_to(&self, response: &mut HttpResponse) -> Result<(), SessionError> {
        for cookie in self.jar.delta() {
            response.add_cookie(cookie).map_err(|e| {
                tracing::error!("Failed to set session cookie: {}", e);
                SessionError::Store(e.to_string())
            })?;
        }
        Ok(())
    }

    fn session_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE_NAME, token.to_string())
            .path("/")
            .secure(self.secure)
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(SESSION_TTL_SECS))
            .finish()
    }

    fn removal_cookie() -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE_NAME, "")
            .path("/")
            .max_age(CookieDuration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .finish()
    }
}

impl SessionStore for CookieSessionStore {
    fn read(&self) -> Option<String> {
        self.jar
            .get(SESSION_COOKIE_NAME)
            .map(|c| c.value())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn write(&mut self, token: &str) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::Store("refusing to store an empty token".into()));
        }
        self.jar.add(self.session_cookie(token));
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SessionError> {
        // Replaces any pending write as well as the request's cookie
        self.jar.add(Self::removal_cookie());
        Ok(())
    }
}
