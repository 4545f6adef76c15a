// common/src/service.rs
use actix_web::HttpRequest;
use chrono::{DateTime, Utc};

use crate::config::SessionConfig;
use crate::error::{ConfigError, SessionError};
use crate::models::session::{SessionPayload, UserInfo};
use crate::store::{CookieSessionStore, SessionStore};
use crate::token::TokenCodec;

/// The authority on whether a request carries a valid session.
///
/// Stateless: a session is valid iff its token verifies. Built once at
/// start-up and shared read-only between workers.
#[derive(Clone)]
pub struct SessionService {
    codec: TokenCodec,
    secure_cookies: bool,
}

impl SessionService {
    pub fn new(codec: TokenCodec, secure_cookies: bool) -> Self {
        Self { codec, secure_cookies }
    }

    /// Fails when the signing secret is missing.
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(TokenCodec::from_config(config)?, config.production))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.codec.now()
    }

    /// Cookie store scoped to `req`, carrying this service's cookie policy
    pub fn store_for(&self, req: &HttpRequest) -> CookieSessionStore {
        CookieSessionStore::from_request(req, self.secure_cookies)
    }

    /// New payload for a completed login, valid from now
    pub fn issue(&self, user: UserInfo, wallet_address: impl Into<String>) -> SessionPayload {
        SessionPayload::issue(user, wallet_address, self.now())
    }

    /// Mint a token. Does not touch any cookie.
    pub fn create_session(&self, payload: &SessionPayload) -> Result<String, SessionError> {
        self.codec.encode(payload)
    }

    pub fn verify_session(&self, token: &str) -> Option<SessionPayload> {
        self.codec.decode(token)
    }

    pub fn get_session<S: SessionStore + ?Sized>(&self, store: &S) -> Option<SessionPayload> {
        let token = store.read()?;
        self.verify_session(&token)
    }

    pub fn set_session_cookie<S: SessionStore + ?Sized>(
        &self,
        store: &mut S,
        token: &str,
    ) -> Result<(), SessionError> {
        store.write(token)
    }

    pub fn clear_session<S: SessionStore + ?Sized>(&self, store: &mut S) -> Result<(), SessionError> {
        store.clear()
    }
}
