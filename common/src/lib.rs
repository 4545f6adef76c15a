pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod service;
pub mod store;
pub mod token;
pub mod utils;
pub mod wallet_auth;

pub use self::config::*;
pub use error::*;
pub use identity::*;
pub use models::session::*;
pub use service::SessionService;
pub use store::{CookieSessionStore, SessionStore, SESSION_COOKIE_NAME};
pub use token::{Clock, ManualClock, SystemClock, TokenCodec, SESSION_TTL_SECS};
pub use utils::*;
pub use wallet_auth::{
    verify_wallet_signature, WalletChallenge, WalletSignatureVerifier, CHALLENGE_TTL_SECS,
};
