// common/src/identity.rs
use serde::{Deserialize, Serialize};

use crate::error::{LoginError, SessionError};
use crate::models::session::{SessionPayload, UserInfo};
use crate::service::SessionService;
use crate::store::SessionStore;
use crate::utils::{format_address, is_valid_wallet_address};

/// Completed login reported by the identity/wallet provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginEvent {
    pub user: UserInfo,
    /// Address derived by the provider from the verified identity
    pub wallet_address: String,
}

/// A login event plus the proof that the caller controls the wallet.
///
/// Wire shape: `{ user, walletAddress, challenge, signature }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginAssertion {
    #[serde(flatten)]
    pub event: LoginEvent,
    /// Challenge token from `POST /api/auth/challenge`
    pub challenge: String,
    /// Base58 ed25519 signature over the challenge message
    pub signature: String,
}

/// Logout reported by the identity/wallet provider. Carries nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutEvent;

/// Decides whether a login assertion proves control of its wallet address.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, assertion: &LoginAssertion) -> Result<(), LoginError>;
}

/// Turns provider login/logout events into session state changes.
///
/// This is the only path that moves a visitor between unauthenticated and
/// authenticated, and it never issues a session the verifier has not accepted.
pub struct IdentityBridge<'a> {
    service: &'a SessionService,
    verifier: &'a dyn IdentityVerifier,
}

impl<'a> IdentityBridge<'a> {
    pub fn new(service: &'a SessionService, verifier: &'a dyn IdentityVerifier) -> Self {
        Self { service, verifier }
    }

    /// Verify `assertion`, then issue, sign and store a session for it.
    pub fn login<S: SessionStore + ?Sized>(
        &self,
        assertion: LoginAssertion,
        store: &mut S,
    ) -> Result<SessionPayload, LoginError> {
        let wallet_address = assertion.event.wallet_address.trim();
        if !is_valid_wallet_address(wallet_address) {
            tracing::warn!("Login rejected: malformed wallet address");
            return Err(LoginError::InvalidWalletAddress);
        }

        self.verifier.verify(&assertion)?;

        let payload = self.service.issue(assertion.event.user.clone(), wallet_address);
        let token = self.service.create_session(&payload)?;
        self.service.set_session_cookie(store, &token)?;

        tracing::info!(
            session_id = %payload.session_id,
            wallet = %format_address(&payload.wallet_address),
            expires_at = %payload.expires_at(),
            "Session issued"
        );

        Ok(payload)
    }

    pub fn logout<S: SessionStore + ?Sized>(
        &self,
        _event: LogoutEvent,
        store: &mut S,
    ) -> Result<(), SessionError> {
        self.service.clear_session(store)?;
        tracing::info!("Session cleared");
        Ok(())
    }
}
