// common/src/wallet_auth.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{ConfigError, LoginError, SessionError};
use crate::identity::{IdentityVerifier, LoginAssertion};
use crate::token::{Clock, SystemClock};
use crate::utils::{decode_wallet_address, format_address};

/// How long a wallet has to sign a challenge (5 minutes)
pub const CHALLENGE_TTL_SECS: i64 = 300;

// Keeps challenge tokens from ever passing as anything else
const CHALLENGE_AUDIENCE: &str = "wallet-login";

#[derive(Debug, Serialize, Deserialize)]
struct ChallengeClaims {
    sub: String,
    aud: String,
    nonce: String,
    iat: i64,
    exp: i64,
}

impl ChallengeClaims {
    /// The exact text the wallet is asked to sign
    fn message(&self) -> String {
        format!(
            "Sign in to Wallet Portal\n\nWallet: {}\nNonce: {}\nIssued At: {}\nExpires At: {}",
            self.sub,
            self.nonce,
            rfc3339(self.iat),
            rfc3339(self.exp),
        )
    }
}

fn rfc3339(secs: i64) -> String {
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

/// Challenge handed to the client before login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletChallenge {
    /// Signed, opaque; must be echoed back on login
    pub challenge: String,
    /// Text the wallet signs
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

/// Check an ed25519 signature (base58) by the key behind `wallet_address`.
pub fn verify_wallet_signature(
    wallet_address: &str,
    message: &[u8],
    signature_b58: &str,
) -> Result<bool, LoginError> {
    let key_bytes = decode_wallet_address(wallet_address)
        .ok_or(LoginError::InvalidWalletAddress)?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| LoginError::InvalidWalletAddress)?;

    let signature_bytes: [u8; 64] = bs58::decode(signature_b58)
        .into_vec()
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(LoginError::InvalidSignature)?;
    let signature = Signature::from_bytes(&signature_bytes);

    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Proves wallet ownership: the client signs a server-issued challenge with
/// the wallet key.
///
/// Challenges are stateless signed tokens; only nonces that have already been
/// used are remembered, until their challenge expires.
pub struct WalletSignatureVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
    consumed: DashMap<String, i64>,
}

impl WalletSignatureVerifier {
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_audience(&[CHALLENGE_AUDIENCE]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
            consumed: DashMap::new(),
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        Self::new(config.secret()?)
    }

    pub fn issue_challenge(&self, wallet_address: &str) -> Result<WalletChallenge, LoginError> {
        let wallet_address = wallet_address.trim();
        if decode_wallet_address(wallet_address).is_none() {
            return Err(LoginError::InvalidWalletAddress);
        }

        let now = self.clock.now().timestamp();
        let claims = ChallengeClaims {
            sub: wallet_address.to_string(),
            aud: CHALLENGE_AUDIENCE.to_string(),
            nonce: Uuid::new_v4().simple().to_string(),
            iat: now,
            exp: now + CHALLENGE_TTL_SECS,
        };

        let challenge = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(SessionError::from)?;

        Ok(WalletChallenge {
            challenge,
            message: claims.message(),
            expires_at: Utc.timestamp_opt(claims.exp, 0)
                .single()
                .unwrap_or_else(|| self.clock.now() + Duration::seconds(CHALLENGE_TTL_SECS)),
        })
    }

    fn check_challenge(&self, token: &str, wallet_address: &str) -> Result<ChallengeClaims, LoginError> {
        let claims = decode::<ChallengeClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(reason = %e, "Rejected login challenge");
                LoginError::InvalidChallenge
            })?
            .claims;

        if claims.sub != wallet_address || claims.exp - claims.iat != CHALLENGE_TTL_SECS {
            return Err(LoginError::InvalidChallenge);
        }
        if self.clock.now().timestamp() >= claims.exp {
            tracing::debug!("Rejected login challenge: expired");
            return Err(LoginError::InvalidChallenge);
        }

        Ok(claims)
    }

    // Marks a nonce used. False when it was already used.
    fn consume(&self, nonce: &str, expires_at: i64) -> bool {
        let now = self.clock.now().timestamp();
        self.consumed.retain(|_, exp| *exp > now);

        match self.consumed.entry(nonce.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        }
    }
}

impl IdentityVerifier for WalletSignatureVerifier {
    fn verify(&self, assertion: &LoginAssertion) -> Result<(), LoginError> {
        let wallet_address = assertion.event.wallet_address.trim();
        let claims = self.check_challenge(&assertion.challenge, wallet_address)?;

        if !verify_wallet_signature(wallet_address, claims.message().as_bytes(), &assertion.signature)? {
            tracing::warn!(wallet = %format_address(wallet_address), "Invalid wallet signature");
            return Err(LoginError::InvalidSignature);
        }

        if !self.consume(&claims.nonce, claims.exp) {
            tracing::warn!(wallet = %format_address(wallet_address), "Login challenge replayed");
            return Err(LoginError::InvalidChallenge);
        }

        Ok(())
    }
}
