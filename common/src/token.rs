// common/src/token.rs
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::{ConfigError, SessionError};
use crate::models::session::{SessionPayload, UserInfo};

/// Session lifetime in seconds (24 hours)
pub const SESSION_TTL_SECS: i64 = 86400;

/// Source of "now" for issuing and expiring sessions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Second resolution.
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { secs: AtomicI64::new(start.timestamp()) }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.secs.store(to.timestamp(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.secs.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.secs.load(Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
    }
}

// JWT claims. The payload is carried as a flat mapping next to the registered claims.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionClaims {
    user: UserInfo,
    wallet_address: String,
    iat: i64,
    exp: i64,
    jti: Uuid,
}

/// Signs and verifies session tokens (HS256 JWS).
///
/// Holds the process-wide signing secret; cloning shares the same keys and clock.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock after the signature passes
        validation.validate_exp = false;
        validation.leeway = 0;
        // Only exp/nbf/aud/iss/sub are checked here; `iat` is made mandatory by
        // SessionClaims itself (non-optional field)
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        Self::new(config.secret()?)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sign `payload` into a compact token. `iat`/`exp` come from the payload's window.
    pub fn encode(&self, payload: &SessionPayload) -> Result<String, SessionError> {
        let claims = SessionClaims {
            user: payload.user.clone(),
            wallet_address: payload.wallet_address.clone(),
            iat: payload.issued_at().timestamp(),
            exp: payload.expires_at().timestamp(),
            jti: payload.session_id,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature and expiry. Every failure collapses to `None`.
    pub fn decode(&self, token: &str) -> Option<SessionPayload> {
        match self.check(token) {
            Ok(payload) => Some(payload),
            Err(reason) => {
                tracing::debug!(%reason, "Rejected session token");
                None
            }
        }
    }

    fn check(&self, token: &str) -> Result<SessionPayload, String> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| e.to_string())?;
        let claims = data.claims;

        let issued_at = Utc.timestamp_opt(claims.iat, 0).single()
            .ok_or("iat out of range")?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single()
            .ok_or("exp out of range")?;

        let payload = SessionPayload::from_claims(
            claims.jti,
            claims.user,
            claims.wallet_address,
            issued_at,
            expires_at,
        )
        .ok_or("validity window does not match session ttl")?;

        if payload.is_expired_at(self.now()) {
            return Err("token expired".to_string());
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-0123456789";
    const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn start() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn codec_at(clock: Arc<ManualClock>) -> TokenCodec {
        TokenCodec::with_clock(SECRET, clock).unwrap()
    }

    fn payload() -> SessionPayload {
        let user = UserInfo {
            email: Some("ada@example.com".into()),
            verifier: Some("web3auth".into()),
            verifier_id: Some("ada@example.com".into()),
            type_of_login: Some("google".into()),
            ..Default::default()
        };
        SessionPayload::issue(user, WALLET, start())
    }

    #[test]
    fn test_missing_secret() {
        assert!(matches!(TokenCodec::new(""), Err(ConfigError::MissingSecret)));
        let config = SessionConfig { secret: None, production: false };
        assert!(matches!(TokenCodec::from_config(&config), Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_round_trip() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec_at(clock.clone());
        let payload = payload();

        let token = codec.encode(&payload).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.decode(&token), Some(payload.clone()));

        clock.advance(Duration::hours(23));
        assert_eq!(codec.decode(&token), Some(payload));
    }

    #[test]
    fn test_header_declares_hs256() {
        let codec = codec_at(Arc::new(ManualClock::new(start())));
        let token = codec.encode(&payload()).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn test_expired_token() {
        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec_at(clock.clone());
        let token = codec.encode(&payload()).unwrap();

        clock.advance(Duration::hours(24) + Duration::seconds(1));
        assert_eq!(codec.decode(&token), None);

        clock.set(start() + Duration::hours(24));
        assert_eq!(codec.decode(&token), None);
    }

    #[test]
    fn test_wrong_secret() {
        let clock = Arc::new(ManualClock::new(start()));
        let token = codec_at(clock.clone()).encode(&payload()).unwrap();
        let other = TokenCodec::with_clock("another-secret", clock).unwrap();
        assert_eq!(other.decode(&token), None);
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = codec_at(Arc::new(ManualClock::new(start())));
        for token in ["", "garbage", "a.b.c", "eyJhbGciOiJub25lIn0.e30."] {
            assert_eq!(codec.decode(token), None, "accepted {:?}", token);
        }
    }

    #[test]
    fn test_foreign_claims_rejected() {
        #[derive(Serialize)]
        struct Foreign {
            sub: String,
            exp: i64,
        }

        let clock = Arc::new(ManualClock::new(start()));
        let codec = codec_at(clock);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Foreign { sub: "x".into(), exp: start().timestamp() + 60 },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(codec.decode(&token), None);
    }

    #[test]
    fn test_token_without_iat_rejected() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct NoIat {
            user: UserInfo,
            wallet_address: String,
            exp: i64,
            jti: Uuid,
        }

        let codec = codec_at(Arc::new(ManualClock::new(start())));
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoIat {
                user: UserInfo::default(),
                wallet_address: WALLET.into(),
                exp: start().timestamp() + SESSION_TTL_SECS,
                jti: Uuid::new_v4(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(codec.decode(&token), None);
    }
}
