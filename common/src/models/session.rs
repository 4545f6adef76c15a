// common/src/models/session.rs
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record handed over by the social login provider.
///
/// Every field is optional; providers fill in different subsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_of_login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_verifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate_verifier_id: Option<String>,
}

/// The authenticated identity bound into a session token.
///
/// The validity window is fixed when the payload is issued; there is no
/// way to extend it. A new login produces a new payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    /// Per-login identifier, used to correlate log lines
    pub session_id: Uuid,
    pub user: UserInfo,
    pub wallet_address: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SessionPayload {
    /// Lifetime of every session
    pub fn ttl() -> Duration {
        Duration::seconds(crate::token::SESSION_TTL_SECS)
    }

    /// Issue a fresh payload valid from `now` for exactly one TTL.
    ///
    /// Timestamps are truncated to whole seconds, the resolution of the token claims.
    pub fn issue(user: UserInfo, wallet_address: impl Into<String>, now: DateTime<Utc>) -> Self {
        let issued_at = now.trunc_subsecs(0);
        Self {
            session_id: Uuid::new_v4(),
            user,
            wallet_address: wallet_address.into(),
            issued_at,
            expires_at: issued_at + Self::ttl(),
        }
    }

    /// Rebuild a payload from verified claims. Returns `None` unless the
    /// window is exactly one TTL long.
    pub(crate) fn from_claims(
        session_id: Uuid,
        user: UserInfo,
        wallet_address: String,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Option<Self> {
        if expires_at - issued_at != Self::ttl() {
            return None;
        }

        Some(Self {
            session_id,
            user,
            wallet_address,
            issued_at,
            expires_at,
        })
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A session is expired from the instant `expires_at` is reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_issue_sets_fixed_window() {
        let now = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let payload = SessionPayload::issue(UserInfo::default(), "wallet", now);

        assert_eq!(payload.issued_at().timestamp(), 1_700_000_000);
        assert_eq!(payload.issued_at().timestamp_subsec_nanos(), 0);
        assert_eq!(payload.expires_at() - payload.issued_at(), Duration::hours(24));
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let payload = SessionPayload::issue(UserInfo::default(), "wallet", now);

        assert!(!payload.is_expired_at(now + Duration::hours(24) - Duration::seconds(1)));
        assert!(payload.is_expired_at(now + Duration::hours(24)));
    }

    #[test]
    fn test_from_claims_rejects_stretched_window() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let stretched = SessionPayload::from_claims(
            Uuid::new_v4(),
            UserInfo::default(),
            "wallet".into(),
            now,
            now + Duration::days(30),
        );
        assert!(stretched.is_none());
    }

    #[test]
    fn test_user_info_uses_camel_case() {
        let user = UserInfo {
            profile_image: Some("https://example.com/a.png".into()),
            type_of_login: Some("google".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["profileImage"], "https://example.com/a.png");
        assert_eq!(json["typeOfLogin"], "google");
        assert!(json.get("email").is_none());
    }
}
