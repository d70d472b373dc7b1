//! One-time verification codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default validity window for a freshly generated code.
pub const DEFAULT_OTP_EXPIRY_MINUTES: i64 = 15;

/// What the code is gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpKind {
    Registration,
    Signin,
    PasswordReset,
}

impl OtpKind {
    /// Parse from a stored or request string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(OtpKind::Registration),
            "signin" => Some(OtpKind::Signin),
            "password_reset" => Some(OtpKind::PasswordReset),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OtpKind::Registration => "registration",
            OtpKind::Signin => "signin",
            OtpKind::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for OtpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored OTP row.
///
/// At most one active code exists per (user, kind); generating a new one
/// deactivates prior actives of the same kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerification {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 6-digit numeric code
    pub code: String,
    pub kind: OtpKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub is_active: bool,
}

impl OtpVerification {
    /// Validity predicate: active, unused, and inside the expiry window.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_used && now < self.expires_at
    }

    /// Whether the code is past its expiry window.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn otp(expires_in: Duration, is_used: bool, is_active: bool) -> OtpVerification {
        let now = Utc::now();
        OtpVerification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "123456".to_string(),
            kind: OtpKind::Signin,
            created_at: now,
            expires_at: now + expires_in,
            is_used,
            is_active,
        }
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [OtpKind::Registration, OtpKind::Signin, OtpKind::PasswordReset] {
            assert_eq!(OtpKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(OtpKind::parse("mfa"), None);
    }

    #[test]
    fn test_fresh_code_is_valid() {
        let otp = otp(Duration::minutes(15), false, true);
        assert!(otp.is_valid(Utc::now()));
    }

    #[test]
    fn test_used_or_inactive_code_is_invalid() {
        assert!(!otp(Duration::minutes(15), true, true).is_valid(Utc::now()));
        assert!(!otp(Duration::minutes(15), false, false).is_valid(Utc::now()));
    }

    #[test]
    fn test_expired_code_is_invalid() {
        let otp = otp(Duration::seconds(-1), false, true);
        let now = Utc::now();
        assert!(!otp.is_valid(now));
        assert!(otp.is_expired(now));
    }
}
