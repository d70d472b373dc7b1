//! User accounts and subscription tiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Subscription tier enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    PremiumMonthly,
    PremiumYearly,
}

impl SubscriptionTier {
    /// Parse from a stored string (unknown values fall back to free).
    pub fn parse(s: &str) -> Self {
        match s {
            "premium_monthly" => SubscriptionTier::PremiumMonthly,
            "premium_yearly" => SubscriptionTier::PremiumYearly,
            _ => SubscriptionTier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::PremiumMonthly => "premium_monthly",
            SubscriptionTier::PremiumYearly => "premium_yearly",
        }
    }

    /// Whether this tier is one of the paid tiers.
    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionTier::Free)
    }

    /// Subscription duration for this tier, if it is a paid tier.
    pub fn duration_days(&self) -> Option<i64> {
        match self {
            SubscriptionTier::Free => None,
            SubscriptionTier::PremiumMonthly => Some(28),
            SubscriptionTier::PremiumYearly => Some(365),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Primary key
    pub id: Uuid,

    /// Unique email, used for login
    pub email: String,

    /// Bcrypt password hash (absent for OAuth-only accounts is never the
    /// case; OAuth accounts get a random password)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// Optional phone number
    pub phone_number: Option<String>,

    /// OAuth provider name (e.g. "google"), if linked
    pub oauth_provider: Option<String>,

    /// Provider-scoped OAuth user id, if linked
    pub oauth_id: Option<String>,

    /// Stored subscription tier (see [`User::subscription_active`])
    pub subscription_tier: SubscriptionTier,

    /// When the current subscription started
    pub subscription_started_at: Option<DateTime<Utc>>,

    /// When the current subscription ends (None for free tier)
    pub subscription_ends_at: Option<DateTime<Utc>>,

    /// Email verification status, flipped exactly once via OTP
    pub is_verified: bool,

    /// Account active flag
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the stored paid subscription is still within its window.
    ///
    /// This is the pure part of the premium check: a paid tier whose end
    /// date has passed must be treated as expired. The persisting
    /// auto-downgrade lives at the repository layer.
    pub fn subscription_active(&self, now: DateTime<Utc>) -> bool {
        if !self.subscription_tier.is_paid() {
            return false;
        }
        match self.subscription_ends_at {
            Some(ends_at) => now < ends_at,
            // Paid tier without an end date never expires
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user_with(tier: SubscriptionTier, ends_at: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "x".to_string(),
            full_name: "Test".to_string(),
            phone_number: None,
            oauth_provider: None,
            oauth_id: None,
            subscription_tier: tier,
            subscription_started_at: None,
            subscription_ends_at: ends_at,
            is_verified: true,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_tier_roundtrip() {
        for tier in [
            SubscriptionTier::Free,
            SubscriptionTier::PremiumMonthly,
            SubscriptionTier::PremiumYearly,
        ] {
            assert_eq!(SubscriptionTier::parse(tier.as_str()), tier);
        }
        // Unknown values fall back to free
        assert_eq!(SubscriptionTier::parse("enterprise"), SubscriptionTier::Free);
    }

    #[test]
    fn test_tier_durations() {
        assert_eq!(SubscriptionTier::Free.duration_days(), None);
        assert_eq!(SubscriptionTier::PremiumMonthly.duration_days(), Some(28));
        assert_eq!(SubscriptionTier::PremiumYearly.duration_days(), Some(365));
    }

    #[test]
    fn test_subscription_active_within_window() {
        let now = Utc::now();
        let user = user_with(
            SubscriptionTier::PremiumMonthly,
            Some(now + Duration::days(7)),
        );
        assert!(user.subscription_active(now));
    }

    #[test]
    fn test_subscription_expired_regardless_of_tier() {
        let now = Utc::now();
        let user = user_with(
            SubscriptionTier::PremiumYearly,
            Some(now - Duration::seconds(1)),
        );
        assert!(!user.subscription_active(now));
    }

    #[test]
    fn test_free_tier_never_active() {
        let now = Utc::now();
        let user = user_with(SubscriptionTier::Free, Some(now + Duration::days(30)));
        assert!(!user.subscription_active(now));
    }
}
