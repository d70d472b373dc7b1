//! Plan configuration and daily credit limits.

use crate::user::SubscriptionTier;

/// Daily content-generation allowance for free-tier users.
pub const FREE_DAILY_CREDIT_LIMIT: u32 = 3;

/// Daily credit limit for a tier.
///
/// `None` means unlimited (paid tiers). The caller is responsible for
/// evaluating tier expiry first; this function only maps tiers to limits.
pub fn daily_credit_limit(tier: SubscriptionTier) -> Option<u32> {
    match tier {
        SubscriptionTier::Free => Some(FREE_DAILY_CREDIT_LIMIT),
        SubscriptionTier::PremiumMonthly | SubscriptionTier::PremiumYearly => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_limit() {
        assert_eq!(daily_credit_limit(SubscriptionTier::Free), Some(3));
    }

    #[test]
    fn test_paid_tiers_unlimited() {
        assert_eq!(daily_credit_limit(SubscriptionTier::PremiumMonthly), None);
        assert_eq!(daily_credit_limit(SubscriptionTier::PremiumYearly), None);
    }
}
