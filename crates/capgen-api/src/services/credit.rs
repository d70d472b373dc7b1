//! Credit metering on top of the ledger and subscription state.
//!
//! `use_credit` is the only way a billable action charges: it evaluates the
//! tier (applying the expiry auto-downgrade), then performs the atomic
//! check-and-charge. Callers invoke it exactly once per billable action,
//! never speculatively, so the ledger stays an accurate audit trail.

use uuid::Uuid;

use capgen_db::{ChargeOutcome, CreditLedger, UserRepository};
use capgen_models::{daily_credit_limit, SubscriptionTier};

use crate::error::ApiResult;

/// Fixed denial message for exhausted free-tier users.
pub const LIMIT_REACHED_MESSAGE: &str =
    "Daily credit limit reached. Upgrade to premium for unlimited generations.";

/// Result of a `use_credit` call.
#[derive(Debug, Clone)]
pub struct CreditOutcome {
    pub allowed: bool,
    pub used_today: u32,
    /// Remaining allowance after this call; None for unlimited tiers
    pub remaining: Option<u32>,
    pub message: String,
}

/// Snapshot for the usage endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreditUsageSummary {
    pub tier: SubscriptionTier,
    pub is_premium: bool,
    pub used_today: u32,
    /// None for unlimited tiers
    pub daily_limit: Option<u32>,
    /// None for unlimited tiers
    pub remaining: Option<u32>,
}

/// Service for credit operations.
#[derive(Clone)]
pub struct CreditService {
    users: UserRepository,
    ledger: CreditLedger,
}

impl CreditService {
    pub fn new(users: UserRepository, ledger: CreditLedger) -> Self {
        Self { users, ledger }
    }

    /// Computed premium check; expired subscriptions are downgraded as a
    /// side effect before this returns.
    pub async fn is_premium(&self, user_id: Uuid) -> ApiResult<bool> {
        Ok(self.users.effective_tier(user_id).await?.is_paid())
    }

    /// Whether a billable action would currently be allowed.
    pub async fn can_use_credit(&self, user_id: Uuid) -> ApiResult<bool> {
        let tier = self.users.effective_tier(user_id).await?;
        match daily_credit_limit(tier) {
            None => Ok(true),
            Some(limit) => Ok(self.ledger.used_today(user_id).await? < limit),
        }
    }

    /// Charge one credit for a billable action.
    pub async fn use_credit(
        &self,
        user_id: Uuid,
        action: &str,
        description: Option<&str>,
    ) -> ApiResult<CreditOutcome> {
        let tier = self.users.effective_tier(user_id).await?;
        let limit = daily_credit_limit(tier);

        let outcome = self
            .ledger
            .try_charge(user_id, limit, action, description)
            .await?;

        Ok(match outcome {
            ChargeOutcome::Charged { used_today } => {
                let remaining = limit.map(|l| l.saturating_sub(used_today));
                let message = match remaining {
                    Some(remaining) => format!(
                        "Credit used. {} of {} remaining today.",
                        remaining,
                        limit.unwrap_or(0)
                    ),
                    None => "Credit recorded (unlimited plan).".to_string(),
                };
                CreditOutcome {
                    allowed: true,
                    used_today,
                    remaining,
                    message,
                }
            }
            ChargeOutcome::LimitReached { used_today } => CreditOutcome {
                allowed: false,
                used_today,
                remaining: Some(0),
                message: LIMIT_REACHED_MESSAGE.to_string(),
            },
        })
    }

    /// Usage snapshot for the credits endpoint.
    pub async fn usage_today(&self, user_id: Uuid) -> ApiResult<CreditUsageSummary> {
        let tier = self.users.effective_tier(user_id).await?;
        let used_today = self.ledger.used_today(user_id).await?;
        let daily_limit = daily_credit_limit(tier);

        Ok(CreditUsageSummary {
            tier,
            is_premium: tier.is_paid(),
            used_today,
            daily_limit,
            remaining: daily_limit.map(|l| l.saturating_sub(used_today)),
        })
    }
}
