//! Append-only credit usage ledger.

use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Result of a charge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// A ledger row was appended; `used_today` includes it.
    Charged { used_today: u32 },
    /// The daily limit was already reached; nothing was appended.
    LimitReached { used_today: u32 },
}

impl ChargeOutcome {
    pub fn is_charged(&self) -> bool {
        matches!(self, ChargeOutcome::Charged { .. })
    }
}

/// Repository for the credit ledger.
#[derive(Clone)]
pub struct CreditLedger {
    pool: PgPool,
}

impl CreditLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Count of the user's ledger rows dated today (database timezone).
    pub async fn used_today(&self, user_id: Uuid) -> DbResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM credit_usages \
             WHERE user_id = $1 AND used_at::date = CURRENT_DATE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u32)
    }

    /// Check-and-charge in one atomic unit.
    ///
    /// With `limit = None` (unlimited tiers) a row is appended
    /// unconditionally. With a limit, the user row is locked for the span
    /// of the transaction so two concurrent charges at usage = limit - 1
    /// serialize: exactly one appends, the other observes the limit.
    pub async fn try_charge(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
        action: &str,
        description: Option<&str>,
    ) -> DbResult<ChargeOutcome> {
        let mut tx = self.pool.begin().await?;

        if limit.is_some() {
            let locked: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if locked.is_none() {
                return Err(DbError::not_found(format!("User {user_id} not found")));
            }
        }

        let used_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM credit_usages \
             WHERE user_id = $1 AND used_at::date = CURRENT_DATE",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let used_today = used_today as u32;

        if let Some(limit) = limit {
            if used_today >= limit {
                tx.rollback().await?;
                debug!(user_id = %user_id, used_today, limit, "Daily credit limit reached");
                return Ok(ChargeOutcome::LimitReached { used_today });
            }
        }

        sqlx::query(
            "INSERT INTO credit_usages (id, user_id, action, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(action)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let used_today = used_today + 1;
        info!(user_id = %user_id, action, used_today, "Charged credit");
        Ok(ChargeOutcome::Charged { used_today })
    }
}
