//! OTP generation and verification bookkeeping.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use capgen_models::{OtpKind, OtpVerification, DEFAULT_OTP_EXPIRY_MINUTES};

use crate::error::DbResult;

/// Outcome of a verification attempt.
///
/// `Expired` and `Invalid` are distinct so callers can word the two
/// failures differently; collapsing them is an open security question
/// tracked in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    Verified,
    Expired,
    Invalid,
}

#[derive(Debug, FromRow)]
struct OtpRow {
    id: Uuid,
    user_id: Uuid,
    code: String,
    kind: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_used: bool,
    is_active: bool,
}

impl OtpRow {
    fn into_model(self) -> Option<OtpVerification> {
        Some(OtpVerification {
            id: self.id,
            user_id: self.user_id,
            code: self.code.trim().to_string(),
            kind: OtpKind::parse(&self.kind)?,
            created_at: self.created_at,
            expires_at: self.expires_at,
            is_used: self.is_used,
            is_active: self.is_active,
        })
    }
}

/// Generate a 6-digit code from the OS cryptographic RNG.
fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Repository for OTP codes.
#[derive(Clone)]
pub struct OtpRepository {
    pool: PgPool,
}

impl OtpRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a fresh code for (user, kind).
    ///
    /// Purges the user's already-expired codes, deactivates other active
    /// codes of the same kind, then inserts the new one, all in one
    /// transaction so at most one active code exists per (user, kind).
    pub async fn generate(
        &self,
        user_id: Uuid,
        kind: OtpKind,
        expiry_minutes: Option<i64>,
    ) -> DbResult<OtpVerification> {
        let expiry_minutes = expiry_minutes.unwrap_or(DEFAULT_OTP_EXPIRY_MINUTES);
        let now = Utc::now();
        let expires_at = now + Duration::minutes(expiry_minutes);
        let code = generate_code();

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM otp_verifications WHERE user_id = $1 AND expires_at < now()")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE otp_verifications SET is_active = FALSE \
             WHERE user_id = $1 AND kind = $2 AND is_active",
        )
        .bind(user_id)
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?;

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO otp_verifications (id, user_id, code, kind, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(user_id)
        .bind(&code)
        .bind(kind.as_str())
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id = %user_id, kind = %kind, "Generated OTP");

        Ok(OtpVerification {
            id,
            user_id,
            code,
            kind,
            created_at: now,
            expires_at,
            is_used: false,
            is_active: true,
        })
    }

    /// Verify a submitted code.
    ///
    /// Sweeps expired rows first, then looks for an active, unused match.
    /// A successful match is marked used and deleted so the code can never
    /// be replayed.
    pub async fn verify(&self, user_id: Uuid, code: &str, kind: OtpKind) -> DbResult<OtpOutcome> {
        self.cleanup_expired().await?;

        let row = sqlx::query_as::<_, OtpRow>(
            "SELECT id, user_id, code, kind, created_at, expires_at, is_used, is_active \
             FROM otp_verifications \
             WHERE user_id = $1 AND code = $2 AND kind = $3 AND is_active AND NOT is_used",
        )
        .bind(user_id)
        .bind(code)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(otp) = row.and_then(OtpRow::into_model) else {
            return Ok(OtpOutcome::Invalid);
        };

        let now = Utc::now();
        if !otp.is_valid(now) {
            return Ok(OtpOutcome::Expired);
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE otp_verifications SET is_used = TRUE WHERE id = $1")
            .bind(otp.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM otp_verifications WHERE id = $1")
            .bind(otp.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(user_id = %user_id, kind = %kind, "OTP verified");
        Ok(OtpOutcome::Verified)
    }

    /// Delete every expired code, for any user.
    pub async fn cleanup_expired(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM otp_verifications WHERE expires_at < now()")
            .execute(&self.pool)
            .await?;

        let count = result.rows_affected();
        if count > 0 {
            debug!(count, "Purged expired OTP codes");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
