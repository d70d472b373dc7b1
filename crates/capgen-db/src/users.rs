//! User repository.

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use capgen_models::{SubscriptionTier, User};

use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str = "id, email, password_hash, full_name, phone_number, \
     oauth_provider, oauth_id, subscription_tier, subscription_started_at, \
     subscription_ends_at, is_verified, is_active, created_at, last_login_at";

/// Raw database row for a user.
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: String,
    phone_number: Option<String>,
    oauth_provider: Option<String>,
    oauth_id: Option<String>,
    subscription_tier: String,
    subscription_started_at: Option<DateTime<Utc>>,
    subscription_ends_at: Option<DateTime<Utc>>,
    is_verified: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            full_name: row.full_name,
            phone_number: row.phone_number,
            oauth_provider: row.oauth_provider,
            oauth_id: row.oauth_id,
            subscription_tier: SubscriptionTier::parse(&row.subscription_tier),
            subscription_started_at: row.subscription_started_at,
            subscription_ends_at: row.subscription_ends_at,
            is_verified: row.is_verified,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        }
    }
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub oauth_provider: Option<String>,
    pub oauth_id: Option<String>,
    pub is_verified: bool,
}

/// Repository for user accounts.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    pub async fn create(&self, new: NewUser) -> DbResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, password_hash, full_name, phone_number, \
             oauth_provider, oauth_id, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(&new.phone_number)
        .bind(&new.oauth_provider)
        .bind(&new.oauth_id)
        .bind(new.is_verified)
        .fetch_one(&self.pool)
        .await?;

        info!(user_id = %row.id, email = %row.email, "Created user");
        Ok(row.into())
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn find_by_oauth_id(&self, oauth_id: &str) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE oauth_id = $1"
        ))
        .bind(oauth_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Delete an unverified account so the email can re-register.
    ///
    /// OTP rows cascade with the account. Verified accounts are never
    /// touched by this path.
    pub async fn delete_unverified(&self, email: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE email = $1 AND is_verified = FALSE")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the verified flag and record the first login.
    pub async fn mark_verified(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE users SET is_verified = TRUE, last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn touch_last_login(&self, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Refresh OAuth linkage on an existing account. Marks the account
    /// verified (the provider vouches for the email) and records the login.
    pub async fn update_oauth_link(
        &self,
        id: Uuid,
        provider: &str,
        oauth_id: &str,
        full_name: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE users SET oauth_provider = $2, oauth_id = $3, \
             full_name = COALESCE($4, full_name), is_verified = TRUE, \
             last_login_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(provider)
        .bind(oauth_id)
        .bind(full_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Downgrade a lapsed paid subscription, if any.
    ///
    /// Single conditional UPDATE so concurrent evaluations of the same user
    /// cannot lose the write; at most one of them changes the row.
    pub async fn expire_lapsed_subscription(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET subscription_tier = 'free', subscription_started_at = NULL, \
             subscription_ends_at = NULL \
             WHERE id = $1 AND subscription_tier <> 'free' \
             AND subscription_ends_at IS NOT NULL AND subscription_ends_at < now()",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        let downgraded = result.rows_affected() > 0;
        if downgraded {
            info!(user_id = %id, "Auto-downgraded lapsed subscription to free");
        }
        Ok(downgraded)
    }

    /// Evaluate the user's current tier, applying the expiry downgrade
    /// side effect first.
    pub async fn effective_tier(&self, id: Uuid) -> DbResult<SubscriptionTier> {
        self.expire_lapsed_subscription(id).await?;

        let tier: Option<String> =
            sqlx::query_scalar("SELECT subscription_tier FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let tier = tier.ok_or_else(|| DbError::not_found(format!("User {id} not found")))?;
        Ok(SubscriptionTier::parse(&tier))
    }

    /// Billing-triggered upgrade: start now, end after the tier's duration.
    pub async fn upgrade_to_premium(&self, id: Uuid, tier: SubscriptionTier) -> DbResult<()> {
        let days = tier
            .duration_days()
            .ok_or_else(|| DbError::conflict("Cannot upgrade to the free tier"))?;
        let now = Utc::now();
        let ends_at = now + Duration::days(days);

        sqlx::query(
            "UPDATE users SET subscription_tier = $2, subscription_started_at = $3, \
             subscription_ends_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(tier.as_str())
        .bind(now)
        .bind(ends_at)
        .execute(&self.pool)
        .await?;

        info!(user_id = %id, tier = %tier, ends_at = %ends_at, "Upgraded subscription");
        Ok(())
    }

    pub async fn downgrade_to_free(&self, id: Uuid) -> DbResult<()> {
        sqlx::query(
            "UPDATE users SET subscription_tier = 'free', subscription_started_at = NULL, \
             subscription_ends_at = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %id, "Downgraded subscription to free");
        Ok(())
    }
}
