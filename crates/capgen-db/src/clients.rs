//! Client (brand) repository.

use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use capgen_models::{Client, Industry, SocialLinks};

use crate::error::DbResult;

const CLIENT_COLUMNS: &str = "id, user_id, client_name, industry, contact_person, \
     contact_email, contact_phone, facebook_url, instagram_url, youtube_url, \
     linkedin_url, twitter_url, tiktok_url, preferred_post_time, logo_path, \
     created_at, updated_at";

#[derive(Debug, FromRow)]
struct ClientRow {
    id: i64,
    user_id: Uuid,
    client_name: String,
    industry: String,
    contact_person: String,
    contact_email: String,
    contact_phone: Option<String>,
    facebook_url: Option<String>,
    instagram_url: Option<String>,
    youtube_url: Option<String>,
    linkedin_url: Option<String>,
    twitter_url: Option<String>,
    tiktok_url: Option<String>,
    preferred_post_time: Option<NaiveTime>,
    logo_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            user_id: row.user_id,
            client_name: row.client_name,
            industry: Industry::parse(&row.industry).unwrap_or_default(),
            contact_person: row.contact_person,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            social: SocialLinks {
                facebook_url: row.facebook_url,
                instagram_url: row.instagram_url,
                youtube_url: row.youtube_url,
                linkedin_url: row.linkedin_url,
                twitter_url: row.twitter_url,
                tiktok_url: row.tiktok_url,
            },
            preferred_post_time: row.preferred_post_time,
            logo_path: row.logo_path,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for a new client record.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub user_id: Uuid,
    pub client_name: String,
    pub industry: Industry,
    pub contact_person: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub social: SocialLinks,
    pub preferred_post_time: Option<NaiveTime>,
    pub logo_path: Option<String>,
}

/// Repository for clients, always scoped to the owning user.
#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewClient) -> DbResult<Client> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "INSERT INTO clients (user_id, client_name, industry, contact_person, \
             contact_email, contact_phone, facebook_url, instagram_url, youtube_url, \
             linkedin_url, twitter_url, tiktok_url, preferred_post_time, logo_path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {CLIENT_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(&new.client_name)
        .bind(new.industry.as_str())
        .bind(&new.contact_person)
        .bind(&new.contact_email)
        .bind(&new.contact_phone)
        .bind(&new.social.facebook_url)
        .bind(&new.social.instagram_url)
        .bind(&new.social.youtube_url)
        .bind(&new.social.linkedin_url)
        .bind(&new.social.twitter_url)
        .bind(&new.social.tiktok_url)
        .bind(new.preferred_post_time)
        .bind(&new.logo_path)
        .fetch_one(&self.pool)
        .await?;

        info!(client_id = row.id, user_id = %new.user_id, "Created client");
        Ok(row.into())
    }

    /// All clients owned by a user, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// A single client, only if owned by the user. Missing and foreign
    /// records are indistinguishable to the caller.
    pub async fn find_for_user(&self, id: i64, user_id: Uuid) -> DbResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
