//! Client (brand) endpoints, all scoped to the authenticated user.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use capgen_db::NewClient;
use capgen_models::{Client, Industry, SocialLinks};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct AddClientRequest {
    #[validate(length(min = 1, max = 255, message = "Client name must be 1-255 characters"))]
    pub client_name: String,
    pub industry_type: String,
    #[validate(length(min = 1, max = 255, message = "Contact person must be 1-255 characters"))]
    pub contact_person: String,
    #[validate(email(message = "Invalid contact email"))]
    pub contact_email: String,
    #[validate(length(max = 20, message = "Phone number too long"))]
    pub contact_phone: Option<String>,
    #[validate(url(message = "Invalid Facebook URL"))]
    pub facebook_url: Option<String>,
    #[validate(url(message = "Invalid Instagram URL"))]
    pub instagram_url: Option<String>,
    #[validate(url(message = "Invalid YouTube URL"))]
    pub youtube_url: Option<String>,
    #[validate(url(message = "Invalid LinkedIn URL"))]
    pub linkedin_url: Option<String>,
    #[validate(url(message = "Invalid Twitter URL"))]
    pub twitter_url: Option<String>,
    #[validate(url(message = "Invalid TikTok URL"))]
    pub tiktok_url: Option<String>,
    /// "HH:MM"
    pub preferred_post_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClientView {
    pub id: i64,
    pub client_name: String,
    pub industry_type: String,
    pub contact_person: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub youtube_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub preferred_post_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Client> for ClientView {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            client_name: client.client_name,
            industry_type: client.industry.as_str().to_string(),
            contact_person: client.contact_person,
            contact_email: client.contact_email,
            contact_phone: client.contact_phone,
            facebook_url: client.social.facebook_url,
            instagram_url: client.social.instagram_url,
            youtube_url: client.social.youtube_url,
            linkedin_url: client.social.linkedin_url,
            twitter_url: client.social.twitter_url,
            tiktok_url: client.social.tiktok_url,
            preferred_post_time: client
                .preferred_post_time
                .map(|t| t.format("%H:%M").to_string()),
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientListResponse {
    pub success: bool,
    pub message: String,
    pub data: Vec<ClientView>,
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/clients/my-clients
pub async fn list_clients(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ClientListResponse>> {
    let clients = state.clients().list_for_user(user.id).await?;
    let data: Vec<ClientView> = clients.into_iter().map(Into::into).collect();

    Ok(Json(ClientListResponse {
        success: true,
        message: "Clients retrieved successfully".to_string(),
        count: data.len(),
        data,
    }))
}

/// GET /api/clients/my-clients/:client_id
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    user: AuthUser,
) -> ApiResult<Json<ClientView>> {
    let client = state
        .clients()
        .find_for_user(client_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client not found"))?;

    Ok(Json(client.into()))
}

/// POST /api/clients/add-client
pub async fn add_client(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<AddClientRequest>,
) -> ApiResult<impl IntoResponse> {
    body.validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let industry = Industry::parse(&body.industry_type)
        .ok_or_else(|| ApiError::bad_request("Invalid industry type"))?;

    let preferred_post_time = body
        .preferred_post_time
        .as_deref()
        .map(parse_post_time)
        .transpose()?;

    let client = state
        .clients()
        .create(NewClient {
            user_id: user.id,
            client_name: body.client_name,
            industry,
            contact_person: body.contact_person,
            contact_email: body.contact_email,
            contact_phone: body.contact_phone,
            social: SocialLinks {
                facebook_url: body.facebook_url,
                instagram_url: body.instagram_url,
                youtube_url: body.youtube_url,
                linkedin_url: body.linkedin_url,
                twitter_url: body.twitter_url,
                tiktok_url: body.tiktok_url,
            },
            preferred_post_time,
            logo_path: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ClientView::from(client))))
}

/// Parse "HH:MM" into a time of day.
fn parse_post_time(value: &str) -> ApiResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| ApiError::bad_request("preferred_post_time must be in HH:MM format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_time() {
        assert_eq!(
            parse_post_time("09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_post_time("25:00").is_err());
        assert!(parse_post_time("morning").is_err());
    }

    #[test]
    fn test_client_view_formats_time() {
        let client = Client {
            id: 1,
            user_id: uuid::Uuid::new_v4(),
            client_name: "Acme".to_string(),
            industry: Industry::Technology,
            contact_person: "Jo".to_string(),
            contact_email: "jo@acme.com".to_string(),
            contact_phone: None,
            social: SocialLinks::default(),
            preferred_post_time: NaiveTime::from_hms_opt(18, 5, 0),
            logo_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = ClientView::from(client);
        assert_eq!(view.preferred_post_time.as_deref(), Some("18:05"));
        assert_eq!(view.industry_type, "technology");
    }
}
