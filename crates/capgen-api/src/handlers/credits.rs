//! Credit usage endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::CreditUsageSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreditUsageResponse {
    pub success: bool,
    #[serde(flatten)]
    pub usage: CreditUsageSummary,
}

/// GET /api/credits/usage
///
/// Evaluating the tier here applies the expiry auto-downgrade, so a lapsed
/// premium user sees themselves as free from this endpoint too.
pub async fn get_credit_usage(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<CreditUsageResponse>> {
    let usage = state.credit_service().usage_today(user.id).await?;

    Ok(Json(CreditUsageResponse {
        success: true,
        usage,
    }))
}
