//! Credit usage ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single append-only ledger row.
///
/// Rows are never updated; "credits used today" is the count of a user's
/// rows dated today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditUsage {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Billable action name, e.g. "content_generation"
    pub action: String,
    pub description: Option<String>,
    /// Immutable, set at creation
    pub used_at: DateTime<Utc>,
}
