//! User profile fields captured by onboarding.

use cuido_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `user_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProfile {
    pub user_id: DbId,
    pub display_name: Option<String>,
    pub caregiving_subject: Option<String>,
    pub relationship: Option<String>,
    pub updated_at: Timestamp,
}

/// Partial profile update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserProfile {
    pub display_name: Option<String>,
    pub caregiving_subject: Option<String>,
    pub relationship: Option<String>,
}
