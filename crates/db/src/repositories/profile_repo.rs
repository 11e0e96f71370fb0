//! Repository for the `user_profiles` table.

use cuido_core::types::DbId;
use sqlx::PgPool;

use crate::models::profile::{UpdateUserProfile, UserProfile};

/// Column list for `user_profiles` queries.
const COLUMNS: &str = "user_id, display_name, caregiving_subject, relationship, updated_at";

/// Provides profile reads and merges.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Create or update a user's profile. Fields left `None` keep their
    /// current value.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &UpdateUserProfile,
    ) -> Result<UserProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_profiles (user_id, display_name, caregiving_subject, relationship) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
                display_name = COALESCE(EXCLUDED.display_name, user_profiles.display_name), \
                caregiving_subject = COALESCE(EXCLUDED.caregiving_subject, user_profiles.caregiving_subject), \
                relationship = COALESCE(EXCLUDED.relationship, user_profiles.relationship), \
                updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(user_id)
            .bind(&input.display_name)
            .bind(&input.caregiving_subject)
            .bind(&input.relationship)
            .fetch_one(pool)
            .await
    }

    /// Find a user's profile.
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_profiles WHERE user_id = $1");
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }
}
