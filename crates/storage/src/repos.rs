//! Queries against the profile store.
//!
//! Each user is one JSONB document keyed by lowercased email, with
//! whole-document replace semantics. Plain upserts are last-write-wins;
//! the versioned variant is a compare-and-swap for cross-account admin
//! mutations.

use minecloud_engine::User;
use sqlx::PgPool;
use sqlx::types::Json;

use crate::StoreError;
use crate::models::*;

// ─── Profile Queries ────────────────────────────────────────────────────────

/// Create a new profile. Returns false when the email is already taken.
pub async fn insert_profile(pool: &PgPool, user: &User) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO profiles (email, data)
        VALUES ($1, $2)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(user.email.to_lowercase())
    .bind(Json(user))
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Fetch a profile by its email key.
pub async fn fetch_profile(pool: &PgPool, email: &str) -> Result<Option<StoredProfile>, StoreError> {
    let row: Option<(Json<User>, i64)> =
        sqlx::query_as("SELECT data, version FROM profiles WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(Json(user), version)| StoredProfile { user, version }))
}

/// Replace a profile document unconditionally (last-write-wins). This is
/// the periodic session sync path.
pub async fn upsert_profile(pool: &PgPool, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO profiles (email, data)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE
        SET data = EXCLUDED.data,
            version = profiles.version + 1,
            updated_at = now()
        "#,
    )
    .bind(user.email.to_lowercase())
    .bind(Json(user))
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace a profile document only if nobody wrote since the caller read
/// `expected_version`. Fails with [`StoreError::Conflict`] otherwise.
pub async fn upsert_profile_versioned(
    pool: &PgPool,
    user: &User,
    expected_version: i64,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET data = $2, version = version + 1, updated_at = now()
        WHERE email = $1 AND version = $3
        "#,
    )
    .bind(user.email.to_lowercase())
    .bind(Json(user))
    .bind(expected_version)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(
            email = %user.email,
            expected_version,
            "versioned profile write lost a race"
        );
        return Err(StoreError::Conflict);
    }
    Ok(())
}

/// Locate a profile by the user id stored inside the document.
pub async fn find_profile_by_user_id(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<StoredProfile>, StoreError> {
    let row: Option<(Json<User>, i64)> =
        sqlx::query_as("SELECT data, version FROM profiles WHERE data->>'id' = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(Json(user), version)| StoredProfile { user, version }))
}

/// Locate a profile by referral code.
pub async fn find_profile_by_referral_code(
    pool: &PgPool,
    code: &str,
) -> Result<Option<StoredProfile>, StoreError> {
    let row: Option<(Json<User>, i64)> =
        sqlx::query_as("SELECT data, version FROM profiles WHERE data->>'referralCode' = $1")
            .bind(code)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(Json(user), version)| StoredProfile { user, version }))
}

/// Check whether an email key is registered (no document decode).
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, StoreError> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM profiles WHERE email = $1)")
        .bind(email.to_lowercase())
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

/// Every stored profile, for the admin overview.
pub async fn list_profiles(pool: &PgPool) -> Result<Vec<StoredProfile>, StoreError> {
    let rows: Vec<(Json<User>, i64)> =
        sqlx::query_as("SELECT data, version FROM profiles ORDER BY email")
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(Json(user), version)| StoredProfile { user, version })
        .collect())
}

// ─── Chat Queries ───────────────────────────────────────────────────────────

/// Append a message to the support-chat table.
pub async fn insert_message(pool: &PgPool, msg: &NewChatMessage) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO chat_messages (sender_email, body, sent_at_ms)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(msg.sender_email.to_lowercase())
    .bind(&msg.body)
    .bind(msg.sent_at_ms)
    .execute(pool)
    .await?;
    Ok(())
}

/// Messages newer than the given timestamp, oldest first. The unread
/// counter polls this with the viewer's `last_seen_chat_ms`.
pub async fn messages_since(pool: &PgPool, since_ms: i64) -> Result<Vec<ChatMessage>, StoreError> {
    let rows = sqlx::query_as::<_, ChatMessage>(
        "SELECT * FROM chat_messages WHERE sent_at_ms > $1 ORDER BY sent_at_ms ASC",
    )
    .bind(since_ms)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
