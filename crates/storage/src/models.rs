use chrono::NaiveDateTime;
use minecloud_engine::User;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ─── Profile ────────────────────────────────────────────────────────────────

/// A user record as read from the store: the JSON document plus the row
/// version used for compare-and-swap writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    pub user: User,
    pub version: i64,
}

// ─── Chat ───────────────────────────────────────────────────────────────────

/// One row of the append-only support-chat table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_email: String,
    pub body: String,
    pub sent_at_ms: i64,
    pub created_at: NaiveDateTime,
}

/// Insert-ready message (no `id` or `created_at`).
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub sender_email: String,
    pub body: String,
    pub sent_at_ms: i64,
}
