//! Data model shared between the persistence layer and the HTTP API.
//!
//! These types mirror the `users`, `conversations`, `messages`, and
//! `user_model_configs` tables one-to-one. Keeping them here (rather than
//! in `cortex-store`) lets the gateway depend on the shapes without
//! pulling in sqlx.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserModelConfig {
    pub id: i64,
    pub user_id: i64,
    pub provider: String,
    pub model_name: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key_encrypted: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Where a memory lives — scopes the memory store namespace it's written
/// to and read from. See [`MemoryScope::namespace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryScope {
    /// Tied to one conversation; invisible outside it.
    Local,
    /// Shared across every conversation a user has.
    Global,
}

impl MemoryScope {
    /// Compute the memory-store namespace identifier for this scope.
    ///
    /// Local memories are namespaced per-conversation so two conversations
    /// for the same user never see each other's local facts. Global
    /// memories are namespaced per-user only.
    pub fn namespace(&self, user_id: i64, conversation_id: i64) -> String {
        match self {
            MemoryScope::Local => format!("{user_id}_conv_{conversation_id}"),
            MemoryScope::Global => user_id.to_string(),
        }
    }
}
