//! Startup schema migration. Raw `CREATE TABLE IF NOT EXISTS` statements,
//! matching the source database's own init-on-boot approach rather than a
//! versioned migrations directory — there is exactly one schema revision.

use sqlx::SqlitePool;

use cortex_domain::error::{Error, Result};

pub async fn run(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("create users: {e}")))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            message_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            last_message_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("create conversations: {e}")))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id)",
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("create idx_conversations_user: {e}")))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id INTEGER NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("create messages: {e}")))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id)",
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("create idx_messages_conversation: {e}")))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_model_configs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            provider TEXT NOT NULL,
            model_name TEXT NOT NULL,
            api_key_encrypted TEXT NOT NULL,
            base_url TEXT NOT NULL DEFAULT '',
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            UNIQUE(user_id, provider, model_name)
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("create user_model_configs: {e}")))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_model_configs_user ON user_model_configs(user_id)",
    )
    .execute(pool)
    .await
    .map_err(|e| Error::Database(format!("create idx_model_configs_user: {e}")))?;

    Ok(())
}
