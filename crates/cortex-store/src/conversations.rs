//! Conversation CRUD. Every read here is ownership-scoped (`user_id = ?`
//! alongside the primary key) so a caller can never load another user's
//! conversation by guessing an id — the query itself enforces I3 rather
//! than relying on an application-level check after the fact.

use sqlx::SqlitePool;

use cortex_domain::error::{Error, Result};
use cortex_domain::models::Conversation;

pub struct ConversationRepo;

impl ConversationRepo {
    pub async fn create(pool: &SqlitePool, user_id: i64, title: &str) -> Result<Conversation> {
        let id = sqlx::query("INSERT INTO conversations (user_id, title) VALUES (?, ?)")
            .bind(user_id)
            .bind(title)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .last_insert_rowid();

        Self::get(pool, id, user_id)
            .await?
            .ok_or_else(|| Error::Database("conversation vanished after insert".into()))
    }

    /// Returns `None` both when the id doesn't exist and when it belongs
    /// to a different user — the caller cannot distinguish the two, which
    /// is the point: existence of another user's conversation must not
    /// leak.
    pub async fn get(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, user_id, title, message_count, created_at, last_message_at
             FROM conversations WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn list(
        pool: &SqlitePool,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, user_id, title, message_count, created_at, last_message_at
             FROM conversations WHERE user_id = ?
             ORDER BY last_message_at DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn rename(
        pool: &SqlitePool,
        id: i64,
        user_id: i64,
        title: &str,
    ) -> Result<Conversation> {
        let affected = sqlx::query("UPDATE conversations SET title = ? WHERE id = ? AND user_id = ?")
            .bind(title)
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("conversation {id}")));
        }
        Self::get(pool, id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("conversation {id}")))
    }

    /// Deletes the conversation and, via `ON DELETE CASCADE`, its messages.
    /// Memory-store cleanup is a separate step the caller must perform —
    /// this repo has no visibility into the external memory store.
    pub async fn delete(pool: &SqlitePool, id: i64, user_id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM conversations WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("conversation {id}")));
        }
        Ok(())
    }

    /// Batch delete, skipping ids that don't belong to `user_id` rather
    /// than failing the whole batch. Returns the number actually deleted.
    pub async fn delete_many(pool: &SqlitePool, ids: &[i64], user_id: i64) -> Result<u64> {
        let mut deleted = 0u64;
        for id in ids {
            if Self::delete(pool, *id, user_id).await.is_ok() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Bumps `message_count` by `delta` and sets `last_message_at` to now.
    /// Called once per user+assistant turn with `delta = 2`.
    pub async fn record_turn(pool: &SqlitePool, id: i64, delta: i64) -> Result<()> {
        sqlx::query(
            "UPDATE conversations SET message_count = message_count + ?,
             last_message_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?",
        )
        .bind(delta)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_with_user() -> (SqlitePool, i64) {
        let pool = crate::connect("sqlite::memory:", 1).await.unwrap();
        let user = crate::UserRepo::create(&pool, "carol", "hash").await.unwrap();
        (pool, user.id)
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let (pool, user_id) = pool_with_user().await;
        let conv = ConversationRepo::create(&pool, user_id, "hello").await.unwrap();
        let found = ConversationRepo::get(&pool, conv.id, user_id).await.unwrap().unwrap();
        assert_eq!(found.title, "hello");
        assert_eq!(found.message_count, 0);
    }

    #[tokio::test]
    async fn get_under_wrong_user_is_none() {
        let (pool, user_id) = pool_with_user().await;
        let conv = ConversationRepo::create(&pool, user_id, "mine").await.unwrap();
        let other = crate::UserRepo::create(&pool, "mallory", "hash").await.unwrap();
        assert!(ConversationRepo::get(&pool, conv.id, other.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_turn_updates_count_and_timestamp() {
        let (pool, user_id) = pool_with_user().await;
        let conv = ConversationRepo::create(&pool, user_id, "t").await.unwrap();
        ConversationRepo::record_turn(&pool, conv.id, 2).await.unwrap();
        let found = ConversationRepo::get(&pool, conv.id, user_id).await.unwrap().unwrap();
        assert_eq!(found.message_count, 2);
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let (pool, user_id) = pool_with_user().await;
        let conv = ConversationRepo::create(&pool, user_id, "t").await.unwrap();
        crate::MessageRepo::create(&pool, conv.id, cortex_domain::models::MessageRole::User, "hi")
            .await
            .unwrap();
        ConversationRepo::delete(&pool, conv.id, user_id).await.unwrap();
        let remaining = crate::MessageRepo::list(&pool, conv.id, 50, None).await.unwrap();
        assert!(remaining.is_empty());
    }
}
