//! Message persistence. History is append-only (I4): there is no update
//! path for assistant turns, only for a user's own messages, and no
//! delete path at all short of deleting the whole conversation.

use sqlx::SqlitePool;

use cortex_domain::error::{Error, Result};
use cortex_domain::models::{Message, MessageRole};

pub struct MessageRepo;

impl MessageRepo {
    pub async fn create(
        pool: &SqlitePool,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let id = sqlx::query("INSERT INTO messages (conversation_id, role, content) VALUES (?, ?, ?)")
            .bind(conversation_id)
            .bind(role)
            .bind(content)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .last_insert_rowid();

        Self::get(pool, id)
            .await?
            .ok_or_else(|| Error::Database("message vanished after insert".into()))
    }

    pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Message>> {
        sqlx::query_as::<_, Message>(
            "SELECT id, conversation_id, role, content, created_at FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// The most recent `limit` messages in ascending (chronological) order
    /// — the shape the agent's history window and the HTTP listing both
    /// need. `before_id` paginates backward from a given message.
    pub async fn list(
        pool: &SqlitePool,
        conversation_id: i64,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, Message>(
            "SELECT id, conversation_id, role, content, created_at FROM messages
             WHERE conversation_id = ? AND (? IS NULL OR id < ?)
             ORDER BY id DESC LIMIT ?",
        )
        .bind(conversation_id)
        .bind(before_id)
        .bind(before_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(rows.into_iter().rev().collect())
    }

    /// Edits a user-authored message in place. Assistant messages are
    /// append-only and cannot be edited through this path. `conversation_id`
    /// scopes both the lookup and the update, mirroring `delete` — a message
    /// id that exists but belongs to a different conversation is reported
    /// the same as one that doesn't exist at all.
    pub async fn update_user_message(
        pool: &SqlitePool,
        id: i64,
        conversation_id: i64,
        content: &str,
    ) -> Result<Message> {
        let message = Self::get(pool, id)
            .await?
            .filter(|m| m.conversation_id == conversation_id)
            .ok_or_else(|| Error::NotFound(format!("message {id}")))?;
        if message.role != MessageRole::User {
            return Err(Error::Forbidden("only user messages can be edited".into()));
        }

        let affected = sqlx::query("UPDATE messages SET content = ? WHERE id = ? AND conversation_id = ?")
            .bind(content)
            .bind(id)
            .bind(conversation_id)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("message {id}")));
        }

        Self::get(pool, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("message {id}")))
    }

    /// Deletes a message of any role. Unlike editing, deletion isn't
    /// restricted to user messages — the source allows removing a bad
    /// assistant reply too.
    pub async fn delete(pool: &SqlitePool, id: i64, conversation_id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM messages WHERE id = ? AND conversation_id = ?")
            .bind(id)
            .bind(conversation_id)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("message {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_with_conversation() -> (SqlitePool, i64) {
        let pool = crate::connect("sqlite::memory:", 1).await.unwrap();
        let user = crate::UserRepo::create(&pool, "dave", "hash").await.unwrap();
        let conv = crate::ConversationRepo::create(&pool, user.id, "t").await.unwrap();
        (pool, conv.id)
    }

    #[tokio::test]
    async fn list_returns_chronological_order() {
        let (pool, conv_id) = pool_with_conversation().await;
        MessageRepo::create(&pool, conv_id, MessageRole::User, "first").await.unwrap();
        MessageRepo::create(&pool, conv_id, MessageRole::Assistant, "second").await.unwrap();

        let history = MessageRepo::list(&pool, conv_id, 20, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "second");
    }

    #[tokio::test]
    async fn assistant_messages_cannot_be_edited() {
        let (pool, conv_id) = pool_with_conversation().await;
        let msg = MessageRepo::create(&pool, conv_id, MessageRole::Assistant, "reply")
            .await
            .unwrap();
        let err = MessageRepo::update_user_message(&pool, msg.id, conv_id, "edited")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn user_message_edit_round_trips() {
        let (pool, conv_id) = pool_with_conversation().await;
        let msg = MessageRepo::create(&pool, conv_id, MessageRole::User, "typo")
            .await
            .unwrap();
        let edited = MessageRepo::update_user_message(&pool, msg.id, conv_id, "fixed")
            .await
            .unwrap();
        assert_eq!(edited.content, "fixed");
    }

    #[tokio::test]
    async fn edit_under_wrong_conversation_is_not_found() {
        let (pool, conv_id) = pool_with_conversation().await;
        let msg = MessageRepo::create(&pool, conv_id, MessageRole::User, "hi").await.unwrap();
        let err = MessageRepo::update_user_message(&pool, msg.id, conv_id + 1, "hijacked")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let unchanged = MessageRepo::get(&pool, msg.id).await.unwrap().unwrap();
        assert_eq!(unchanged.content, "hi");
    }

    #[tokio::test]
    async fn delete_removes_message_of_any_role() {
        let (pool, conv_id) = pool_with_conversation().await;
        let msg = MessageRepo::create(&pool, conv_id, MessageRole::Assistant, "oops")
            .await
            .unwrap();
        MessageRepo::delete(&pool, msg.id, conv_id).await.unwrap();
        assert!(MessageRepo::get(&pool, msg.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_under_wrong_conversation_is_not_found() {
        let (pool, conv_id) = pool_with_conversation().await;
        let msg = MessageRepo::create(&pool, conv_id, MessageRole::User, "hi").await.unwrap();
        let err = MessageRepo::delete(&pool, msg.id, conv_id + 1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
