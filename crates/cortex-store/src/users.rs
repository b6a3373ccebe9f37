//! Account creation and lookup. Password hashing itself lives in the
//! gateway (argon2 is an auth concern, not a storage concern); this repo
//! only ever sees and stores the already-hashed value.

use sqlx::SqlitePool;

use cortex_domain::error::{Error, Result};
use cortex_domain::models::User;

pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<User> {
        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        if existing.is_some() {
            return Err(Error::Validation(format!("username {username} already taken")));
        }

        let id = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| Error::Database("user vanished after insert".into()))
    }

    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn get_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        crate::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn create_then_lookup_by_username() {
        let pool = pool().await;
        let user = UserRepo::create(&pool, "alice", "hash").await.unwrap();
        assert_eq!(user.username, "alice");

        let found = UserRepo::get_by_username(&pool, "alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let pool = pool().await;
        UserRepo::create(&pool, "bob", "hash").await.unwrap();
        let err = UserRepo::create(&pool, "bob", "other-hash").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_id_returns_none() {
        let pool = pool().await;
        assert!(UserRepo::get_by_id(&pool, 9999).await.unwrap().is_none());
    }
}
