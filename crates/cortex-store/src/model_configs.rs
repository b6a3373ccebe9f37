//! Per-user LLM provider configuration. `set_default` is the one place
//! I2 (exactly one `is_default = true` row per user) is enforced: the
//! unset-then-set happens inside a single transaction so a crash between
//! the two halves can never leave a user with zero or two defaults.

use sqlx::SqlitePool;

use cortex_domain::error::{Error, Result};
use cortex_domain::models::UserModelConfig;

pub struct ModelConfigRepo;

impl ModelConfigRepo {
    pub async fn create(
        pool: &SqlitePool,
        user_id: i64,
        provider: &str,
        model_name: &str,
        base_url: &str,
        api_key_encrypted: &str,
        make_default: bool,
    ) -> Result<UserModelConfig> {
        let mut tx = pool.begin().await.map_err(|e| Error::Database(e.to_string()))?;

        let existing_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_model_configs WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        // The very first config for a user is always the default, even if
        // the caller didn't ask for it — otherwise a brand new account has
        // no default and every agent turn fails with NO_MODEL_CONFIG.
        let is_default = make_default || existing_count == 0;

        if is_default {
            sqlx::query("UPDATE user_model_configs SET is_default = 0 WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::Database(e.to_string()))?;
        }

        let id = sqlx::query(
            "INSERT INTO user_model_configs
             (user_id, provider, model_name, base_url, api_key_encrypted, is_default)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(provider)
        .bind(model_name)
        .bind(base_url)
        .bind(api_key_encrypted)
        .bind(is_default)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                Error::Validation(format!("{provider}/{model_name} already configured"))
            } else {
                Error::Database(e.to_string())
            }
        })?
        .last_insert_rowid();

        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;

        Self::get(pool, id, user_id)
            .await?
            .ok_or_else(|| Error::Database("model config vanished after insert".into()))
    }

    pub async fn get(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Option<UserModelConfig>> {
        sqlx::query_as::<_, UserModelConfig>(
            "SELECT id, user_id, provider, model_name, base_url, api_key_encrypted, is_default, created_at
             FROM user_model_configs WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    pub async fn list(pool: &SqlitePool, user_id: i64) -> Result<Vec<UserModelConfig>> {
        sqlx::query_as::<_, UserModelConfig>(
            "SELECT id, user_id, provider, model_name, base_url, api_key_encrypted, is_default, created_at
             FROM user_model_configs WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// The config an agent turn should use when the caller didn't pick
    /// one explicitly. `NoModelConfig` (§7) when the user has none yet.
    pub async fn get_default(pool: &SqlitePool, user_id: i64) -> Result<UserModelConfig> {
        sqlx::query_as::<_, UserModelConfig>(
            "SELECT id, user_id, provider, model_name, base_url, api_key_encrypted, is_default, created_at
             FROM user_model_configs WHERE user_id = ? AND is_default = 1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .ok_or(Error::NoModelConfig)
    }

    pub async fn set_default(pool: &SqlitePool, id: i64, user_id: i64) -> Result<UserModelConfig> {
        let mut tx = pool.begin().await.map_err(|e| Error::Database(e.to_string()))?;

        let affected = sqlx::query("UPDATE user_model_configs SET is_default = 0 WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .rows_affected();
        let _ = affected;

        let set = sqlx::query("UPDATE user_model_configs SET is_default = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .rows_affected();

        if set == 0 {
            tx.rollback().await.map_err(|e| Error::Database(e.to_string()))?;
            return Err(Error::NotFound(format!("model config {id}")));
        }

        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;

        Self::get(pool, id, user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("model config {id}")))
    }

    pub async fn delete(pool: &SqlitePool, id: i64, user_id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM user_model_configs WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?
            .rows_affected();

        if affected == 0 {
            return Err(Error::NotFound(format!("model config {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool_with_user() -> (SqlitePool, i64) {
        let pool = crate::connect("sqlite::memory:", 1).await.unwrap();
        let user = crate::UserRepo::create(&pool, "erin", "hash").await.unwrap();
        (pool, user.id)
    }

    #[tokio::test]
    async fn first_config_becomes_default_automatically() {
        let (pool, user_id) = pool_with_user().await;
        let cfg = ModelConfigRepo::create(&pool, user_id, "openai", "gpt-4o", "https://api.openai.com/v1", "enc", false)
            .await
            .unwrap();
        assert!(cfg.is_default);
    }

    #[tokio::test]
    async fn only_one_default_survives_a_second_create() {
        let (pool, user_id) = pool_with_user().await;
        let first = ModelConfigRepo::create(&pool, user_id, "openai", "gpt-4o", "", "enc", false)
            .await
            .unwrap();
        let second = ModelConfigRepo::create(&pool, user_id, "deepseek", "deepseek-chat", "", "enc", true)
            .await
            .unwrap();

        let refreshed_first = ModelConfigRepo::get(&pool, first.id, user_id).await.unwrap().unwrap();
        assert!(!refreshed_first.is_default);
        assert!(second.is_default);

        let defaults = ModelConfigRepo::list(&pool, user_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.is_default)
            .count();
        assert_eq!(defaults, 1);
    }

    #[tokio::test]
    async fn set_default_moves_the_flag() {
        let (pool, user_id) = pool_with_user().await;
        let first = ModelConfigRepo::create(&pool, user_id, "openai", "gpt-4o", "", "enc", false)
            .await
            .unwrap();
        let second = ModelConfigRepo::create(&pool, user_id, "deepseek", "deepseek-chat", "", "enc", false)
            .await
            .unwrap();

        ModelConfigRepo::set_default(&pool, second.id, user_id).await.unwrap();
        let default = ModelConfigRepo::get_default(&pool, user_id).await.unwrap();
        assert_eq!(default.id, second.id);
        let _ = first;
    }

    #[tokio::test]
    async fn no_configs_yields_no_model_config_error() {
        let (pool, user_id) = pool_with_user().await;
        let err = ModelConfigRepo::get_default(&pool, user_id).await.unwrap_err();
        assert!(matches!(err, Error::NoModelConfig));
    }

    #[tokio::test]
    async fn duplicate_provider_model_pair_is_rejected() {
        let (pool, user_id) = pool_with_user().await;
        ModelConfigRepo::create(&pool, user_id, "openai", "gpt-4o", "", "enc", false)
            .await
            .unwrap();
        let err = ModelConfigRepo::create(&pool, user_id, "openai", "gpt-4o", "", "enc2", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
