//! Relational persistence for everything that is *not* a memory record:
//! accounts, conversations, their messages, and per-user model configs.
//!
//! `MemoryRecord` has no table here — it lives entirely in the external
//! vector/graph store reached through `cortex-memory`. This crate owns the
//! SQLite schema that backs the HTTP API's conversation and auth surface.

mod conversations;
mod messages;
mod migrate;
mod model_configs;
mod users;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use cortex_domain::error::{Error, Result};

pub use conversations::ConversationRepo;
pub use messages::MessageRepo;
pub use model_configs::ModelConfigRepo;
pub use users::UserRepo;

/// Open (creating if necessary) the SQLite database at `url` and run the
/// schema migration. `url` is a `sqlite:` connection string, e.g.
/// `sqlite://./data/cortex.db`.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| Error::Database(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

    migrate::run(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_creates_all_tables() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"conversations".to_string()));
        assert!(tables.contains(&"messages".to_string()));
        assert!(tables.contains(&"user_model_configs".to_string()));
    }
}
