use std::sync::Arc;

use sqlx::SqlitePool;

use cortex_domain::config::Config;
use cortex_memory::MemoryManager;

use crate::runtime::turn_lock::ConversationTurnLocks;

/// Everything a handler needs, cloned cheaply into every request.
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

struct Inner {
    pub db: SqlitePool,
    pub memory: MemoryManager,
    pub config: Config,
    pub turn_locks: ConversationTurnLocks,
}

impl AppState {
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let memory = MemoryManager::new(config.memory_store.clone());
        Self(Arc::new(Inner {
            db,
            memory,
            config,
            turn_locks: ConversationTurnLocks::new(),
        }))
    }

    pub fn db(&self) -> &SqlitePool {
        &self.0.db
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.0.memory
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub fn turn_locks(&self) -> &ConversationTurnLocks {
        &self.0.turn_locks
    }
}
