//! Per-conversation turn serialization (§5 of the agent loop: "at most one
//! turn runs per conversation at a time").
//!
//! Core behavior gives no ordering guarantee across two overlapping sends on
//! the same conversation — that's a client responsibility. This map narrows
//! it: an Axum handler holds a permit for the whole persist-agent-persist
//! cycle, so at most one send per conversation is ever mid-flight, and a
//! second send arriving while the first is still running queues behind it
//! instead of racing it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// One binary semaphore per conversation id, created lazily on first use.
pub struct ConversationTurnLocks {
    semaphores: Mutex<HashMap<i64, Arc<Semaphore>>>,
}

impl Default for ConversationTurnLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationTurnLocks {
    pub fn new() -> Self {
        Self {
            semaphores: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore_for(&self, conversation_id: i64) -> Arc<Semaphore> {
        self.semaphores
            .lock()
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone()
    }

    /// Waits for exclusive access to `conversation_id`. The returned permit
    /// releases the lock when dropped, so callers should hold it for the
    /// full duration of the turn (persist → agent loop → persist).
    pub async fn acquire(&self, conversation_id: i64) -> Result<OwnedSemaphorePermit, TurnLockError> {
        self.semaphore_for(conversation_id)
            .acquire_owned()
            .await
            .map_err(|_| TurnLockError::Closed)
    }

    /// Drops the bookkeeping entry for any conversation with no held or
    /// queued permit, so the map doesn't grow unbounded over a long-running
    /// process.
    pub fn sweep(&self) {
        self.semaphores
            .lock()
            .retain(|_, sem| sem.available_permits() == 0);
    }

    pub fn tracked(&self) -> usize {
        self.semaphores.lock().len()
    }
}

#[derive(Debug)]
pub enum TurnLockError {
    Closed,
}

impl std::fmt::Display for TurnLockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnLockError::Closed => write!(f, "turn lock semaphore was closed"),
        }
    }
}

impl std::error::Error for TurnLockError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn one_turn_at_a_time_per_conversation() {
        let locks = ConversationTurnLocks::new();
        let first = locks.acquire(42).await.unwrap();
        drop(first);
        let second = locks.acquire(42).await.unwrap();
        drop(second);
    }

    #[tokio::test]
    async fn distinct_conversations_do_not_block_each_other() {
        let locks = Arc::new(ConversationTurnLocks::new());
        let a = locks.acquire(1).await.unwrap();
        let b = locks.acquire(2).await.unwrap();
        assert_eq!(locks.tracked(), 2);
        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn a_queued_send_proceeds_once_the_running_one_finishes() {
        let locks = Arc::new(ConversationTurnLocks::new());
        let held = locks.acquire(7).await.unwrap();

        let waiter = tokio::spawn({
            let locks = locks.clone();
            async move {
                let _permit = locks.acquire(7).await.unwrap();
                "done"
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn sweep_drops_idle_entries_but_keeps_held_ones() {
        let locks = ConversationTurnLocks::new();
        let held = locks.acquire(1).await.unwrap();
        {
            let _idle = locks.acquire(2).await.unwrap();
        }
        locks.sweep();
        assert_eq!(locks.tracked(), 1);
        drop(held);
    }
}
