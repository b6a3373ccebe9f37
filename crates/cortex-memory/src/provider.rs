//! The [`MemoryStoreAdapter`] trait abstracts over the external vector +
//! knowledge-graph memory library. Every method is keyed by `(namespace, run)`
//! — the Memory Manager is responsible for deriving those from
//! `(user_id, scope, conversation_id)`; the adapter never sees a user id.

use async_trait::async_trait;
use cortex_domain::error::Result;
use serde_json::Value;

use crate::types::{AddResult, ExtractionMessage, GetAllResult, SearchResult};

#[async_trait]
pub trait MemoryStoreAdapter: Send + Sync {
    /// Extract facts from `messages` and write them into the vector and
    /// graph stores under `(namespace, run)`.
    async fn add(
        &self,
        messages: &[ExtractionMessage],
        namespace: &str,
        run: Option<&str>,
        metadata: Value,
    ) -> Result<AddResult>;

    /// Semantic search scoped to `(namespace, run)`.
    async fn search(
        &self,
        query: &str,
        namespace: &str,
        run: Option<&str>,
        limit: u32,
    ) -> Result<SearchResult>;

    /// All memories in `(namespace, run)`, unscored.
    async fn get_all(
        &self,
        namespace: &str,
        run: Option<&str>,
        limit: u32,
    ) -> Result<GetAllResult>;

    /// Replace the text of a single memory by id.
    async fn update(&self, id: &str, text: &str) -> Result<()>;

    /// Remove a single memory by id. The graph store is updated
    /// transitively by the library, not by the caller.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Bulk delete every memory in `(namespace, run)`.
    async fn delete_all(&self, namespace: &str, run: Option<&str>) -> Result<()>;
}
