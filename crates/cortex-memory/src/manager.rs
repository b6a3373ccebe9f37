//! The Memory Manager (C2): routes `(user_id, conversation_id, scope)` into
//! `(namespace, run)`, caches one adapter client per LLM-settings
//! fingerprint, and recovers from a transient "collection missing" error on
//! `add` by evicting and rebuilding the cached client.
//!
//! Replaces the singleton-with-hidden-global-state pattern in the source
//! with an explicitly constructed, explicitly shared (`Arc`) service.

use std::collections::HashMap;
use std::sync::Arc;

use cortex_domain::config::MemoryStoreConfig;
use cortex_domain::error::{Error, Result};
use cortex_domain::models::MemoryScope;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::provider::MemoryStoreAdapter;
use crate::rest::RestMemoryStoreClient;
use crate::types::{AddResult, ExtractionMessage, GetAllResult, Relation, SearchResult};

/// The subset of a user's `user_model_configs` row needed to configure the
/// memory store's own fact-extraction LLM. Two users pointed at different
/// providers/models must never share a cached adapter.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LlmSettings {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

/// Deterministic cache key for a set of LLM settings. `None` maps to the
/// literal `"default"`, matching the source's untyped-client convention.
fn fingerprint(settings: Option<&LlmSettings>) -> String {
    match settings {
        None => "default".to_string(),
        Some(s) => {
            let json = serde_json::to_string(s).expect("LlmSettings always serializes");
            let mut hasher = Sha256::new();
            hasher.update(json.as_bytes());
            hex::encode(hasher.finalize())
        }
    }
}

pub struct MemoryManager {
    store_cfg: MemoryStoreConfig,
    clients: RwLock<HashMap<String, Arc<dyn MemoryStoreAdapter>>>,
}

impl MemoryManager {
    pub fn new(store_cfg: MemoryStoreConfig) -> Self {
        Self {
            store_cfg,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Force construction of the adapter for `settings` so the first real
    /// request pays no cold-start cost.
    pub fn warm_up(&self, settings: Option<&LlmSettings>) -> Result<()> {
        self.get_or_build(settings).map(|_| ())
    }

    fn get_or_build(&self, settings: Option<&LlmSettings>) -> Result<Arc<dyn MemoryStoreAdapter>> {
        let key = fingerprint(settings);

        if let Some(client) = self.clients.read().get(&key) {
            return Ok(client.clone());
        }

        let client: Arc<dyn MemoryStoreAdapter> =
            Arc::new(RestMemoryStoreClient::new(&self.store_cfg)?);
        self.clients.write().insert(key, client.clone());
        Ok(client)
    }

    fn evict(&self, settings: Option<&LlmSettings>) {
        let key = fingerprint(settings);
        self.clients.write().remove(&key);
        cortex_domain::trace::TraceEvent::MemoryClientEvicted {
            fingerprint: key,
            reason: "add returned not-found".into(),
        }
        .emit();
    }

    fn resolve_ids(user_id: i64, conversation_id: i64, scope: MemoryScope) -> String {
        scope.namespace(user_id, conversation_id)
    }

    /// `C2.add` — scope-routed, with one evict-and-retry on a transient
    /// "not found" signature from the adapter (§4.2).
    pub async fn add_memory(
        &self,
        user_id: i64,
        conversation_id: i64,
        scope: MemoryScope,
        content: &str,
        settings: Option<&LlmSettings>,
    ) -> Result<AddResult> {
        let namespace = Self::resolve_ids(user_id, conversation_id, scope);
        let messages = [ExtractionMessage {
            role: "user".into(),
            content: content.to_string(),
        }];
        let metadata = serde_json::json!({
            "scope": match scope { MemoryScope::Local => "local", MemoryScope::Global => "global" },
            "real_user_id": user_id,
            "source_conversation_id": conversation_id,
        });

        let client = self.get_or_build(settings)?;
        match client.add(&messages, &namespace, None, metadata.clone()).await {
            Ok(result) => Ok(result),
            Err(Error::NotFound(_)) => {
                self.evict(settings);
                let rebuilt = self.get_or_build(settings)?;
                rebuilt.add(&messages, &namespace, None, metadata).await
            }
            Err(e) => Err(e),
        }
    }

    /// Insert a `graph_reset` neutralizing statement (I5). Used by the
    /// delete tool, never by a normal `add_*` tool call.
    pub async fn add_graph_reset(
        &self,
        user_id: i64,
        conversation_id: i64,
        scope: MemoryScope,
        neutralizing_text: &str,
        settings: Option<&LlmSettings>,
    ) -> Result<AddResult> {
        let namespace = Self::resolve_ids(user_id, conversation_id, scope);
        let messages = [ExtractionMessage {
            role: "user".into(),
            content: neutralizing_text.to_string(),
        }];
        let metadata = serde_json::json!({"type": "graph_reset", "source": "delete_tool"});
        let client = self.get_or_build(settings)?;
        client.add(&messages, &namespace, None, metadata).await
    }

    /// `C2.search` — errors are swallowed and surfaced as an empty result,
    /// matching the source's defensive `try/except -> []`.
    pub async fn search_memories(
        &self,
        user_id: i64,
        conversation_id: i64,
        scope: MemoryScope,
        query: &str,
        limit: u32,
        settings: Option<&LlmSettings>,
    ) -> SearchResult {
        let namespace = Self::resolve_ids(user_id, conversation_id, scope);
        let run_memories = async {
            let client = self.get_or_build(settings)?;
            client.search(query, &namespace, None, limit).await
        };
        match run_memories.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, namespace = %namespace, "search_memories failed, returning empty");
                SearchResult::default()
            }
        }
    }

    /// `C2.get_memories` — always returns `{results, relations}`, even on
    /// failure, never filtering relations by conversation.
    pub async fn get_memories(
        &self,
        user_id: i64,
        conversation_id: Option<i64>,
        limit: u32,
        settings: Option<&LlmSettings>,
    ) -> GetAllResult {
        let namespace = match conversation_id {
            Some(conv) => Self::resolve_ids(user_id, conv, MemoryScope::Local),
            None => MemoryScope::Global.namespace(user_id, 0),
        };
        let run_memories = async {
            let client = self.get_or_build(settings)?;
            client.get_all(&namespace, None, limit).await
        };
        match run_memories.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, namespace = %namespace, "get_memories failed, returning empty");
                GetAllResult::default()
            }
        }
    }

    pub async fn update_memory(
        &self,
        id: &str,
        text: &str,
        settings: Option<&LlmSettings>,
    ) -> Result<()> {
        self.get_or_build(settings)?.update(id, text).await
    }

    pub async fn delete_memory(&self, id: &str, settings: Option<&LlmSettings>) -> Result<()> {
        self.get_or_build(settings)?.delete(id).await
    }

    /// Cascading delete for conversation deletion. The source declares this
    /// behavior but never implements it (§9 Open Questions); this
    /// implementation treats it as required.
    pub async fn delete_conversation_memories(
        &self,
        user_id: i64,
        conversation_id: i64,
        settings: Option<&LlmSettings>,
    ) -> Result<()> {
        let namespace = Self::resolve_ids(user_id, conversation_id, MemoryScope::Local);
        self.get_or_build(settings)?
            .delete_all(&namespace, None)
            .await
    }
}

/// Flatten a [`SearchResult`]/[`GetAllResult`]-shaped pair into the two
/// ordered lists the LLM is shown: relevant memory text, and rendered graph
/// edges. Shared by both search tools (§4.3).
pub fn render_relations(relations: &[Relation]) -> Vec<String> {
    relations.iter().map(Relation::render).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_default_is_stable() {
        assert_eq!(fingerprint(None), "default");
    }

    #[test]
    fn fingerprint_differs_per_settings() {
        let a = LlmSettings {
            provider: "openai".into(),
            model: "gpt-4o".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: "sk-a".into(),
        };
        let b = LlmSettings {
            api_key: "sk-b".into(),
            ..a.clone()
        };
        assert_ne!(fingerprint(Some(&a)), fingerprint(Some(&b)));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let s = LlmSettings {
            provider: "deepseek".into(),
            model: "deepseek-chat".into(),
            base_url: "https://api.deepseek.com".into(),
            api_key: "sk-x".into(),
        };
        assert_eq!(fingerprint(Some(&s)), fingerprint(Some(&s)));
    }
}
