//! Typed records returned by the memory store, replacing the dynamic
//! dictionary responses the underlying library returns natively.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A `(subject, relationship, destination)` edge in the knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relation {
    pub source: String,
    pub relationship: String,
    pub destination: String,
}

impl Relation {
    /// Render as `"{source} --[{relationship}]--> {destination}"`, the form
    /// handed to the LLM so it can reason over graph edges explicitly.
    pub fn render(&self) -> String {
        format!(
            "{} --[{}]--> {}",
            self.source, self.relationship, self.destination
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryEventKind {
    Add,
    Update,
    Delete,
    None,
}

/// One outcome of an `add` call — the adapter may ADD a new fact, UPDATE
/// an existing one it judges equivalent, DELETE a contradicted one, or do
/// NONE if nothing novel was extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEvent {
    pub id: String,
    pub text: String,
    pub event: MemoryEventKind,
}

/// One scored hit from `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub memory: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub score: f64,
}

/// One unscored hit from `get_all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHit {
    pub id: String,
    pub memory: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AddResult {
    pub results: Vec<MemoryEvent>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResult {
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GetAllResult {
    pub results: Vec<MemoryHit>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

/// A single chat-shaped turn handed to `add` for fact extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionMessage {
    pub role: String,
    pub content: String,
}
