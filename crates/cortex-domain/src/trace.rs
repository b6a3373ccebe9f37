use serde::Serialize;

/// Structured trace events emitted across the cortex crates.
///
/// Each variant is logged through [`tracing`] as a single JSON-encoded
/// `cortex_event` field so a log pipeline can index on `event` without
/// parsing free-text messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    MemoryStoreCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    MemoryClientEvicted {
        fingerprint: String,
        reason: String,
    },
    LlmRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    AgentTurn {
        conversation_id: String,
        turn: u32,
        tool_calls: usize,
    },
    AgentTurnExhausted {
        conversation_id: String,
        max_turns: u32,
    },
    ToolExecuted {
        tool_name: String,
        ok: bool,
        duration_ms: u64,
    },
    MemoryGraphReset {
        user_id: String,
        scope: String,
        memory_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(cortex_event = %json, "cortex_event");
    }
}
