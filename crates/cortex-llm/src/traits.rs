use cortex_domain::error::Result;
use cortex_domain::tool::{Message, ToolCall, ToolDefinition};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The conversation messages to send.
    pub messages: Vec<Message>,
    /// Tool definitions the model may invoke.
    pub tools: Vec<ToolDefinition>,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    pub max_tokens: Option<u32>,
    /// Model identifier. Every call here is per-user, so this is always set
    /// from the caller's `user_model_configs` row rather than a crate default.
    pub model: String,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Textual content of the response. Empty when the model only emitted
    /// tool calls.
    pub content: String,
    /// Tool calls emitted by the model, in the order the provider returned
    /// them.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage information, when the provider reports it.
    pub usage: Option<Usage>,
    /// The reason the model stopped generating (e.g. "stop", "tool_calls").
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every LLM adapter implements.
///
/// There is exactly one production implementation ([`crate::OpenAiCompatClient`])
/// because every provider the agent talks to speaks the OpenAI chat-completions
/// wire format, but the trait seam keeps the agent loop decoupled from HTTP and
/// testable with a fake.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and wait for the full (non-streaming)
    /// response. The agent loop never streams intermediate turns — only the
    /// final answer is chunked for the client, after this call returns.
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse>;
}
