//! The Agent Orchestrator (C4): drives the LLM tool-call loop, dispatching
//! tool calls from one turn in parallel and feeding their results back in
//! original order before the next turn.

use cortex_domain::tool::Message;
use cortex_llm::{ChatRequest, LlmProvider};

use super::tools::{self, ToolContext};

const SYSTEM_PROMPT: &str = "\
You are a conversational assistant backed by a two-tier memory store: \
a local tier scoped to this conversation, and a global tier shared across \
every conversation the user has.

Search results you receive contain both vector hits and knowledge-graph \
edges; consider both. Treat graph edges as a secondary signal when vector \
records are missing for a topic, but an explicit \"unknown\" marker in the \
graph always takes precedence over an older vector hit.

Store facts fully, including their subject — never store a fact without \
naming who it is about. When the user corrects a fact, store the \
corrected version; don't try to edit the old one yourself. Only call \
delete_memory when the user explicitly asks you to forget something. \
When searching, check local memories before global ones.";

/// `chat_agent` (§4.4). `history` excludes the user message that triggered
/// this call — the caller appends it last.
pub async fn chat_agent(
    llm: &dyn LlmProvider,
    model: &str,
    max_turns: u32,
    temperature: f64,
    history: &[Message],
    user_message: &str,
    tool_ctx: &ToolContext<'_>,
) -> String {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(SYSTEM_PROMPT));
    messages.extend_from_slice(history);
    messages.push(Message::user(user_message));

    let tool_defs = tools::tool_definitions();

    for _turn in 0..max_turns {
        let req = ChatRequest {
            messages: messages.clone(),
            tools: tool_defs.clone(),
            temperature: Some(temperature as f32),
            max_tokens: None,
            model: model.to_string(),
        };

        let response = match llm.chat(req).await {
            Ok(r) => r,
            Err(e) => return format!("处理错误: {e}"),
        };

        if response.tool_calls.is_empty() {
            return response.content;
        }

        messages.push(Message::assistant_tool_calls(&response.tool_calls));

        // Dispatch every tool call in this turn concurrently, then append
        // results in the original order regardless of completion order —
        // OpenAI-compatible APIs require tool_call_id pairing by position.
        let futures = response
            .tool_calls
            .iter()
            .map(|call| tools::execute(&call.tool_name, &call.arguments, tool_ctx));
        let results = futures_util::future::join_all(futures).await;

        for (call, result) in response.tool_calls.iter().zip(results) {
            messages.push(Message::tool_result(&call.call_id, result));
        }
    }

    "思考超时。".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cortex_domain::error::Result;
    use cortex_domain::tool::ToolCall;
    use cortex_llm::ChatResponse;
    use cortex_memory::MemoryManager;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct StubLlm {
        call_count: AtomicU32,
        responses: Vec<ChatResponse>,
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(self.responses[idx.min(self.responses.len() - 1)].clone())
        }
    }

    fn ctx(memory: &MemoryManager) -> ToolContext<'_> {
        ToolContext {
            user_id: 1,
            conversation_id: 1,
            memory,
            llm_settings: None,
            llm: Arc::new(StubLlm {
                call_count: AtomicU32::new(0),
                responses: vec![ChatResponse {
                    content: "[]".into(),
                    tool_calls: vec![],
                    usage: None,
                    finish_reason: None,
                }],
            }),
            model: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn returns_text_when_no_tool_calls_requested() {
        let memory = MemoryManager::new(Default::default());
        let llm = StubLlm {
            call_count: AtomicU32::new(0),
            responses: vec![ChatResponse {
                content: "hello there".into(),
                tool_calls: vec![],
                usage: None,
                finish_reason: Some("stop".into()),
            }],
        };
        let tool_ctx = ctx(&memory);
        let out = chat_agent(&llm, "m", 5, 0.7, &[], "hi", &tool_ctx).await;
        assert_eq!(out, "hello there");
    }

    #[tokio::test]
    async fn exhausting_max_turns_returns_timeout_string() {
        let memory = MemoryManager::new(Default::default());
        let llm = StubLlm {
            call_count: AtomicU32::new(0),
            responses: vec![ChatResponse {
                content: "".into(),
                tool_calls: vec![ToolCall {
                    call_id: "c1".into(),
                    tool_name: "search_local_memories".into(),
                    arguments: serde_json::json!({"query": "anything"}),
                }],
                usage: None,
                finish_reason: Some("tool_calls".into()),
            }],
        };
        let tool_ctx = ctx(&memory);
        let out = chat_agent(&llm, "m", 2, 0.7, &[], "hi", &tool_ctx).await;
        assert_eq!(out, "思考超时。");
    }

    #[tokio::test]
    async fn llm_error_produces_chinese_error_string() {
        struct FailingLlm;
        #[async_trait]
        impl LlmProvider for FailingLlm {
            async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
                Err(cortex_domain::error::Error::Provider {
                    provider: "test".into(),
                    message: "boom".into(),
                })
            }
        }
        let memory = MemoryManager::new(Default::default());
        let tool_ctx = ctx(&memory);
        let out = chat_agent(&FailingLlm, "m", 5, 0.7, &[], "hi", &tool_ctx).await;
        assert!(out.starts_with("处理错误:"));
    }
}
