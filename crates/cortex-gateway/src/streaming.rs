//! The Streaming Pipeline (C5): persists the user turn, runs the agent
//! loop to completion, then replays the final answer as a sequence of
//! fixed-size SSE `token` events — pseudo-streaming, since the agent may
//! issue an unpredictable number of tool calls before it has anything to
//! say (§4.5).

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use serde_json::json;
use std::convert::Infallible;

use cortex_domain::models::{Message as DbMessage, MessageRole};
use cortex_domain::tool::Message as LlmMessage;
use cortex_store::{ConversationRepo, MessageRepo};

use crate::agent::tools::ToolContext;
use crate::agent::{self};
use crate::state::AppState;

const DEFAULT_TITLE: &str = "新对话";

fn db_history_to_llm(messages: &[DbMessage]) -> Vec<LlmMessage> {
    messages
        .iter()
        .map(|m| match m.role {
            MessageRole::User => LlmMessage::user(m.content.clone()),
            MessageRole::Assistant => LlmMessage::assistant(m.content.clone()),
        })
        .collect()
}

fn sse_event(event_name: &str, data: serde_json::Value) -> Event {
    Event::default().event(event_name).data(data.to_string())
}

/// Runs one full turn and returns it as an SSE byte stream. Errors during
/// setup (resolving the model, loading history) are reported as a single
/// terminal `error` event rather than an HTTP error, matching the
/// source's "the response has already started" pseudo-streaming contract.
pub async fn stream_turn(
    state: AppState,
    user_id: i64,
    conversation_id: i64,
    content: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = run_turn(state, user_id, conversation_id, content).await;
    Sse::new(stream::iter(events.into_iter().map(Ok))).keep_alive(KeepAlive::default())
}

async fn run_turn(state: AppState, user_id: i64, conversation_id: i64, content: String) -> Vec<Event> {
    let _permit = match state.turn_locks().acquire(conversation_id).await {
        Ok(permit) => permit,
        Err(busy) => return vec![error_event(&busy.to_string(), "AGENT_ERROR")],
    };

    let mut events = Vec::new();

    let user_message = match MessageRepo::create(state.db(), conversation_id, MessageRole::User, &content).await {
        Ok(m) => m,
        Err(e) => return vec![error_event(&e.to_string(), e.code().as_str())],
    };
    events.push(sse_event(
        "user_message",
        json!({"type": "user_message", "message_id": user_message.id, "content": content}),
    ));

    let history_limit = state.config().agent.history_limit as i64;
    let history = match MessageRepo::list(state.db(), conversation_id, history_limit + 1, None).await {
        Ok(h) => h,
        Err(e) => return push_and_return(events, error_event(&e.to_string(), e.code().as_str())),
    };
    // `list` includes the just-saved user message; drop it so the agent
    // doesn't see it twice (once in history, once as `user_message`).
    let history: Vec<_> = history.into_iter().filter(|m| m.id != user_message.id).collect();
    let llm_history = db_history_to_llm(&history);

    let resolved = match crate::llm_resolve::resolve_default(&state, user_id).await {
        Ok(r) => r,
        Err(e) => return push_and_return(events, error_event(&e.to_string(), e.code().as_str())),
    };

    let tool_ctx = ToolContext {
        user_id,
        conversation_id,
        memory: state.memory(),
        llm_settings: Some(resolved.settings.clone()),
        llm: resolved.llm.clone(),
        model: resolved.model.clone(),
    };

    let final_text = agent::chat_agent(
        resolved.llm.as_ref(),
        &resolved.model,
        state.config().agent.max_turns,
        state.config().agent.temperature,
        &llm_history,
        &content,
        &tool_ctx,
    )
    .await;

    let chunk_chars = state.config().agent.stream_chunk_chars.max(1);
    for chunk in chunk_str(&final_text, chunk_chars) {
        events.push(sse_event("token", json!({"type": "token", "content": chunk})));
    }

    let assistant_message = match MessageRepo::create(state.db(), conversation_id, MessageRole::Assistant, &final_text).await {
        Ok(m) => m,
        Err(e) => return push_and_return(events, error_event(&e.to_string(), e.code().as_str())),
    };

    if let Err(e) = ConversationRepo::record_turn(state.db(), conversation_id, 2).await {
        tracing::warn!(error = %e, "failed to record turn metadata");
    }
    maybe_set_title(&state, conversation_id, user_id, &content).await;

    events.push(sse_event("done", json!({"type": "done", "message_id": assistant_message.id})));
    events
}

fn push_and_return(mut events: Vec<Event>, terminal: Event) -> Vec<Event> {
    events.push(terminal);
    events
}

fn error_event(message: &str, error_code: &str) -> Event {
    sse_event("error", json!({"type": "error", "message": message, "error_code": error_code}))
}

/// First non-empty user message, truncated to 30 chars, applied once
/// when the conversation still has the default placeholder title.
async fn maybe_set_title(state: &AppState, conversation_id: i64, user_id: i64, content: &str) {
    let Ok(Some(conversation)) = ConversationRepo::get(state.db(), conversation_id, user_id).await else {
        return;
    };
    if !conversation.title.is_empty() && conversation.title != DEFAULT_TITLE {
        return;
    }
    let title: String = content.chars().take(30).collect();
    if let Err(e) = ConversationRepo::rename(state.db(), conversation_id, user_id, &title).await {
        tracing::warn!(error = %e, "failed to auto-derive conversation title");
    }
}

fn chunk_str(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(chunk_chars).map(|c| c.iter().collect()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_str_splits_on_char_boundaries_not_bytes() {
        let chunks = chunk_str("你好世界hello", 2);
        assert_eq!(chunks, vec!["你好", "世界", "he", "ll", "o"]);
    }

    #[test]
    fn chunk_str_of_55_chars_by_10_yields_six_chunks() {
        let text = "a".repeat(55);
        assert_eq!(chunk_str(&text, 10).len(), 6);
    }

    #[test]
    fn chunk_str_empty_text_yields_no_chunks() {
        assert!(chunk_str("", 10).is_empty());
    }
}
