//! The Tool Executor (C3): the five memory tools advertised to the LLM,
//! plus the delete protocol's graph-reset bookkeeping.
//!
//! Every tool returns a plain string, success or failure alike — a
//! failing tool is reported back to the model, never thrown, so the
//! loop can keep going and the model can explain the failure to the
//! user (§4.3's "failure semantics").

use std::sync::Arc;

use serde_json::{json, Value};

use cortex_domain::models::MemoryScope;
use cortex_domain::tool::{Message, ToolDefinition};
use cortex_llm::{ChatRequest, LlmProvider};
use cortex_memory::{LlmSettings, MemoryManager};

pub const ADD_LOCAL: &str = "add_local_memory";
pub const ADD_GLOBAL: &str = "add_global_memory";
pub const SEARCH_LOCAL: &str = "search_local_memories";
pub const SEARCH_GLOBAL: &str = "search_global_memories";
pub const DELETE_MEMORY: &str = "delete_memory";

const SEARCH_LIMIT: u32 = 5;
const DELETE_CANDIDATE_LIMIT: u32 = 10;

pub fn tool_definitions() -> Vec<ToolDefinition> {
    let content_schema = json!({
        "type": "object",
        "properties": {"content": {"type": "string"}},
        "required": ["content"],
    });
    let query_schema = json!({
        "type": "object",
        "properties": {"query": {"type": "string"}},
        "required": ["query"],
    });

    vec![
        ToolDefinition {
            name: ADD_LOCAL.into(),
            description: "Store a fact that only applies to this conversation.".into(),
            parameters: content_schema.clone(),
        },
        ToolDefinition {
            name: ADD_GLOBAL.into(),
            description: "Store a fact about the user that should be remembered across every conversation.".into(),
            parameters: content_schema.clone(),
        },
        ToolDefinition {
            name: SEARCH_LOCAL.into(),
            description: "Search facts stored only in this conversation.".into(),
            parameters: query_schema.clone(),
        },
        ToolDefinition {
            name: SEARCH_GLOBAL.into(),
            description: "Search facts stored about the user across all conversations.".into(),
            parameters: query_schema,
        },
        ToolDefinition {
            name: DELETE_MEMORY.into(),
            description: "Forget a fact the user asked to have removed. Describe what to forget in natural language.".into(),
            parameters: content_schema,
        },
    ]
}

/// Per-turn context a tool call executes against. Built fresh for every
/// `chat_agent` invocation — nothing here outlives one HTTP request.
pub struct ToolContext<'a> {
    pub user_id: i64,
    pub conversation_id: i64,
    pub memory: &'a MemoryManager,
    pub llm_settings: Option<LlmSettings>,
    pub llm: Arc<dyn LlmProvider>,
    pub model: String,
}

pub async fn execute(name: &str, args: &Value, ctx: &ToolContext<'_>) -> String {
    let result = match name {
        ADD_LOCAL => add_memory(ctx, args, MemoryScope::Local).await,
        ADD_GLOBAL => add_memory(ctx, args, MemoryScope::Global).await,
        SEARCH_LOCAL => search_memory(ctx, args, MemoryScope::Local).await,
        SEARCH_GLOBAL => search_memory(ctx, args, MemoryScope::Global).await,
        DELETE_MEMORY => delete_memory(ctx, args).await,
        other => Err(format!("unknown tool: {other}")),
    };
    match result {
        Ok(s) => s,
        Err(s) => s,
    }
}

fn arg_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| format!("missing or empty '{key}' argument"))
}

async fn add_memory(ctx: &ToolContext<'_>, args: &Value, scope: MemoryScope) -> Result<String, String> {
    let content = arg_str(args, "content")?;
    ctx.memory
        .add_memory(ctx.user_id, ctx.conversation_id, scope, content, ctx.llm_settings.as_ref())
        .await
        .map(|_| "Memory stored.".to_string())
        .map_err(|e| format!("Failed to store memory: {e}"))
}

async fn search_memory(ctx: &ToolContext<'_>, args: &Value, scope: MemoryScope) -> Result<String, String> {
    let query = arg_str(args, "query")?;
    let result = ctx
        .memory
        .search_memories(ctx.user_id, ctx.conversation_id, scope, query, SEARCH_LIMIT, ctx.llm_settings.as_ref())
        .await;

    let relevant_memories: Vec<&str> = result.results.iter().map(|h| h.memory.as_str()).collect();
    let knowledge_graph_connections = cortex_memory::render_relations(&result.relations);

    let header = match scope {
        MemoryScope::Local => "局部搜索结果",
        MemoryScope::Global => "全局搜索结果",
    };
    Ok(format!(
        "{header}: {}",
        json!({
            "relevant_memories": relevant_memories,
            "knowledge_graph_connections": knowledge_graph_connections,
        })
    ))
}

struct DeleteCandidate {
    id: String,
    content: String,
    scope: MemoryScope,
}

/// The delete protocol (§4.3): gather candidates from both namespaces,
/// ask the LLM which ones the user actually means, physically delete
/// them, then reset the graph so no orphaned edge survives (I5).
async fn delete_memory(ctx: &ToolContext<'_>, args: &Value) -> Result<String, String> {
    let description = arg_str(args, "content")?;

    let mut candidates = Vec::new();
    let mut graph_residue = false;
    for scope in [MemoryScope::Local, MemoryScope::Global] {
        let hits = ctx
            .memory
            .search_memories(ctx.user_id, ctx.conversation_id, scope, description, DELETE_CANDIDATE_LIMIT, ctx.llm_settings.as_ref())
            .await;
        for hit in &hits.results {
            candidates.push(DeleteCandidate {
                id: hit.id.clone(),
                content: hit.memory.clone(),
                scope,
            });
        }
        for relation in &hits.relations {
            graph_residue = true;
            candidates.push(DeleteCandidate {
                id: "graph_only".into(),
                content: format!("[{scope:?}图谱残留] {}", relation.render()),
                scope,
            });
        }
    }

    if candidates.is_empty() {
        return Ok("No matching memories found.".to_string());
    }

    let chosen_ids = review_delete_candidates(ctx, description, &candidates).await;

    let mut deleted_contents = Vec::new();
    for id in &chosen_ids {
        if id == "graph_only" {
            continue;
        }
        if let Some(candidate) = candidates.iter().find(|c| &c.id == id) {
            match ctx.memory.delete_memory(id, ctx.llm_settings.as_ref()).await {
                Ok(()) => deleted_contents.push(candidate.content.clone()),
                Err(e) => tracing::warn!(error = %e, id = %id, "delete_memory failed for candidate"),
            }
        }
    }

    if deleted_contents.is_empty() && !graph_residue {
        return Ok("No matching memories found.".to_string());
    }

    if let Some(statement) = neutralizing_statement(ctx, &deleted_contents).await {
        let global = ctx
            .memory
            .add_graph_reset(ctx.user_id, ctx.conversation_id, MemoryScope::Global, &statement, ctx.llm_settings.as_ref())
            .await;
        let local = ctx
            .memory
            .add_graph_reset(ctx.user_id, ctx.conversation_id, MemoryScope::Local, &statement, ctx.llm_settings.as_ref())
            .await;
        if let Err(e) = global {
            tracing::warn!(error = %e, "global graph reset insert failed");
        }
        if let Err(e) = local {
            tracing::warn!(error = %e, "local graph reset insert failed");
        }
    }

    Ok(format!(
        "Deleted {} memor{}. Knowledge graph synchronized.",
        deleted_contents.len(),
        if deleted_contents.len() == 1 { "y" } else { "ies" }
    ))
}

async fn review_delete_candidates(ctx: &ToolContext<'_>, description: &str, candidates: &[DeleteCandidate]) -> Vec<String> {
    let listing: Vec<Value> = candidates
        .iter()
        .map(|c| json!({"id": c.id, "content": c.content}))
        .collect();
    let prompt = format!(
        "The user wants to forget: \"{description}\".\n\
         Candidate memories: {}\n\
         Return a JSON array of the ids that match what the user wants to forget. \
         Only match candidates whose content is actually what the user is describing. \
         Ignore any id literally equal to \"graph_only\" — those are informational only. \
         Return [] if nothing matches. Respond with the JSON array and nothing else.",
        Value::Array(listing)
    );

    let req = ChatRequest {
        messages: vec![Message::user(prompt)],
        tools: vec![],
        temperature: Some(0.0),
        max_tokens: Some(512),
        model: ctx.model.clone(),
    };

    let Ok(resp) = ctx.llm.chat(req).await else {
        return Vec::new();
    };
    parse_id_array(&resp.content)
}

fn parse_id_array(text: &str) -> Vec<String> {
    let start = text.find('[');
    let end = text.rfind(']');
    let Some((start, end)) = start.zip(end) else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<String>>(&text[start..=end]).unwrap_or_default()
}

/// Asks the LLM for a subject-"the user" neutralizing statement (I5).
/// Returns `None` if the LLM call itself fails — the physical delete
/// still took effect, only the graph-reset insert is skipped.
async fn neutralizing_statement(ctx: &ToolContext<'_>, deleted_contents: &[String]) -> Option<String> {
    if deleted_contents.is_empty() {
        return None;
    }
    let prompt = format!(
        "These facts about the user were just deleted: {}\n\
         Write one short sentence, with \"the user\" as the subject (never the deleted entity's name), \
         that resets only the affected attribute to unknown. \
         For example, deleting \"the user's name is Zhang San\" becomes \"the user's name is unknown\". \
         Respond with only the sentence.",
        Value::Array(deleted_contents.iter().map(|s| Value::String(s.clone())).collect())
    );
    let req = ChatRequest {
        messages: vec![Message::user(prompt)],
        tools: vec![],
        temperature: Some(0.0),
        max_tokens: Some(128),
        model: ctx.model.clone(),
    };
    ctx.llm.chat(req).await.ok().map(|r| r.content.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definitions_cover_all_five() {
        let definitions = tool_definitions();
        let names: Vec<&str> = definitions.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![ADD_LOCAL, ADD_GLOBAL, SEARCH_LOCAL, SEARCH_GLOBAL, DELETE_MEMORY]);
    }

    #[test]
    fn parse_id_array_extracts_bracketed_json() {
        let text = "Sure, here you go: [\"a\", \"b\"] — done.";
        assert_eq!(parse_id_array(text), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parse_id_array_empty_on_malformed_input() {
        assert!(parse_id_array("not json at all").is_empty());
    }

    #[test]
    fn arg_str_rejects_blank_content() {
        let args = json!({"content": "   "});
        assert!(arg_str(&args, "content").is_err());
    }
}
