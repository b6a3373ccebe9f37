//! Resolves a user's default model config into an LLM client plus the
//! [`LlmSettings`] fingerprint the memory store's adapter cache keys on.
//!
//! API-key encryption at rest is an explicit out-of-scope collaborator
//! (model-provider configuration storage); `api_key_encrypted` here is
//! stored and read back verbatim rather than through a real cipher —
//! see DESIGN.md.

use std::sync::Arc;

use cortex_domain::error::Result;
use cortex_domain::models::UserModelConfig;
use cortex_llm::{LlmProvider, OpenAiCompatClient};
use cortex_memory::LlmSettings;
use cortex_store::ModelConfigRepo;

use crate::state::AppState;

pub struct ResolvedModel {
    pub llm: Arc<dyn LlmProvider>,
    pub model: String,
    pub settings: LlmSettings,
}

pub async fn resolve_default(state: &AppState, user_id: i64) -> Result<ResolvedModel> {
    let config = ModelConfigRepo::get_default(state.db(), user_id).await?;
    build(&config)
}

fn build(config: &UserModelConfig) -> Result<ResolvedModel> {
    let api_key = decrypt(&config.api_key_encrypted);
    let base_url = if config.base_url.is_empty() {
        default_base_url(&config.provider)
    } else {
        config.base_url.clone()
    };

    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatClient::new(base_url.clone(), api_key.clone())?);
    let settings = LlmSettings {
        provider: config.provider.clone(),
        model: config.model_name.clone(),
        base_url,
        api_key,
    };
    Ok(ResolvedModel {
        llm,
        model: config.model_name.clone(),
        settings,
    })
}

fn default_base_url(provider: &str) -> String {
    match provider {
        "deepseek" => "https://api.deepseek.com".to_string(),
        "openai" => "https://api.openai.com/v1".to_string(),
        other => {
            tracing::warn!(provider = %other, "no known default base_url, falling back to OpenAI's");
            "https://api.openai.com/v1".to_string()
        }
    }
}

pub fn encrypt(api_key: &str) -> String {
    api_key.to_string()
}

fn decrypt(stored: &str) -> String {
    stored.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deepseek_model_without_base_url_gets_a_default() {
        let config = UserModelConfig {
            id: 1,
            user_id: 1,
            provider: "deepseek".into(),
            model_name: "deepseek-chat".into(),
            base_url: "".into(),
            api_key_encrypted: "sk-x".into(),
            is_default: true,
            created_at: chrono::Utc::now(),
        };
        let resolved = build(&config).unwrap();
        assert_eq!(resolved.settings.base_url, "https://api.deepseek.com");
    }
}
