//! `cortex-llm` — a thin OpenAI-compatible chat completions client.
//!
//! Every user configures their own provider (base URL + model + API key)
//! in `user_model_configs`, so there is no provider registry here: the
//! gateway builds an [`OpenAiCompatClient`] fresh from those three values
//! whenever it needs to talk to a model.

pub mod openai_compat;
pub mod traits;
mod util;

pub use openai_compat::OpenAiCompatClient;
pub use traits::{ChatRequest, ChatResponse, LlmProvider, Usage};
