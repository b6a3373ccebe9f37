use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub memory_store: MemoryStoreConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. Use `["*"]` for permissive (NOT recommended).
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Database
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "d_db_url")]
    pub url: String,
    #[serde(default = "d_max_conns")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: d_db_url(),
            max_connections: d_max_conns(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Memory store connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    #[serde(default = "d_mem_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_retries")]
    pub max_retries: u32,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            base_url: d_mem_url(),
            api_key: None,
            timeout_ms: d_timeout_ms(),
            max_retries: d_retries(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Agent orchestration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard ceiling on the tool-call loop. A turn that keeps calling
    /// tools past this count is abandoned with a "thinking timed out"
    /// response rather than run forever.
    #[serde(default = "d_max_turns")]
    pub max_turns: u32,
    /// Number of past messages (user + assistant) loaded as context
    /// for each new turn.
    #[serde(default = "d_history_limit")]
    pub history_limit: u32,
    /// Chunk size, in characters, used to replay the final answer as
    /// a sequence of SSE `token` events.
    #[serde(default = "d_chunk_size")]
    pub stream_chunk_chars: usize,
    #[serde(default = "d_temperature")]
    pub temperature: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: d_max_turns(),
            history_limit: d_history_limit(),
            stream_chunk_chars: d_chunk_size(),
            temperature: d_temperature(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret for issued JWTs. The default is fine for local
    /// development only — production deployments must override it.
    #[serde(default = "d_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "d_jwt_hours")]
    pub jwt_expiration_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: d_jwt_secret(),
            jwt_expiration_hours: d_jwt_hours(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Default value helpers (serde)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_port() -> u16 {
    8080
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_db_url() -> String {
    "sqlite://./data/cortex.db".into()
}
fn d_max_conns() -> u32 {
    5
}
fn d_mem_url() -> String {
    "http://localhost:8765".into()
}
fn d_timeout_ms() -> u64 {
    8000
}
fn d_retries() -> u32 {
    3
}
fn d_max_turns() -> u32 {
    5
}
fn d_history_limit() -> u32 {
    20
}
fn d_chunk_size() -> usize {
    10
}
fn d_temperature() -> f64 {
    0.7
}
fn d_jwt_secret() -> String {
    "dev-secret-change-me".into()
}
fn d_jwt_hours() -> i64 {
    24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_round_trip_toml() {
        let cfg = Config::default();
        let toml_str = toml::to_string(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.server.port, cfg.server.port);
        assert_eq!(parsed.agent.max_turns, 5);
    }

    #[test]
    fn empty_toml_fills_in_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.agent.stream_chunk_chars, 10);
    }
}
