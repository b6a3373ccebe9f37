use serde::Serialize;

/// Shared error type used across all cortex crates.
///
/// Every variant maps onto an [`ErrorCode`] via [`Error::code`] so the
/// gateway can fill in the `{success, error_code}` envelope without
/// re-deriving the mapping at each call site.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database: {0}")]
    Database(String),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("memory store: {0}")]
    MemoryStore(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("no default model configured for this user")]
    NoModelConfig,

    #[error("config: {0}")]
    Config(String),

    #[error("agent: {0}")]
    Agent(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable machine-readable error codes returned in the JSON envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    TokenInvalid,
    NotFound,
    Forbidden,
    InternalError,
    AgentError,
    NoModelConfig,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::AgentError => "AGENT_ERROR",
            ErrorCode::NoModelConfig => "NO_MODEL_CONFIG",
        }
    }
}

impl Error {
    /// Map this error onto the stable error-code taxonomy exposed over HTTP.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Validation(_) => ErrorCode::ValidationError,
            Error::Unauthorized(_) => ErrorCode::Unauthorized,
            Error::Forbidden(_) => ErrorCode::Forbidden,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::NoModelConfig => ErrorCode::NoModelConfig,
            Error::Agent(_) | Error::Provider { .. } => ErrorCode::AgentError,
            _ => ErrorCode::InternalError,
        }
    }

    /// The HTTP status this error should be reported with.
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::NoModelConfig => 409,
            _ => 500,
        }
    }
}
