//! The `{success, message, data?, error_code?, timestamp}` response shape
//! every HTTP handler returns, plus the glue that turns a `cortex_domain`
//! [`Error`](cortex_domain::error::Error) into one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use cortex_domain::error::Error;

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub timestamp: String,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    let body = Envelope {
        success: true,
        message: message.into(),
        data: Some(serde_json::to_value(data).unwrap_or(Value::Null)),
        error_code: None,
        timestamp: now(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn created<T: Serialize>(data: T, message: impl Into<String>) -> Response {
    let body = Envelope {
        success: true,
        message: message.into(),
        data: Some(serde_json::to_value(data).unwrap_or(Value::Null)),
        error_code: None,
        timestamp: now(),
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

/// A request-level error the caller should see verbatim (not wrapped
/// through [`ApiError`]) — used by handlers that validate before doing
/// anything fallible.
pub fn fail(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    let body = Envelope {
        success: false,
        message: message.into(),
        data: None,
        error_code: Some(code),
        timestamp: now(),
    };
    (status, Json(body)).into_response()
}

/// Newtype so handlers can return `Result<Response, ApiError>` and rely
/// on `?` to convert any [`Error`] into the JSON envelope.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match err.code() {
            cortex_domain::error::ErrorCode::InternalError => {
                tracing::error!(error = %err, "internal error");
                "internal error".to_string()
            }
            _ => err.to_string(),
        };
        fail(status, err.code().as_str(), message)
    }
}
