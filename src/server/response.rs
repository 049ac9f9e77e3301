//! Response envelope and API errors.
//!
//! Every response, success or failure, has the same shape:
//! `{success, statusCode, message, data, errors, path, timestamp}`.

use crate::engine::EngineError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

/// The JSON body of every API response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
    pub errors: Option<Value>,
    /// Original request URI, including the query string.
    pub path: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A 200 response carrying `data`.
pub fn success<T: Serialize>(message: &str, data: T, path: &str) -> Response {
    let envelope = Envelope {
        success: true,
        status_code: StatusCode::OK.as_u16(),
        message: message.to_string(),
        data: Some(data),
        errors: None,
        path: path.to_string(),
        timestamp: timestamp(),
    };

    (StatusCode::OK, Json(envelope)).into_response()
}

/// Failures an endpoint can report.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation { field: &'static str, detail: String },

    #[error("{0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn errors(&self) -> Value {
        match self {
            ApiError::Validation { field, detail } => json!({ "field": field, "detail": detail }),
            ApiError::NotFound(detail) | ApiError::Internal(detail) => json!({ "detail": detail }),
        }
    }

    /// Attach the request path so the error can be rendered.
    pub fn at(self, path: impl Into<String>) -> ApiFailure {
        ApiFailure {
            error: self,
            path: path.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Store(source) => ApiError::Internal(source.to_string()),
            EngineError::NotFound(detail) => ApiError::NotFound(detail),
            EngineError::Invalid { field, detail } => ApiError::Validation { field, detail },
        }
    }
}

/// An [`ApiError`] bound to the request it answers.
#[derive(Debug)]
pub struct ApiFailure {
    pub error: ApiError,
    pub path: String,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.error.status();

        match self.error {
            ApiError::Internal(ref detail) => error!("{} failed: {}", self.path, detail),
            ApiError::Validation { field, ref detail } => {
                warn!("{} rejected: {} {}", self.path, field, detail)
            }
            ApiError::NotFound(_) => {}
        }

        let envelope: Envelope<()> = Envelope {
            success: false,
            status_code: status.as_u16(),
            message: self.error.to_string(),
            data: None,
            errors: Some(self.error.errors()),
            path: self.path,
            timestamp: timestamp(),
        };

        (status, Json(envelope)).into_response()
    }
}
