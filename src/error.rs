//! API error type and its JSON rendering.
//!
//! Every failure leaving a handler is an [`ApiError`]. It renders as a
//! [`StandardError`] body carrying the HTTP status, a short title in
//! `error` and a detail message. The request path is filled in by the
//! router's error-path middleware.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::StoreError;
use crate::models::FieldError;

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The addressed client does not exist
    NotFound,
    /// The body parsed but broke a field rule
    ValidationFailed,
    /// The request could not be understood
    BadRequest,
    /// The store failed
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Title placed in the `error` field of the body.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "Resource not found",
            ErrorKind::ValidationFailed => "Validation exception",
            ErrorKind::BadRequest => "Bad request",
            ErrorKind::Internal => "Internal server error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub errors: Vec<FieldError>,
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardError {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn client_not_found(id: i64) -> Self {
        Self::not_found(format!("Client {} not found", id))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.field_name, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            kind: ErrorKind::ValidationFailed,
            message,
            errors,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    pub fn to_body(&self, path: Option<String>) -> StandardError {
        StandardError {
            timestamp: Utc::now(),
            status: self.status_code().as_u16(),
            error: self.kind.title().to_string(),
            message: self.message.clone(),
            path,
            errors: self.errors.clone(),
        }
    }

    /// Render with a known request path.
    pub fn into_response_at(self, path: &str) -> Response {
        let status = self.status_code();
        (status, Json(self.to_body(Some(path.to_string())))).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.title(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_body(None));
        let mut response = (status, body).into_response();
        // Lets the path middleware re-render the body with the request path.
        response.extensions_mut().insert(self);
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Client store failure");
        // Details stay in the log
        ApiError::internal("Client store operation failed")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
