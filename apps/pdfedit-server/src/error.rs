//! Error types for the pdfedit server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdfedit_core::PdfEditError;
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid file")]
    InvalidFile,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("PDF not found. Please upload again.")]
    DocumentNotFound(String),

    #[error("Session expired. Please upload again.")]
    SessionExpired(String),

    #[error("Too many active sessions (max: {0})")]
    TooManySessions(usize),

    #[error("{0}")]
    DocumentParse(String),

    #[error("Upload failed: {0}")]
    Upload(#[from] MultipartError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, code) = match &self {
            ServerError::InvalidFile => (StatusCode::BAD_REQUEST, "INVALID_FILE"),
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServerError::DocumentNotFound(_) => (StatusCode::BAD_REQUEST, "DOCUMENT_NOT_FOUND"),
            ServerError::SessionExpired(_) => (StatusCode::BAD_REQUEST, "SESSION_EXPIRED"),
            ServerError::TooManySessions(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "TOO_MANY_SESSIONS")
            }
            ServerError::DocumentParse(_) => (StatusCode::BAD_REQUEST, "DOCUMENT_PARSE_ERROR"),
            ServerError::Upload(err) => (err.status(), "UPLOAD_ERROR"),
            ServerError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PdfEditError> for ServerError {
    fn from(err: PdfEditError) -> Self {
        match err {
            PdfEditError::DocumentParse(_) => ServerError::DocumentParse(err.to_string()),
            PdfEditError::InvalidRange(_) | PdfEditError::InvalidArgument(_) => {
                ServerError::InvalidRequest(err.to_string())
            }
            PdfEditError::Operation(msg) => ServerError::Internal(msg),
        }
    }
}
