//! Central error type and its HTTP mapping.
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::{
    auth::password::PasswordError,
    db::{StoreError, UniqueField},
};

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Email or username already owned by someone else.
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials, or a missing/invalid/expired bearer token.
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    /// A stored password hash could not be parsed.
    #[error("malformed credential: {0}")]
    CredentialFormat(String),

    #[error("store error: {0}")]
    Store(#[source] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CredentialFormat(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client. Server-side failures never leak detail.
    pub fn client_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(UniqueField::Email) => {
                AppError::Conflict("User with this email already exists".into())
            }
            StoreError::Duplicate(UniqueField::Username) => {
                AppError::Conflict("Username is already taken".into())
            }
            StoreError::Database(e) => AppError::Store(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected request body");
        AppError::Validation("Invalid request body".into())
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Format(msg) => AppError::CredentialFormat(msg),
            PasswordError::Hash(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = json!({ "message": self.client_message() });
        (status, Json(body)).into_response()
    }
}
