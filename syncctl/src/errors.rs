//! HTTP-facing error type.
//!
//! Every handler returns [`Result`]; [`Error::status_code`] is the single place where failures
//! are classified:
//!
//! | Kind                                  | Status | Body                                  |
//! |---------------------------------------|--------|---------------------------------------|
//! | [`Error::BadRequest`]                 | 400    | `{"success": false, "message": ...}`  |
//! | [`Error::NotFound`], `DbError::NotFound` | 404 | `{"success": false, "message": ...}`  |
//! | everything else                       | 500    | `{"success": false, "error": ...}`    |
//!
//! Backend failures surface their raw message to the caller. Nothing is retried.

use crate::db::errors::DbError;
use crate::sources::SourceError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{message}")]
    NotFound { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Document store or registry failure
    #[error(transparent)]
    Database(#[from] DbError),

    /// Relational source failure (connection, query, insert)
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } | Error::Database(DbError::NotFound) => StatusCode::NOT_FOUND,
            Error::Internal { .. } | Error::Database(_) | Error::Source(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the response body
    pub fn user_message(&self) -> String {
        match self {
            Error::Database(DbError::NotFound) => "Resource not found".to_string(),
            Error::Other(e) => format!("{e:#}"),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Internal service error: {:#}", self);
        } else {
            tracing::debug!("Client error: {}", self);
        }

        let body = if status.is_server_error() {
            json!({ "success": false, "error": self.user_message() })
        } else {
            json!({ "success": false, "message": self.user_message() })
        };

        (status, Json(body)).into_response()
    }
}

/// Malformed JSON bodies are validation errors, not axum's default 422
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

/// Query strings that fail to parse get the same JSON envelope as every other 400
impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(err.into())
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
