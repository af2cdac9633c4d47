use std::fmt::Display;

use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Invalid path: {}", path),
        }),
    )
}

/// Errors surfaced to HTTP callers.
///
/// `InternalError` only ever carries a generic message; the underlying cause is
/// logged where the error is built.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "error")]
pub enum Error {
    InvalidPayload { message: String },
    NotFound { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    /// Logs `cause` and masks it behind `message`.
    pub fn storage<E: Display>(message: &'static str, cause: E) -> Error {
        log::error!("{}: {}", message, cause);
        Error::InternalError {
            kind: "DatabaseError",
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
