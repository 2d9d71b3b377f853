//! Error taxonomy for the HTTP surface.
//!
//! Handlers and extractors return [`AppError`]; its `IntoResponse` impl is the
//! only place internal detail is turned into a client-visible body.

use axum::{
    extract::rejection::{FormRejection, JsonRejection, PathRejection},
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::auth::{jwt::TokenRejection, repo::RepoError};

/// Internal reason behind a 401. Logged, never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("missing Authorization header")]
    MissingHeader,
    #[error("Authorization header is not a bearer token")]
    InvalidScheme,
    #[error(transparent)]
    Token(#[from] TokenRejection),
    #[error("token subject no longer exists")]
    UnknownSubject,
    #[error("username or password did not match")]
    BadCredentials,
}

impl AuthFailure {
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthFailure::BadCredentials => "Incorrect username or password",
            _ => "Could not validate credentials",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthenticated: {0}")]
    Unauthenticated(AuthFailure),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(f: AuthFailure) -> Self {
        AppError::Unauthenticated(f)
    }
}

impl From<TokenRejection> for AppError {
    fn from(r: TokenRejection) -> Self {
        AppError::Unauthenticated(AuthFailure::Token(r))
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => {
                AppError::Conflict("Username or email already registered".into())
            }
            RepoError::Database(e) => AppError::Internal(e.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        debug!(reason = %r.body_text(), "json body rejected");
        AppError::InvalidInput("Invalid request body".into())
    }
}

impl From<FormRejection> for AppError {
    fn from(r: FormRejection) -> Self {
        debug!(reason = %r.body_text(), "form body rejected");
        AppError::InvalidInput("Invalid form body".into())
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        debug!(reason = %r.body_text(), "path parameter rejected");
        AppError::InvalidInput("Invalid path parameter".into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::InvalidInput(msg)
            | AppError::Conflict(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthenticated(reason) => {
                warn!(%reason, "request unauthenticated");
                reason.public_message().to_string()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
        };

        let mut res = (status, Json(json!({ "detail": detail }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}
