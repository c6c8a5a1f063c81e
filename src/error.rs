// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::config::ConfigError;
use crate::middleware::session::{cleared_session_cookie, LOGIN_PATH};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ciphertext failed integrity check")]
    Integrity,

    #[error("Session cookie failed authentication")]
    Tampered,

    #[error("Session cookie payload is malformed")]
    Malformed,

    #[error("No session cookie present")]
    Absent,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Authorization code is missing or empty")]
    InvalidCode,

    #[error("Spotify API error: {0}")]
    Provider(String),

    #[error("Access token rejected by Spotify")]
    Unauthorized,

    #[error("Refresh token rejected by Spotify: {0}")]
    RefreshRejected(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the only way forward for an interactive caller is to go
    /// through the authorization flow again.
    pub fn is_reauth_required(&self) -> bool {
        matches!(
            self,
            AppError::Absent
                | AppError::Tampered
                | AppError::Malformed
                | AppError::Integrity
                | AppError::Unauthorized
                | AppError::RefreshRejected(_)
        )
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_reauth_required() {
            tracing::debug!(error = %self, "Session unusable, redirecting to authorization");
            let jar = CookieJar::new().add(cleared_session_cookie());
            return (jar, Redirect::to(LOGIN_PATH)).into_response();
        }

        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Duplicate(msg) => (StatusCode::CONFLICT, "duplicate", Some(msg.clone())),
            AppError::InvalidCode => (StatusCode::BAD_REQUEST, "invalid_code", None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Provider(msg) => {
                tracing::warn!(error = %msg, "Spotify request failed");
                (StatusCode::BAD_GATEWAY, "spotify_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Config(err) => {
                tracing::error!(error = %err, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            // Session errors were handled above.
            _ => (StatusCode::UNAUTHORIZED, "unauthorized", None),
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
