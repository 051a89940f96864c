use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{auth::TokenError, models::ErrorBody, models::Role, password::PasswordError};

/// ApiError
///
/// Every way a request can end early. Each variant is terminal for its request
/// and is raised before any store mutation is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unknown email or wrong password. The two cases are indistinguishable on the wire.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("This action requires the {0} role")]
    InsufficientRole(Role),

    #[error("You can only modify your own posts")]
    NotOwner,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("failed to sign token: {0}")]
    TokenIssue(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole(_) | Self::NotOwner => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Password(_) | Self::TokenIssue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code sent alongside the status.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Token(e) => e.code(),
            Self::InsufficientRole(_) => "INSUFFICIENT_ROLE",
            Self::NotOwner => "NOT_OWNER",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Database(_) | Self::Password(_) | Self::TokenIssue(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: message,
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
