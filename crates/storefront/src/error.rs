//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! logged, captured to Sentry and shown as a generic error page; missing
//! resources render the "Not found" page.

use askama::Template;
use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::filters;
use crate::services::auth::AuthError;
use crate::services::media::MediaError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Saving an uploaded file failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Resource not found, or not owned by the requester.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Standalone error page; it does not depend on session data.
#[derive(Template)]
#[template(path = "errors/error.html")]
struct ErrorPage<'a> {
    status: u16,
    title: &'a str,
    message: &'a str,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Media(MediaError::TooLarge | MediaError::NotAnImage) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::InvalidResetToken | AuthError::ExpiredResetToken) => {
                StatusCode::NOT_FOUND
            }
            Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::NotFound(_) | Self::Database(RepositoryError::NotFound) => {
                "The page you requested does not exist.".to_owned()
            }
            Self::BadRequest(msg) => msg.clone(),
            Self::Media(err @ (MediaError::TooLarge | MediaError::NotAnImage)) => err.to_string(),
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                "Invalid username or password.".to_owned()
            }
            Self::Auth(AuthError::InvalidResetToken | AuthError::ExpiredResetToken) => {
                "This reset link has expired or has already been used.".to_owned()
            }
            _ => "Something went wrong on our side. Please try again.".to_owned(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let title = match status {
            StatusCode::NOT_FOUND => "Not found",
            StatusCode::BAD_REQUEST => "Bad request",
            StatusCode::UNAUTHORIZED => "Not allowed",
            _ => "Server error",
        };
        let message = self.public_message();
        let page = ErrorPage {
            status: status.as_u16(),
            title,
            message: &message,
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render error page");
                (status, message).into_response()
            }
        }
    }
}

/// A path segment that does not parse as the expected id names no page.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::NotFound(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after login.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
