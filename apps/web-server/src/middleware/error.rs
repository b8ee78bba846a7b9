//! Error handling - failures rendered as HTML error pages.

use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use minijinja::context;

use inkwell_core::error::{DomainError, RepoError};
use inkwell_core::ports::{AuthError, MediaError};

use crate::templates;

/// Application-level error type rendered through the error templates.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(body)
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let rendered = match self {
            AppError::NotFound(path) => {
                tracing::debug!(path = %path, "Not found");
                templates::render("core/404.html", context! { path })
            }
            AppError::BadRequest(detail) => {
                tracing::warn!("Bad request: {}", detail);
                return HttpResponse::BadRequest()
                    .content_type("text/plain; charset=utf-8")
                    .body("Некорректный запрос");
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                templates::render("core/500.html", context! {})
            }
        };

        match rendered {
            Ok(body) => html(status, body),
            Err(e) => {
                tracing::error!(error = %e, "Error page failed to render");
                HttpResponse::build(status)
                    .content_type("text/plain; charset=utf-8")
                    .body(status.to_string())
            }
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, key } => {
                AppError::NotFound(format!("{entity_type} {key}"))
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => AppError::Internal(format!("Constraint violation: {msg}")),
            RepoError::Connection(msg) => {
                AppError::Internal(format!("Database connection error: {msg}"))
            }
            RepoError::Query(msg) => AppError::Internal(format!("Database query error: {msg}")),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        AppError::Internal(format!("Template error: {err:#}"))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
