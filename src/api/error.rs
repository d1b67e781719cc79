use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::email::EmailError;
use crate::services::SearchError;

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    ExternalApiError { service: String, message: String },

    ServiceUnavailable { service: String, message: String },

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::ExternalApiError { service, message } => {
                write!(f, "{service} error: {message}")
            }
            Self::ServiceUnavailable { service, message } => {
                write!(f, "{service} unavailable: {message}")
            }
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::ExternalApiError { service, message } => {
                tracing::warn!("{} error: {}", service, message);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("{service} service is unavailable"),
                )
            }
            Self::ServiceUnavailable { service, message } => {
                tracing::error!("{} unavailable: {}", service, message);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("{service} is temporarily unavailable"),
                )
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidQuery => Self::validation("Invalid search query"),
            SearchError::UpstreamFailure { .. } | SearchError::TimedOut(_) => {
                Self::ExternalApiError {
                    service: "Search".to_string(),
                    message: err.to_string(),
                }
            }
            SearchError::StoreUnavailable(e) => Self::ServiceUnavailable {
                service: "Search cache".to_string(),
                message: e.to_string(),
            },
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::InvalidAddress(_) => Self::validation(err.to_string()),
            EmailError::Disabled => Self::ServiceUnavailable {
                service: "Email delivery".to_string(),
                message: err.to_string(),
            },
            EmailError::Render(_) => Self::internal(err.to_string()),
            EmailError::Transport(_) | EmailError::Rejected { .. } => Self::ExternalApiError {
                service: "Email".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}
