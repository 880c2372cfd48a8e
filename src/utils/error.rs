use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ResourceDescriptor;
use crate::store::StoreError;
use crate::utils::response::error as error_response;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

/// Which side of the API a store failure happened on. Uncategorised
/// failures surface as 500 on reads and deletes but as 400 on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl AppError {
    pub fn from_store(resource: &ResourceDescriptor, err: StoreError, access: Access) -> Self {
        if let StoreError::DuplicateKey { field, .. } = &err {
            let message = resource
                .unique_field(field)
                .map(|unique| unique.conflict_message.to_string())
                .unwrap_or_else(|| err.to_string());
            return AppError::DuplicateKey(message);
        }

        match access {
            Access::Read => AppError::InternalServerError(err.to_string()),
            Access::Write => AppError::ValidationError(err.to_string()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateKey(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::DuplicateKey(_) => "DUPLICATE_KEY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::ValidationError(msg)
            | AppError::DuplicateKey(msg)
            | AppError::NotFound(msg)
            | AppError::InternalServerError(msg) => msg,
        }
    }

    fn log(&self) {
        if self.status_code().is_server_error() {
            error!(code = self.code(), message = %self.message(), "Application error");
        } else {
            warn!(code = self.code(), message = %self.message(), "Request rejected");
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        error_response(self.message(), self.status_code())
    }
}
