use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("no configuration found, please add configuration first")]
    ConfigurationMissing,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to load portfolio from {analyzer}: {message}")]
    AdapterFailure { analyzer: String, message: String },

    #[error("Price lookup failed: {0}")]
    PriceLookup(String),

    #[error("invalid data: errorCode 001")]
    ImportEmpty,

    #[error("invalid data: errorCode 002 (missing key `{0}`)")]
    ImportMissingKey(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("asset with id {0} not found")]
    BatchNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type RepoResult<T> = Result<T, AppError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ConfigurationMissing => "CONFIGURATION_MISSING",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::AdapterFailure { .. } => "ADAPTER_FAILURE",
            AppError::PriceLookup(_) => "PRICE_LOOKUP_FAILURE",
            AppError::ImportEmpty => "IMPORT_EMPTY",
            AppError::ImportMissingKey(_) => "IMPORT_MISSING_KEY",
            AppError::InvalidParameter(_) => "INVALID_PARAMETER",
            AppError::BatchNotFound(_) => "NOT_FOUND",
            AppError::Storage(_) | AppError::Migrate(_) => "STORAGE_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Io(_) | AppError::Csv(_) => "IO_ERROR",
            AppError::Http(_) => "HTTP_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ConfigurationMissing => StatusCode::PRECONDITION_FAILED,
            AppError::Config(_)
            | AppError::ImportEmpty
            | AppError::ImportMissingKey(_)
            | AppError::InvalidParameter(_)
            | AppError::Serialization(_) => StatusCode::BAD_REQUEST,
            AppError::AdapterFailure { .. } | AppError::PriceLookup(_) | AppError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::BatchNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (self.status(), Json(self.to_error_response())).into_response()
    }
}
