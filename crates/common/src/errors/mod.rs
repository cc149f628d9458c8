//! Error types for Polydoc services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    UnsupportedFile,
    MissingColumn,

    // Resource errors (4xxx)
    NotFound,
    AssetNotFound,
    MemoryNotFound,
    TaskNotFound,
    ArtifactNotFound,
    SettingsNotFound,

    // Import errors (5xxx)
    ImportParseError,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    OcrError,
    OcrProcessingFailed,
    TranslationError,
    UpstreamError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::UnsupportedFile => 1003,
            ErrorCode::MissingColumn => 1004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::AssetNotFound => 4002,
            ErrorCode::MemoryNotFound => 4003,
            ErrorCode::TaskNotFound => 4004,
            ErrorCode::ArtifactNotFound => 4005,
            ErrorCode::SettingsNotFound => 4006,

            // Imports (5xxx)
            ErrorCode::ImportParseError => 5001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::OcrError => 8001,
            ErrorCode::OcrProcessingFailed => 8002,
            ErrorCode::TranslationError => 8003,
            ErrorCode::UpstreamError => 8004,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Unsupported file type: {name}. Only {allowed} are allowed")]
    UnsupportedFile { name: String, allowed: String },

    #[error("Language column '{column}' not found in the file")]
    MissingColumn { column: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Memory asset not found: {id}")]
    AssetNotFound { id: String },

    #[error("No memory records found for the provided IDs")]
    MemoryNotFound,

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Document artifact not found: {path}")]
    ArtifactNotFound { path: String },

    #[error("Settings have not been configured yet")]
    SettingsNotFound,

    // Structural import failures (abort the whole operation)
    #[error("Failed to parse import file: {message}")]
    ImportParse { message: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("OCR service error: {message}")]
    Ocr { message: String },

    #[error("OCR processing failed for task {task_id}")]
    OcrProcessingFailed { task_id: String },

    #[error("Translation service error: {message}")]
    Translation { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::UnsupportedFile { .. } => ErrorCode::UnsupportedFile,
            AppError::MissingColumn { .. } => ErrorCode::MissingColumn,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::AssetNotFound { .. } => ErrorCode::AssetNotFound,
            AppError::MemoryNotFound => ErrorCode::MemoryNotFound,
            AppError::TaskNotFound { .. } => ErrorCode::TaskNotFound,
            AppError::ArtifactNotFound { .. } => ErrorCode::ArtifactNotFound,
            AppError::SettingsNotFound => ErrorCode::SettingsNotFound,
            AppError::ImportParse { .. } => ErrorCode::ImportParseError,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Ocr { .. } => ErrorCode::OcrError,
            AppError::OcrProcessingFailed { .. } => ErrorCode::OcrProcessingFailed,
            AppError::Translation { .. } => ErrorCode::TranslationError,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::UnsupportedFile { .. }
            | AppError::MissingColumn { .. }
            | AppError::ImportParse { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::AssetNotFound { .. }
            | AppError::MemoryNotFound
            | AppError::TaskNotFound { .. }
            | AppError::ArtifactNotFound { .. }
            | AppError::SettingsNotFound => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Ocr { .. }
            | AppError::OcrProcessingFailed { .. }
            | AppError::Translation { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::AssetNotFound { id: "42".into() };
        assert_eq!(err.code(), ErrorCode::AssetNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::MissingColumn {
            column: "fr".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_upstream_error() {
        let err = AppError::OcrProcessingFailed {
            task_id: "abc".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_import_parse_is_client_error() {
        let err = AppError::ImportParse {
            message: "not a tmx file".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), ErrorCode::ImportParseError);
    }
}
