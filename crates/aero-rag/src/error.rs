//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Required credentials or endpoints are missing or invalid
    #[error("Backend not properly configured: {0}")]
    Config(String),

    /// Embedding provider call failed
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// Vector store write failed
    #[error("Vector store insert failed: {0}")]
    StoreWrite(String),

    /// Vector store search failed
    #[error("Vector store search failed: {0}")]
    StoreRead(String),

    /// Language model call failed
    #[error("Question answering failed: {0}")]
    Synthesis(String),

    /// Document could not be turned into text
    #[error("Failed to parse document '{source_name}': {message}")]
    DocumentParse {
        source_name: String,
        message: String,
    },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Invalid request from the caller
    #[error("{0}")]
    BadRequest(String),

    /// Request body exceeds the configured limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Operation exceeded its time limit
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a document parse error
    pub fn document_parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DocumentParse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Re-tag any failure raised while embedding as an embedding failure
    pub fn into_embedding(self) -> Self {
        match self {
            Self::Embedding(_) | Self::Timeout(_) => self,
            other => Self::Embedding(other.to_string()),
        }
    }

    /// Re-tag any failure raised while writing to the store
    pub fn into_store_write(self) -> Self {
        match self {
            Self::StoreWrite(_) | Self::Timeout(_) => self,
            other => Self::StoreWrite(other.to_string()),
        }
    }

    /// Re-tag any failure raised while searching the store
    pub fn into_store_read(self) -> Self {
        match self {
            Self::StoreRead(_) | Self::Timeout(_) => self,
            other => Self::StoreRead(other.to_string()),
        }
    }

    /// Re-tag any failure raised by the language model
    pub fn into_synthesis(self) -> Self {
        match self {
            Self::Synthesis(_) | Self::Timeout(_) => self,
            other => Self::Synthesis(other.to_string()),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) | Error::UnsupportedFileType(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::DocumentParse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Embedding(_) | Error::StoreWrite(_) | Error::StoreRead(_) | Error::Synthesis(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
