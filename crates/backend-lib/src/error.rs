// crates/backend-lib/src/error.rs

//! Central error type for the account core.
//!
//! Every variant except [`AppError::Storage`] is recoverable at the caller;
//! the transport layer maps them with [`AppError::error_code`] and
//! [`AppError::sanitized_message`].
use std::fmt;

use thiserror::Error;

/// Field that collided with an existing account on create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Username,
    Email,
}

impl DuplicateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateField::Username => "username",
            DuplicateField::Email => "email",
        }
    }
}

impl fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Duplicate {field}")]
    Duplicate { field: DuplicateField },

    #[error("Account not found")]
    NotFound,

    /// Unknown user and wrong password both land here.
    #[error("Invalid credentials")]
    Auth,

    #[error("Password must be at least {min_length} characters")]
    WeakInput { min_length: usize },

    #[error("Stored password hash is malformed")]
    CorruptHash,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error means the store itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Duplicate { field: DuplicateField::Username } => "ACC_DUP_001",
            AppError::Duplicate { field: DuplicateField::Email } => "ACC_DUP_002",
            AppError::NotFound => "NF_001",
            AppError::Auth => "AUTH_001",
            AppError::WeakInput { .. } => "AUTH_002",
            AppError::CorruptHash => "AUTH_003",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Config(_) => "CFG_001",
            AppError::Storage(_) => "DB_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Duplicate { field } => format!("An account with this {field} already exists"),
            AppError::NotFound => "Account not found".to_string(),
            AppError::Auth => "Invalid credentials".to_string(),
            AppError::WeakInput { min_length } => {
                format!("Password must be at least {min_length} characters")
            },
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::CorruptHash
            | AppError::Config(_)
            | AppError::Storage(_)
            | AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }

    /// JSON error body in the shape `{"error": {"code", "message"}}`.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.sanitized_message(),
            }
        })
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {err}"))
    }
}
