use crate::database::DatabaseError;
use crate::warehouse::WarehouseError;
use thiserror::Error;

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Warehouse scan or lookup errors
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Socket I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
