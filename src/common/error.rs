// src/common/error.rs

use thiserror::Error;

/// Application error type. Configuration problems are fatal for the
/// calculation that hit them; division-by-zero situations are NOT errors
/// anywhere in the engine (they resolve to a defined zero result).
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or inconsistent configuration (no warehouses for a role,
    /// allocation weights not summing to 1, ...). Never retried or defaulted.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}
