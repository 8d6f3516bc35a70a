//! # Export Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Configuration   InvalidConfig, ConfigLoadFailed                       │
//! │  Data            Database (DbError)                                    │
//! │  Output          Io, Serialization                                     │
//! │  Pipeline        LoadFailed                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use storefront_core::ValidationError;
use storefront_db::DbError;
use thiserror::Error;

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid export configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Data Errors
    // =========================================================================
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    // =========================================================================
    // Pipeline Errors
    // =========================================================================
    /// The entity loader could not produce the next batch.
    #[error("Failed to load export data: {0}")]
    LoadFailed(String),

    // =========================================================================
    // Output Errors
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ValidationError> for ExportError {
    fn from(err: ValidationError) -> Self {
        ExportError::InvalidConfig(err.to_string())
    }
}

impl From<toml::de::Error> for ExportError {
    fn from(err: toml::de::Error) -> Self {
        ExportError::ConfigLoadFailed(err.to_string())
    }
}

impl ExportError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ExportError::InvalidConfig(_) | ExportError::ConfigLoadFailed(_)
        )
    }
}
