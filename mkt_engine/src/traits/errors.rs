use gateway_tools::GatewayApiError;
use thiserror::Error;

use crate::db_types::ConversionError;

/// The error taxonomy shared by every engine operation.
#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayApiError),
    #[error("No funds available: {0}")]
    NoFunds(String),
    #[error("Database error: {0}")]
    Database(String),
}

impl MarketplaceError {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn forbidden<S: Into<String>>(msg: S) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => Self::NotFound("Record".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("Duplicate record. {}", db.message()))
            },
            _ => Self::Database(e.to_string()),
        }
    }
}

impl From<ConversionError> for MarketplaceError {
    fn from(e: ConversionError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for MarketplaceError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("Migration failed. {e}"))
    }
}
