//! Error types for cache operations

use crate::{EntityKind, Snowflake};
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Persistent tier {operation} failed for {kind}: {reason}")]
    Persistent {
        operation: &'static str,
        kind: EntityKind,
        reason: String,
    },

    #[error("Serialization failed for {kind} with id {id}: {reason}")]
    Serialization {
        kind: EntityKind,
        id: Snowflake,
        reason: String,
    },

    #[error("Memory tier lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse cache options: {reason}")]
    Parse { reason: String },

    #[error("Unknown field {field:?} configured for {kind}")]
    UnknownField { kind: EntityKind, field: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid snowflake: {raw:?}")]
    InvalidSnowflake { raw: String },
}

/// Master error type for all cache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_persistent() {
        let err = StorageError::Persistent {
            operation: "write",
            kind: EntityKind::Channel,
            reason: "connection reset".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("write"));
        assert!(msg.contains("channel"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_config_error_display_unknown_field() {
        let err = ConfigError::UnknownField {
            kind: EntityKind::User,
            field: "emial".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("emial"));
        assert!(msg.contains("user"));
    }

    #[test]
    fn test_cache_error_from_conversions() {
        let err: CacheError = StorageError::LockPoisoned.into();
        assert!(matches!(err, CacheError::Storage(StorageError::LockPoisoned)));

        let err: CacheError = ValidationError::InvalidSnowflake {
            raw: "abc".to_string(),
        }
        .into();
        assert!(format!("{}", err).contains("abc"));
    }
}
