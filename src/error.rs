use thiserror::Error;

/// Main error type for the transcript cache service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    RedisError(String),

    /// Cache payload error (corrupt or unreadable cached value)
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Database connection or query error
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Destructive operation refused by an environment guard
    #[error("Operation forbidden: {0}")]
    OperationForbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Check if error is related to Redis
    pub fn is_redis_error(&self) -> bool {
        matches!(self, ServiceError::RedisError(_))
    }

    /// Check if error is related to the database
    pub fn is_database_error(&self) -> bool {
        matches!(self, ServiceError::DatabaseError(_))
    }

    /// Check if error is a guard refusal rather than an infrastructure fault
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ServiceError::OperationForbidden(_))
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ServiceError::RedisError("down".to_string()).is_redis_error());
        assert!(ServiceError::DatabaseError("down".to_string()).is_database_error());
        assert!(ServiceError::OperationForbidden("flush".to_string()).is_forbidden());
        assert!(!ServiceError::Internal("oops".to_string()).is_redis_error());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::OperationForbidden("FLUSHALL in production".to_string());
        assert_eq!(err.to_string(), "Operation forbidden: FLUSHALL in production");
    }
}
