use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable error code (or message) exposed to API clients
    #[must_use]
    pub fn client_message(&self) -> &str {
        match self {
            Self::Authentication(msg)
            | Self::Authorization(msg)
            | Self::NotFound(msg)
            | Self::AlreadyExists(msg)
            | Self::InvalidInput(msg) => msg,
            Self::Storage(_) => "ER_STORAGE",
            Self::Database(_) | Self::Redis(_) | Self::Serialization(_) | Self::Internal(_) => {
                "ER_INTERNAL"
            }
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("ER_NOT_FOUND".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    // PostgreSQL unique_violation
                    "23505" => {
                        let constraint = db_err.constraint().unwrap_or_default();
                        if constraint.contains("user_name") {
                            Self::AlreadyExists("USER_NAME_IN_USE".to_string())
                        } else if constraint.contains("one_active_slide") {
                            Self::AlreadyExists("ER_SLIDE_ALREADY_ACTIVE".to_string())
                        } else {
                            Self::AlreadyExists("ER_DUPLICATE".to_string())
                        }
                    }
                    // PostgreSQL foreign_key_violation
                    "23503" => Self::NotFound("ER_REFERENCE_NOT_FOUND".to_string()),
                    // PostgreSQL check_violation
                    "23514" => Self::InvalidInput("ER_CONSTRAINT_CHECK".to_string()),
                    // PostgreSQL not_null_violation
                    "23502" => Self::InvalidInput("ER_MISSING_FIELDS".to_string()),
                    _ => Self::Database(err),
                }
            }
            _ => Self::Database(err),
        }
    }
}

impl From<opendal::Error> for Error {
    fn from(err: opendal::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_client_message_hides_internal_detail() {
        let err = Error::Internal("connection reset by peer".to_string());
        assert_eq!(err.client_message(), "ER_INTERNAL");

        let err = Error::Authorization("UN_AUTHORIZED".to_string());
        assert_eq!(err.client_message(), "UN_AUTHORIZED");
    }
}
