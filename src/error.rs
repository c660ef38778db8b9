/// The main error type for subtrack operations
#[derive(Debug, thiserror::Error)]
pub enum SubtrackError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(String),
}

impl SubtrackError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller caused this error (bad input, missing record, rejected state).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::BadRequest(_) | Self::Forbidden(_)
        )
    }
}

/// Result type alias for subtrack operations
pub type Result<T> = std::result::Result<T, SubtrackError>;

impl From<serde_json::Error> for SubtrackError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            SubtrackError::BadRequest(format!("JSON error: {}", err))
        } else {
            SubtrackError::Internal(format!("JSON serialization error: {}", err))
        }
    }
}

#[cfg(feature = "database")]
impl From<sea_orm::DbErr> for SubtrackError {
    fn from(err: sea_orm::DbErr) -> Self {
        match &err {
            sea_orm::DbErr::RecordNotFound(msg) => SubtrackError::NotFound(if msg.is_empty() {
                "Record not found".to_string()
            } else {
                msg.clone()
            }),
            sea_orm::DbErr::Query(inner) => {
                SubtrackError::Database(format!("Query error: {}", inner))
            }
            sea_orm::DbErr::Exec(inner) => {
                SubtrackError::Database(format!("Execution error: {}", inner))
            }
            sea_orm::DbErr::Conn(inner) => {
                SubtrackError::Database(format!("Connection error: {}", inner))
            }
            _ => SubtrackError::Database(format!("Database error: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = SubtrackError::not_found("Subscription 7");
        assert!(matches!(err, SubtrackError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Subscription 7");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_forbidden_error() {
        let err = SubtrackError::forbidden("subscription is inactive");
        assert_eq!(err.to_string(), "Forbidden: subscription is inactive");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_error() {
        let err = SubtrackError::internal("store unavailable");
        assert_eq!(err.to_string(), "Internal error: store unavailable");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: SubtrackError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, SubtrackError::Anyhow(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_json_error_classification() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let converted: SubtrackError = err.into();
        assert!(matches!(converted, SubtrackError::BadRequest(_)));
    }
}
