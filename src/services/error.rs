//! Errors shared by the entity CRUD services

/// Error types for entity service operations
#[derive(Debug, thiserror::Error)]
pub enum EntityServiceError {
    /// Entity not found
    #[error("{0}")]
    NotFound(String),

    /// Validation error
    #[error("{0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl EntityServiceError {
    pub(crate) fn not_found(entity: &str, id: i64) -> Self {
        EntityServiceError::NotFound(format!("{} with ID {} not found", entity, id))
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EntityServiceError::ValidationError(message.into())
    }
}

/// Require a field that clients may omit
pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, EntityServiceError> {
    value.ok_or_else(|| EntityServiceError::invalid(format!("'{}' is required", field)))
}

/// Require a text field of at least `min` characters
pub(crate) fn min_length(
    value: Option<String>,
    field: &str,
    min: usize,
) -> Result<String, EntityServiceError> {
    let value = required(value, field)?;
    if value.chars().count() < min {
        return Err(EntityServiceError::invalid(format!(
            "'{}' must be at least {} characters",
            field, min
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert_eq!(required(Some(1), "id").unwrap(), 1);
        let err = required::<i64>(None, "blogId").unwrap_err();
        assert_eq!(err.to_string(), "'blogId' is required");
    }

    #[test]
    fn test_min_length_counts_chars() {
        assert!(min_length(Some("ab".to_string()), "name", 3).is_err());
        assert!(min_length(Some("äöü".to_string()), "name", 3).is_ok());
        assert!(matches!(
            min_length(None, "name", 3),
            Err(EntityServiceError::ValidationError(_))
        ));
    }
}
