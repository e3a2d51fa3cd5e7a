use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

type SharedSource = Arc<dyn StdError + Send + Sync + 'static>;

fn share(source: impl Into<anyhow::Error>) -> SharedSource {
    let boxed: Box<dyn StdError + Send + Sync + 'static> = source.into().into();
    Arc::from(boxed)
}

/// What was wrong with a rejected field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    Empty,
    TooLong { max: usize, actual: usize },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Empty => write!(f, "cannot be empty"),
            ValidationIssue::TooLong { max, actual } => {
                write!(f, "must be at most {} characters (got {})", max, actual)
            }
        }
    }
}

/// A task field failed validation. Raised before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Task {field} {issue}")]
pub struct ValidationError {
    pub field: &'static str,
    pub issue: ValidationIssue,
}

impl ValidationError {
    pub fn new(field: &'static str, issue: ValidationIssue) -> Self {
        Self { field, issue }
    }
}

/// Failure reported by a persistence gateway.
#[derive(Debug, Clone, Error)]
#[error("{context}: {source}")]
pub struct StorageError {
    context: String,
    source: SharedSource,
}

impl StorageError {
    pub fn new(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            context: context.into(),
            source: share(source),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Failure of the one-shot legacy import that runs during store init.
#[derive(Debug, Clone, Error)]
#[error("{context}: {source}")]
pub struct MigrationError {
    context: String,
    source: SharedSource,
}

impl MigrationError {
    pub fn new(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            context: context.into(),
            source: share(source),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Error recorded in the store state for consumers to render.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
    #[error("migration failure: {0}")]
    Migration(#[from] MigrationError),
}

impl StoreError {
    pub fn is_storage(&self) -> bool {
        matches!(self, StoreError::Storage(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Task text cannot be empty")]
    EmptyText,
    #[error("Unrecognized due date '{0}'. Try YYYY-MM-DD, tomorrow, this weekend, next week")]
    InvalidDue(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn validation_error_names_field_and_issue() {
        let err = ValidationError::new(
            "title",
            ValidationIssue::TooLong {
                max: 200,
                actual: 201,
            },
        );
        assert_eq!(
            err.to_string(),
            "Task title must be at most 200 characters (got 201)"
        );
    }

    #[test]
    fn storage_error_keeps_source_chain() {
        let err = StorageError::new("Failed to save tasks", anyhow!("disk full"));
        assert_eq!(err.to_string(), "Failed to save tasks: disk full");
        assert!(StdError::source(&err).is_some());

        let store_err = StoreError::from(err.clone());
        assert!(store_err.is_storage());
        assert_eq!(err.context(), "Failed to save tasks");
    }
}
