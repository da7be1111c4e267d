//! Validation failures surfaced by write operations.

use std::fmt;

use thiserror::Error;

/// The write that was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        f.write_str(action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Offending column, or `base` when the failure is not tied to one column.
    pub field: String,
    pub message: String,
}

/// A rejected write, with one entry per failed check.
///
/// Produced either by [`Record::validate`](crate::Record::validate) before a
/// statement runs, or by the database itself (constraint violations).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{action} failed validation: {}", summary(.errors))]
pub struct ValidationFailure {
    pub action: Action,
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationFailure {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            errors: vec![],
        }
    }

    pub fn add(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
        self
    }

    /// `Ok(())` when no check failed.
    pub fn check(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Maps a SQLite constraint message (e.g. `UNIQUE constraint failed: users.name`)
    /// onto the column it names.
    pub(crate) fn from_constraint(action: Action, message: &str) -> Self {
        let field = message
            .split_once("constraint failed: ")
            .and_then(|(_, columns)| columns.split(',').next())
            .and_then(|column| column.trim().rsplit('.').next())
            .filter(|column| !column.is_empty())
            .unwrap_or("base");
        Self::new(action).add(field, message)
    }
}

/// Outcome of a non-strict write: the stored record or why it was rejected.
pub type Saved<R> = Result<R, ValidationFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_without_errors() {
        assert!(ValidationFailure::new(Action::Insert).check().is_ok());
    }

    #[test]
    fn test_display_lists_every_error() {
        let failure = ValidationFailure::new(Action::Update)
            .add("name", "can't be blank")
            .add("age", "must be positive");

        assert_eq!(
            failure.to_string(),
            "update failed validation: name can't be blank; age must be positive"
        );
    }

    #[test]
    fn test_constraint_message_names_column() {
        let failure =
            ValidationFailure::from_constraint(Action::Insert, "UNIQUE constraint failed: users.name");
        assert_eq!(failure.errors[0].field, "name");

        let failure = ValidationFailure::from_constraint(Action::Delete, "FOREIGN KEY constraint failed");
        assert_eq!(failure.errors[0].field, "base");
    }
}
