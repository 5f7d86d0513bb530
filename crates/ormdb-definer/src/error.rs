//! Error types for definition calls.

use crate::registry::ModelId;
use std::path::PathBuf;
use thiserror::Error;

/// A definition was rejected.
///
/// Carries the entity (and field, when there is one) that caused the error so
/// callers can point at the offending definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DefinerError {
    /// Error kind for programmatic handling.
    pub kind: DefinerErrorKind,
    /// Entity being processed.
    pub entity: String,
    /// Field being processed, if any.
    pub field: Option<String>,
    /// Human readable message.
    pub message: String,
}

/// Kinds of definition errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinerErrorKind {
    /// A reference names an entity that is not defined or registered.
    InvalidReference,
    /// `referenceType` is neither `one` nor `many`.
    InvalidReferenceType,
    /// A definition file has no `fields` table.
    MissingFields,
    /// A referenced or many-to-many entity has no primary key.
    MissingPrimaryKey,
    /// A self-referential many-to-many relationship lacks `as`/`asReverse`.
    MissingAssociationLabel,
    /// Two definitions produce the same entity name.
    DuplicateEntity,
}

impl DefinerError {
    /// Create a new definition error.
    pub fn new(
        kind: DefinerErrorKind,
        entity: impl Into<String>,
        field: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity: entity.into(),
            field,
            message: message.into(),
        }
    }

    /// Create an invalid reference error.
    pub fn invalid_reference(entity: &str, field: Option<&str>, target: &str) -> Self {
        let message = match field {
            Some(field) => format!(
                "field '{}' of '{}' references undefined entity '{}'",
                field, entity, target
            ),
            None => format!(
                "many-to-many relationship of '{}' names undefined entity '{}'",
                entity, target
            ),
        };
        Self::new(
            DefinerErrorKind::InvalidReference,
            entity,
            field.map(String::from),
            message,
        )
    }

    /// Create an invalid reference type error.
    pub fn invalid_reference_type(entity: &str, field: &str, reference_type: &str) -> Self {
        Self::new(
            DefinerErrorKind::InvalidReferenceType,
            entity,
            Some(field.to_string()),
            format!(
                "field '{}' of '{}' has reference type '{}', expected 'one' or 'many'",
                field, entity, reference_type
            ),
        )
    }

    /// Create a missing fields error.
    pub fn missing_fields(entity: &str) -> Self {
        Self::new(
            DefinerErrorKind::MissingFields,
            entity,
            None,
            format!("definition of '{}' has no fields", entity),
        )
    }

    /// Create a missing primary key error.
    pub fn missing_primary_key(entity: &str) -> Self {
        Self::new(
            DefinerErrorKind::MissingPrimaryKey,
            entity,
            None,
            format!("'{}' is referenced but has no primary key", entity),
        )
    }

    /// Create a missing association label error.
    pub fn missing_association_label(entity: &str) -> Self {
        Self::new(
            DefinerErrorKind::MissingAssociationLabel,
            entity,
            None,
            format!(
                "self-referential many-to-many relationship of '{}' needs both 'as' and 'asReverse'",
                entity
            ),
        )
    }

    /// Create a duplicate entity error.
    pub fn duplicate_entity(entity: &str) -> Self {
        Self::new(
            DefinerErrorKind::DuplicateEntity,
            entity,
            None,
            format!("entity '{}' is defined more than once", entity),
        )
    }
}

/// Errors raised by a model registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A model with this name is already registered.
    #[error("model '{0}' is already registered")]
    DuplicateModel(String),

    /// The handle does not belong to this registry.
    #[error("unknown model {0}")]
    UnknownModel(ModelId),

    /// The model already has an association with this label.
    #[error("model '{model}' already has an association labelled '{label}'")]
    DuplicateAssociation { model: String, label: String },

    /// Any other registry failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Definition(#[from] DefinerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

impl Error {
    /// Definition error kind, if this is a definition error.
    pub fn definer_kind(&self) -> Option<DefinerErrorKind> {
        match self {
            Error::Definition(err) => Some(err.kind),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_reference_carries_context() {
        let err = DefinerError::invalid_reference("Task", Some("WorkerId"), "Person");
        assert_eq!(err.kind, DefinerErrorKind::InvalidReference);
        assert_eq!(err.entity, "Task");
        assert_eq!(err.field.as_deref(), Some("WorkerId"));
        assert!(err.to_string().contains("Person"));
    }

    #[test]
    fn test_many_to_many_reference_has_no_field() {
        let err = DefinerError::invalid_reference("Task", None, "Tag");
        assert!(err.field.is_none());
        assert!(err.to_string().contains("many-to-many"));
    }

    #[test]
    fn test_error_kind_passthrough() {
        let err: Error = DefinerError::missing_association_label("Task").into();
        assert_eq!(
            err.definer_kind(),
            Some(DefinerErrorKind::MissingAssociationLabel)
        );

        let err: Error = RegistryError::DuplicateModel("User".into()).into();
        assert_eq!(err.definer_kind(), None);
        assert_eq!(err.to_string(), "model 'User' is already registered");
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = Error::parse("defs/User.json", "expected value");
        assert_eq!(
            err.to_string(),
            "failed to parse defs/User.json: expected value"
        );
    }
}
