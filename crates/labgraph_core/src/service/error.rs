//! Error taxonomy surfaced by every entity manager.
//!
//! # Invariants
//! - Every variant maps to one stable `kind()` string.
//! - Messages name the offending field or value so callers can self-correct.

use crate::repo::coordinator::WriteError;
use crate::repo::document_store::DocumentId;
use crate::repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CoreResult<T> = Result<T, CoreError>;

/// Caller-facing error of the core.
#[derive(Debug)]
pub enum CoreError {
    /// An ancestor (or the target itself) does not resolve by name.
    ContextNotFound { entity: &'static str, name: String },
    /// The chain resolved but the acting user lacks access.
    PermissionDenied {
        user: Uuid,
        project: String,
        reason: &'static str,
    },
    /// A domain rule rejected the candidate.
    DomainValidation { rule: &'static str, message: String },
    /// Name collision within the parent scope.
    AlreadyExists { entity: &'static str, name: String },
    /// Graph-side collision, raised before any document write.
    VertexAlreadyExists { label: &'static str, name: String },
    /// A stored id has no live target.
    DanglingReference { entity: &'static str, id: DocumentId },
    /// Store failure; fatal for the request.
    Storage(StoreError),
}

impl CoreError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContextNotFound { .. } => "context_not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::DomainValidation { .. } => "domain_validation",
            Self::AlreadyExists { .. } => "already_exists",
            Self::VertexAlreadyExists { .. } => "vertex_already_exists",
            Self::DanglingReference { .. } => "dangling_reference",
            Self::Storage(_) => "storage",
        }
    }

    pub(crate) fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
        Self::ContextNotFound {
            entity,
            name: name.into(),
        }
    }

    pub(crate) fn rule(rule: &'static str, message: impl Into<String>) -> Self {
        Self::DomainValidation {
            rule,
            message: message.into(),
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContextNotFound { entity, name } => write!(f, "{entity} `{name}` not found"),
            Self::PermissionDenied {
                user,
                project,
                reason,
            } => write!(
                f,
                "user {user} may not access project `{project}`: {reason}"
            ),
            Self::DomainValidation { rule, message } => write!(f, "{rule}: {message}"),
            Self::AlreadyExists { entity, name } => write!(f, "{entity} `{name}` already exists"),
            Self::VertexAlreadyExists { label, name } => {
                write!(f, "{label} vertex for `{name}` already exists")
            }
            Self::DanglingReference { entity, id } => {
                write!(f, "dangling {entity} reference: {id}")
            }
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(value: StoreError) -> Self {
        Self::Storage(value)
    }
}

impl From<WriteError> for CoreError {
    fn from(value: WriteError) -> Self {
        match value {
            WriteError::VertexExists { label, name } => Self::VertexAlreadyExists { label, name },
            WriteError::DocumentExists { entity, name } => Self::AlreadyExists { entity, name },
            WriteError::VertexInUse {
                vertex_id,
                document_id,
            } => Self::rule(
                "vertex_in_use",
                format!("vertex {vertex_id} is still referenced by document {document_id}"),
            ),
            WriteError::Store(err) => Self::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CoreError;
    use crate::repo::coordinator::WriteError;

    #[test]
    fn document_conflict_maps_to_already_exists() {
        let err = CoreError::from(WriteError::DocumentExists {
            entity: "project run",
            name: "r1".to_string(),
        });
        assert_eq!(err.kind(), "already_exists");
        assert_eq!(err.to_string(), "project run `r1` already exists");
    }

    #[test]
    fn vertex_conflict_keeps_its_own_kind() {
        let err = CoreError::from(WriteError::VertexExists {
            label: "ProjectRun",
            name: "r1".to_string(),
        });
        assert_eq!(err.kind(), "vertex_already_exists");
    }
}
