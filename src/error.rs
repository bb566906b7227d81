//! Error types for qpas-storage

use std::fmt;

use thiserror::Error;

/// A referenced record that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Institution(i32),
    User(i32),
    /// No subject with this id belongs to this institution. Covers both
    /// "no such subject" and "subject owned by another institution".
    Subject { subject_id: i32, institution_id: i32 },
    Paper(i32),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Institution(id) => write!(f, "institution {} not found", id),
            Missing::User(id) => write!(f, "user {} not found", id),
            Missing::Subject {
                subject_id,
                institution_id,
            } => write!(
                f,
                "subject {} not found in institution {}",
                subject_id, institution_id
            ),
            Missing::Paper(id) => write!(f, "paper {} not found", id),
        }
    }
}

/// Two records exist but violate a required relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    UserInstitutionMismatch {
        user_id: i32,
        user_institution_id: i32,
        institution_id: i32,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inconsistency::UserInstitutionMismatch {
                user_id,
                user_institution_id,
                institution_id,
            } => write!(
                f,
                "user {} belongs to institution {}, not institution {}",
                user_id, user_institution_id, institution_id
            ),
        }
    }
}

/// A uniqueness constraint that a write would violate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    DuplicateEmail(String),
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::DuplicateEmail(email) => {
                write!(f, "a user with email {} already exists", email)
            }
        }
    }
}

/// Coarse error classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Inconsistent,
    Conflict,
    InvalidInput,
    StorageFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Inconsistent => "inconsistent",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Not found: {0}")]
    NotFound(Missing),

    #[error("Inconsistent: {0}")]
    Inconsistent(Inconsistency),

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::NotFound(_) => ErrorKind::NotFound,
            ArchiveError::Inconsistent(_) => ErrorKind::Inconsistent,
            ArchiveError::Conflict(_) => ErrorKind::Conflict,
            ArchiveError::InvalidInput(_) | ArchiveError::Json(_) => ErrorKind::InvalidInput,
            ArchiveError::Storage(_) | ArchiveError::Config(_) | ArchiveError::Io(_) => {
                ErrorKind::StorageFailure
            }
        }
    }

    /// Wrap a diesel error with the operation that produced it
    pub(crate) fn query(context: &str, err: diesel::result::Error) -> Self {
        ArchiveError::Storage(format!("{}: {}", context, err))
    }
}

impl From<diesel::r2d2::PoolError> for ArchiveError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        ArchiveError::Storage(format!("Connection pool error: {}", err))
    }
}
