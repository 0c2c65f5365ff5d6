//! Error kinds shared by every component. Collaborator (store) failures
//! are wrapped rather than flattened so callers can still tell an
//! infrastructure fault apart from a policy decision.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    /// Document, link or grant absent, or a denial deliberately disguised
    /// as absence for deleted/inactive entities.
    #[error("not found")]
    NotFound,
    /// The actor lacks the required permission level.
    #[error("permission denied")]
    PermissionDenied,
    #[error("validation failed: {0}")]
    Validation(String),
    /// Semantically redundant operation, e.g. granting to the owner.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("share link expired")]
    Expired,
    #[error("invalid password")]
    InvalidPassword,
    #[error("batch of {got} exceeds limit of {limit}")]
    BatchLimitExceeded { got: usize, limit: usize },
    #[error("cycle detected in folder hierarchy")]
    CycleDetected,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AccessError>;

impl AccessError {
    /// Collapse `PermissionDenied` into `NotFound`. API layers apply this
    /// to read-like operations so unauthorized callers cannot probe for
    /// document existence.
    pub fn disguise_denial(self) -> Self {
        match self {
            AccessError::PermissionDenied => AccessError::NotFound,
            other => other,
        }
    }
}
