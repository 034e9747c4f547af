//! Error types shared by every segflow module.

use thiserror::Error;

/// Broad error category, used by callers that only care about the class of
/// failure (e.g. to decide whether to surface a message or a bug report).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Duplicate or unknown identifiers, inconsistent inputs.
    Validation,
    /// Tool or strategy configuration is missing or malformed.
    Configuration,
    /// An operation was issued against a missing or finished edit session.
    State,
    /// The tool/strategy combination is not supported for the view kind.
    NotImplemented,
}

/// Segmentation errors.
#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("{kind} with id '{id}' already exists")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{kind} with id '{id}' not found")]
    UnknownId { kind: &'static str, id: String },
    #[error(
        "volume '{volume_id}' has frame of reference '{found}' but viewport '{viewport_id}' uses '{expected}'"
    )]
    FrameOfReferenceMismatch {
        viewport_id: String,
        volume_id: String,
        expected: String,
        found: String,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No active segmentation representation for tool group '{tool_group_id}'")]
    NoActiveSegmentation { tool_group_id: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("State error: {0}")]
    State(String),
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    #[error("Failed to load volume '{volume_id}': {reason}")]
    Load { volume_id: String, reason: String },
}

impl SegmentationError {
    pub(crate) fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        Self::DuplicateId { kind, id: id.into() }
    }

    pub(crate) fn unknown(kind: &'static str, id: impl Into<String>) -> Self {
        Self::UnknownId { kind, id: id.into() }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateId { .. }
            | Self::UnknownId { .. }
            | Self::FrameOfReferenceMismatch { .. }
            | Self::InvalidInput(_)
            | Self::Load { .. } => ErrorKind::Validation,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::NoActiveSegmentation { .. } | Self::State(_) => ErrorKind::State,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }
}

/// Result type for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentationError>;
