//! Identity of the data a tool acts on in a view.

use super::ToolConfiguration;
use crate::error::{Result, SegmentationError};
use crate::viewport::{View, ViewKind};
use std::fmt;

const STACK_TARGET_PREFIX: &str = "stackTarget";

/// Parsed form of a target id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetId {
    /// The image stack shown by one viewport.
    Stack { viewport_id: String },
    /// A volume shown by any number of viewports.
    Volume { volume_id: String },
}

impl TargetId {
    /// Parse a target id string. Anything not prefixed with the stack
    /// marker is a volume id.
    pub fn parse(target_id: &str) -> Self {
        match target_id.split_once(':') {
            Some((STACK_TARGET_PREFIX, viewport_id)) => TargetId::Stack {
                viewport_id: viewport_id.to_string(),
            },
            _ => TargetId::Volume {
                volume_id: target_id.to_string(),
            },
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Stack { viewport_id } => write!(f, "{}:{}", STACK_TARGET_PREFIX, viewport_id),
            TargetId::Volume { volume_id } => write!(f, "{}", volume_id),
        }
    }
}

/// Resolve what a tool acts on in `view`.
///
/// - Stack views: `stackTarget:<view id>`.
/// - Volume views: the configured `volume_id`, or else the uid of the first
///   attached actor. Actor uids default to the volume id, so without
///   explicit actor names this is the first attached volume.
///
/// A volume view with neither a configured volume nor actors is an error.
pub fn target_id(view: &dyn View, configuration: &ToolConfiguration) -> Result<TargetId> {
    match view.kind() {
        ViewKind::Stack => Ok(TargetId::Stack {
            viewport_id: view.id().to_string(),
        }),
        ViewKind::Volume => {
            if let Some(volume_id) = &configuration.volume_id {
                return Ok(TargetId::Volume {
                    volume_id: volume_id.clone(),
                });
            }
            view.actors()
                .first()
                .map(|actor| TargetId::Volume {
                    volume_id: actor.uid.clone(),
                })
                .ok_or_else(|| {
                    SegmentationError::InvalidInput(format!(
                        "volume viewport '{}' has no actors and no configured volume",
                        view.id()
                    ))
                })
        }
    }
}
