//! Segmentation entities.

use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a segmentation is stored and drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RepresentationType {
    Labelmap,
    Contour,
}

impl fmt::Display for RepresentationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepresentationType::Labelmap => write!(f, "Labelmap"),
            RepresentationType::Contour => write!(f, "Contour"),
        }
    }
}

/// Labelmap backing data: a label volume in the volume cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelmapData {
    pub volume_id: String,
}

/// Contour backing data: geometry held by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContourData {
    pub geometry_ids: Vec<String>,
}

/// Backing data references, one slot per representation type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepresentationData {
    #[serde(rename = "Labelmap", skip_serializing_if = "Option::is_none")]
    pub labelmap: Option<LabelmapData>,
    #[serde(rename = "Contour", skip_serializing_if = "Option::is_none")]
    pub contour: Option<ContourData>,
}

impl RepresentationData {
    pub fn labelmap(volume_id: impl Into<String>) -> Self {
        Self {
            labelmap: Some(LabelmapData {
                volume_id: volume_id.into(),
            }),
            contour: None,
        }
    }

    pub fn has(&self, representation_type: RepresentationType) -> bool {
        match representation_type {
            RepresentationType::Labelmap => self.labelmap.is_some(),
            RepresentationType::Contour => self.contour.is_some(),
        }
    }
}

/// Input to `add_segmentation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationInput {
    pub segmentation_id: String,
    #[serde(rename = "type")]
    pub representation_type: RepresentationType,
    pub representation_data: RepresentationData,
}

impl SegmentationInput {
    /// Labelmap segmentation backed by `volume_id`.
    pub fn labelmap(segmentation_id: impl Into<String>, volume_id: impl Into<String>) -> Self {
        Self {
            segmentation_id: segmentation_id.into(),
            representation_type: RepresentationType::Labelmap,
            representation_data: RepresentationData::labelmap(volume_id),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.segmentation_id.is_empty() {
            return Err(SegmentationError::InvalidInput(
                "segmentation id must not be empty".to_string(),
            ));
        }
        if !self.representation_data.has(self.representation_type) {
            return Err(SegmentationError::InvalidInput(format!(
                "segmentation '{}' of type {} has no {} data",
                self.segmentation_id, self.representation_type, self.representation_type
            )));
        }
        Ok(())
    }
}

/// A region-of-interest entity, independent of how it is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    pub segmentation_id: String,
    #[serde(rename = "type")]
    pub representation_type: RepresentationType,
    pub representation_data: RepresentationData,
    /// Segment value written by fill strategies.
    pub active_segment_index: u8,
    /// Segment values no strategy may overwrite.
    pub segments_locked: BTreeSet<u8>,
}

impl From<SegmentationInput> for Segmentation {
    fn from(input: SegmentationInput) -> Self {
        Self {
            segmentation_id: input.segmentation_id,
            representation_type: input.representation_type,
            representation_data: input.representation_data,
            active_segment_index: 1,
            segments_locked: BTreeSet::new(),
        }
    }
}

impl Segmentation {
    /// Label volume backing a labelmap segmentation.
    pub fn labelmap_volume_id(&self) -> Option<&str> {
        self.representation_data
            .labelmap
            .as_ref()
            .map(|l| l.volume_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_validation() {
        assert!(SegmentationInput::labelmap("seg1", "vol1").validate().is_ok());

        let missing = SegmentationInput {
            segmentation_id: "seg1".to_string(),
            representation_type: RepresentationType::Contour,
            representation_data: RepresentationData::labelmap("vol1"),
        };
        assert!(missing.validate().is_err());

        assert!(SegmentationInput::labelmap("", "vol1").validate().is_err());
    }

    #[test]
    fn test_new_segmentation_defaults() {
        let seg = Segmentation::from(SegmentationInput::labelmap("seg1", "vol1"));
        assert_eq!(seg.active_segment_index, 1);
        assert!(seg.segments_locked.is_empty());
        assert_eq!(seg.labelmap_volume_id(), Some("vol1"));
    }

    #[test]
    fn test_input_json_shape() {
        let json = r#"{
            "segmentationId": "seg1",
            "type": "Labelmap",
            "representationData": { "Labelmap": { "volumeId": "vol1" } }
        }"#;
        let input: SegmentationInput = serde_json::from_str(json).unwrap();
        assert_eq!(input, SegmentationInput::labelmap("seg1", "vol1"));
    }
}
