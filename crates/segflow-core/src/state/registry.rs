//! Per-tool-group associations between segmentations and their representations.

use super::RepresentationType;
use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How one segmentation is shown within one tool group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolGroupRepresentation {
    #[serde(rename = "segmentationRepresentationUID")]
    pub segmentation_representation_uid: String,
    pub tool_group_id: String,
    pub segmentation_id: String,
    #[serde(rename = "type")]
    pub representation_type: RepresentationType,
    pub visible: bool,
    /// Whether this is the representation edited by the group's tools.
    pub active: bool,
    pub color_lut_index: u32,
}

/// Input to `add_segmentation_representation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentationInput {
    /// Generated when absent.
    #[serde(rename = "segmentationRepresentationUID", default)]
    pub segmentation_representation_uid: Option<String>,
    pub segmentation_id: String,
    #[serde(rename = "type")]
    pub representation_type: RepresentationType,
    #[serde(default)]
    pub color_lut_index: Option<u32>,
}

impl RepresentationInput {
    pub fn new(segmentation_id: impl Into<String>, representation_type: RepresentationType) -> Self {
        Self {
            segmentation_representation_uid: None,
            segmentation_id: segmentation_id.into(),
            representation_type,
            color_lut_index: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.segmentation_representation_uid = Some(uid.into());
        self
    }

    pub fn with_color_lut_index(mut self, index: u32) -> Self {
        self.color_lut_index = Some(index);
        self
    }
}

/// Representations keyed by tool group, in insertion order within a group.
///
/// A group with representations always has exactly one active one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepresentationRegistry {
    groups: BTreeMap<String, Vec<ToolGroupRepresentation>>,
}

impl RepresentationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn representations(&self, tool_group_id: &str) -> &[ToolGroupRepresentation] {
        self.groups
            .get(tool_group_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn tool_group_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Whether any group holds a representation with this uid.
    pub fn contains_uid(&self, uid: &str) -> bool {
        self.groups
            .values()
            .flatten()
            .any(|r| r.segmentation_representation_uid == uid)
    }

    pub fn get(&self, tool_group_id: &str, uid: &str) -> Option<&ToolGroupRepresentation> {
        self.representations(tool_group_id)
            .iter()
            .find(|r| r.segmentation_representation_uid == uid)
    }

    pub fn get_mut(&mut self, tool_group_id: &str, uid: &str) -> Option<&mut ToolGroupRepresentation> {
        self.groups
            .get_mut(tool_group_id)?
            .iter_mut()
            .find(|r| r.segmentation_representation_uid == uid)
    }

    /// Insert a representation. The caller guarantees the uid is unused.
    pub(crate) fn insert(&mut self, mut representation: ToolGroupRepresentation) {
        let reps = self
            .groups
            .entry(representation.tool_group_id.clone())
            .or_default();
        representation.active = reps.is_empty();
        reps.push(representation);
    }

    /// Remove a representation, promoting the next one if it was active.
    pub(crate) fn remove(&mut self, tool_group_id: &str, uid: &str) -> Option<ToolGroupRepresentation> {
        let reps = self.groups.get_mut(tool_group_id)?;
        let pos = reps
            .iter()
            .position(|r| r.segmentation_representation_uid == uid)?;
        let removed = reps.remove(pos);
        if removed.active {
            if let Some(next) = reps.first_mut() {
                next.active = true;
            }
        }
        if reps.is_empty() {
            self.groups.remove(tool_group_id);
        }
        Some(removed)
    }

    /// Remove every representation of a segmentation, in every group.
    pub(crate) fn remove_segmentation(&mut self, segmentation_id: &str) -> Vec<ToolGroupRepresentation> {
        let doomed: Vec<(String, String)> = self
            .groups
            .values()
            .flatten()
            .filter(|r| r.segmentation_id == segmentation_id)
            .map(|r| {
                (
                    r.tool_group_id.clone(),
                    r.segmentation_representation_uid.clone(),
                )
            })
            .collect();
        doomed
            .iter()
            .filter_map(|(group, uid)| self.remove(group, uid))
            .collect()
    }

    pub fn active(&self, tool_group_id: &str) -> Option<&ToolGroupRepresentation> {
        self.representations(tool_group_id).iter().find(|r| r.active)
    }

    /// Make `uid` the active representation of its group.
    pub(crate) fn set_active(&mut self, tool_group_id: &str, uid: &str) -> Result<()> {
        let reps = self
            .groups
            .get_mut(tool_group_id)
            .ok_or_else(|| SegmentationError::unknown("tool group", tool_group_id))?;
        if !reps.iter().any(|r| r.segmentation_representation_uid == uid) {
            return Err(SegmentationError::unknown("segmentation representation", uid));
        }
        for rep in reps.iter_mut() {
            rep.active = rep.segmentation_representation_uid == uid;
        }
        Ok(())
    }

    /// Groups holding at least one representation of the segmentation.
    pub fn tool_groups_with_segmentation(&self, segmentation_id: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, reps)| reps.iter().any(|r| r.segmentation_id == segmentation_id))
            .map(|(group, _)| group.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(group: &str, uid: &str, seg: &str) -> ToolGroupRepresentation {
        ToolGroupRepresentation {
            segmentation_representation_uid: uid.to_string(),
            tool_group_id: group.to_string(),
            segmentation_id: seg.to_string(),
            representation_type: RepresentationType::Labelmap,
            visible: true,
            active: false,
            color_lut_index: 0,
        }
    }

    #[test]
    fn test_first_insert_becomes_active() {
        let mut registry = RepresentationRegistry::new();
        registry.insert(rep("g1", "rep1", "seg1"));
        registry.insert(rep("g1", "rep2", "seg2"));
        assert_eq!(
            registry.active("g1").map(|r| r.segmentation_representation_uid.as_str()),
            Some("rep1")
        );
        assert!(!registry.get("g1", "rep2").map(|r| r.active).unwrap_or(true));
    }

    #[test]
    fn test_removing_active_promotes_next() {
        let mut registry = RepresentationRegistry::new();
        registry.insert(rep("g1", "rep1", "seg1"));
        registry.insert(rep("g1", "rep2", "seg2"));
        registry.remove("g1", "rep1");
        assert_eq!(
            registry.active("g1").map(|r| r.segmentation_representation_uid.as_str()),
            Some("rep2")
        );
        registry.remove("g1", "rep2");
        assert!(registry.representations("g1").is_empty());
        assert_eq!(registry.tool_group_ids().count(), 0);
    }

    #[test]
    fn test_remove_segmentation_cascades() {
        let mut registry = RepresentationRegistry::new();
        registry.insert(rep("g1", "rep1", "seg1"));
        registry.insert(rep("g2", "rep2", "seg1"));
        registry.insert(rep("g2", "rep3", "seg2"));

        let removed = registry.remove_segmentation("seg1");

        assert_eq!(removed.len(), 2);
        assert!(registry.representations("g1").is_empty());
        assert_eq!(registry.representations("g2").len(), 1);
        assert!(registry.get("g2", "rep3").map(|r| r.active).unwrap_or(false));
    }

    #[test]
    fn test_set_active_unknown_uid() {
        let mut registry = RepresentationRegistry::new();
        registry.insert(rep("g1", "rep1", "seg1"));
        assert!(registry.set_active("g1", "nope").is_err());
        assert!(registry.set_active("nope", "rep1").is_err());
        assert!(registry.get("g1", "rep1").map(|r| r.active).unwrap_or(false));
    }

    #[test]
    fn test_groups_with_segmentation() {
        let mut registry = RepresentationRegistry::new();
        registry.insert(rep("g2", "rep2", "seg1"));
        registry.insert(rep("g1", "rep1", "seg1"));
        registry.insert(rep("g3", "rep3", "seg2"));
        assert_eq!(registry.tool_groups_with_segmentation("seg1"), vec!["g1", "g2"]);
        assert!(registry.contains_uid("rep3"));
        assert!(!registry.contains_uid("rep4"));
    }
}
