//! The authoritative segmentation state.

use super::color::{ColorLut, Rgba};
use super::registry::{RepresentationInput, RepresentationRegistry, ToolGroupRepresentation};
use super::segmentation::{Segmentation, SegmentationInput};
use crate::config::{Merge, SegmentationRepresentationConfig};
use crate::error::{Result, SegmentationError};
use crate::events::{ChangeKind, ConfigScope, RepresentationEvent, StateChange};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use uuid::Uuid;

/// Index of the color table installed on first representation add.
pub const DEFAULT_COLOR_LUT_INDEX: u32 = 0;

/// Segmentations, their representations per tool group, configuration
/// layers and color tables.
///
/// Every mutation appends a [`StateChange`] to an internal journal. The
/// store never publishes anything itself; the owner drains the journal with
/// [`drain_changes`](Self::drain_changes).
#[derive(Debug, Default)]
pub struct SegmentationStateStore {
    segmentations: HashMap<String, Segmentation>,
    /// Insertion order of segmentation ids.
    order: Vec<String>,
    registry: RepresentationRegistry,
    global_config: SegmentationRepresentationConfig,
    group_configs: BTreeMap<String, SegmentationRepresentationConfig>,
    color_luts: BTreeMap<u32, Rc<ColorLut>>,
    changes: Vec<StateChange>,
}

impl SegmentationStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, change: StateChange) {
        log::trace!("Recording {:?}", change);
        self.changes.push(change);
    }

    fn record_representation(&mut self, kind: ChangeKind, rep: &ToolGroupRepresentation) {
        self.record(StateChange::Representation(RepresentationEvent {
            kind,
            tool_group_id: rep.tool_group_id.clone(),
            segmentation_representation_uid: rep.segmentation_representation_uid.clone(),
            segmentation_id: rep.segmentation_id.clone(),
        }));
    }

    /// Take every change recorded since the last drain, oldest first.
    pub fn drain_changes(&mut self) -> Vec<StateChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn pending_changes(&self) -> &[StateChange] {
        &self.changes
    }

    // --- segmentations ---

    /// Add a segmentation and install default configuration for its type
    /// underneath the current global layer.
    pub fn add_segmentation(&mut self, input: SegmentationInput) -> Result<()> {
        input.validate()?;
        if self.segmentations.contains_key(&input.segmentation_id) {
            return Err(SegmentationError::duplicate(
                "segmentation",
                input.segmentation_id,
            ));
        }

        let defaults = SegmentationRepresentationConfig::default_for(input.representation_type);
        self.global_config = defaults.merge(&self.global_config);

        let id = input.segmentation_id.clone();
        log::debug!("Adding segmentation '{}'", id);
        self.order.push(id.clone());
        self.segmentations.insert(id.clone(), Segmentation::from(input));
        self.record(StateChange::segmentation(ChangeKind::Added, id));
        Ok(())
    }

    pub fn segmentation(&self, segmentation_id: &str) -> Option<&Segmentation> {
        self.segmentations.get(segmentation_id)
    }

    /// All segmentations, in insertion order.
    pub fn segmentations(&self) -> Vec<&Segmentation> {
        self.order
            .iter()
            .filter_map(|id| self.segmentations.get(id))
            .collect()
    }

    /// Remove a segmentation and all its representations in every group.
    /// Returns `false` if the id is unknown.
    pub fn remove_segmentation(&mut self, segmentation_id: &str) -> bool {
        if self.segmentations.remove(segmentation_id).is_none() {
            return false;
        }
        self.order.retain(|id| id != segmentation_id);

        let removed = self.registry.remove_segmentation(segmentation_id);
        for rep in &removed {
            self.record_representation(ChangeKind::Removed, rep);
        }
        log::debug!(
            "Removed segmentation '{}' and {} representation(s)",
            segmentation_id,
            removed.len()
        );
        self.record(StateChange::segmentation(ChangeKind::Removed, segmentation_id));
        true
    }

    fn segmentation_mut(&mut self, segmentation_id: &str) -> Result<&mut Segmentation> {
        self.segmentations
            .get_mut(segmentation_id)
            .ok_or_else(|| SegmentationError::unknown("segmentation", segmentation_id))
    }

    /// Record that a segmentation's backing data was edited.
    pub fn mark_segmentation_data_modified(&mut self, segmentation_id: &str) -> Result<()> {
        self.segmentation_mut(segmentation_id)?;
        self.record(StateChange::segmentation(ChangeKind::Modified, segmentation_id));
        Ok(())
    }

    pub fn active_segment_index(&self, segmentation_id: &str) -> Option<u8> {
        self.segmentation(segmentation_id)
            .map(|s| s.active_segment_index)
    }

    /// Select the segment value written by fill strategies. 0 is the
    /// background and cannot be selected.
    pub fn set_active_segment_index(&mut self, segmentation_id: &str, index: u8) -> Result<()> {
        if index == 0 {
            return Err(SegmentationError::InvalidInput(
                "segment index 0 is reserved for the background".to_string(),
            ));
        }
        let seg = self.segmentation_mut(segmentation_id)?;
        if seg.active_segment_index == index {
            return Ok(());
        }
        seg.active_segment_index = index;
        self.record(StateChange::segmentation(ChangeKind::Modified, segmentation_id));
        Ok(())
    }

    pub fn locked_segments(&self, segmentation_id: &str) -> Option<&BTreeSet<u8>> {
        self.segmentation(segmentation_id).map(|s| &s.segments_locked)
    }

    pub fn set_segment_locked(&mut self, segmentation_id: &str, index: u8, locked: bool) -> Result<()> {
        let seg = self.segmentation_mut(segmentation_id)?;
        let changed = if locked {
            seg.segments_locked.insert(index)
        } else {
            seg.segments_locked.remove(&index)
        };
        if changed {
            self.record(StateChange::segmentation(ChangeKind::Modified, segmentation_id));
        }
        Ok(())
    }

    // --- representations ---

    pub fn registry(&self) -> &RepresentationRegistry {
        &self.registry
    }

    pub fn segmentation_representations(&self, tool_group_id: &str) -> &[ToolGroupRepresentation] {
        self.registry.representations(tool_group_id)
    }

    /// Add a representation to a tool group and return its uid.
    ///
    /// The uid must be unused in every group. Installs the default color
    /// table if no table exists at index 0 yet.
    pub fn add_segmentation_representation(
        &mut self,
        tool_group_id: &str,
        input: RepresentationInput,
    ) -> Result<String> {
        let seg = self
            .segmentation(&input.segmentation_id)
            .ok_or_else(|| SegmentationError::unknown("segmentation", &input.segmentation_id))?;
        if !seg.representation_data.has(input.representation_type) {
            return Err(SegmentationError::InvalidInput(format!(
                "segmentation '{}' has no {} data",
                input.segmentation_id, input.representation_type
            )));
        }

        let uid = input
            .segmentation_representation_uid
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if self.registry.contains_uid(&uid) {
            return Err(SegmentationError::duplicate("segmentation representation", uid));
        }

        let color_lut_index = input.color_lut_index.unwrap_or(DEFAULT_COLOR_LUT_INDEX);
        if color_lut_index == DEFAULT_COLOR_LUT_INDEX
            && !self.color_luts.contains_key(&DEFAULT_COLOR_LUT_INDEX)
        {
            self.add_color_lut(ColorLut::default_lut(), DEFAULT_COLOR_LUT_INDEX);
        } else if !self.color_luts.contains_key(&color_lut_index) {
            return Err(SegmentationError::unknown(
                "color LUT",
                color_lut_index.to_string(),
            ));
        }

        let rep = ToolGroupRepresentation {
            segmentation_representation_uid: uid.clone(),
            tool_group_id: tool_group_id.to_string(),
            segmentation_id: input.segmentation_id,
            representation_type: input.representation_type,
            visible: true,
            active: false,
            color_lut_index,
        };
        log::debug!(
            "Adding {} representation '{}' to tool group '{}'",
            rep.representation_type,
            uid,
            tool_group_id
        );
        self.record_representation(ChangeKind::Added, &rep);
        self.registry.insert(rep);
        Ok(uid)
    }

    /// Remove a representation from a group. Returns `false` if not found.
    pub fn remove_segmentation_representation(&mut self, tool_group_id: &str, uid: &str) -> bool {
        match self.registry.remove(tool_group_id, uid) {
            Some(rep) => {
                self.record_representation(ChangeKind::Removed, &rep);
                true
            }
            None => false,
        }
    }

    pub fn segmentation_representation_by_uid(
        &self,
        tool_group_id: &str,
        uid: &str,
    ) -> Option<&ToolGroupRepresentation> {
        self.registry.get(tool_group_id, uid)
    }

    pub fn active_segmentation_representation(
        &self,
        tool_group_id: &str,
    ) -> Option<&ToolGroupRepresentation> {
        self.registry.active(tool_group_id)
    }

    pub fn set_active_segmentation_representation(&mut self, tool_group_id: &str, uid: &str) -> Result<()> {
        self.registry.set_active(tool_group_id, uid)?;
        if let Some(rep) = self.registry.get(tool_group_id, uid).cloned() {
            self.record_representation(ChangeKind::Modified, &rep);
        }
        Ok(())
    }

    pub fn set_representation_visibility(
        &mut self,
        tool_group_id: &str,
        uid: &str,
        visible: bool,
    ) -> Result<()> {
        let rep = self
            .registry
            .get_mut(tool_group_id, uid)
            .ok_or_else(|| SegmentationError::unknown("segmentation representation", uid))?;
        if rep.visible == visible {
            return Ok(());
        }
        rep.visible = visible;
        let rep = rep.clone();
        self.record_representation(ChangeKind::Modified, &rep);
        Ok(())
    }

    pub fn tool_groups_with_segmentation(&self, segmentation_id: &str) -> Vec<String> {
        self.registry.tool_groups_with_segmentation(segmentation_id)
    }

    // --- configuration ---

    pub fn global_config(&self) -> &SegmentationRepresentationConfig {
        &self.global_config
    }

    pub fn set_global_config(&mut self, config: SegmentationRepresentationConfig) {
        self.global_config = config;
        self.record(StateChange::config(ChangeKind::Modified, ConfigScope::Global));
    }

    pub fn tool_group_specific_config(
        &self,
        tool_group_id: &str,
    ) -> Option<&SegmentationRepresentationConfig> {
        self.group_configs.get(tool_group_id)
    }

    pub fn set_tool_group_specific_config(
        &mut self,
        tool_group_id: &str,
        config: SegmentationRepresentationConfig,
    ) {
        let kind = match self.group_configs.insert(tool_group_id.to_string(), config) {
            Some(_) => ChangeKind::Modified,
            None => ChangeKind::Added,
        };
        self.record(StateChange::config(
            kind,
            ConfigScope::ToolGroup(tool_group_id.to_string()),
        ));
    }

    // --- color tables ---

    /// Install a color table at `index`, replacing any existing one.
    pub fn add_color_lut(&mut self, lut: ColorLut, index: u32) -> Rc<ColorLut> {
        let lut = Rc::new(lut);
        let kind = match self.color_luts.insert(index, Rc::clone(&lut)) {
            Some(_) => ChangeKind::Modified,
            None => ChangeKind::Added,
        };
        self.record(StateChange::config(kind, ConfigScope::ColorLut(index)));
        lut
    }

    pub fn color_lut(&self, index: u32) -> Option<Rc<ColorLut>> {
        self.color_luts.get(&index).cloned()
    }

    /// Color of a segment as shown by a representation.
    pub fn color_for_segment_index(
        &self,
        tool_group_id: &str,
        uid: &str,
        segment_index: u8,
    ) -> Option<Rgba> {
        let rep = self.registry.get(tool_group_id, uid)?;
        self.color_luts.get(&rep.color_lut_index)?.get(segment_index)
    }
}
