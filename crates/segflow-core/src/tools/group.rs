//! Tool groups: named sets of viewports sharing tools and an active
//! segmentation context.

use super::Tool;
use crate::error::{Result, SegmentationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a tool in a group reacts to input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolMode {
    /// Receives primary-button gestures. At most one per group.
    Active,
    /// Draws its state but does not start gestures.
    Passive,
    Enabled,
    #[default]
    Disabled,
}

struct ToolEntry {
    tool: Box<dyn Tool>,
    mode: ToolMode,
}

/// Tools and viewports of one group.
pub struct ToolGroup {
    id: String,
    viewport_ids: Vec<String>,
    tools: BTreeMap<String, ToolEntry>,
}

impl std::fmt::Debug for ToolGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolGroup")
            .field("id", &self.id)
            .field("viewport_ids", &self.viewport_ids)
            .field(
                "tools",
                &self
                    .tools
                    .iter()
                    .map(|(name, e)| (name.as_str(), e.mode))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ToolGroup {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            viewport_ids: Vec::new(),
            tools: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn viewport_ids(&self) -> &[String] {
        &self.viewport_ids
    }

    pub fn has_viewport(&self, viewport_id: &str) -> bool {
        self.viewport_ids.iter().any(|id| id == viewport_id)
    }

    fn add_viewport(&mut self, viewport_id: &str) {
        if !self.has_viewport(viewport_id) {
            self.viewport_ids.push(viewport_id.to_string());
        }
    }

    pub fn remove_viewport(&mut self, viewport_id: &str) -> bool {
        let before = self.viewport_ids.len();
        self.viewport_ids.retain(|id| id != viewport_id);
        before != self.viewport_ids.len()
    }

    /// Register a tool, initially disabled.
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(SegmentationError::duplicate("tool", name));
        }
        self.tools.insert(
            name,
            ToolEntry {
                tool,
                mode: ToolMode::Disabled,
            },
        );
        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|e| e.tool.as_ref())
    }

    pub fn tool_mut(&mut self, name: &str) -> Option<&mut (dyn Tool + 'static)> {
        self.tools.get_mut(name).map(|e| e.tool.as_mut())
    }

    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn tool_mode(&self, name: &str) -> Option<ToolMode> {
        self.tools.get(name).map(|e| e.mode)
    }

    /// Set a tool's mode. Activating a tool demotes the previously active
    /// one to passive.
    pub fn set_tool_mode(&mut self, name: &str, mode: ToolMode) -> Result<()> {
        if !self.tools.contains_key(name) {
            return Err(SegmentationError::unknown("tool", name));
        }
        if mode == ToolMode::Active {
            for (other, entry) in self.tools.iter_mut() {
                if other != name && entry.mode == ToolMode::Active {
                    entry.mode = ToolMode::Passive;
                }
            }
        }
        if let Some(entry) = self.tools.get_mut(name) {
            entry.mode = mode;
        }
        log::debug!("Tool '{}' in group '{}' is now {:?}", name, self.id, mode);
        Ok(())
    }

    pub fn activate_tool(&mut self, name: &str) -> Result<()> {
        self.set_tool_mode(name, ToolMode::Active)
    }

    pub fn deactivate_tool(&mut self, name: &str) -> Result<()> {
        self.set_tool_mode(name, ToolMode::Disabled)
    }

    pub fn active_tool_name(&self) -> Option<&str> {
        self.tools
            .iter()
            .find(|(_, e)| e.mode == ToolMode::Active)
            .map(|(name, _)| name.as_str())
    }

    pub fn active_tool_mut(&mut self) -> Option<&mut (dyn Tool + 'static)> {
        self.tools
            .values_mut()
            .find(|e| e.mode == ToolMode::Active)
            .map(|e| e.tool.as_mut())
    }

    /// The tool with a gesture in flight, if any.
    pub fn drawing_tool_mut(&mut self) -> Option<&mut (dyn Tool + 'static)> {
        self.tools
            .values_mut()
            .find(|e| e.tool.is_drawing())
            .map(|e| e.tool.as_mut())
    }

    pub fn tools_mut(&mut self) -> impl Iterator<Item = &mut (dyn Tool + 'static)> {
        self.tools.values_mut().map(|e| e.tool.as_mut())
    }

    pub fn tools(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.values().map(|e| e.tool.as_ref())
    }
}

/// All tool groups of a session. A viewport belongs to at most one group.
#[derive(Debug, Default)]
pub struct ToolGroupManager {
    groups: BTreeMap<String, ToolGroup>,
}

impl ToolGroupManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_tool_group(&mut self, id: &str) -> Result<&mut ToolGroup> {
        if self.groups.contains_key(id) {
            return Err(SegmentationError::duplicate("tool group", id));
        }
        Ok(self
            .groups
            .entry(id.to_string())
            .or_insert_with(|| ToolGroup::new(id)))
    }

    pub fn tool_group(&self, id: &str) -> Option<&ToolGroup> {
        self.groups.get(id)
    }

    pub fn tool_group_mut(&mut self, id: &str) -> Option<&mut ToolGroup> {
        self.groups.get_mut(id)
    }

    pub fn tool_groups(&self) -> impl Iterator<Item = &ToolGroup> {
        self.groups.values()
    }

    pub fn tool_groups_mut(&mut self) -> impl Iterator<Item = &mut ToolGroup> {
        self.groups.values_mut()
    }

    /// Add a viewport to a group.
    pub fn add_viewport(&mut self, tool_group_id: &str, viewport_id: &str) -> Result<()> {
        if let Some(owner) = self.group_for_viewport(viewport_id) {
            if owner != tool_group_id {
                return Err(SegmentationError::InvalidInput(format!(
                    "viewport '{}' already belongs to tool group '{}'",
                    viewport_id, owner
                )));
            }
        }
        self.groups
            .get_mut(tool_group_id)
            .ok_or_else(|| SegmentationError::unknown("tool group", tool_group_id))?
            .add_viewport(viewport_id);
        Ok(())
    }

    pub fn group_for_viewport(&self, viewport_id: &str) -> Option<&str> {
        self.groups
            .values()
            .find(|g| g.has_viewport(viewport_id))
            .map(|g| g.id())
    }

    /// Viewports of the given groups, deduplicated.
    pub fn viewports_of<'a>(&self, group_ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for id in group_ids {
            if let Some(group) = self.groups.get(id) {
                for vp in group.viewport_ids() {
                    if !out.contains(vp) {
                        out.push(vp.clone());
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{CircleScissorsTool, RectangleScissorsTool, ToolConfiguration};

    fn group_with_tools() -> ToolGroup {
        let mut group = ToolGroup::new("g1");
        group
            .add_tool(Box::new(CircleScissorsTool::new(ToolConfiguration::default()).unwrap()))
            .unwrap();
        group
            .add_tool(Box::new(RectangleScissorsTool::new(ToolConfiguration::default()).unwrap()))
            .unwrap();
        group
    }

    #[test]
    fn test_single_active_tool() {
        let mut group = group_with_tools();
        assert_eq!(group.tool_mode("CircleScissor"), Some(ToolMode::Disabled));

        group.activate_tool("CircleScissor").unwrap();
        group.activate_tool("RectangleScissor").unwrap();

        assert_eq!(group.active_tool_name(), Some("RectangleScissor"));
        assert_eq!(group.tool_mode("CircleScissor"), Some(ToolMode::Passive));

        group.deactivate_tool("RectangleScissor").unwrap();
        assert!(group.active_tool_mut().is_none());
    }

    #[test]
    fn test_unknown_and_duplicate_tools() {
        let mut group = group_with_tools();
        assert!(group.activate_tool("Probe").is_err());
        let dup = group.add_tool(Box::new(
            CircleScissorsTool::new(ToolConfiguration::default()).unwrap(),
        ));
        assert!(matches!(dup, Err(SegmentationError::DuplicateId { .. })));
    }

    #[test]
    fn test_viewport_membership() {
        let mut manager = ToolGroupManager::new();
        manager.create_tool_group("g1").unwrap();
        manager.create_tool_group("g2").unwrap();
        assert!(manager.create_tool_group("g1").is_err());

        manager.add_viewport("g1", "vp1").unwrap();
        manager.add_viewport("g1", "vp1").unwrap();
        manager.add_viewport("g2", "vp2").unwrap();
        assert!(manager.add_viewport("g2", "vp1").is_err());
        assert!(manager.add_viewport("g3", "vp3").is_err());

        assert_eq!(manager.group_for_viewport("vp1"), Some("g1"));
        assert_eq!(manager.tool_group("g1").unwrap().viewport_ids().len(), 1);
        assert_eq!(manager.viewports_of(["g1", "g2"]), vec!["vp1", "vp2"]);
    }
}
