//! Named edit strategies and the payload they operate on.

use crate::error::{Result, SegmentationError};
use crate::volume::SharedVolume;
use glam::DVec3;
use std::collections::{BTreeMap, BTreeSet};

/// Fill the drawn shape with the active segment index.
pub const FILL_INSIDE: &str = "FILL_INSIDE";
/// Clear voxels of the active segment inside the drawn shape.
pub const ERASE_INSIDE: &str = "ERASE_INSIDE";

/// Everything a strategy needs to edit a label volume.
#[derive(Debug, Clone)]
pub struct OperationData {
    /// Draft handle points in world space, in the order the tool defines.
    pub points: Vec<DVec3>,
    /// Label volume being edited.
    pub volume: SharedVolume,
    pub segmentation_id: String,
    pub segment_index: u8,
    pub segments_locked: BTreeSet<u8>,
    pub view_plane_normal: DVec3,
    pub view_up: DVec3,
    /// Extra per-strategy parameters from the tool configuration.
    pub strategy_options: BTreeMap<String, serde_json::Value>,
}

/// What a strategy did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyOutcome {
    pub modified_voxels: usize,
}

/// An edit algorithm.
pub type StrategyFn = fn(&OperationData) -> Result<StrategyOutcome>;

/// Strategy functions keyed by name.
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    entries: BTreeMap<String, StrategyFn>,
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, strategy: StrategyFn) -> Self {
        self.insert(name, strategy);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, strategy: StrategyFn) {
        self.entries.insert(name.into(), strategy);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up a strategy. Unknown names are a configuration error.
    pub fn get(&self, name: &str) -> Result<StrategyFn> {
        self.entries.get(name).copied().ok_or_else(|| {
            SegmentationError::Configuration(format!("unknown strategy '{}'", name))
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of `over` replace same-named entries of `self`.
    pub fn merged_with(&self, over: &StrategyTable) -> StrategyTable {
        let mut entries = self.entries.clone();
        entries.extend(over.entries.iter().map(|(k, v)| (k.clone(), *v)));
        StrategyTable { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &OperationData) -> Result<StrategyOutcome> {
        Ok(StrategyOutcome::default())
    }

    fn one(_: &OperationData) -> Result<StrategyOutcome> {
        Ok(StrategyOutcome { modified_voxels: 1 })
    }

    #[test]
    fn test_unknown_strategy_is_configuration_error() {
        let table = StrategyTable::new().with(FILL_INSIDE, noop);
        assert!(table.get(FILL_INSIDE).is_ok());
        let err = table.get("PAINT").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_merge_prefers_override() {
        let base = StrategyTable::new().with(FILL_INSIDE, noop).with(ERASE_INSIDE, noop);
        let over = StrategyTable::new().with(FILL_INSIDE, one);
        let merged = base.merged_with(&over);
        assert_eq!(merged.names().collect::<Vec<_>>(), vec![ERASE_INSIDE, FILL_INSIDE]);
        assert!(std::ptr::fn_addr_eq(
            merged.get(FILL_INSIDE).unwrap(),
            one as StrategyFn
        ));
    }
}
