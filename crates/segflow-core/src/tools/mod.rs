//! Editing tools: configuration, strategy dispatch and tool groups.

pub mod fill;
mod group;
mod scissors;
pub mod strategy;
pub mod target;

pub use group::{ToolGroup, ToolGroupManager, ToolMode};
pub use scissors::{CircleScissorsTool, RectangleScissorsTool, ScissorsShape, ScissorsTool};
pub use strategy::{
    ERASE_INSIDE, FILL_INSIDE, OperationData, StrategyFn, StrategyOutcome, StrategyTable,
};
pub use target::{TargetId, target_id};

use crate::config::{Merge, leaf};
use crate::error::{Result, SegmentationError};
use crate::input::EventPoints;
use crate::interaction::{CommitOutcome, DrawingSink, EditLocks, EditSession, GestureContext};
use crate::render_bus::RenderTriggerBus;
use crate::viewport::View;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tool configuration. Built by merging caller values onto a tool default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolConfiguration {
    #[serde(skip)]
    pub strategies: StrategyTable,
    pub default_strategy: Option<String>,
    pub active_strategy: Option<String>,
    /// Volume the tool targets in volume views; first actor when unset.
    pub volume_id: Option<String>,
    pub prevent_handle_outside_image: Option<bool>,
    pub strategy_options: BTreeMap<String, serde_json::Value>,
}

impl Merge for ToolConfiguration {
    fn merge(&self, over: &Self) -> Self {
        let mut strategy_options = self.strategy_options.clone();
        for (key, value) in &over.strategy_options {
            match strategy_options.get_mut(key) {
                Some(base) => merge_option(base, value),
                None => {
                    strategy_options.insert(key.clone(), value.clone());
                }
            }
        }
        Self {
            strategies: self.strategies.merged_with(&over.strategies),
            default_strategy: leaf(&self.default_strategy, &over.default_strategy),
            active_strategy: leaf(&self.active_strategy, &over.active_strategy),
            volume_id: leaf(&self.volume_id, &over.volume_id),
            prevent_handle_outside_image: leaf(
                &self.prevent_handle_outside_image,
                &over.prevent_handle_outside_image,
            ),
            strategy_options,
        }
    }
}

/// Merge `over` into `base`. Objects merge per key, recursively; any other
/// value, arrays included, replaces the base value.
fn merge_option(base: &mut serde_json::Value, over: &serde_json::Value) {
    match (base, over) {
        (serde_json::Value::Object(base), serde_json::Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(key) {
                    Some(existing) => merge_option(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, over) => *base = over.clone(),
    }
}

impl ToolConfiguration {
    /// Check that named strategies exist in the table.
    pub fn validate(&self) -> Result<()> {
        for name in [&self.default_strategy, &self.active_strategy]
            .into_iter()
            .flatten()
        {
            if !self.strategies.contains(name) {
                return Err(SegmentationError::Configuration(format!(
                    "strategy '{}' is not in the strategy table",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Select the active strategy. Unknown names are rejected.
    pub fn set_active_strategy(&mut self, name: &str) -> Result<()> {
        self.strategies.get(name)?;
        self.active_strategy = Some(name.to_string());
        Ok(())
    }

    pub fn active_strategy_fn(&self) -> Result<StrategyFn> {
        let name = self
            .active_strategy
            .as_deref()
            .ok_or_else(|| SegmentationError::Configuration("no active strategy".to_string()))?;
        self.strategies.get(name)
    }

    pub fn apply_active_strategy(&self, operation: &OperationData) -> Result<StrategyOutcome> {
        (self.active_strategy_fn()?)(operation)
    }
}

/// An editing tool.
///
/// Anything with a configuration, gesture handlers and a draft renderer is a
/// tool; strategy selection and dispatch are provided on top of the
/// configuration.
pub trait Tool {
    fn name(&self) -> &str;

    fn configuration(&self) -> &ToolConfiguration;

    fn configuration_mut(&mut self) -> &mut ToolConfiguration;

    /// Primary-button down.
    fn pointer_down(&mut self, ctx: &mut GestureContext<'_>, points: &EventPoints) -> Result<()>;

    /// Pointer drag while the button is held. Returns whether the draft changed.
    fn pointer_drag(&mut self, ctx: &mut GestureContext<'_>, points: &EventPoints) -> Result<bool>;

    /// Pointer up or confirm click.
    fn pointer_up(&mut self, ctx: &mut GestureContext<'_>) -> Result<CommitOutcome>;

    /// Abandon the in-flight gesture, returning the discarded draft's uid.
    fn cancel(&mut self, locks: &mut EditLocks, render_bus: &mut RenderTriggerBus) -> Option<String>;

    /// The in-flight session, while drawing.
    fn edit_session(&self) -> Option<&EditSession>;

    /// Draw the draft overlay for `view`.
    fn render(&self, view: &dyn View, sink: &mut dyn DrawingSink);

    fn is_drawing(&self) -> bool {
        self.edit_session().is_some()
    }

    fn strategies(&self) -> &StrategyTable {
        &self.configuration().strategies
    }

    /// Merge `over` onto the current configuration.
    fn set_configuration(&mut self, over: &ToolConfiguration) -> Result<()> {
        let merged = self.configuration().merge(over);
        merged.validate()?;
        *self.configuration_mut() = merged;
        Ok(())
    }

    fn set_active_strategy(&mut self, name: &str) -> Result<()> {
        self.configuration_mut().set_active_strategy(name)
    }

    fn apply_active_strategy(&self, operation: &OperationData) -> Result<StrategyOutcome> {
        self.configuration().apply_active_strategy(operation)
    }
}
