//! Scissors tools: draw a shape on a slice, then fill or erase inside it.

use super::fill;
use super::strategy::{ERASE_INSIDE, FILL_INSIDE, StrategyTable};
use super::{Tool, ToolConfiguration};
use crate::config::Merge;
use crate::error::Result;
use crate::input::EventPoints;
use crate::interaction::{
    CircleDraft, CommitOutcome, DraftShape, DrawingSink, EditLocks, EditSession, GestureContext,
    InteractionStateMachine, RectangleDraft,
};
use crate::render_bus::RenderTriggerBus;
use crate::viewport::View;

/// Shape policy plus the strategies that understand its handle points.
pub trait ScissorsShape: DraftShape + Default {
    const TOOL_NAME: &'static str;

    fn strategies() -> StrategyTable;
}

impl ScissorsShape for CircleDraft {
    const TOOL_NAME: &'static str = "CircleScissor";

    fn strategies() -> StrategyTable {
        StrategyTable::new()
            .with(FILL_INSIDE, fill::fill_inside_circle)
            .with(ERASE_INSIDE, fill::erase_inside_circle)
    }
}

impl ScissorsShape for RectangleDraft {
    const TOOL_NAME: &'static str = "RectangleScissor";

    fn strategies() -> StrategyTable {
        StrategyTable::new()
            .with(FILL_INSIDE, fill::fill_inside_rectangle)
            .with(ERASE_INSIDE, fill::erase_inside_rectangle)
    }
}

/// A labelmap editing tool parameterised by its draft shape.
#[derive(Debug)]
pub struct ScissorsTool<S: ScissorsShape> {
    shape: S,
    configuration: ToolConfiguration,
    machine: InteractionStateMachine,
}

pub type CircleScissorsTool = ScissorsTool<CircleDraft>;
pub type RectangleScissorsTool = ScissorsTool<RectangleDraft>;

impl<S: ScissorsShape> ScissorsTool<S> {
    /// Tool defaults: both strategies, fill active.
    pub fn default_configuration() -> ToolConfiguration {
        ToolConfiguration {
            strategies: S::strategies(),
            default_strategy: Some(FILL_INSIDE.to_string()),
            active_strategy: Some(FILL_INSIDE.to_string()),
            ..Default::default()
        }
    }

    /// Create the tool, merging `configuration` onto the defaults.
    pub fn new(configuration: ToolConfiguration) -> Result<Self> {
        let mut merged = Self::default_configuration().merge(&configuration);
        if merged.active_strategy.is_none() {
            merged.active_strategy = merged.default_strategy.clone();
        }
        merged.validate()?;
        Ok(Self {
            shape: S::default(),
            configuration: merged,
            machine: InteractionStateMachine::new(),
        })
    }

    pub fn state_machine(&self) -> &InteractionStateMachine {
        &self.machine
    }
}

impl<S: ScissorsShape> Tool for ScissorsTool<S> {
    fn name(&self) -> &str {
        S::TOOL_NAME
    }

    fn configuration(&self) -> &ToolConfiguration {
        &self.configuration
    }

    fn configuration_mut(&mut self) -> &mut ToolConfiguration {
        &mut self.configuration
    }

    fn pointer_down(&mut self, ctx: &mut GestureContext<'_>, points: &EventPoints) -> Result<()> {
        self.machine
            .begin(ctx, S::TOOL_NAME, &self.shape, &self.configuration, points)
    }

    fn pointer_drag(&mut self, ctx: &mut GestureContext<'_>, points: &EventPoints) -> Result<bool> {
        self.machine.drag(ctx, &self.shape, points)
    }

    fn pointer_up(&mut self, ctx: &mut GestureContext<'_>) -> Result<CommitOutcome> {
        let configuration = &self.configuration;
        self.machine
            .commit(ctx, configuration, |op| configuration.apply_active_strategy(op))
    }

    fn cancel(&mut self, locks: &mut EditLocks, render_bus: &mut RenderTriggerBus) -> Option<String> {
        self.machine.cancel(locks, render_bus)
    }

    fn edit_session(&self) -> Option<&EditSession> {
        self.machine.session()
    }

    fn render(&self, view: &dyn View, sink: &mut dyn DrawingSink) {
        self.machine.render(&self.shape, view, sink);
    }
}
