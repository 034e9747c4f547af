//! Gesture lifecycle of the editing tools.
//!
//! ```text
//! Idle --down--> Drawing --drag--> Drawing --up--> Committing --> Idle
//!                   |
//!                   +--cancel--> Idle
//! ```
//!
//! A gesture only enters `Drawing` once every precondition has been checked;
//! a failed start leaves no session behind. Once `Committing` has begun the
//! commit always runs to completion and the machine ends in `Idle`, whether
//! or not the strategy succeeded.

use crate::error::{Result, SegmentationError};
use crate::input::EventPoints;
use crate::render_bus::RenderTriggerBus;
use crate::state::{
    RepresentationType, Rgba, SegmentationStateStore, ToolGroupRepresentation,
};
use crate::tools::strategy::{OperationData, StrategyOutcome};
use crate::tools::{ToolConfiguration, target};
use crate::viewport::{View, ViewKind};
use crate::volume::VolumeCache;
use glam::DVec3;
use kurbo::{Circle, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Canvas outline of a draft, for the host's overlay renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftOutline {
    Circle(Circle),
    Polygon(Vec<Point>),
}

/// Receiver of draft overlays.
pub trait DrawingSink {
    fn draw_outline(&mut self, annotation_uid: &str, outline: &DraftOutline, color: peniko::Color);
}

/// Geometry policy of a drawing tool.
pub trait DraftShape {
    /// World-space handle points for a drag from `anchor` to `current`,
    /// both in canvas pixels.
    fn handle_points(&self, anchor: Point, current: Point, view: &dyn View) -> Vec<DVec3>;

    /// Canvas outline of the given handle points.
    fn outline(&self, handle_points: &[DVec3], view: &dyn View) -> Option<DraftOutline>;
}

/// Circle centred on the anchor, through the current pointer position.
///
/// Handle points are `[bottom, top, left, right]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleDraft;

impl CircleDraft {
    /// Canvas positions of the four handles.
    pub fn canvas_handles(anchor: Point, current: Point) -> [Point; 4] {
        let radius = (current - anchor).hypot();
        [
            anchor + Vec2::new(0.0, radius),
            anchor - Vec2::new(0.0, radius),
            anchor - Vec2::new(radius, 0.0),
            anchor + Vec2::new(radius, 0.0),
        ]
    }
}

impl DraftShape for CircleDraft {
    fn handle_points(&self, anchor: Point, current: Point, view: &dyn View) -> Vec<DVec3> {
        Self::canvas_handles(anchor, current)
            .into_iter()
            .map(|p| view.canvas_to_world(p))
            .collect()
    }

    fn outline(&self, handle_points: &[DVec3], view: &dyn View) -> Option<DraftOutline> {
        let [bottom, top, ..] = handle_points else {
            return None;
        };
        let bottom = view.world_to_canvas(*bottom);
        let top = view.world_to_canvas(*top);
        let center = Point::new(
            ((bottom.x + top.x) / 2.0).floor(),
            ((bottom.y + top.y) / 2.0).floor(),
        );
        let radius = (bottom.y - center.y).abs();
        Some(DraftOutline::Circle(Circle::new(center, radius)))
    }
}

/// Axis-aligned canvas rectangle spanned by the anchor and the pointer.
///
/// Handle points are `[top_left, top_right, bottom_left, bottom_right]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectangleDraft;

impl DraftShape for RectangleDraft {
    fn handle_points(&self, anchor: Point, current: Point, view: &dyn View) -> Vec<DVec3> {
        let r = Rect::from_points(anchor, current);
        [
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x0, r.y1),
            Point::new(r.x1, r.y1),
        ]
        .into_iter()
        .map(|p| view.canvas_to_world(p))
        .collect()
    }

    fn outline(&self, handle_points: &[DVec3], view: &dyn View) -> Option<DraftOutline> {
        let [tl, tr, bl, br] = handle_points else {
            return None;
        };
        Some(DraftOutline::Polygon(
            [tl, tr, br, bl]
                .into_iter()
                .map(|p| view.world_to_canvas(*p))
                .collect(),
        ))
    }
}

/// Which edit sessions exclude each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionScope {
    /// One session per representation. Representations of the same
    /// segmentation in different groups may be edited concurrently.
    #[default]
    Representation,
    /// One session per segmentation, across all its representations.
    Segmentation,
}

/// Key of a held edit lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Representation(String),
    Segmentation(String),
}

/// Mutual exclusion between edit sessions.
#[derive(Debug, Default)]
pub struct EditLocks {
    scope: ExclusionScope,
    /// Lock key to the annotation uid of the holding session.
    held: HashMap<LockKey, String>,
}

impl EditLocks {
    pub fn new(scope: ExclusionScope) -> Self {
        Self {
            scope,
            held: HashMap::new(),
        }
    }

    pub fn scope(&self) -> ExclusionScope {
        self.scope
    }

    fn key_for(&self, representation: &ToolGroupRepresentation) -> LockKey {
        match self.scope {
            ExclusionScope::Representation => {
                LockKey::Representation(representation.segmentation_representation_uid.clone())
            }
            ExclusionScope::Segmentation => {
                LockKey::Segmentation(representation.segmentation_id.clone())
            }
        }
    }

    /// Take the lock for a representation on behalf of a session.
    pub fn acquire(&mut self, representation: &ToolGroupRepresentation, owner: &str) -> Result<LockKey> {
        let key = self.key_for(representation);
        if let Some(holder) = self.held.get(&key) {
            return Err(SegmentationError::State(format!(
                "{:?} is already being edited by session '{}'",
                key, holder
            )));
        }
        self.held.insert(key.clone(), owner.to_string());
        Ok(key)
    }

    pub fn release(&mut self, key: &LockKey) {
        self.held.remove(key);
    }

    pub fn is_locked(&self, representation: &ToolGroupRepresentation) -> bool {
        self.held.contains_key(&self.key_for(representation))
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

/// Draft geometry shown while a gesture is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftAnnotation {
    pub annotation_uid: String,
    pub tool_name: String,
    pub handle_points: Vec<DVec3>,
    pub view_plane_normal: DVec3,
    pub view_up: DVec3,
    pub frame_of_reference_uid: Option<String>,
    /// What the tool targets in the view, if it resolves.
    pub target_id: Option<String>,
    pub segment_color: Option<Rgba>,
}

/// Everything known about one in-flight gesture.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub annotation: DraftAnnotation,
    pub tool_group_id: String,
    pub segmentation_id: String,
    pub segmentation_representation_uid: String,
    /// Label volume the commit writes into.
    pub volume_id: String,
    pub segment_index: u8,
    pub segments_locked: BTreeSet<u8>,
    /// View the gesture started in.
    pub viewport_id: String,
    pub view_ids_to_render: Vec<String>,
    /// Canvas position of the pointer-down.
    pub anchor: Point,
    pub current: Point,
    pub has_moved: bool,
    pub new_annotation: bool,
    lock: LockKey,
}

/// Gesture state.
#[derive(Debug, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Drawing(Box<EditSession>),
    Committing,
}

/// How a commit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// New shape that never moved; nothing was applied.
    Discarded { annotation_uid: String },
    Applied {
        annotation_uid: String,
        outcome: StrategyOutcome,
    },
}

/// Collaborators a gesture step needs.
pub struct GestureContext<'a> {
    pub store: &'a mut SegmentationStateStore,
    pub volumes: &'a dyn VolumeCache,
    /// View the event came from.
    pub view: &'a dyn View,
    pub tool_group_id: &'a str,
    pub render_bus: &'a mut RenderTriggerBus,
    pub locks: &'a mut EditLocks,
}

/// Per-tool gesture state machine.
#[derive(Debug, Default)]
pub struct InteractionStateMachine {
    state: GestureState,
}

impl InteractionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, GestureState::Drawing(_))
    }

    /// The in-flight session, while drawing.
    pub fn session(&self) -> Option<&EditSession> {
        match &self.state {
            GestureState::Drawing(session) => Some(session),
            _ => None,
        }
    }

    /// `Idle -> Drawing` on primary-button down.
    pub fn begin(
        &mut self,
        ctx: &mut GestureContext<'_>,
        tool_name: &str,
        shape: &dyn DraftShape,
        configuration: &ToolConfiguration,
        points: &EventPoints,
    ) -> Result<()> {
        if !matches!(self.state, GestureState::Idle) {
            return Err(SegmentationError::State(format!(
                "tool '{}' already has a gesture in progress",
                tool_name
            )));
        }

        let representation = ctx
            .store
            .active_segmentation_representation(ctx.tool_group_id)
            .cloned()
            .ok_or_else(|| SegmentationError::NoActiveSegmentation {
                tool_group_id: ctx.tool_group_id.to_string(),
            })?;
        if representation.representation_type != RepresentationType::Labelmap {
            return Err(SegmentationError::NotImplemented(format!(
                "{} cannot edit {} representations",
                tool_name, representation.representation_type
            )));
        }
        let segmentation = ctx
            .store
            .segmentation(&representation.segmentation_id)
            .ok_or_else(|| {
                SegmentationError::unknown("segmentation", &representation.segmentation_id)
            })?;
        let volume_id = segmentation
            .labelmap_volume_id()
            .ok_or_else(|| {
                SegmentationError::InvalidInput(format!(
                    "segmentation '{}' has no labelmap data",
                    segmentation.segmentation_id
                ))
            })?
            .to_string();
        if ctx.volumes.get_volume(&volume_id).is_none() {
            return Err(SegmentationError::unknown("volume", volume_id));
        }
        let segment_index = segmentation.active_segment_index;
        let segments_locked = segmentation.segments_locked.clone();
        let segment_color = ctx.store.color_for_segment_index(
            ctx.tool_group_id,
            &representation.segmentation_representation_uid,
            segment_index,
        );

        let annotation_uid = Uuid::new_v4().to_string();
        let lock = ctx.locks.acquire(&representation, &annotation_uid)?;

        let camera = ctx.view.camera();
        let annotation = DraftAnnotation {
            annotation_uid,
            tool_name: tool_name.to_string(),
            handle_points: shape.handle_points(points.canvas, points.canvas, ctx.view),
            view_plane_normal: camera.view_plane_normal,
            view_up: camera.view_up,
            frame_of_reference_uid: ctx.view.frame_of_reference_uid().map(str::to_string),
            target_id: target::target_id(ctx.view, configuration)
                .ok()
                .map(|t| t.to_string()),
            segment_color,
        };
        let session = EditSession {
            annotation,
            tool_group_id: ctx.tool_group_id.to_string(),
            segmentation_id: representation.segmentation_id,
            segmentation_representation_uid: representation.segmentation_representation_uid,
            volume_id,
            segment_index,
            segments_locked,
            viewport_id: ctx.view.id().to_string(),
            view_ids_to_render: vec![ctx.view.id().to_string()],
            anchor: points.canvas,
            current: points.canvas,
            has_moved: false,
            new_annotation: true,
            lock,
        };

        log::debug!(
            "{} started session '{}' on segmentation '{}'",
            tool_name,
            session.annotation.annotation_uid,
            session.segmentation_id
        );
        ctx.render_bus.request(session.view_ids_to_render.iter().cloned());
        self.state = GestureState::Drawing(Box::new(session));
        Ok(())
    }

    /// `Drawing -> Drawing` on pointer drag. Returns `false` for drags from
    /// a view other than the one the gesture started in.
    pub fn drag(
        &mut self,
        ctx: &mut GestureContext<'_>,
        shape: &dyn DraftShape,
        points: &EventPoints,
    ) -> Result<bool> {
        let GestureState::Drawing(session) = &mut self.state else {
            return Err(SegmentationError::State(
                "drag without an edit session in progress".to_string(),
            ));
        };
        if ctx.view.id() != session.viewport_id {
            return Ok(false);
        }

        session.current = points.canvas;
        session.annotation.handle_points = shape.handle_points(session.anchor, points.canvas, ctx.view);
        if points.canvas != session.anchor {
            session.has_moved = true;
        }
        ctx.render_bus.request(session.view_ids_to_render.iter().cloned());
        Ok(true)
    }

    /// `Drawing -> Committing -> Idle` on pointer up or confirm click.
    ///
    /// `apply` runs the edit; its error is returned after the session has
    /// been discarded.
    pub fn commit(
        &mut self,
        ctx: &mut GestureContext<'_>,
        configuration: &ToolConfiguration,
        apply: impl FnOnce(&OperationData) -> Result<StrategyOutcome>,
    ) -> Result<CommitOutcome> {
        let session = match std::mem::replace(&mut self.state, GestureState::Committing) {
            GestureState::Drawing(session) => session,
            other => {
                self.state = other;
                return Err(SegmentationError::State(
                    "commit without an edit session in progress".to_string(),
                ));
            }
        };

        let result = Self::run_commit(ctx, configuration, &session, apply);

        ctx.locks.release(&session.lock);
        ctx.render_bus.request(session.view_ids_to_render.iter().cloned());
        self.state = GestureState::Idle;
        result
    }

    fn run_commit(
        ctx: &mut GestureContext<'_>,
        configuration: &ToolConfiguration,
        session: &EditSession,
        apply: impl FnOnce(&OperationData) -> Result<StrategyOutcome>,
    ) -> Result<CommitOutcome> {
        let annotation_uid = session.annotation.annotation_uid.clone();
        if session.new_annotation && !session.has_moved {
            log::debug!("Discarding session '{}' without movement", annotation_uid);
            return Ok(CommitOutcome::Discarded { annotation_uid });
        }
        if ctx.view.kind() == ViewKind::Stack {
            return Err(SegmentationError::NotImplemented(format!(
                "{} on stack viewports",
                session.annotation.tool_name
            )));
        }

        let volume = ctx
            .volumes
            .get_volume(&session.volume_id)
            .ok_or_else(|| SegmentationError::unknown("volume", &session.volume_id))?;
        let camera = ctx.view.camera();
        let operation = OperationData {
            points: session.annotation.handle_points.clone(),
            volume,
            segmentation_id: session.segmentation_id.clone(),
            segment_index: session.segment_index,
            segments_locked: session.segments_locked.clone(),
            view_plane_normal: camera.view_plane_normal,
            view_up: camera.view_up,
            strategy_options: configuration.strategy_options.clone(),
        };

        let outcome = apply(&operation)?;
        ctx.store
            .mark_segmentation_data_modified(&session.segmentation_id)?;
        log::info!(
            "Session '{}' modified {} voxel(s) of '{}'",
            annotation_uid,
            outcome.modified_voxels,
            session.segmentation_id
        );
        Ok(CommitOutcome::Applied {
            annotation_uid,
            outcome,
        })
    }

    /// Abandon the in-flight gesture. Only effective while drawing; returns
    /// the uid of the discarded draft.
    pub fn cancel(&mut self, locks: &mut EditLocks, render_bus: &mut RenderTriggerBus) -> Option<String> {
        if !self.is_drawing() {
            return None;
        }
        let GestureState::Drawing(session) = std::mem::take(&mut self.state) else {
            return None;
        };
        locks.release(&session.lock);
        render_bus.request(session.view_ids_to_render.iter().cloned());
        log::debug!("Cancelled session '{}'", session.annotation.annotation_uid);
        Some(session.annotation.annotation_uid)
    }

    /// Draw the draft overlay of the in-flight session into `view`.
    pub fn render(&self, shape: &dyn DraftShape, view: &dyn View, sink: &mut dyn DrawingSink) {
        let Some(session) = self.session() else {
            return;
        };
        if !session.view_ids_to_render.iter().any(|id| id == view.id()) {
            return;
        }
        let Some(outline) = shape.outline(&session.annotation.handle_points, view) else {
            return;
        };
        let color = session
            .annotation
            .segment_color
            .map(peniko::Color::from)
            .unwrap_or(peniko::Color::WHITE);
        sink.draw_outline(&session.annotation.annotation_uid, &outline, color);
    }
}
