//! Core application state and lifecycle.

use crate::script::{ScriptInput, ScriptStep, drag_gesture};
use crate::shortcuts::{ShortcutAction, ShortcutRegistry};
use kurbo::Point;
use segflow_core::events::Subscription;
use segflow_core::interaction::DraftOutline;
use segflow_core::volume::{VolumeMetadata, load_into_cache};
use segflow_core::{
    Camera, CircleScissorsTool, CommitOutcome, DrawingSink, ExclusionScope, ImageVolume,
    InMemoryVolumeCache, InMemoryVolumeLoader, OrthographicView, PointerOutcome,
    RectangleScissorsTool, RepresentationInput, RepresentationType, SegmentationError,
    SegmentationInput, SegmentationRepresentationConfig, SegmentationSession,
    ToolConfiguration, VolumeCache, VolumeInput, VolumeLoader,
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

/// Errors raised by the application shell.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Segmentation(#[from] SegmentationError),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub title: String,
    pub image_volume_id: String,
    pub labelmap_volume_id: String,
    pub dimensions: [usize; 3],
    pub frame_of_reference_uid: String,
    pub segmentation_id: String,
    pub tool_group_id: String,
    pub viewport_id: String,
    pub exclusion_scope: ExclusionScope,
    /// Initial tool; one of the registered scissors.
    pub tool: String,
    pub global_config: Option<SegmentationRepresentationConfig>,
    pub tool_group_config: Option<SegmentationRepresentationConfig>,
    pub script: Vec<ScriptStep>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Segflow".to_string(),
            image_volume_id: "ct".to_string(),
            labelmap_volume_id: "ct-labels".to_string(),
            dimensions: [256, 256, 1],
            frame_of_reference_uid: "FOR-1".to_string(),
            segmentation_id: "seg1".to_string(),
            tool_group_id: "group1".to_string(),
            viewport_id: "axial".to_string(),
            exclusion_scope: ExclusionScope::default(),
            tool: "CircleScissor".to_string(),
            global_config: None,
            tool_group_config: None,
            script: drag_gesture(Point::new(100.0, 100.0), Point::new(130.0, 100.0), 6),
        }
    }
}

impl AppConfig {
    /// Load a configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// What a replayed script did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub commits: usize,
    pub discarded: usize,
    pub cancelled: usize,
    pub modified_voxels: usize,
    pub redraws: usize,
    pub events: usize,
}

struct LogOutlines;

impl DrawingSink for LogOutlines {
    fn draw_outline(&mut self, uid: &str, outline: &DraftOutline, color: peniko::Color) {
        let rgba = color.to_rgba8();
        match outline {
            DraftOutline::Circle(c) => log::debug!(
                "Draft {}: circle at ({:.1}, {:.1}) r={:.1} #{:02x}{:02x}{:02x}",
                uid,
                c.center.x,
                c.center.y,
                c.radius,
                rgba.r,
                rgba.g,
                rgba.b
            ),
            DraftOutline::Polygon(points) => {
                log::debug!("Draft {}: polygon with {} points", uid, points.len())
            }
        }
    }
}

/// Main application struct.
pub struct App {
    config: AppConfig,
    session: SegmentationSession,
    summary: RunSummary,
    event_count: Rc<Cell<usize>>,
    _subscriptions: Vec<Subscription>,
}

impl App {
    /// Open a session: load the image, attach it to the view, and set up
    /// the segmentation and its tools.
    pub async fn open(config: AppConfig) -> Result<Self, AppError> {
        let cache = Rc::new(InMemoryVolumeCache::new());
        let loader = Rc::new(InMemoryVolumeLoader::new());
        for id in [&config.image_volume_id, &config.labelmap_volume_id] {
            loader.register(ImageVolume::labelmap(
                id.clone(),
                config.dimensions,
                VolumeMetadata::identity(config.frame_of_reference_uid.clone()),
            ));
        }
        let cache_dyn: Rc<dyn VolumeCache> = cache;
        let loader_dyn: Rc<dyn VolumeLoader> = loader;

        load_into_cache(
            Rc::clone(&loader_dyn),
            Rc::clone(&cache_dyn),
            config.image_volume_id.clone(),
        )
        .await?;

        let mut view = OrthographicView::volume(config.viewport_id.clone(), Camera::axial());
        view.set_volumes(&[VolumeInput::new(config.image_volume_id.clone())], cache_dyn.as_ref())?;

        let mut session = SegmentationSession::new(cache_dyn)
            .with_loader(loader_dyn)
            .with_exclusion_scope(config.exclusion_scope);

        let event_count = Rc::new(Cell::new(0));
        let subscriptions = Self::subscribe(&session, &event_count);

        session.add_view(Box::new(view))?;
        session.create_tool_group(&config.tool_group_id)?;
        session.add_viewport_to_tool_group(&config.tool_group_id, &config.viewport_id)?;
        session.add_tool(
            &config.tool_group_id,
            Box::new(CircleScissorsTool::new(ToolConfiguration::default())?),
        )?;
        session.add_tool(
            &config.tool_group_id,
            Box::new(RectangleScissorsTool::new(ToolConfiguration::default())?),
        )?;
        session.activate_tool(&config.tool_group_id, &config.tool)?;

        session.add_segmentation(
            SegmentationInput::labelmap(
                config.segmentation_id.clone(),
                config.labelmap_volume_id.clone(),
            ),
            false,
        )?;
        session.load_segmentation_data(&config.segmentation_id)?.await?;

        if let Some(global) = &config.global_config {
            session.set_global_config(global.clone(), false);
        }
        if let Some(layer) = &config.tool_group_config {
            session.set_tool_group_specific_config(&config.tool_group_id, layer.clone(), false);
        }
        session.add_segmentation_representation(
            &config.tool_group_id,
            RepresentationInput::new(config.segmentation_id.clone(), RepresentationType::Labelmap),
            false,
        )?;

        log::info!(
            "{}: segmentation '{}' on '{}' ready",
            config.title,
            config.segmentation_id,
            config.viewport_id
        );
        Ok(Self {
            config,
            session,
            summary: RunSummary::default(),
            event_count,
            _subscriptions: subscriptions,
        })
    }

    fn subscribe(session: &SegmentationSession, count: &Rc<Cell<usize>>) -> Vec<Subscription> {
        let notifier = session.notifier();
        let (c1, c2, c3) = (Rc::clone(count), Rc::clone(count), Rc::clone(count));
        vec![
            notifier.segmentation().subscribe(move |e| {
                c1.set(c1.get() + 1);
                log::info!("Segmentation {:?}: {}", e.kind, e.segmentation_id);
            }),
            notifier.representation().subscribe(move |e| {
                c2.set(c2.get() + 1);
                log::info!(
                    "Representation {:?}: {} in {}",
                    e.kind,
                    e.segmentation_representation_uid,
                    e.tool_group_id
                );
            }),
            notifier.config().subscribe(move |e| {
                c3.set(c3.get() + 1);
                log::info!("Config {:?}: {:?}", e.kind, e.scope);
            }),
        ]
    }

    pub fn session(&self) -> &SegmentationSession {
        &self.session
    }

    /// Replay the configured script.
    pub fn run_script(&mut self) -> Result<RunSummary, AppError> {
        let baseline = self.event_count.get();
        let script = self.config.script.clone();
        for step in &script {
            self.step(step)?;
            self.redraw();
        }
        self.summary.events = self.event_count.get() - baseline;
        Ok(self.summary.clone())
    }

    fn step(&mut self, step: &ScriptStep) -> Result<(), AppError> {
        let view = self
            .session
            .view(&self.config.viewport_id)
            .ok_or_else(|| SegmentationError::UnknownId {
                kind: "viewport",
                id: self.config.viewport_id.clone(),
            })?;
        match step.to_input(view) {
            ScriptInput::Pointer(event) => match self.session.handle_pointer_event(&event) {
                Ok(PointerOutcome::Committed(CommitOutcome::Applied { outcome, .. })) => {
                    self.summary.commits += 1;
                    self.summary.modified_voxels += outcome.modified_voxels;
                }
                Ok(PointerOutcome::Committed(CommitOutcome::Discarded { .. })) => {
                    self.summary.discarded += 1;
                }
                Ok(_) => {}
                // A rejected gesture leaves no draft behind; keep replaying.
                Err(e @ SegmentationError::NoActiveSegmentation { .. }) => log::warn!("{}", e),
                Err(e) => return Err(e.into()),
            },
            ScriptInput::Key { event, shift } => {
                if let Some(action) = ShortcutRegistry::action_for(event_key(&event), shift) {
                    self.apply_shortcut(action)?;
                }
            }
        }
        Ok(())
    }

    fn apply_shortcut(&mut self, action: ShortcutAction) -> Result<(), AppError> {
        let group = self.config.tool_group_id.clone();
        let seg = self.config.segmentation_id.clone();
        match action {
            ShortcutAction::ActivateTool(name) => self.session.activate_tool(&group, name)?,
            ShortcutAction::SetStrategy(strategy) => {
                let Some(active) = self
                    .session
                    .tool_group(&group)
                    .and_then(|g| g.active_tool_name())
                    .map(str::to_string)
                else {
                    return Ok(());
                };
                self.session
                    .tool_mut(&group, &active)?
                    .set_active_strategy(strategy)?;
            }
            ShortcutAction::NextSegment | ShortcutAction::PreviousSegment => {
                let current = self.active_segment_index()?;
                let next = if action == ShortcutAction::NextSegment {
                    current.saturating_add(1)
                } else {
                    current.saturating_sub(1).max(1)
                };
                self.session.set_active_segment_index(&seg, next, false)?;
            }
            ShortcutAction::ToggleSegmentLock => {
                let index = self.active_segment_index()?;
                let locked = self
                    .session
                    .segmentation(&seg)
                    .is_some_and(|s| s.segments_locked.contains(&index));
                self.session.set_segment_locked(&seg, index, !locked, false)?;
            }
            ShortcutAction::CancelGesture => {
                if self.session.cancel_gesture(&group).is_some() {
                    self.summary.cancelled += 1;
                }
            }
        }
        Ok(())
    }

    fn active_segment_index(&self) -> Result<u8, AppError> {
        self.session
            .segmentation(&self.config.segmentation_id)
            .map(|s| s.active_segment_index)
            .ok_or_else(|| {
                SegmentationError::UnknownId {
                    kind: "segmentation",
                    id: self.config.segmentation_id.clone(),
                }
                .into()
            })
    }

    fn redraw(&mut self) {
        let mut views = Vec::new();
        self.session
            .flush_renders(&mut |ids: &[String]| views.extend_from_slice(ids));
        for view_id in &views {
            log::trace!("Redraw {}", view_id);
            self.session.render_drafts(view_id, &mut LogOutlines);
        }
        self.summary.redraws += views.len();
    }

    /// Open a session and replay its script.
    pub async fn run(config: AppConfig) -> Result<RunSummary, AppError> {
        let mut app = Self::open(config).await?;
        app.run_script()
    }
}

fn event_key(event: &segflow_core::KeyEvent) -> &str {
    match event {
        segflow_core::KeyEvent::Pressed { key, .. } | segflow_core::KeyEvent::Released { key, .. } => {
            key
        }
    }
}
