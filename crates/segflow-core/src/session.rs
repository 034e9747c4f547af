//! The per-viewer editing session.
//!
//! A [`SegmentationSession`] owns everything one viewer needs: the state
//! store, tool groups, registered views, the event notifier, the render bus
//! and the edit locks. Sessions share nothing, so several can coexist.
//!
//! Every mutating call takes a `suppress_events` flag. Suppressed changes are
//! neither published nor turned into redraw requests.

use crate::config::{self, ResolvedConfig, SegmentationRepresentationConfig};
use crate::error::{Result, SegmentationError};
use crate::events::{ConfigScope, EventNotifier, StateChange};
use crate::input::{KeyEvent, MouseButton, PointerEvent};
use crate::interaction::{
    CommitOutcome, DrawingSink, EditLocks, EditSession, ExclusionScope, GestureContext,
};
use crate::render_bus::{RenderSink, RenderTriggerBus};
use crate::state::{
    ColorLut, RepresentationInput, RepresentationType, Segmentation, SegmentationInput,
    SegmentationStateStore, ToolGroupRepresentation,
};
use crate::tools::{Tool, ToolGroup, ToolGroupManager};
use crate::viewport::View;
use crate::volume::{BoxFuture, SharedVolume, VolumeCache, VolumeLoader, load_into_cache};
use std::collections::BTreeMap;
use std::rc::Rc;

/// What a pointer event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerOutcome {
    /// No tool consumed the event.
    Ignored,
    Started { annotation_uid: String },
    Updated,
    Committed(CommitOutcome),
}

/// One viewer's segmentation editing context.
pub struct SegmentationSession {
    store: SegmentationStateStore,
    tool_groups: ToolGroupManager,
    volumes: Rc<dyn VolumeCache>,
    loader: Option<Rc<dyn VolumeLoader>>,
    views: BTreeMap<String, Box<dyn View>>,
    notifier: EventNotifier,
    render_bus: RenderTriggerBus,
    locks: EditLocks,
}

impl SegmentationSession {
    pub fn new(volumes: Rc<dyn VolumeCache>) -> Self {
        Self {
            store: SegmentationStateStore::new(),
            tool_groups: ToolGroupManager::new(),
            volumes,
            loader: None,
            views: BTreeMap::new(),
            notifier: EventNotifier::new(),
            render_bus: RenderTriggerBus::new(),
            locks: EditLocks::default(),
        }
    }

    pub fn with_loader(mut self, loader: Rc<dyn VolumeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Choose which edit sessions exclude each other. Only allowed while no
    /// gesture is in flight.
    pub fn with_exclusion_scope(mut self, scope: ExclusionScope) -> Self {
        if self.locks.held_count() == 0 {
            self.locks = EditLocks::new(scope);
        }
        self
    }

    pub fn store(&self) -> &SegmentationStateStore {
        &self.store
    }

    pub fn volumes(&self) -> &Rc<dyn VolumeCache> {
        &self.volumes
    }

    /// Subscribe to changes through the per-category channels.
    pub fn notifier(&self) -> &EventNotifier {
        &self.notifier
    }

    pub fn render_bus(&self) -> &RenderTriggerBus {
        &self.render_bus
    }

    pub fn exclusion_scope(&self) -> ExclusionScope {
        self.locks.scope()
    }

    fn publish_changes(&mut self, suppress_events: bool) {
        let changes = self.store.drain_changes();
        if suppress_events {
            if !changes.is_empty() {
                log::trace!("Suppressed {} change(s)", changes.len());
            }
            return;
        }
        for change in &changes {
            let views = self.views_affected_by(change);
            self.render_bus.request(views);
            self.notifier.publish(change);
        }
    }

    fn views_affected_by(&self, change: &StateChange) -> Vec<String> {
        match change {
            StateChange::Segmentation(e) => {
                let groups = self.store.tool_groups_with_segmentation(&e.segmentation_id);
                self.tool_groups
                    .viewports_of(groups.iter().map(String::as_str))
            }
            StateChange::Representation(e) => {
                self.tool_groups.viewports_of([e.tool_group_id.as_str()])
            }
            StateChange::Config(e) => match &e.scope {
                ConfigScope::ToolGroup(group) => self.tool_groups.viewports_of([group.as_str()]),
                ConfigScope::Global | ConfigScope::ColorLut(_) => self
                    .tool_groups
                    .viewports_of(self.tool_groups.tool_groups().map(ToolGroup::id)),
            },
        }
    }

    /// Cancel every in-flight gesture matching `pred`.
    fn cancel_where(&mut self, pred: impl Fn(&EditSession) -> bool) -> Vec<String> {
        let mut cancelled = Vec::new();
        for group in self.tool_groups.tool_groups_mut() {
            for tool in group.tools_mut() {
                if tool.edit_session().is_some_and(&pred) {
                    if let Some(uid) = tool.cancel(&mut self.locks, &mut self.render_bus) {
                        cancelled.push(uid);
                    }
                }
            }
        }
        cancelled
    }

    // --- views and tool groups ---

    pub fn add_view(&mut self, view: Box<dyn View>) -> Result<()> {
        let id = view.id().to_string();
        if self.views.contains_key(&id) {
            return Err(SegmentationError::duplicate("viewport", id));
        }
        self.views.insert(id, view);
        Ok(())
    }

    /// Remove a view, cancelling gestures drawn in it.
    pub fn remove_view(&mut self, view_id: &str) -> Option<Box<dyn View>> {
        let view = self.views.remove(view_id)?;
        self.cancel_where(|s| s.viewport_id == view_id);
        for group in self.tool_groups.tool_groups_mut() {
            group.remove_viewport(view_id);
        }
        Some(view)
    }

    pub fn view(&self, view_id: &str) -> Option<&dyn View> {
        self.views.get(view_id).map(|v| v.as_ref())
    }

    pub fn create_tool_group(&mut self, tool_group_id: &str) -> Result<()> {
        self.tool_groups.create_tool_group(tool_group_id)?;
        Ok(())
    }

    pub fn tool_group(&self, tool_group_id: &str) -> Option<&ToolGroup> {
        self.tool_groups.tool_group(tool_group_id)
    }

    pub fn add_viewport_to_tool_group(&mut self, tool_group_id: &str, view_id: &str) -> Result<()> {
        if !self.views.contains_key(view_id) {
            return Err(SegmentationError::unknown("viewport", view_id));
        }
        self.tool_groups.add_viewport(tool_group_id, view_id)
    }

    fn group_mut(&mut self, tool_group_id: &str) -> Result<&mut ToolGroup> {
        self.tool_groups
            .tool_group_mut(tool_group_id)
            .ok_or_else(|| SegmentationError::unknown("tool group", tool_group_id))
    }

    pub fn add_tool(&mut self, tool_group_id: &str, tool: Box<dyn Tool>) -> Result<()> {
        self.group_mut(tool_group_id)?.add_tool(tool)
    }

    /// Make a tool the one receiving primary-button gestures in a group.
    /// A gesture in flight with another tool of the group is cancelled.
    pub fn activate_tool(&mut self, tool_group_id: &str, tool_name: &str) -> Result<()> {
        let group = self
            .tool_groups
            .tool_group_mut(tool_group_id)
            .ok_or_else(|| SegmentationError::unknown("tool group", tool_group_id))?;
        if group.tool(tool_name).is_none() {
            return Err(SegmentationError::unknown("tool", tool_name));
        }
        for tool in group.tools_mut() {
            if tool.name() != tool_name {
                tool.cancel(&mut self.locks, &mut self.render_bus);
            }
        }
        group.activate_tool(tool_name)
    }

    /// Disable a tool in a group, cancelling its gesture if one is in flight.
    pub fn deactivate_tool(&mut self, tool_group_id: &str, tool_name: &str) -> Result<()> {
        let group = self
            .tool_groups
            .tool_group_mut(tool_group_id)
            .ok_or_else(|| SegmentationError::unknown("tool group", tool_group_id))?;
        let tool = group
            .tool_mut(tool_name)
            .ok_or_else(|| SegmentationError::unknown("tool", tool_name))?;
        tool.cancel(&mut self.locks, &mut self.render_bus);
        group.deactivate_tool(tool_name)
    }

    /// Mutable access to a tool, e.g. to change its active strategy.
    pub fn tool_mut(&mut self, tool_group_id: &str, tool_name: &str) -> Result<&mut (dyn Tool + 'static)> {
        self.group_mut(tool_group_id)?
            .tool_mut(tool_name)
            .ok_or_else(|| SegmentationError::unknown("tool", tool_name))
    }

    // --- segmentations ---

    pub fn add_segmentation(&mut self, input: SegmentationInput, suppress_events: bool) -> Result<()> {
        let result = self.store.add_segmentation(input);
        self.publish_changes(suppress_events);
        result
    }

    /// Remove a segmentation and its representations. Gestures editing it
    /// are cancelled first.
    pub fn remove_segmentation(&mut self, segmentation_id: &str, suppress_events: bool) -> bool {
        if self.store.segmentation(segmentation_id).is_none() {
            return false;
        }
        self.cancel_where(|s| s.segmentation_id == segmentation_id);
        let removed = self.store.remove_segmentation(segmentation_id);
        self.publish_changes(suppress_events);
        removed
    }

    pub fn segmentation(&self, segmentation_id: &str) -> Option<&Segmentation> {
        self.store.segmentation(segmentation_id)
    }

    pub fn segmentations(&self) -> Vec<&Segmentation> {
        self.store.segmentations()
    }

    pub fn set_active_segment_index(
        &mut self,
        segmentation_id: &str,
        index: u8,
        suppress_events: bool,
    ) -> Result<()> {
        let result = self.store.set_active_segment_index(segmentation_id, index);
        self.publish_changes(suppress_events);
        result
    }

    pub fn set_segment_locked(
        &mut self,
        segmentation_id: &str,
        index: u8,
        locked: bool,
        suppress_events: bool,
    ) -> Result<()> {
        let result = self.store.set_segment_locked(segmentation_id, index, locked);
        self.publish_changes(suppress_events);
        result
    }

    /// Load the backing label volume of a segmentation into the cache.
    ///
    /// The returned future owns everything it needs; the session keeps
    /// handling events while it is pending.
    pub fn load_segmentation_data(
        &self,
        segmentation_id: &str,
    ) -> Result<BoxFuture<'static, Result<SharedVolume>>> {
        let segmentation = self
            .store
            .segmentation(segmentation_id)
            .ok_or_else(|| SegmentationError::unknown("segmentation", segmentation_id))?;
        let volume_id = segmentation.labelmap_volume_id().ok_or_else(|| {
            SegmentationError::InvalidInput(format!(
                "segmentation '{}' has no labelmap data to load",
                segmentation_id
            ))
        })?;
        let loader = self
            .loader
            .clone()
            .ok_or_else(|| SegmentationError::Configuration("no volume loader".to_string()))?;
        Ok(Box::pin(load_into_cache(
            loader,
            Rc::clone(&self.volumes),
            volume_id.to_string(),
        )))
    }

    // --- representations ---

    pub fn add_segmentation_representation(
        &mut self,
        tool_group_id: &str,
        input: RepresentationInput,
        suppress_events: bool,
    ) -> Result<String> {
        let result = self.store.add_segmentation_representation(tool_group_id, input);
        self.publish_changes(suppress_events);
        result
    }

    pub fn remove_segmentation_representation(
        &mut self,
        tool_group_id: &str,
        uid: &str,
        suppress_events: bool,
    ) -> bool {
        if self
            .store
            .segmentation_representation_by_uid(tool_group_id, uid)
            .is_none()
        {
            return false;
        }
        self.cancel_where(|s| {
            s.tool_group_id == tool_group_id && s.segmentation_representation_uid == uid
        });
        let removed = self.store.remove_segmentation_representation(tool_group_id, uid);
        self.publish_changes(suppress_events);
        removed
    }

    pub fn segmentation_representations(&self, tool_group_id: &str) -> &[ToolGroupRepresentation] {
        self.store.segmentation_representations(tool_group_id)
    }

    pub fn set_active_segmentation_representation(
        &mut self,
        tool_group_id: &str,
        uid: &str,
        suppress_events: bool,
    ) -> Result<()> {
        let result = self
            .store
            .set_active_segmentation_representation(tool_group_id, uid);
        self.publish_changes(suppress_events);
        result
    }

    pub fn set_representation_visibility(
        &mut self,
        tool_group_id: &str,
        uid: &str,
        visible: bool,
        suppress_events: bool,
    ) -> Result<()> {
        let result = self
            .store
            .set_representation_visibility(tool_group_id, uid, visible);
        self.publish_changes(suppress_events);
        result
    }

    // --- configuration ---

    pub fn global_config(&self) -> &SegmentationRepresentationConfig {
        self.store.global_config()
    }

    pub fn set_global_config(&mut self, config: SegmentationRepresentationConfig, suppress_events: bool) {
        self.store.set_global_config(config);
        self.publish_changes(suppress_events);
    }

    pub fn tool_group_specific_config(
        &self,
        tool_group_id: &str,
    ) -> Option<&SegmentationRepresentationConfig> {
        self.store.tool_group_specific_config(tool_group_id)
    }

    pub fn set_tool_group_specific_config(
        &mut self,
        tool_group_id: &str,
        config: SegmentationRepresentationConfig,
        suppress_events: bool,
    ) {
        self.store.set_tool_group_specific_config(tool_group_id, config);
        self.publish_changes(suppress_events);
    }

    pub fn resolve_config(
        &self,
        representation_type: RepresentationType,
        tool_group_id: &str,
    ) -> ResolvedConfig {
        config::resolve(&self.store, representation_type, tool_group_id)
    }

    pub fn add_color_lut(&mut self, lut: ColorLut, index: u32, suppress_events: bool) -> Rc<ColorLut> {
        let lut = self.store.add_color_lut(lut, index);
        self.publish_changes(suppress_events);
        lut
    }

    pub fn color_lut(&self, index: u32) -> Option<Rc<ColorLut>> {
        self.store.color_lut(index)
    }

    // --- input ---

    /// Route a pointer event to the tools of the view's group.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> Result<PointerOutcome> {
        let Some(tool_group_id) = self
            .tool_groups
            .group_for_viewport(event.view_id())
            .map(str::to_string)
        else {
            return Ok(PointerOutcome::Ignored);
        };
        let group = self
            .tool_groups
            .tool_group_mut(&tool_group_id)
            .ok_or_else(|| SegmentationError::unknown("tool group", &tool_group_id))?;

        // Commits run against the view the gesture started in.
        let view_id = match event {
            PointerEvent::Up { .. } | PointerEvent::Click { .. } => group
                .drawing_tool_mut()
                .and_then(|t| t.edit_session().map(|s| s.viewport_id.clone()))
                .unwrap_or_else(|| event.view_id().to_string()),
            _ => event.view_id().to_string(),
        };
        let view = self
            .views
            .get(&view_id)
            .ok_or_else(|| SegmentationError::unknown("viewport", &view_id))?;

        let mut ctx = GestureContext {
            store: &mut self.store,
            volumes: self.volumes.as_ref(),
            view: view.as_ref(),
            tool_group_id: &tool_group_id,
            render_bus: &mut self.render_bus,
            locks: &mut self.locks,
        };

        let result = match event {
            PointerEvent::Down {
                button: MouseButton::Left,
                points,
                ..
            } => match group.active_tool_mut() {
                Some(tool) => tool.pointer_down(&mut ctx, points).map(|()| {
                    tool.edit_session()
                        .map(|s| PointerOutcome::Started {
                            annotation_uid: s.annotation.annotation_uid.clone(),
                        })
                        .unwrap_or(PointerOutcome::Ignored)
                }),
                None => Ok(PointerOutcome::Ignored),
            },
            PointerEvent::Drag { points, .. } => match group.drawing_tool_mut() {
                Some(tool) => tool.pointer_drag(&mut ctx, points).map(|updated| {
                    if updated {
                        PointerOutcome::Updated
                    } else {
                        PointerOutcome::Ignored
                    }
                }),
                None => Ok(PointerOutcome::Ignored),
            },
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            }
            | PointerEvent::Click {
                button: MouseButton::Left,
                ..
            } => match group.drawing_tool_mut() {
                Some(tool) => tool.pointer_up(&mut ctx).map(PointerOutcome::Committed),
                None => Ok(PointerOutcome::Ignored),
            },
            _ => Ok(PointerOutcome::Ignored),
        };

        self.publish_changes(false);
        result
    }

    /// Handle a key event. The cancel key abandons the gesture in flight in
    /// the view's group and returns the discarded draft's uid.
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> Option<String> {
        if !event.is_cancel() {
            return None;
        }
        let tool_group_id = self
            .tool_groups
            .group_for_viewport(event.view_id())?
            .to_string();
        self.cancel_gesture(&tool_group_id)
    }

    /// Cancel the gesture in flight in a group. Never fails.
    pub fn cancel_gesture(&mut self, tool_group_id: &str) -> Option<String> {
        let group = self.tool_groups.tool_group_mut(tool_group_id)?;
        group
            .drawing_tool_mut()?
            .cancel(&mut self.locks, &mut self.render_bus)
    }

    /// The gesture in flight in a group.
    pub fn edit_session(&self, tool_group_id: &str) -> Option<&EditSession> {
        self.tool_groups
            .tool_group(tool_group_id)?
            .tools()
            .find_map(|t| t.edit_session())
    }

    // --- rendering ---

    /// Dispatch the redraws requested since the last flush.
    pub fn flush_renders(&mut self, sink: &mut dyn RenderSink) -> usize {
        self.render_bus.flush(sink)
    }

    /// Draw in-flight drafts for a view.
    pub fn render_drafts(&self, view_id: &str, sink: &mut dyn DrawingSink) {
        let Some(view) = self.views.get(view_id) else {
            return;
        };
        let Some(group) = self
            .tool_groups
            .group_for_viewport(view_id)
            .and_then(|id| self.tool_groups.tool_group(id))
        else {
            return;
        };
        for tool in group.tools() {
            tool.render(view.as_ref(), sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::events::ChangeKind;
    use crate::input::EventPoints;
    use crate::tools::{CircleScissorsTool, ToolConfiguration};
    use crate::viewport::{OrthographicView, VolumeInput};
    use crate::volume::{ImageVolume, InMemoryVolumeCache, InMemoryVolumeLoader, VolumeMetadata};
    use glam::DVec3;
    use kurbo::Point;
    use std::cell::RefCell;

    fn session() -> SegmentationSession {
        let cache = Rc::new(InMemoryVolumeCache::new());
        cache.put_volume(ImageVolume::labelmap(
            "vol1",
            [64, 64, 1],
            VolumeMetadata::identity("FOR1"),
        ));
        let mut view = OrthographicView::volume("vp1", Camera::axial());
        view.set_volumes(&[VolumeInput::new("vol1")], cache.as_ref())
            .unwrap();

        let mut session = SegmentationSession::new(cache);
        session.add_view(Box::new(view)).unwrap();
        session.create_tool_group("group1").unwrap();
        session.add_viewport_to_tool_group("group1", "vp1").unwrap();
        session
            .add_tool(
                "group1",
                Box::new(CircleScissorsTool::new(ToolConfiguration::default()).unwrap()),
            )
            .unwrap();
        session.activate_tool("group1", "CircleScissor").unwrap();
        session
            .add_segmentation(SegmentationInput::labelmap("seg1", "vol1"), false)
            .unwrap();
        session
            .add_segmentation_representation(
                "group1",
                RepresentationInput::new("seg1", RepresentationType::Labelmap).with_uid("rep1"),
                false,
            )
            .unwrap();
        session
    }

    fn points(x: f64, y: f64) -> EventPoints {
        EventPoints::new(Point::new(x, y), DVec3::new(x, y, 0.0))
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            view_id: "vp1".to_string(),
            button: MouseButton::Left,
            points: points(x, y),
        }
    }

    fn drag(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Drag {
            view_id: "vp1".to_string(),
            points: points(x, y),
        }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up {
            view_id: "vp1".to_string(),
            button: MouseButton::Left,
            points: points(x, y),
        }
    }

    #[test]
    fn test_circle_gesture_fills_labels() {
        let mut session = session();
        session.handle_pointer_event(&down(32.0, 32.0)).unwrap();
        assert_eq!(
            session.handle_pointer_event(&drag(35.0, 32.0)).unwrap(),
            PointerOutcome::Updated
        );
        let outcome = session.handle_pointer_event(&up(35.0, 32.0)).unwrap();

        let PointerOutcome::Committed(CommitOutcome::Applied { outcome, .. }) = outcome else {
            panic!("expected an applied commit, got {:?}", outcome);
        };
        // Lattice points within radius 3.
        assert_eq!(outcome.modified_voxels, 29);
        let volume = session.volumes().get_volume("vol1").unwrap();
        assert_eq!(volume.borrow().count_label(1), 29);
        assert!(session.edit_session("group1").is_none());
    }

    #[test]
    fn test_events_published_and_renders_coalesced() {
        let mut session = session();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = session
            .notifier()
            .segmentation()
            .subscribe(move |e| sink.borrow_mut().push(e.kind));

        session.handle_pointer_event(&down(10.0, 10.0)).unwrap();
        session.handle_pointer_event(&drag(12.0, 10.0)).unwrap();
        session.handle_pointer_event(&drag(13.0, 10.0)).unwrap();
        session.handle_pointer_event(&up(13.0, 10.0)).unwrap();

        assert_eq!(*seen.borrow(), vec![ChangeKind::Modified]);
        let mut batches = Vec::new();
        session.flush_renders(&mut |views: &[String]| batches.push(views.to_vec()));
        assert_eq!(batches, vec![vec!["vp1".to_string()]]);
    }

    #[test]
    fn test_suppressed_changes_are_silent() {
        let mut session = session();
        session.flush_renders(&mut |_: &[String]| {});
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let _sub = session
            .notifier()
            .config()
            .subscribe(move |_| *c.borrow_mut() += 1);

        session.set_global_config(SegmentationRepresentationConfig::default(), true);
        assert_eq!(*count.borrow(), 0);
        assert!(!session.render_bus().has_pending());

        session.set_global_config(SegmentationRepresentationConfig::default(), false);
        assert_eq!(*count.borrow(), 1);
        assert!(session.render_bus().is_pending("vp1"));
    }

    #[test]
    fn test_escape_cancels_gesture() {
        let mut session = session();
        let PointerOutcome::Started { annotation_uid } =
            session.handle_pointer_event(&down(10.0, 10.0)).unwrap()
        else {
            panic!("gesture did not start");
        };
        session.handle_pointer_event(&drag(15.0, 10.0)).unwrap();

        let cancelled = session.handle_key_event(&KeyEvent::Pressed {
            view_id: "vp1".to_string(),
            key: "Escape".to_string(),
        });

        assert_eq!(cancelled, Some(annotation_uid));
        assert_eq!(
            session.handle_pointer_event(&up(15.0, 10.0)).unwrap(),
            PointerOutcome::Ignored
        );
        let volume = session.volumes().get_volume("vol1").unwrap();
        assert_eq!(volume.borrow().count_label(1), 0);
    }

    #[test]
    fn test_remove_segmentation_cancels_gesture() {
        let mut session = session();
        session.handle_pointer_event(&down(10.0, 10.0)).unwrap();
        assert!(session.remove_segmentation("seg1", false));
        assert!(session.edit_session("group1").is_none());
        assert!(session.segmentation_representations("group1").is_empty());
        assert!(!session.remove_segmentation("seg1", false));
    }

    #[test]
    fn test_remove_representation_from_wrong_group_keeps_gesture() {
        let mut session = session();
        session.create_tool_group("group2").unwrap();
        session.handle_pointer_event(&down(10.0, 10.0)).unwrap();

        assert!(!session.remove_segmentation_representation("group2", "rep1", false));
        assert!(session.edit_session("group1").is_some());
        assert_eq!(session.segmentation_representations("group1").len(), 1);

        session.handle_pointer_event(&drag(13.0, 10.0)).unwrap();
        let outcome = session.handle_pointer_event(&up(13.0, 10.0)).unwrap();
        assert!(matches!(
            outcome,
            PointerOutcome::Committed(CommitOutcome::Applied { .. })
        ));
    }

    #[test]
    fn test_remove_representation_cancels_its_gesture() {
        let mut session = session();
        session.handle_pointer_event(&down(10.0, 10.0)).unwrap();
        assert!(session.remove_segmentation_representation("group1", "rep1", false));
        assert!(session.edit_session("group1").is_none());
    }

    #[test]
    fn test_no_active_segmentation() {
        let mut session = session();
        session.remove_segmentation_representation("group1", "rep1", false);
        let err = session.handle_pointer_event(&down(10.0, 10.0)).unwrap_err();
        assert!(matches!(err, SegmentationError::NoActiveSegmentation { .. }));
        assert!(session.edit_session("group1").is_none());
    }

    #[test]
    fn test_events_from_unknown_view_are_ignored() {
        let mut session = session();
        let event = PointerEvent::Down {
            view_id: "elsewhere".to_string(),
            button: MouseButton::Left,
            points: points(1.0, 1.0),
        };
        assert_eq!(session.handle_pointer_event(&event).unwrap(), PointerOutcome::Ignored);
    }

    #[test]
    fn test_load_segmentation_data() {
        let cache = Rc::new(InMemoryVolumeCache::new());
        let loader = Rc::new(InMemoryVolumeLoader::new());
        loader.register(ImageVolume::labelmap(
            "labels",
            [4, 4, 4],
            VolumeMetadata::identity("FOR1"),
        ));
        let mut session = SegmentationSession::new(cache.clone()).with_loader(loader);
        session
            .add_segmentation(SegmentationInput::labelmap("seg1", "labels"), false)
            .unwrap();

        let pending = session.load_segmentation_data("seg1").unwrap();
        // The session stays usable while the load is pending.
        session
            .add_segmentation(SegmentationInput::labelmap("seg2", "other"), false)
            .unwrap();
        let volume = pollster::block_on(pending).unwrap();

        assert_eq!(volume.borrow().voxel_count(), 64);
        assert!(cache.get_volume("labels").is_some());
    }

    #[test]
    fn test_load_without_loader() {
        let session = SegmentationSession::new(Rc::new(InMemoryVolumeCache::new()));
        assert!(session.load_segmentation_data("seg1").is_err());
    }
}
