//! Views the segmentation core draws into and receives input from.
//!
//! Projection maths and rendering belong to the host; the core only talks to
//! views through the [`View`] trait. [`OrthographicView`] is a planar
//! implementation usable by headless hosts and tests.

use crate::camera::{Camera, CanvasTransform};
use crate::error::{Result, SegmentationError};
use crate::volume::VolumeCache;
use glam::DVec3;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How a view presents image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    /// A stack of 2D images.
    Stack,
    /// Slices or projections through one or more 3D volumes.
    Volume,
}

/// A visual actor attached to a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorEntry {
    /// Actor identifier; the volume id unless an explicit actor uid was given.
    pub uid: String,
    pub volume_id: String,
    pub slab_thickness: Option<f64>,
    pub visible: bool,
}

/// A displayed view.
pub trait View {
    fn id(&self) -> &str;

    fn kind(&self) -> ViewKind;

    /// Back-project a canvas point onto the view plane in world space.
    fn canvas_to_world(&self, canvas: Point) -> DVec3;

    /// Project a world point to canvas pixels.
    fn world_to_canvas(&self, world: DVec3) -> Point;

    fn camera(&self) -> Camera;

    /// Frame of reference of the data currently displayed, if any.
    fn frame_of_reference_uid(&self) -> Option<&str>;

    /// Attached actors, first actor is the default one.
    fn actors(&self) -> &[ActorEntry];
}

/// Request to attach a volume to a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInput {
    pub volume_id: String,
    /// Actor name; lets one volume be shown through several actors.
    pub actor_uid: Option<String>,
    pub slab_thickness: Option<f64>,
    pub visibility: bool,
}

impl VolumeInput {
    pub fn new(volume_id: impl Into<String>) -> Self {
        Self {
            volume_id: volume_id.into(),
            actor_uid: None,
            slab_thickness: None,
            visibility: true,
        }
    }

    pub fn with_actor_uid(mut self, actor_uid: impl Into<String>) -> Self {
        self.actor_uid = Some(actor_uid.into());
        self
    }

    pub fn with_slab_thickness(mut self, slab_thickness: f64) -> Self {
        self.slab_thickness = Some(slab_thickness);
        self
    }

    fn actor_uid(&self) -> &str {
        self.actor_uid.as_deref().unwrap_or(&self.volume_id)
    }
}

/// Planar view with an orthographic projection.
#[derive(Debug, Clone)]
pub struct OrthographicView {
    id: String,
    kind: ViewKind,
    pub camera: Camera,
    pub canvas: CanvasTransform,
    frame_of_reference_uid: Option<String>,
    actors: Vec<ActorEntry>,
}

impl OrthographicView {
    pub fn stack(id: impl Into<String>, camera: Camera) -> Self {
        Self::new(id, ViewKind::Stack, camera)
    }

    pub fn volume(id: impl Into<String>, camera: Camera) -> Self {
        Self::new(id, ViewKind::Volume, camera)
    }

    fn new(id: impl Into<String>, kind: ViewKind, camera: Camera) -> Self {
        Self {
            id: id.into(),
            kind,
            camera,
            canvas: CanvasTransform::new(),
            frame_of_reference_uid: None,
            actors: Vec::new(),
        }
    }

    /// Set the frame of reference of a stack view.
    pub fn set_frame_of_reference_uid(&mut self, uid: impl Into<String>) {
        self.frame_of_reference_uid = Some(uid.into());
    }

    /// Replace all actors with the given volumes.
    ///
    /// Every input is validated (existence, frame of reference, actor
    /// uniqueness) before any actor is attached.
    pub fn set_volumes(&mut self, inputs: &[VolumeInput], cache: &dyn VolumeCache) -> Result<()> {
        self.require_volume_view()?;
        let first = inputs
            .first()
            .ok_or_else(|| SegmentationError::InvalidInput("no volumes to set".to_string()))?;
        let first_volume = cache
            .get_volume(&first.volume_id)
            .ok_or_else(|| SegmentationError::unknown("volume", first.volume_id.clone()))?;
        let frame_of_reference = first_volume.borrow().metadata.frame_of_reference_uid.clone();

        self.validate_inputs(inputs, &frame_of_reference, cache, &HashSet::new())?;

        let actors: Vec<ActorEntry> = inputs.iter().map(Self::actor_for).collect();

        let thicknesses: HashSet<u64> = actors
            .iter()
            .filter_map(|a| a.slab_thickness.map(f64::to_bits))
            .collect();
        if thicknesses.len() > 1 {
            log::warn!(
                "Viewport {}: slab thickness is tied to the camera; using the largest of {} values",
                self.id,
                thicknesses.len()
            );
        }
        self.camera.slab_thickness = actors
            .iter()
            .filter_map(|a| a.slab_thickness)
            .fold(0.0, f64::max);

        self.frame_of_reference_uid = Some(frame_of_reference);
        self.actors = actors;
        log::debug!("Viewport {}: set {} volume actor(s)", self.id, self.actors.len());
        Ok(())
    }

    /// Attach additional volumes, all sharing the view's frame of reference.
    pub fn add_volumes(&mut self, inputs: &[VolumeInput], cache: &dyn VolumeCache) -> Result<()> {
        self.require_volume_view()?;
        let Some(frame_of_reference) = self.frame_of_reference_uid.clone() else {
            return self.set_volumes(inputs, cache);
        };

        let existing: HashSet<String> = self.actors.iter().map(|a| a.uid.clone()).collect();
        self.validate_inputs(inputs, &frame_of_reference, cache, &existing)?;

        self.actors.extend(inputs.iter().map(Self::actor_for));
        Ok(())
    }

    /// Remove actors by uid; unknown uids are ignored.
    pub fn remove_volume_actors(&mut self, actor_uids: &[&str]) {
        self.actors.retain(|a| !actor_uids.contains(&a.uid.as_str()));
    }

    pub fn set_slab_thickness(&mut self, slab_thickness: f64) {
        self.camera.slab_thickness = slab_thickness;
    }

    fn require_volume_view(&self) -> Result<()> {
        if self.kind != ViewKind::Volume {
            return Err(SegmentationError::NotImplemented(format!(
                "viewport '{}' is not a volume viewport",
                self.id
            )));
        }
        Ok(())
    }

    fn validate_inputs(
        &self,
        inputs: &[VolumeInput],
        frame_of_reference: &str,
        cache: &dyn VolumeCache,
        existing_actor_uids: &HashSet<String>,
    ) -> Result<()> {
        let mut seen = existing_actor_uids.clone();
        for input in inputs {
            let volume = cache
                .get_volume(&input.volume_id)
                .ok_or_else(|| SegmentationError::unknown("volume", input.volume_id.clone()))?;
            let found = volume.borrow().metadata.frame_of_reference_uid.clone();
            if found != frame_of_reference {
                return Err(SegmentationError::FrameOfReferenceMismatch {
                    viewport_id: self.id.clone(),
                    volume_id: input.volume_id.clone(),
                    expected: frame_of_reference.to_string(),
                    found,
                });
            }
            if !seen.insert(input.actor_uid().to_string()) {
                return Err(SegmentationError::duplicate("actor", input.actor_uid()));
            }
        }
        Ok(())
    }

    fn actor_for(input: &VolumeInput) -> ActorEntry {
        ActorEntry {
            uid: input.actor_uid().to_string(),
            volume_id: input.volume_id.clone(),
            slab_thickness: input.slab_thickness,
            visible: input.visibility,
        }
    }
}

impl View for OrthographicView {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ViewKind {
        self.kind
    }

    fn canvas_to_world(&self, canvas: Point) -> DVec3 {
        self.camera.plane_to_world(self.canvas.canvas_to_plane(canvas))
    }

    fn world_to_canvas(&self, world: DVec3) -> Point {
        self.canvas.plane_to_canvas(self.camera.world_to_plane(world))
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn frame_of_reference_uid(&self) -> Option<&str> {
        self.frame_of_reference_uid.as_deref()
    }

    fn actors(&self) -> &[ActorEntry] {
        &self.actors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{ImageVolume, InMemoryVolumeCache, VolumeMetadata};

    fn cache_with(volumes: &[(&str, &str)]) -> InMemoryVolumeCache {
        let cache = InMemoryVolumeCache::new();
        for (id, frame) in volumes {
            cache.put_volume(ImageVolume::labelmap(
                *id,
                [2, 2, 2],
                VolumeMetadata::identity(*frame),
            ));
        }
        cache
    }

    #[test]
    fn test_canvas_world_roundtrip() {
        let mut view = OrthographicView::volume("vp1", Camera::axial());
        view.canvas.zoom = 2.0;
        let world = view.canvas_to_world(Point::new(40.0, 20.0));
        assert_eq!(world, DVec3::new(20.0, 10.0, 0.0));
        let canvas = view.world_to_canvas(world);
        assert!((canvas.x - 40.0).abs() < 1e-9);
        assert!((canvas.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_volumes_sets_frame_and_actors() {
        let cache = cache_with(&[("ct", "for-a"), ("pet", "for-a")]);
        let mut view = OrthographicView::volume("vp1", Camera::axial());
        view.set_volumes(
            &[
                VolumeInput::new("ct").with_slab_thickness(2.0),
                VolumeInput::new("pet").with_slab_thickness(5.0),
            ],
            &cache,
        )
        .unwrap();

        assert_eq!(view.frame_of_reference_uid(), Some("for-a"));
        assert_eq!(view.actors().len(), 2);
        assert_eq!(view.actors()[0].uid, "ct");
        assert_eq!(view.camera().slab_thickness, 5.0);
    }

    #[test]
    fn test_mismatched_frame_attaches_nothing() {
        let cache = cache_with(&[("ct", "for-a"), ("pet", "for-a"), ("mr", "for-b")]);
        let mut view = OrthographicView::volume("vp1", Camera::axial());
        let result = view.set_volumes(
            &[VolumeInput::new("ct"), VolumeInput::new("pet"), VolumeInput::new("mr")],
            &cache,
        );

        assert!(matches!(result, Err(SegmentationError::FrameOfReferenceMismatch { .. })));
        assert!(view.actors().is_empty());
        assert_eq!(view.frame_of_reference_uid(), None);
    }

    #[test]
    fn test_add_volumes_is_all_or_nothing() {
        let cache = cache_with(&[("ct", "for-a"), ("seg", "for-a"), ("mr", "for-b")]);
        let mut view = OrthographicView::volume("vp1", Camera::axial());
        view.set_volumes(&[VolumeInput::new("ct")], &cache).unwrap();

        let result = view.add_volumes(&[VolumeInput::new("seg"), VolumeInput::new("mr")], &cache);
        assert!(result.is_err());
        assert_eq!(view.actors().len(), 1);

        view.add_volumes(&[VolumeInput::new("seg")], &cache).unwrap();
        assert_eq!(view.actors().len(), 2);
    }

    #[test]
    fn test_add_volumes_rejects_missing_volume() {
        let cache = cache_with(&[("ct", "for-a")]);
        let mut view = OrthographicView::volume("vp1", Camera::axial());
        view.set_volumes(&[VolumeInput::new("ct")], &cache).unwrap();
        let result = view.add_volumes(&[VolumeInput::new("ghost")], &cache);
        assert!(matches!(result, Err(SegmentationError::UnknownId { .. })));
    }

    #[test]
    fn test_duplicate_actor_uid_rejected() {
        let cache = cache_with(&[("seg", "for-a")]);
        let mut view = OrthographicView::volume("vp1", Camera::axial());
        view.set_volumes(&[VolumeInput::new("seg")], &cache).unwrap();

        let dup = view.add_volumes(&[VolumeInput::new("seg")], &cache);
        assert!(matches!(dup, Err(SegmentationError::DuplicateId { .. })));

        view.add_volumes(&[VolumeInput::new("seg").with_actor_uid("seg-Labelmap")], &cache)
            .unwrap();
        view.remove_volume_actors(&["seg"]);
        assert_eq!(view.actors()[0].uid, "seg-Labelmap");
    }

    #[test]
    fn test_stack_view_cannot_take_volumes() {
        let cache = cache_with(&[("ct", "for-a")]);
        let mut view = OrthographicView::stack("stack1", Camera::axial());
        let result = view.set_volumes(&[VolumeInput::new("ct")], &cache);
        assert!(matches!(result, Err(SegmentationError::NotImplemented(_))));
    }
}
