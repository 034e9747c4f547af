//! End-to-end editing flows through a `SegmentationSession`.

use glam::DVec3;
use kurbo::Point;
use segflow_core::config::{LabelmapConfig, RepresentationConfig};
use segflow_core::events::{RepresentationEvent, SegmentationEvent};
use segflow_core::interaction::DraftOutline;
use segflow_core::tools::ERASE_INSIDE;
use segflow_core::volume::VolumeMetadata;
use segflow_core::*;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

const GROUP: &str = "group1";
const VIEW: &str = "vp1";

fn new_session() -> (SegmentationSession, Rc<InMemoryVolumeCache>) {
    let cache = Rc::new(InMemoryVolumeCache::new());
    cache.put_volume(ImageVolume::labelmap(
        "vol1",
        [256, 256, 1],
        VolumeMetadata::identity("FOR1"),
    ));
    let mut view = OrthographicView::volume(VIEW, Camera::axial());
    view.set_volumes(&[VolumeInput::new("vol1")], cache.as_ref())
        .unwrap();

    let mut session = SegmentationSession::new(cache.clone());
    session.add_view(Box::new(view)).unwrap();
    session.create_tool_group(GROUP).unwrap();
    session.add_viewport_to_tool_group(GROUP, VIEW).unwrap();
    session
        .add_tool(
            GROUP,
            Box::new(CircleScissorsTool::new(ToolConfiguration::default()).unwrap()),
        )
        .unwrap();
    session.activate_tool(GROUP, "CircleScissor").unwrap();
    (session, cache)
}

fn with_seg1_rep1() -> (SegmentationSession, Rc<InMemoryVolumeCache>) {
    let (mut session, cache) = new_session();
    session
        .add_segmentation(SegmentationInput::labelmap("seg1", "vol1"), false)
        .unwrap();
    session
        .add_segmentation_representation(
            GROUP,
            RepresentationInput::new("seg1", RepresentationType::Labelmap).with_uid("rep1"),
            false,
        )
        .unwrap();
    (session, cache)
}

fn at(x: f64, y: f64) -> EventPoints {
    EventPoints::new(Point::new(x, y), DVec3::new(x, y, 0.0))
}

fn down(x: f64, y: f64) -> PointerEvent {
    PointerEvent::Down {
        view_id: VIEW.to_string(),
        button: MouseButton::Left,
        points: at(x, y),
    }
}

fn drag(x: f64, y: f64) -> PointerEvent {
    PointerEvent::Drag {
        view_id: VIEW.to_string(),
        points: at(x, y),
    }
}

fn up(x: f64, y: f64) -> PointerEvent {
    PointerEvent::Up {
        view_id: VIEW.to_string(),
        button: MouseButton::Left,
        points: at(x, y),
    }
}

fn labels(cache: &InMemoryVolumeCache, label: u8) -> usize {
    cache.get_volume("vol1").unwrap().borrow().count_label(label)
}

#[test]
fn test_add_and_get_segmentation() {
    let (mut session, _) = new_session();
    session
        .add_segmentation(SegmentationInput::labelmap("seg1", "vol1"), false)
        .unwrap();
    assert_eq!(session.segmentation("seg1").unwrap().segmentation_id, "seg1");

    let dup = session.add_segmentation(SegmentationInput::labelmap("seg1", "vol1"), false);
    assert_eq!(dup.unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn test_representation_add_and_remove() {
    let (mut session, _) = with_seg1_rep1();
    let reps = session.segmentation_representations(GROUP);
    assert_eq!(reps.len(), 1);
    assert_eq!(reps[0].segmentation_representation_uid, "rep1");

    assert!(session.remove_segmentation_representation(GROUP, "rep1", false));
    assert!(session.segmentation_representations(GROUP).is_empty());
}

#[test]
fn test_store_never_lists_duplicates() {
    let (mut session, _) = new_session();
    let ops = ["a", "b", "a", "c", "b", "a", "c"];
    for (i, id) in ops.iter().enumerate() {
        if i % 3 == 2 {
            session.remove_segmentation(id, false);
        } else {
            let _ = session.add_segmentation(SegmentationInput::labelmap(*id, "vol1"), false);
            let _ = session.add_segmentation_representation(
                GROUP,
                RepresentationInput::new(*id, RepresentationType::Labelmap),
                false,
            );
        }
        let mut ids: Vec<&str> = session
            .segmentations()
            .into_iter()
            .map(|s| s.segmentation_id.as_str())
            .collect();
        let listed = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), listed);
    }

    for id in ["a", "b", "c"] {
        session.remove_segmentation(id, false);
        assert!(
            session
                .segmentation_representations(GROUP)
                .iter()
                .all(|r| r.segmentation_id != id)
        );
    }
    assert!(session.segmentation_representations(GROUP).is_empty());
}

#[test]
fn test_group_override_wins() {
    let (mut session, _) = with_seg1_rep1();
    session.set_global_config(
        SegmentationRepresentationConfig {
            render_inactive_segmentations: Some(true),
            ..Default::default()
        },
        false,
    );
    session.set_tool_group_specific_config(
        GROUP,
        SegmentationRepresentationConfig {
            render_inactive_segmentations: Some(false),
            ..Default::default()
        },
        false,
    );

    let first = session.resolve_config(RepresentationType::Labelmap, GROUP);
    let second = session.resolve_config(RepresentationType::Labelmap, GROUP);
    assert!(!first.render_inactive_segmentations);
    assert_eq!(first, second);
    assert!(
        session
            .resolve_config(RepresentationType::Labelmap, "other")
            .render_inactive_segmentations
    );
}

#[test]
fn test_group_config_from_json_file() {
    let (mut session, _) = with_seg1_rep1();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"representations": {{"Labelmap": {{"fillAlpha": 0.4, "outlineDash": [4.0, 2.0]}}}}}}"#
    )
    .unwrap();

    let json = std::fs::read_to_string(file.path()).unwrap();
    let layer = SegmentationRepresentationConfig::from_json(&json).unwrap();
    session.set_tool_group_specific_config(GROUP, layer, false);

    let RepresentationConfig::Labelmap(labelmap) = session
        .resolve_config(RepresentationType::Labelmap, GROUP)
        .representation
    else {
        panic!("expected labelmap parameters");
    };
    let effective = labelmap.effective();
    approx::assert_relative_eq!(effective.fill_alpha, 0.4);
    assert_eq!(effective.outline_dash, vec![4.0, 2.0]);
    // Untouched leaves come from the global defaults.
    assert_eq!(
        Some(effective.render_outline),
        LabelmapConfig::defaults().render_outline
    );

    assert!(SegmentationRepresentationConfig::from_json("{not json").is_err());
}

#[test]
fn test_release_without_movement_mutates_nothing() {
    let (mut session, cache) = with_seg1_rep1();
    let seen = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&seen);
    let _sub = session
        .notifier()
        .segmentation()
        .subscribe(move |_| *counter.borrow_mut() += 1);

    session.handle_pointer_event(&down(50.0, 50.0)).unwrap();
    session.handle_pointer_event(&drag(50.0, 50.0)).unwrap();
    let outcome = session.handle_pointer_event(&up(50.0, 50.0)).unwrap();

    assert!(matches!(
        outcome,
        PointerOutcome::Committed(CommitOutcome::Discarded { .. })
    ));
    assert_eq!(labels(&cache, 1), 0);
    assert_eq!(*seen.borrow(), 0);
}

#[test]
fn test_cancel_mid_gesture() {
    let (mut session, cache) = with_seg1_rep1();
    let PointerOutcome::Started { annotation_uid } =
        session.handle_pointer_event(&down(50.0, 50.0)).unwrap()
    else {
        panic!("gesture did not start");
    };
    session.handle_pointer_event(&drag(60.0, 50.0)).unwrap();

    let cancelled = session.cancel_gesture(GROUP);
    assert_eq!(cancelled.as_deref(), Some(annotation_uid.as_str()));
    assert_eq!(labels(&cache, 1), 0);
    assert!(session.edit_session(GROUP).is_none());

    // Cancelling again is a silent no-op.
    assert!(session.cancel_gesture(GROUP).is_none());
}

#[test]
fn test_circle_gesture_radius_30() {
    let (mut session, cache) = with_seg1_rep1();
    session.handle_pointer_event(&down(100.0, 100.0)).unwrap();
    session.handle_pointer_event(&drag(130.0, 100.0)).unwrap();

    let draft = &session.edit_session(GROUP).unwrap().annotation;
    assert_eq!(
        draft.handle_points,
        vec![
            DVec3::new(100.0, 130.0, 0.0),
            DVec3::new(100.0, 70.0, 0.0),
            DVec3::new(70.0, 100.0, 0.0),
            DVec3::new(130.0, 100.0, 0.0),
        ]
    );

    struct Outlines(Vec<DraftOutline>);
    impl DrawingSink for Outlines {
        fn draw_outline(&mut self, _: &str, outline: &DraftOutline, _: peniko::Color) {
            self.0.push(outline.clone());
        }
    }
    let mut outlines = Outlines(Vec::new());
    session.render_drafts(VIEW, &mut outlines);
    let [DraftOutline::Circle(circle)] = outlines.0.as_slice() else {
        panic!("expected one circle outline");
    };
    approx::assert_relative_eq!(circle.radius, 30.0);

    let PointerOutcome::Committed(CommitOutcome::Applied { outcome, .. }) =
        session.handle_pointer_event(&up(130.0, 100.0)).unwrap()
    else {
        panic!("expected the fill to be applied");
    };
    // Lattice points within radius 30 of the centre.
    assert_eq!(outcome.modified_voxels, 2821);
    assert_eq!(labels(&cache, 1), outcome.modified_voxels);
    let volume = cache.get_volume("vol1").unwrap();
    assert_eq!(volume.borrow().label_at([100, 100, 0]), Some(1));
    assert_eq!(volume.borrow().label_at([100, 131, 0]), Some(0));
}

#[test]
fn test_erase_respects_locked_segments() {
    let (mut session, cache) = with_seg1_rep1();
    session.handle_pointer_event(&down(40.0, 40.0)).unwrap();
    session.handle_pointer_event(&drag(50.0, 40.0)).unwrap();
    session.handle_pointer_event(&up(50.0, 40.0)).unwrap();
    let filled = labels(&cache, 1);
    assert!(filled > 0);

    session.set_segment_locked("seg1", 1, true, false).unwrap();
    session
        .tool_mut(GROUP, "CircleScissor")
        .unwrap()
        .set_active_strategy(ERASE_INSIDE)
        .unwrap();
    session.handle_pointer_event(&down(40.0, 40.0)).unwrap();
    session.handle_pointer_event(&drag(50.0, 40.0)).unwrap();
    session.handle_pointer_event(&up(50.0, 40.0)).unwrap();
    assert_eq!(labels(&cache, 1), filled);

    session.set_segment_locked("seg1", 1, false, false).unwrap();
    session.handle_pointer_event(&down(40.0, 40.0)).unwrap();
    session.handle_pointer_event(&drag(50.0, 40.0)).unwrap();
    session.handle_pointer_event(&up(50.0, 40.0)).unwrap();
    assert_eq!(labels(&cache, 1), 0);
}

#[test]
fn test_events_carry_identifiers() {
    let (mut session, _) = new_session();
    let segs: Rc<RefCell<Vec<SegmentationEvent>>> = Rc::default();
    let reps: Rc<RefCell<Vec<RepresentationEvent>>> = Rc::default();
    let (s, r) = (Rc::clone(&segs), Rc::clone(&reps));
    let _seg_sub = session
        .notifier()
        .segmentation()
        .subscribe(move |e| s.borrow_mut().push(e.clone()));
    let _rep_sub = session
        .notifier()
        .representation()
        .subscribe(move |e| r.borrow_mut().push(e.clone()));

    session
        .add_segmentation(SegmentationInput::labelmap("seg1", "vol1"), false)
        .unwrap();
    session
        .add_segmentation(SegmentationInput::labelmap("seg2", "vol1"), true)
        .unwrap();
    session
        .add_segmentation_representation(
            GROUP,
            RepresentationInput::new("seg1", RepresentationType::Labelmap).with_uid("rep1"),
            false,
        )
        .unwrap();
    session.remove_segmentation("seg1", false);

    let segs = segs.borrow();
    assert_eq!(
        segs.iter()
            .map(|e| (e.kind, e.segmentation_id.as_str()))
            .collect::<Vec<_>>(),
        vec![(ChangeKind::Added, "seg1"), (ChangeKind::Removed, "seg1")]
    );
    let reps = reps.borrow();
    assert_eq!(reps.len(), 2);
    assert_eq!(reps[0].kind, ChangeKind::Added);
    assert_eq!(reps[1].kind, ChangeKind::Removed);
    assert!(reps.iter().all(|e| e.tool_group_id == GROUP
        && e.segmentation_representation_uid == "rep1"
        && e.segmentation_id == "seg1"));
}

#[test]
fn test_dropped_subscription_stops_delivery() {
    let (mut session, _) = new_session();
    let count = Rc::new(RefCell::new(0));
    let c = Rc::clone(&count);
    let sub = session
        .notifier()
        .segmentation()
        .subscribe(move |_| *c.borrow_mut() += 1);

    session
        .add_segmentation(SegmentationInput::labelmap("seg1", "vol1"), false)
        .unwrap();
    drop(sub);
    session
        .add_segmentation(SegmentationInput::labelmap("seg2", "vol1"), false)
        .unwrap();

    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_redraws_coalesce_per_flush() {
    let (mut session, _) = with_seg1_rep1();
    let batches: Rc<RefCell<Vec<Vec<String>>>> = Rc::default();
    let mut record = {
        let batches = Rc::clone(&batches);
        move |views: &[String]| batches.borrow_mut().push(views.to_vec())
    };
    session.flush_renders(&mut record);
    batches.borrow_mut().clear();

    session.handle_pointer_event(&down(20.0, 20.0)).unwrap();
    for x in 21..30 {
        session.handle_pointer_event(&drag(x as f64, 20.0)).unwrap();
    }
    assert_eq!(session.flush_renders(&mut record), 1);
    assert_eq!(session.flush_renders(&mut record), 0);
    assert_eq!(*batches.borrow(), vec![vec![VIEW.to_string()]]);
    assert_eq!(session.render_bus().tick(), 2);
}

#[test]
fn test_independent_sessions() {
    let (mut a, _) = with_seg1_rep1();
    let (b, _) = new_session();
    a.remove_segmentation("seg1", false);
    assert!(a.segmentation("seg1").is_none());
    assert!(b.segmentation("seg1").is_none());

    let (c, _) = with_seg1_rep1();
    assert!(c.segmentation("seg1").is_some());
}

#[test]
fn test_load_pending_while_handling_input() {
    let cache = Rc::new(InMemoryVolumeCache::new());
    let loader = Rc::new(InMemoryVolumeLoader::new());
    loader.register(ImageVolume::labelmap(
        "labels2",
        [8, 8, 2],
        VolumeMetadata::identity("FOR1"),
    ));
    let mut session = SegmentationSession::new(cache.clone()).with_loader(loader);
    session
        .add_segmentation(SegmentationInput::labelmap("seg2", "labels2"), false)
        .unwrap();

    let pending = session.load_segmentation_data("seg2").unwrap();
    session
        .add_segmentation(SegmentationInput::labelmap("seg3", "vol1"), false)
        .unwrap();
    let loaded = pollster::block_on(pending).unwrap();

    assert_eq!(loaded.borrow().voxel_count(), 128);
    assert!(cache.get_volume("labels2").is_some());
    assert_eq!(session.segmentations().len(), 2);
}
