//! Voxel strategies for planar shapes drawn on a single slice.
//!
//! A shape covers the voxels whose centres lie inside it in the view plane
//! and within half a voxel of the plane along its normal.

use super::strategy::{OperationData, StrategyOutcome};
use crate::error::{Result, SegmentationError};
use crate::volume::ImageVolume;
use glam::DVec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fill,
    Erase,
}

/// A planar region in world space.
#[derive(Debug, Clone, Copy)]
enum Region {
    Circle {
        center: DVec3,
        radius: f64,
    },
    /// Parallelogram `origin + s * edge_a + t * edge_b` for `s, t` in `[0, 1]`.
    Rectangle {
        origin: DVec3,
        edge_a: DVec3,
        edge_b: DVec3,
    },
}

impl Region {
    fn anchor(&self) -> DVec3 {
        match *self {
            Region::Circle { center, .. } => center,
            Region::Rectangle { origin, .. } => origin,
        }
    }

    /// In-plane containment of a point already projected onto the plane.
    fn contains(&self, p: DVec3) -> bool {
        match *self {
            Region::Circle { center, radius } => p.distance_squared(center) <= radius * radius,
            Region::Rectangle {
                origin,
                edge_a,
                edge_b,
            } => {
                let q = p - origin;
                let (la, lb) = (edge_a.length_squared(), edge_b.length_squared());
                if la <= f64::EPSILON || lb <= f64::EPSILON {
                    return false;
                }
                let s = q.dot(edge_a) / la;
                let t = q.dot(edge_b) / lb;
                (0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t)
            }
        }
    }

    /// World points spanning the region's extent in the plane.
    fn extent(&self, right: DVec3, up: DVec3) -> Vec<DVec3> {
        match *self {
            Region::Circle { center, radius } => [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)]
                .iter()
                .map(|&(a, b)| center + right * (a * radius) + up * (b * radius))
                .collect(),
            Region::Rectangle {
                origin,
                edge_a,
                edge_b,
            } => vec![origin, origin + edge_a, origin + edge_b, origin + edge_a + edge_b],
        }
    }
}

/// Circle from handle points `[bottom, top, left, right]`.
fn circle_region(points: &[DVec3]) -> Result<Region> {
    match points {
        [bottom, top, _, _] => Ok(Region::Circle {
            center: (*bottom + *top) * 0.5,
            radius: bottom.distance(*top) * 0.5,
        }),
        _ => Err(SegmentationError::InvalidInput(format!(
            "circle needs 4 handle points, got {}",
            points.len()
        ))),
    }
}

/// Rectangle from handle points `[top_left, top_right, bottom_left, bottom_right]`.
fn rectangle_region(points: &[DVec3]) -> Result<Region> {
    match points {
        [top_left, top_right, bottom_left, _] => Ok(Region::Rectangle {
            origin: *top_left,
            edge_a: *top_right - *top_left,
            edge_b: *bottom_left - *top_left,
        }),
        _ => Err(SegmentationError::InvalidInput(format!(
            "rectangle needs 4 handle points, got {}",
            points.len()
        ))),
    }
}

/// Half the voxel thickness along `normal`.
fn plane_tolerance(volume: &ImageVolume, normal: DVec3) -> f64 {
    let m = &volume.metadata;
    let spacing = [m.spacing.x, m.spacing.y, m.spacing.z];
    0.5 * m
        .direction
        .iter()
        .zip(spacing)
        .map(|(dir, s)| normal.dot(*dir).abs() * s)
        .sum::<f64>()
}

/// Inclusive voxel index range covering the given world points.
fn index_bounds(volume: &ImageVolume, corners: &[DVec3]) -> Option<[(usize, usize); 3]> {
    let mut lo = DVec3::splat(f64::INFINITY);
    let mut hi = DVec3::splat(f64::NEG_INFINITY);
    for c in corners {
        let ijk = volume.world_to_index(*c);
        lo = lo.min(ijk);
        hi = hi.max(ijk);
    }

    let mut bounds = [(0usize, 0usize); 3];
    for axis in 0..3 {
        let dim = volume.dimensions[axis];
        if dim == 0 {
            return None;
        }
        let max_index = (dim - 1) as f64;
        let (l, h) = (lo[axis].floor(), hi[axis].ceil());
        if h < 0.0 || l > max_index {
            return None;
        }
        bounds[axis] = (l.max(0.0) as usize, h.min(max_index) as usize);
    }
    Some(bounds)
}

fn apply(op: &OperationData, region: Region, mode: Mode) -> Result<StrategyOutcome> {
    let mut volume = op.volume.try_borrow_mut().map_err(|_| {
        SegmentationError::State(format!(
            "label volume of segmentation '{}' is already being edited",
            op.segmentation_id
        ))
    })?;

    let normal = op.view_plane_normal.normalize_or_zero();
    let up = op.view_up.normalize_or_zero();
    let right = up.cross(normal).normalize_or_zero();
    if normal == DVec3::ZERO || right == DVec3::ZERO {
        return Err(SegmentationError::InvalidInput(
            "view plane normal and view up must be non-zero and not parallel".to_string(),
        ));
    }

    let tolerance = plane_tolerance(&volume, normal);
    let corners: Vec<DVec3> = region
        .extent(right, up)
        .into_iter()
        .flat_map(|p| [p + normal * tolerance, p - normal * tolerance])
        .collect();
    let Some(bounds) = index_bounds(&volume, &corners) else {
        return Ok(StrategyOutcome::default());
    };

    let anchor = region.anchor();
    let mut inside = Vec::new();
    for k in bounds[2].0..=bounds[2].1 {
        for j in bounds[1].0..=bounds[1].1 {
            for i in bounds[0].0..=bounds[0].1 {
                let world = volume.index_to_world([i, j, k]);
                let offset = (world - anchor).dot(normal);
                if offset.abs() > tolerance {
                    continue;
                }
                if region.contains(world - normal * offset) {
                    if let Some(index) = volume.linear_index([i, j, k]) {
                        inside.push(index);
                    }
                }
            }
        }
    }

    let labels = volume.labels_mut()?;
    let mut modified = 0;
    for index in inside {
        let current = labels[index];
        if op.segments_locked.contains(&current) {
            continue;
        }
        let next = match mode {
            Mode::Fill if current != op.segment_index => op.segment_index,
            Mode::Erase if current == op.segment_index && current != 0 => 0,
            _ => continue,
        };
        labels[index] = next;
        modified += 1;
    }

    log::debug!(
        "{:?} touched {} voxel(s) of segmentation '{}'",
        mode,
        modified,
        op.segmentation_id
    );
    Ok(StrategyOutcome {
        modified_voxels: modified,
    })
}

/// Set voxels inside the circle to the active segment index.
pub fn fill_inside_circle(op: &OperationData) -> Result<StrategyOutcome> {
    apply(op, circle_region(&op.points)?, Mode::Fill)
}

/// Clear voxels of the active segment inside the circle.
pub fn erase_inside_circle(op: &OperationData) -> Result<StrategyOutcome> {
    apply(op, circle_region(&op.points)?, Mode::Erase)
}

/// Set voxels inside the rectangle to the active segment index.
pub fn fill_inside_rectangle(op: &OperationData) -> Result<StrategyOutcome> {
    apply(op, rectangle_region(&op.points)?, Mode::Fill)
}

/// Clear voxels of the active segment inside the rectangle.
pub fn erase_inside_rectangle(op: &OperationData) -> Result<StrategyOutcome> {
    apply(op, rectangle_region(&op.points)?, Mode::Erase)
}
