//! Camera and canvas transforms for planar views.

use glam::DVec3;
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Orientation of a view in world space.
///
/// World points on the view plane are expressed as
/// `focal_point + right * u + down * v`, where `right = view_up x normal`
/// and `down = -view_up`. `(u, v)` are plane coordinates in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Normal of the view plane, pointing towards the viewer.
    pub view_plane_normal: DVec3,
    /// Up direction on screen.
    pub view_up: DVec3,
    /// Point of the world shown at the plane origin.
    pub focal_point: DVec3,
    /// Along-normal integration thickness used by projection rendering.
    pub slab_thickness: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::axial()
    }
}

impl Camera {
    /// Axial orientation: canvas x follows world +x and canvas y follows world +y.
    pub fn axial() -> Self {
        Self {
            view_plane_normal: DVec3::new(0.0, 0.0, -1.0),
            view_up: DVec3::new(0.0, -1.0, 0.0),
            focal_point: DVec3::ZERO,
            slab_thickness: 0.0,
        }
    }

    /// Unit vector pointing right on screen.
    pub fn view_right(&self) -> DVec3 {
        self.view_up.cross(self.view_plane_normal).normalize_or_zero()
    }

    /// Map plane coordinates to a world point.
    pub fn plane_to_world(&self, plane: Point) -> DVec3 {
        self.focal_point + self.view_right() * plane.x - self.view_up.normalize_or_zero() * plane.y
    }

    /// Project a world point onto the plane coordinates.
    pub fn world_to_plane(&self, world: DVec3) -> Point {
        let d = world - self.focal_point;
        Point::new(
            d.dot(self.view_right()),
            -d.dot(self.view_up.normalize_or_zero()),
        )
    }
}

/// Pan/zoom transform between plane coordinates and canvas pixels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasTransform {
    /// Current translation offset (pan), in canvas pixels.
    pub offset: Vec2,
    /// Canvas pixels per millimetre.
    pub zoom: f64,
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl CanvasTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plane coordinates to canvas coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Canvas coordinates to plane coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn canvas_to_plane(&self, canvas: Point) -> Point {
        self.inverse_transform() * canvas
    }

    pub fn plane_to_canvas(&self, plane: Point) -> Point {
        self.transform() * plane
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axial_plane_roundtrip() {
        let camera = Camera::axial();
        let world = camera.plane_to_world(Point::new(12.0, -4.0));
        assert_relative_eq!(world.x, 12.0);
        assert_relative_eq!(world.y, -4.0);
        assert_relative_eq!(world.z, 0.0);

        let back = camera.world_to_plane(world);
        assert_relative_eq!(back.x, 12.0);
        assert_relative_eq!(back.y, -4.0);
    }

    #[test]
    fn test_sagittal_right_vector() {
        let camera = Camera {
            view_plane_normal: DVec3::new(1.0, 0.0, 0.0),
            view_up: DVec3::new(0.0, 0.0, 1.0),
            focal_point: DVec3::new(5.0, 0.0, 0.0),
            slab_thickness: 0.0,
        };
        let right = camera.view_right();
        assert_relative_eq!(right.y, 1.0);
        let world = camera.plane_to_world(Point::new(0.0, 0.0));
        assert_relative_eq!(world.x, 5.0);
    }

    #[test]
    fn test_canvas_with_offset_and_zoom() {
        let mut canvas = CanvasTransform::new();
        canvas.offset = Vec2::new(50.0, 100.0);
        canvas.zoom = 2.0;
        let plane = canvas.canvas_to_plane(Point::new(150.0, 300.0));
        assert_relative_eq!(plane.x, 50.0);
        assert_relative_eq!(plane.y, 100.0);

        let back = canvas.plane_to_canvas(plane);
        assert_relative_eq!(back.x, 150.0);
        assert_relative_eq!(back.y, 300.0);
    }
}
