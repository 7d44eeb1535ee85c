use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::device::PlaneSegments;

/// Distance of the camera from the plane track along +Z.
pub const CAMERA_DISTANCE: f32 = 20.0;

/// Container size in pixels together with the world-space extent the
/// camera sees at the track's depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportGeometry {
    pub screen_width: f32,
    pub screen_height: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl ViewportGeometry {
    /// Returns `None` for a zero-sized container.
    pub fn compute(width_px: u32, height_px: u32, fov_degrees: f32) -> Option<Self> {
        if width_px == 0 || height_px == 0 {
            return None;
        }
        let screen_width = width_px as f32;
        let screen_height = height_px as f32;
        let aspect = screen_width / screen_height;
        let viewport_height = 2.0 * (fov_degrees.to_radians() / 2.0).tan() * CAMERA_DISTANCE;
        Some(Self {
            screen_width,
            screen_height,
            viewport_width: viewport_height * aspect,
            viewport_height,
        })
    }

    pub fn aspect(&self) -> f32 {
        self.screen_width / self.screen_height
    }
}

/// Perspective camera looking down -Z at the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub fov_degrees: f32,
    pub aspect: f32,
    pub position: Vec3,
}

impl Camera {
    pub fn new(fov_degrees: f32) -> Self {
        Self {
            fov_degrees,
            aspect: 1.0,
            position: Vec3::new(0.0, 0.0, CAMERA_DISTANCE),
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y);
        let projection =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect.max(0.01), 0.1, 100.0);
        projection * view
    }
}

/// Vertical offset and roll of a plane sitting on the bent track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcPlacement {
    pub y: f32,
    pub rotation_z: f32,
}

impl ArcPlacement {
    pub const FLAT: ArcPlacement = ArcPlacement {
        y: 0.0,
        rotation_z: 0.0,
    };
}

/// Places a plane centred at `x` on a circular arc whose sagitta across
/// `half_width` equals `|bend|`.
///
/// A negative bend bows the arc upward, a positive one downward with the
/// roll direction inverted.
pub fn arc_placement(x: f32, half_width: f32, bend: f32) -> ArcPlacement {
    if bend == 0.0 {
        return ArcPlacement::FLAT;
    }
    let bend_abs = bend.abs();
    let radius = (half_width * half_width + bend_abs * bend_abs) / (2.0 * bend_abs);
    let effective_x = x.abs().min(half_width);
    let arc = radius - (radius * radius - effective_x * effective_x).max(0.0).sqrt();
    let angle = sign(x) * (effective_x / radius).asin();
    if bend > 0.0 {
        ArcPlacement {
            y: -arc,
            rotation_z: -angle,
        }
    } else {
        ArcPlacement {
            y: arc,
            rotation_z: angle,
        }
    }
}

fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// Unit plane in the XY plane spanning -0.5..0.5, subdivided for the wave
/// displacement. UVs start at the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneMesh {
    pub vertices: Vec<PlaneVertex>,
    pub indices: Vec<u32>,
}

impl PlaneMesh {
    pub fn new(segments: PlaneSegments) -> Self {
        let columns = segments.width.max(1);
        let rows = segments.height.max(1);
        let mut vertices = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize);
        for row in 0..=rows {
            let v = row as f32 / rows as f32;
            for column in 0..=columns {
                let u = column as f32 / columns as f32;
                vertices.push(PlaneVertex {
                    position: [u - 0.5, 0.5 - v, 0.0],
                    uv: [u, v],
                });
            }
        }

        let stride = columns + 1;
        let mut indices = Vec::with_capacity((columns * rows * 6) as usize);
        for row in 0..rows {
            for column in 0..columns {
                let top_left = row * stride + column;
                let bottom_left = top_left + stride;
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_left + 1,
                    top_left + 1,
                    bottom_left,
                    bottom_left + 1,
                ]);
            }
        }
        Self { vertices, indices }
    }

    pub fn quad() -> Self {
        Self::new(PlaneSegments {
            width: 1,
            height: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_follows_fov_and_aspect() {
        let geometry = ViewportGeometry::compute(1600, 800, 90.0).unwrap();
        assert!((geometry.viewport_height - 2.0 * CAMERA_DISTANCE).abs() < 1e-4);
        assert!((geometry.viewport_width - 4.0 * CAMERA_DISTANCE).abs() < 1e-4);
        assert!(ViewportGeometry::compute(0, 800, 45.0).is_none());
        assert!(ViewportGeometry::compute(800, 0, 45.0).is_none());
    }

    #[test]
    fn flat_track_has_no_offset_or_roll() {
        for x in [-30.0, -1.0, 0.0, 0.5, 12.0, 400.0] {
            assert_eq!(arc_placement(x, 14.0, 0.0), ArcPlacement::FLAT);
        }
    }

    #[test]
    fn arc_is_even_and_roll_is_odd() {
        for bend in [-2.0, -0.5, 1.0, 3.0] {
            for x in [0.25, 3.0, 9.5, 14.0, 40.0] {
                let right = arc_placement(x, 14.0, bend);
                let left = arc_placement(-x, 14.0, bend);
                assert_eq!(right.y, left.y);
                assert_eq!(right.rotation_z, -left.rotation_z);
            }
        }
    }

    #[test]
    fn bend_sign_flips_the_bow() {
        let up = arc_placement(10.0, 14.0, -2.0);
        let down = arc_placement(10.0, 14.0, 2.0);
        assert!(up.y > 0.0);
        assert_eq!(down.y, -up.y);
        assert_eq!(down.rotation_z, -up.rotation_z);
    }

    #[test]
    fn sagitta_at_the_edge_equals_bend() {
        let edge = arc_placement(14.0, 14.0, -2.0);
        assert!((edge.y - 2.0).abs() < 1e-4);
        let beyond = arc_placement(50.0, 14.0, -2.0);
        assert_eq!(edge, beyond);
    }

    #[test]
    fn plane_mesh_counts() {
        let mesh = PlaneMesh::new(PlaneSegments {
            width: 4,
            height: 2,
        });
        assert_eq!(mesh.vertices.len(), 15);
        assert_eq!(mesh.indices.len(), 48);
        assert_eq!(mesh.vertices[0].position, [-0.5, 0.5, 0.0]);
        assert_eq!(mesh.vertices[0].uv, [0.0, 0.0]);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert_eq!(PlaneMesh::quad().indices.len(), 6);
    }
}
