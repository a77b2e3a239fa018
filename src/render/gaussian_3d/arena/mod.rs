//! Per-frame storage of the projected points.

pub use super::kernel::tile::TileBound;

use humansize::{format_size, BINARY};
use std::mem::size_of;

/// A point projected onto screen space.
///
/// A culled point keeps the default values, i.e., zero radius.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProjectedPoint {
    /// `[R, G, B]`
    pub color_rgb: [f32; 3],
    /// `[a, b, c, o]`
    ///
    /// The upper triangle of the inverse 2D covariance,
    /// `[[a, b], [b, c]]`, followed by the opacity.
    pub conic_opacity: [f32; 4],
    /// The view-space depth.
    pub depth: f32,
    pub is_color_rgb_clamped: [bool; 3],
    /// The center in pixels.
    pub position_2d: [f32; 2],
    /// The pixel radius, `0` if culled.
    pub radius: u32,
    pub tile_bound: TileBound,
    pub tile_touched_count: u32,
}

impl ProjectedPoint {
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.radius > 0
    }
}

/// The frame-scoped storage owned by one render call.
///
/// Each slot is indexed by the point id, and only its own work item writes it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameArena {
    /// `[P, 6]`
    ///
    /// The upper triangle `xx xy xz yy yz zz` of the 3D covariances.
    pub covariances_3d: Vec<[f32; 6]>,
    /// `[P]`
    pub points: Vec<ProjectedPoint>,
}

impl FrameArena {
    pub fn new(point_count: usize) -> Self {
        Self {
            covariances_3d: vec![[0.0; 6]; point_count],
            points: vec![ProjectedPoint::default(); point_count],
        }
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.covariances_3d.len() * size_of::<[f32; 6]>()
            + self.points.len() * size_of::<ProjectedPoint>()
    }

    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }

    /// The count of visible points.
    pub fn visible_count(&self) -> usize {
        self.points.iter().filter(|point| point.is_visible()).count()
    }
}
