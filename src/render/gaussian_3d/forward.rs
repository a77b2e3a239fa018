/// The points to render, borrowed for one call.
///
/// `P` is the point count.
#[derive(Clone, Copy, Debug)]
pub struct RenderInput<'a> {
    pub colors: ColorSource<'a>,
    /// `[P]`, each in `[0, 1]`.
    pub opacities: &'a [f32],
    /// `[P, 3]`
    pub positions: &'a [[f32; 3]],
    pub shapes: ShapeSource<'a>,
}

/// Where the colors of the points come from.
#[derive(Clone, Copy, Debug)]
pub enum ColorSource<'a> {
    /// Evaluating the SH coefficients toward the view.
    Sh {
        /// `[P, M, 3]`
        colors_sh: &'a [[f32; 3]],
        /// `M`, at least `(D + 1) ^ 2`.
        colors_sh_count: usize,
    },
    /// `[P, 3]`
    Rgb(&'a [[f32; 3]]),
}

/// Where the 3D covariances of the points come from.
#[derive(Clone, Copy, Debug)]
pub enum ShapeSource<'a> {
    /// Computing `Σ = (R S) (R S)^T`.
    Transform {
        /// `[P, 4]`, the quaternions `[x, y, z, w]`.
        ///
        /// They are normalized before use.
        rotations: &'a [[f32; 4]],
        /// `[P, 3]`
        scalings: &'a [[f32; 3]],
    },
    /// `[P, 6]`, the upper triangles `xx xy xz yy yz zz`.
    Covariance(&'a [[f32; 6]]),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderOutput {
    /// `[3, I_y, I_x]`
    pub colors_rgb_2d: Vec<f32>,
    /// `[P, 3]`, only if evaluated from SH.
    pub colors_rgb_3d: Option<Vec<[f32; 3]>>,
    /// `[P, 4]`
    pub conics_opacities: Vec<[f32; 4]>,
    /// `[P, 6]`, only if computed from rotations and scalings.
    pub covariances_3d: Option<Vec<[f32; 6]>>,
    /// `[P]`
    pub depths: Vec<f32>,
    /// `[I_y, I_x]`
    pub depths_2d: Vec<f32>,
    /// `[P, 3]`
    pub is_colors_rgb_3d_clamped: Vec<[bool; 3]>,
    /// `[I_y, I_x]`
    pub pixel_contributor_counts: Vec<u32>,
    /// `[P]`
    pub point_rendered_counts: Vec<u32>,
    /// `[P, 2]`
    pub positions_2d: Vec<[f32; 2]>,
    /// `[P]`
    pub radii: Vec<u32>,
    /// `T`
    pub tile_point_count: usize,
    /// `[P]`
    pub tile_touched_counts: Vec<u32>,
    /// `[I_y, I_x]`
    pub transmittances: Vec<f32>,
}

impl RenderInput<'_> {
    /// `P`
    #[inline]
    pub fn point_count(&self) -> usize {
        self.positions.len()
    }
}
