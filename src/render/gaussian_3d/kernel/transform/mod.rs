//! Transforming the points.

pub use super::*;

use crate::spherical_harmonics::colors_rgb_from_sh;
use rayon::prelude::*;

/// Arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Arguments {
    /// `D`
    pub colors_sh_degree_max: u32,
    /// The farthest visible view-space depth.
    pub depth_far: f32,
    /// The nearest view-space depth, exclusive.
    pub depth_near: f32,
    /// `F_x <- I_x / tan(Fov_x / 2) / 2`
    pub focal_length_x: f32,
    /// `F_y <- I_y / tan(Fov_y / 2) / 2`
    pub focal_length_y: f32,
    /// `I_x`
    pub image_size_x: u32,
    /// `I_y`
    pub image_size_y: u32,
    /// Skipping the frustum test if `true`.
    pub is_prefiltered: bool,
    /// The transformation from world space to clip space.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    pub projection_transform: [[f32; 4]; 4],
    pub scaling_modifier: f32,
    /// `I_x / T_x`
    pub tile_count_x: u32,
    /// `I_y / T_y`
    pub tile_count_y: u32,
    /// `tan(Fov_x / 2) * C_b`
    ///
    /// `C_b` is [`VIEW_BOUND_FACTOR`].
    pub view_bound_x: f32,
    /// `tan(Fov_y / 2) * C_b`
    ///
    /// `C_b` is [`VIEW_BOUND_FACTOR`].
    pub view_bound_y: f32,
    /// The camera position in world space.
    pub view_position: [f32; 3],
    /// The transformation from world space to view space.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    pub view_transform: [[f32; 4]; 4],
}

/// `C_f`, added to the diagonal of 2D covariances.
pub const FILTER_LOW_PASS: f32 = 0.3;
/// The minimum of the eigenvalue discriminant.
pub const DISCRIMINANT_MIN: f32 = 0.1;
/// The radius in standard deviations.
pub const RADIUS_FACTOR: f32 = 3.0;
/// `C_b`, the guard band of the Jacobian around the view frustum.
pub const VIEW_BOUND_FACTOR: f64 = 1.3;
/// The depth range of [`View::projection_transform`] used for screen positions.
///
/// It only affects the clip `z`, which is not used.
pub const PROJECTION_DEPTH_RANGE: (f64, f64) = (0.01, 100.0);

impl Arguments {
    pub fn new(
        view: &View,
        options: &Gaussian3dRenderOptions,
    ) -> Self {
        // I_x, I_y
        let image_size_x = view.image_width;
        let image_size_y = view.image_height;
        // I_x / T_x, I_y / T_y
        let (tile_count_x, tile_count_y) =
            tile_counts(image_size_x, image_size_y);
        let (projection_depth_near, projection_depth_far) =
            PROJECTION_DEPTH_RANGE;

        Self {
            colors_sh_degree_max: options.colors_sh_degree_max,
            depth_far: options.depth_far,
            depth_near: options.depth_near,
            focal_length_x: view.focal_length_x() as f32,
            focal_length_y: view.focal_length_y() as f32,
            image_size_x,
            image_size_y,
            is_prefiltered: options.is_prefiltered,
            projection_transform: view
                .projection_transform(projection_depth_near, projection_depth_far)
                .map(|col| col.map(|value| value as f32)),
            scaling_modifier: options.scaling_modifier,
            tile_count_x,
            tile_count_y,
            view_bound_x: (view.field_of_view_x_half_tan() * VIEW_BOUND_FACTOR)
                as f32,
            view_bound_y: (view.field_of_view_y_half_tan() * VIEW_BOUND_FACTOR)
                as f32,
            view_position: view.view_position.map(|value| value as f32),
            view_transform: view
                .view_transform
                .map(|col| col.map(|value| value as f32)),
        }
    }
}

/// Transforming the points into the arena.
///
/// For each point, independently:
///
/// 1. Transform the position from world space to view space and
///    cull it if the depth is out of `(depth_near, depth_far]`.
/// 2. Take the 3D covariance, computing `(R S) (R S)^T` if it is not given.
/// 3. Project the position onto screen space.
/// 4. Project the 3D covariance onto screen space with the Jacobian
///    of the perspective projection and apply the low-pass filter.
/// 5. Invert it into the conic and bound it by a radius of 3 standard deviations.
/// 6. Bin it into tiles.
/// 7. Resolve the color.
///
/// Culled points keep the default slot, i.e., zero radius.
pub fn main(
    arguments: &Arguments,
    inputs: &RenderInput,
    arena: &mut FrameArena,
) {
    let FrameArena {
        covariances_3d,
        points,
    } = arena;

    points
        .par_iter_mut()
        .zip(covariances_3d.par_iter_mut())
        .enumerate()
        .for_each(|(index, (point, covariance_3d))| {
            *point = transform_point(arguments, inputs, index, covariance_3d);
        });
}

/// Transforming the point at `index`.
///
/// The computed 3D covariance is written to `covariance_3d`.
pub fn transform_point(
    arguments: &Arguments,
    inputs: &RenderInput,
    index: usize,
    covariance_3d: &mut [f32; 6],
) -> ProjectedPoint {
    let position_3d = inputs.positions[index];

    // P_v
    let position_view =
        transform_affine(&arguments.view_transform, position_3d);
    if !is_in_frustum(arguments, position_view[2]) {
        return ProjectedPoint::default();
    }

    // Σ
    let covariance = match inputs.shapes {
        ShapeSource::Covariance(covariances) => covariances[index],
        ShapeSource::Transform {
            rotations,
            scalings,
        } => {
            *covariance_3d = covariance_3d_from_transform(
                rotations[index],
                scalings[index],
                arguments.scaling_modifier,
            );
            *covariance_3d
        },
    };
    // tr(Σ) is zero if the point has no extent.
    let trace = covariance[0] + covariance[3] + covariance[5];
    if !(trace > 0.0) {
        return ProjectedPoint::default();
    }

    // P'
    let position_clip =
        transform_homogeneous(&arguments.projection_transform, position_3d);
    let w_inv = 1.0 / (position_clip[3] + 1e-7);
    let position_2d = [
        ndc_to_pixel(position_clip[0] * w_inv, arguments.image_size_x),
        ndc_to_pixel(position_clip[1] * w_inv, arguments.image_size_y),
    ];

    // Σ'
    let [a, b, c] = covariance_2d(arguments, position_view, &covariance);
    let det = a * c - b * b;
    if !(det > 0.0) {
        return ProjectedPoint::default();
    }

    // Σ'^-1
    let det_inv = 1.0 / det;
    let conic = [c * det_inv, -b * det_inv, a * det_inv];

    // r
    let mid = 0.5 * (a + c);
    let discriminant = (mid * mid - det).max(DISCRIMINANT_MIN).sqrt();
    let eigenvalue_max = (mid + discriminant).max(mid - discriminant);
    let radius = (RADIUS_FACTOR * eigenvalue_max.sqrt()).ceil() as u32;

    let tile_bound = TileBound::from_position(
        position_2d,
        radius,
        arguments.tile_count_x,
        arguments.tile_count_y,
    );
    if radius == 0 || tile_bound.is_empty() {
        return ProjectedPoint::default();
    }

    let (color_rgb, is_color_rgb_clamped) = match inputs.colors {
        ColorSource::Rgb(colors_rgb) => (colors_rgb[index], [false; 3]),
        ColorSource::Sh {
            colors_sh,
            colors_sh_count,
        } => colors_rgb_from_sh(
            &colors_sh[index * colors_sh_count..(index + 1) * colors_sh_count],
            arguments.colors_sh_degree_max,
            position_3d,
            arguments.view_position,
        ),
    };

    ProjectedPoint {
        color_rgb,
        conic_opacity: [conic[0], conic[1], conic[2], inputs.opacities[index]],
        depth: position_view[2],
        is_color_rgb_clamped,
        position_2d,
        radius,
        tile_bound,
        tile_touched_count: tile_bound.touched_count(),
    }
}

/// Whether the view-space depth lies in `(depth_near, depth_far]`.
///
/// It is always `true` if the points are prefiltered.
#[inline]
pub fn is_in_frustum(
    arguments: &Arguments,
    depth: f32,
) -> bool {
    arguments.is_prefiltered
        || (depth > arguments.depth_near && depth <= arguments.depth_far)
}

/// Whether the world-space position passes the frustum test.
#[inline]
pub fn is_visible(
    arguments: &Arguments,
    position_3d: [f32; 3],
) -> bool {
    let position_view =
        transform_affine(&arguments.view_transform, position_3d);
    is_in_frustum(arguments, position_view[2])
}

/// The rotation matrix of the normalized quaternion `[x, y, z, w]`.
///
/// It is in **row-major order**, i.e., `R[row][col]`.
pub fn rotation_matrix(rotation: [f32; 4]) -> [[f32; 3]; 3] {
    let norm = rotation.iter().map(|q| q * q).sum::<f32>().sqrt();
    let [x, y, z, w] = rotation.map(|q| q / norm);

    [
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - w * z),
            2.0 * (x * z + w * y),
        ],
        [
            2.0 * (x * y + w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - w * x),
        ],
        [
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ]
}

/// `Σ = (R S) (R S)^T` in the upper triangle `xx xy xz yy yz zz`.
pub fn covariance_3d_from_transform(
    rotation: [f32; 4],
    scaling: [f32; 3],
    scaling_modifier: f32,
) -> [f32; 6] {
    let scaling = scaling.map(|s| s * scaling_modifier);
    // M = R S
    let m = rotation_matrix(rotation).map(|row| {
        [row[0] * scaling[0], row[1] * scaling[1], row[2] * scaling[2]]
    });
    let dot = |i: usize, j: usize| {
        m[i][0] * m[j][0] + m[i][1] * m[j][1] + m[i][2] * m[j][2]
    };

    [dot(0, 0), dot(0, 1), dot(0, 2), dot(1, 1), dot(1, 2), dot(2, 2)]
}

/// `Σ' = (J W) Σ (J W)^T + C_f I` in the upper triangle `xx xy yy`.
///
/// `J` is the Jacobian of the perspective projection at `position_view`,
/// and `W` is the rotation of the view transform.
pub fn covariance_2d(
    arguments: &Arguments,
    position_view: [f32; 3],
    covariance_3d: &[f32; 6],
) -> [f32; 3] {
    let [x, y, z] = position_view;
    let bound_x = arguments.view_bound_x;
    let bound_y = arguments.view_bound_y;
    let x = (x / z).max(-bound_x).min(bound_x) * z;
    let y = (y / z).max(-bound_y).min(bound_y) * z;
    let fx = arguments.focal_length_x;
    let fy = arguments.focal_length_y;

    // J
    let j = [
        [fx / z, 0.0, -fx * x / (z * z)],
        [0.0, fy / z, -fy * y / (z * z)],
    ];
    // T = J W
    let w = &arguments.view_transform;
    let t = j.map(|j_row| {
        [0, 1, 2].map(|col| {
            j_row[0] * w[col][0] + j_row[1] * w[col][1] + j_row[2] * w[col][2]
        })
    });
    let [xx, xy, xz, yy, yz, zz] = *covariance_3d;
    let s = [[xx, xy, xz], [xy, yy, yz], [xz, yz, zz]];
    // U = T Σ
    let u = t.map(|t_row| {
        [0, 1, 2].map(|col| {
            t_row[0] * s[0][col] + t_row[1] * s[1][col] + t_row[2] * s[2][col]
        })
    });
    let dot = |r: usize, q: usize| {
        u[r][0] * t[q][0] + u[r][1] * t[q][1] + u[r][2] * t[q][2]
    };

    [
        dot(0, 0) + FILTER_LOW_PASS,
        dot(0, 1),
        dot(1, 1) + FILTER_LOW_PASS,
    ]
}

#[inline]
fn ndc_to_pixel(
    value: f32,
    size: u32,
) -> f32 {
    ((value + 1.0) * size as f32 - 1.0) * 0.5
}

/// `M [P, 1]^T` without the last row.
#[inline]
fn transform_affine(
    m: &[[f32; 4]; 4],
    p: [f32; 3],
) -> [f32; 3] {
    [0, 1, 2].map(|row| {
        m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row]
    })
}

/// `M [P, 1]^T`
#[inline]
fn transform_homogeneous(
    m: &[[f32; 4]; 4],
    p: [f32; 3],
) -> [f32; 4] {
    [0, 1, 2, 3].map(|row| {
        m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row]
    })
}
