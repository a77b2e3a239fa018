//! Real spherical harmonics for view-dependent colors.

use std::{f64::consts::PI, sync::LazyLock};

/// The maximum degree of spherical harmonics
pub const SH_DEGREE_MAX: u32 = 3;

/// The count of spherical harmonics coefficients of [`SH_DEGREE_MAX`]
pub const SH_COUNT_MAX: usize = sh_count(SH_DEGREE_MAX);

/// The offset added to the evaluated colors, re-centering them around mid-gray.
pub const SH_COLOR_OFFSET: f32 = 0.5;

/// The real coefficients of orthonormalized spherical harmonics from degree 0 to 3
///
/// The signs of the basis polynomials are folded into the coefficients.
///
/// ## Examples
///
/// ```rust
/// use gausplat_rasterizer::spherical_harmonics::SH_COEF;
///
/// assert_eq!(SH_COEF.0[0], 0.28209479177387814);
/// assert_eq!(SH_COEF.1[0], -0.4886025119029199);
/// assert_eq!(SH_COEF.2[2], 0.31539156525252005);
/// assert_eq!(SH_COEF.3[3 + 2], 1.445305721320277);
/// ```
#[allow(clippy::type_complexity)]
pub static SH_COEF: LazyLock<([f64; 1], [f64; 3], [f64; 5], [f64; 7])> =
    LazyLock::new(|| {
        (
            [(1.0 / 4.0 / PI).sqrt()],
            [
                -(3.0 / 4.0 / PI).sqrt(),
                (3.0 / 4.0 / PI).sqrt(),
                -(3.0 / 4.0 / PI).sqrt(),
            ],
            [
                (15.0 / 4.0 / PI).sqrt(),
                -(15.0 / 4.0 / PI).sqrt(),
                (5.0 / 16.0 / PI).sqrt(),
                -(15.0 / 4.0 / PI).sqrt(),
                (15.0 / 16.0 / PI).sqrt(),
            ],
            [
                -(35.0 / 32.0 / PI).sqrt(),
                (105.0 / 4.0 / PI).sqrt(),
                -(21.0 / 32.0 / PI).sqrt(),
                (7.0 / 16.0 / PI).sqrt(),
                -(21.0 / 32.0 / PI).sqrt(),
                (105.0 / 16.0 / PI).sqrt(),
                -(35.0 / 32.0 / PI).sqrt(),
            ],
        )
    });

/// The coefficients of [`SH_COEF`] flattened in basis order as `f32`.
static SH_COEF_F32: LazyLock<[f32; SH_COUNT_MAX]> = LazyLock::new(|| {
    let (c0, c1, c2, c3) = *SH_COEF;
    let mut coefficients = [0.0; SH_COUNT_MAX];
    c0.iter()
        .chain(&c1)
        .chain(&c2)
        .chain(&c3)
        .zip(coefficients.iter_mut())
        .for_each(|(source, target)| *target = *source as f32);
    coefficients
});

/// The count of coefficients for the given degree, i.e., `(D + 1) ^ 2`.
#[inline]
pub const fn sh_count(degree: u32) -> usize {
    (degree as usize + 1) * (degree as usize + 1)
}

/// Evaluating the weighted basis polynomials up to `degree` at the unit `direction`.
///
/// Only the first [`sh_count(degree)`](sh_count) entries are meaningful,
/// the rest are zeros.
pub fn sh_basis(
    degree: u32,
    direction: [f32; 3],
) -> [f32; SH_COUNT_MAX] {
    let c = &*SH_COEF_F32;
    let [x, y, z] = direction;
    let mut basis = [0.0; SH_COUNT_MAX];

    basis[0] = c[0];
    if degree < 1 {
        return basis;
    }

    basis[1] = c[1] * y;
    basis[2] = c[2] * z;
    basis[3] = c[3] * x;
    if degree < 2 {
        return basis;
    }

    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, yz, xz) = (x * y, y * z, x * z);
    basis[4] = c[4] * xy;
    basis[5] = c[5] * yz;
    basis[6] = c[6] * (2.0 * zz - xx - yy);
    basis[7] = c[7] * xz;
    basis[8] = c[8] * (xx - yy);
    if degree < 3 {
        return basis;
    }

    basis[9] = c[9] * y * (3.0 * xx - yy);
    basis[10] = c[10] * xy * z;
    basis[11] = c[11] * y * (4.0 * zz - xx - yy);
    basis[12] = c[12] * z * (2.0 * zz - 3.0 * xx - 3.0 * yy);
    basis[13] = c[13] * x * (4.0 * zz - xx - yy);
    basis[14] = c[14] * z * (xx - yy);
    basis[15] = c[15] * x * (xx - 3.0 * yy);
    basis
}

/// Transforming the colors from SH space to RGB space.
///
/// ## Arguments
///
/// * `colors_sh` - `[M, 3]`, where `M >= (D + 1) ^ 2`.
/// * `colors_sh_degree` - `D`, no more than [`SH_DEGREE_MAX`].
/// * `position` - The point position in world space.
/// * `view_position` - The camera position in world space.
///
/// ## Returns
///
/// The RGB color clamped to non-negative values,
/// and whether each channel was negative before clamping.
///
/// A zero displacement from the camera yields NaN, which is propagated.
///
/// ## Examples
///
/// ```rust
/// use gausplat_rasterizer::spherical_harmonics::colors_rgb_from_sh;
///
/// let (color_rgb, is_clamped) =
///     colors_rgb_from_sh(&[[0.0; 3]], 0, [0.0, 0.0, 1.0], [0.0; 3]);
/// assert_eq!(color_rgb, [0.5; 3]);
/// assert_eq!(is_clamped, [false; 3]);
/// ```
pub fn colors_rgb_from_sh(
    colors_sh: &[[f32; 3]],
    colors_sh_degree: u32,
    position: [f32; 3],
    view_position: [f32; 3],
) -> ([f32; 3], [bool; 3]) {
    let offset = [
        position[0] - view_position[0],
        position[1] - view_position[1],
        position[2] - view_position[2],
    ];
    let norm = (offset[0] * offset[0]
        + offset[1] * offset[1]
        + offset[2] * offset[2])
        .sqrt();
    let direction = offset.map(|o| o / norm);

    let basis = sh_basis(colors_sh_degree, direction);
    let count = sh_count(colors_sh_degree).min(colors_sh.len());

    let mut color_rgb = [0.0; 3];
    for (coefficient, weight) in colors_sh[..count].iter().zip(&basis) {
        color_rgb[0] += coefficient[0] * weight;
        color_rgb[1] += coefficient[1] * weight;
        color_rgb[2] += coefficient[2] * weight;
    }

    let color_rgb = color_rgb.map(|c| c + SH_COLOR_OFFSET);
    let is_clamped = color_rgb.map(|c| c < 0.0);
    let color_rgb = color_rgb.map(|c| if c < 0.0 { 0.0 } else { c });
    (color_rgb, is_clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sh_count_by_degree() {
        assert_eq!(sh_count(0), 1);
        assert_eq!(sh_count(1), 4);
        assert_eq!(sh_count(2), 9);
        assert_eq!(sh_count(3), 16);
        assert_eq!(SH_COUNT_MAX, 16);
    }

    #[test]
    fn colors_rgb_from_sh_zero_coefficients() {
        let (color_rgb, is_clamped) =
            colors_rgb_from_sh(&[[0.0; 3]], 0, [1.0, 2.0, 3.0], [0.0; 3]);

        assert_eq!(color_rgb, [0.5, 0.5, 0.5]);
        assert_eq!(is_clamped, [false, false, false]);
    }

    #[test]
    fn colors_rgb_from_sh_negative_is_clamped() {
        let (color_rgb, is_clamped) =
            colors_rgb_from_sh(&[[-2.0; 3]], 0, [0.0, 0.0, 5.0], [0.0; 3]);

        assert_eq!(color_rgb, [0.0, 0.0, 0.0]);
        assert_eq!(is_clamped, [true, true, true]);

        let value = -2.0 * 0.28209479177387814_f32 + 0.5;
        assert!((value - -0.0641896).abs() < 1e-6, "value: {value}");
    }

    #[test]
    fn colors_rgb_from_sh_partial_clamp() {
        let (color_rgb, is_clamped) = colors_rgb_from_sh(
            &[[-2.0, 0.0, 1.0]],
            0,
            [0.0, 0.0, 5.0],
            [0.0; 3],
        );

        assert_eq!(color_rgb[0], 0.0);
        assert_eq!(color_rgb[1], 0.5);
        assert!((color_rgb[2] - 0.7820948).abs() < 1e-6);
        assert_eq!(is_clamped, [true, false, false]);
    }

    #[test]
    fn colors_rgb_from_sh_degree_1_depends_on_direction() {
        // Only the z-linear basis is set.
        let colors_sh = [[0.0; 3], [0.0; 3], [2.0; 3], [0.0; 3]];
        let c1 = SH_COEF.1[1] as f32;

        let (front, _) =
            colors_rgb_from_sh(&colors_sh, 1, [0.0, 0.0, 2.0], [0.0; 3]);
        let (back, is_clamped) =
            colors_rgb_from_sh(&colors_sh, 1, [0.0, 0.0, -2.0], [0.0; 3]);

        assert!((front[0] - (0.5 + 2.0 * c1)).abs() < 1e-6);
        assert_eq!(back, [0.0; 3]);
        assert_eq!(is_clamped, [true; 3]);
    }

    #[test]
    fn colors_rgb_from_sh_degree_is_respected() {
        let colors_sh = [[0.25; 3]; SH_COUNT_MAX];
        let position = [0.3, -0.4, 1.2];

        let (degree_0, _) = colors_rgb_from_sh(&colors_sh, 0, position, [0.0; 3]);
        let (degree_3, _) = colors_rgb_from_sh(&colors_sh, 3, position, [0.0; 3]);

        let expected = 0.25 * SH_COEF.0[0] as f32 + 0.5;
        assert_eq!(degree_0, [expected; 3]);
        assert_ne!(degree_0, degree_3);
    }

    #[test]
    fn colors_rgb_from_sh_zero_direction_is_nan() {
        let colors_sh = [[0.0; 3], [1.0; 3], [1.0; 3], [1.0; 3]];
        let (color_rgb, _) =
            colors_rgb_from_sh(&colors_sh, 1, [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);

        assert!(color_rgb.iter().all(|c| c.is_nan()));
    }

    #[test]
    fn sh_basis_along_z_axis() {
        let basis = sh_basis(2, [0.0, 0.0, 1.0]);
        let c = &*SH_COEF_F32;

        assert_eq!(basis[0], c[0]);
        assert_eq!(basis[1], 0.0);
        assert_eq!(basis[2], c[2]);
        assert_eq!(basis[6], c[6] * 2.0);
        assert!(basis[9..].iter().all(|b| *b == 0.0));
    }
}
