/// A view in 3D space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct View {
    /// The horizontal field of view in radians.
    pub field_of_view_x: f64,
    /// The vertical field of view in radians.
    pub field_of_view_y: f64,
    /// Image height.
    pub image_height: u32,
    /// Image width.
    pub image_width: u32,
    /// Position in world space.
    pub view_position: [f64; 3],
    /// Affine transformation from world space to view space.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    ///
    /// # Format
    ///
    /// ```plaintext
    /// [R_v   | T_v]
    /// [...   | ...]
    /// [0 0 0 | 1  ]
    /// ```
    pub view_transform: [[f64; 4]; 4],
}

/// Linear transformations.
impl View {
    /// Returns the affine transformation matrix.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    #[inline]
    pub const fn transform(
        rotation: &[[f64; 3]; 3],
        translation: &[f64; 3],
    ) -> [[f64; 4]; 4] {
        let r = rotation;
        let t = translation;
        [
            [r[0][0], r[0][1], r[0][2], 0.0],
            [r[1][0], r[1][1], r[1][2], 0.0],
            [r[2][0], r[2][1], r[2][2], 0.0],
            [t[0], t[1], t[2], 1.0],
        ]
    }

    /// Returns the perspective transformation from view space to clip space.
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    /// The clip `w` is the view-space depth.
    ///
    /// # Format
    ///
    /// ```plaintext
    /// [1 / tan(Fov_x / 2) | 0                  | 0           | 0               ]
    /// [0                  | 1 / tan(Fov_y / 2) | 0           | 0               ]
    /// [0                  | 0                  | f / (f - n) | -f * n / (f - n)]
    /// [0                  | 0                  | 1           | 0               ]
    /// ```
    pub fn perspective_transform(
        &self,
        depth_near: f64,
        depth_far: f64,
    ) -> [[f64; 4]; 4] {
        let depth_range = depth_far - depth_near;
        [
            [1.0 / self.field_of_view_x_half_tan(), 0.0, 0.0, 0.0],
            [0.0, 1.0 / self.field_of_view_y_half_tan(), 0.0, 0.0],
            [0.0, 0.0, depth_far / depth_range, 1.0],
            [0.0, 0.0, -depth_far * depth_near / depth_range, 0.0],
        ]
    }

    /// Returns the full projection from world space to clip space,
    /// i.e., the perspective transformation applied after [`Self::view_transform`].
    ///
    /// It is in **column-major order**, i.e., `M[col][row]`.
    pub fn projection_transform(
        &self,
        depth_near: f64,
        depth_far: f64,
    ) -> [[f64; 4]; 4] {
        let lhs = self.perspective_transform(depth_near, depth_far);
        let rhs = &self.view_transform;

        let mut product = [[0.0; 4]; 4];
        for (col, product_col) in product.iter_mut().enumerate() {
            for (row, value) in product_col.iter_mut().enumerate() {
                *value = (0..4).map(|k| lhs[k][row] * rhs[col][k]).sum();
            }
        }
        product
    }
}

/// Camera intrinsics.
impl View {
    /// `tan(Fov_x / 2)`
    #[inline]
    pub fn field_of_view_x_half_tan(&self) -> f64 {
        (self.field_of_view_x / 2.0).tan()
    }

    /// `tan(Fov_y / 2)`
    #[inline]
    pub fn field_of_view_y_half_tan(&self) -> f64 {
        (self.field_of_view_y / 2.0).tan()
    }

    /// `F_x <- I_x / tan(Fov_x / 2) / 2`
    #[inline]
    pub fn focal_length_x(&self) -> f64 {
        self.image_width as f64 / self.field_of_view_x_half_tan() / 2.0
    }

    /// `F_y <- I_y / tan(Fov_y / 2) / 2`
    #[inline]
    pub fn focal_length_y(&self) -> f64 {
        self.image_height as f64 / self.field_of_view_y_half_tan() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_identity() -> View {
        View {
            field_of_view_x: std::f64::consts::FRAC_PI_2,
            field_of_view_y: std::f64::consts::FRAC_PI_2,
            image_height: 32,
            image_width: 64,
            view_position: [0.0; 3],
            view_transform: View::transform(
                &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                &[0.0; 3],
            ),
        }
    }

    #[test]
    fn transform() {
        let target = [
            [0.9870946659543874, 0.011754269038001336, 0.1597058471183149, 0.0],
            [-0.000481623211642526, 0.9975159094549839, -0.07043989227191047, 0.0],
            [-0.1601370927782764, 0.0694539238889973, 0.9846482945564589, 0.0],
            [0.129242027423, 0.0, -0.3424233862, 1.0],
        ];
        let output = View::transform(
            &[
                [0.9870946659543874, 0.011754269038001336, 0.1597058471183149],
                [-0.000481623211642526, 0.9975159094549839, -0.07043989227191047],
                [-0.1601370927782764, 0.0694539238889973, 0.9846482945564589],
            ],
            &[0.129242027423, 0.0, -0.3424233862],
        );
        assert_eq!(output, target);
    }

    #[test]
    fn focal_lengths() {
        let view = view_identity();

        assert!((view.field_of_view_x_half_tan() - 1.0).abs() < 1e-12);
        assert!((view.focal_length_x() - 32.0).abs() < 1e-9);
        assert!((view.focal_length_y() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn projection_transform_maps_depth_to_w() {
        let mut view = view_identity();
        // Moving the world 2 units forward along the view axis.
        view.view_transform[3][2] = 2.0;

        let projection = view.projection_transform(0.01, 100.0);
        let point = [1.0, -0.5, 2.0, 1.0];
        let clip = (0..4)
            .map(|row| (0..4).map(|col| projection[col][row] * point[col]).sum())
            .collect::<Vec<f64>>();

        assert!((clip[3] - 4.0).abs() < 1e-12);
        assert!((clip[0] / clip[3] - 0.25).abs() < 1e-12);
        assert!((clip[1] / clip[3] + 0.125).abs() < 1e-12);
        assert!(clip[2] / clip[3] > 0.0 && clip[2] / clip[3] < 1.0);
    }
}
