pub use super::*;

use burn::tensor::activation;
use humansize::{format_size, BINARY};

/// Outer property value getters
impl<B: Backend> Gaussian3dScene<B> {
    /// Colors in SH space.
    ///
    /// The shape is `[P, M * 3]`, which derives from `[P, M, 3]`.
    /// `M` is [`SH_COUNT_MAX`](crate::spherical_harmonics::SH_COUNT_MAX).
    #[inline]
    pub fn get_colors_sh(&self) -> Tensor<B, 2> {
        self.colors_sh.val()
    }

    /// Opacities ranging from `0.0` to `1.0`.
    ///
    /// The shape is `[P, 1]`.
    #[inline]
    pub fn get_opacities(&self) -> Tensor<B, 2> {
        Self::make_opacities(self.opacities.val())
    }

    /// The shape is `[P, 3]`.
    #[inline]
    pub fn get_positions(&self) -> Tensor<B, 2> {
        self.positions.val()
    }

    /// Normalized Hamilton quaternions in scalar-last order, i.e., `[x, y, z, w]`.
    ///
    /// The shape is `[P, 4]`.
    #[inline]
    pub fn get_rotations(&self) -> Tensor<B, 2> {
        Self::make_rotations(self.rotations.val())
    }

    /// The shape is `[P, 3]`.
    #[inline]
    pub fn get_scalings(&self) -> Tensor<B, 2> {
        Self::make_scalings(self.scalings.val())
    }
}

/// Activations from inner values to outer values, and their inverses
impl<B: Backend> Gaussian3dScene<B> {
    /// `sigmoid(x)`
    #[inline]
    pub fn make_opacities(opacities: Tensor<B, 2>) -> Tensor<B, 2> {
        activation::sigmoid(opacities)
    }

    /// `x / |x|`
    #[inline]
    pub fn make_rotations(rotations: Tensor<B, 2>) -> Tensor<B, 2> {
        rotations
            .to_owned()
            .div(rotations.powf_scalar(2.0).sum_dim(1).sqrt())
    }

    /// `exp(x)`
    #[inline]
    pub fn make_scalings(scalings: Tensor<B, 2>) -> Tensor<B, 2> {
        scalings.exp()
    }

    /// `log(x / (1 - x))`
    #[inline]
    pub fn make_inner_opacities(opacities: Tensor<B, 2>) -> Tensor<B, 2> {
        opacities.to_owned().div(-opacities + 1.0).log()
    }

    /// `log(x)`
    #[inline]
    pub fn make_inner_scalings(scalings: Tensor<B, 2>) -> Tensor<B, 2> {
        scalings.log()
    }
}

/// Outer property value setters
impl<B: Backend> Gaussian3dScene<B> {
    pub fn set_colors_sh(
        &mut self,
        colors_sh: Tensor<B, 2>,
    ) -> &mut Self {
        self.colors_sh =
            Param::initialized(self.colors_sh.id.to_owned(), colors_sh);
        self
    }

    pub fn set_opacities(
        &mut self,
        opacities: Tensor<B, 2>,
    ) -> &mut Self {
        self.opacities = Param::initialized(
            self.opacities.id.to_owned(),
            Self::make_inner_opacities(opacities),
        );
        self
    }

    pub fn set_positions(
        &mut self,
        positions: Tensor<B, 2>,
    ) -> &mut Self {
        self.positions =
            Param::initialized(self.positions.id.to_owned(), positions);
        self
    }

    /// The rotations are stored as given and normalized by the getter.
    pub fn set_rotations(
        &mut self,
        rotations: Tensor<B, 2>,
    ) -> &mut Self {
        self.rotations =
            Param::initialized(self.rotations.id.to_owned(), rotations);
        self
    }

    pub fn set_scalings(
        &mut self,
        scalings: Tensor<B, 2>,
    ) -> &mut Self {
        self.scalings = Param::initialized(
            self.scalings.id.to_owned(),
            Self::make_inner_scalings(scalings),
        );
        self
    }
}

/// Attribute getters
impl<B: Backend> Gaussian3dScene<B> {
    #[inline]
    pub fn device(&self) -> B::Device {
        self.positions.device()
    }

    /// `P`
    #[inline]
    pub fn point_count(&self) -> usize {
        self.positions.dims()[0]
    }

    /// Number of bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.num_params() * size_of::<B::FloatElem>()
    }

    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}
