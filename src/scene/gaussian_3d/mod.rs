pub mod config;
pub mod property;
pub mod render;

pub use crate::error::Error;
pub use burn::{
    module::{Module, Param},
    tensor::{backend::Backend, Tensor, TensorData},
};
pub use config::*;
pub use render::*;

use std::fmt;

/// The points of a 3D Gaussian splatting scene as tensors.
///
/// The fields hold the inner values, which are activated by the getters.
#[derive(Module)]
pub struct Gaussian3dScene<B: Backend> {
    /// `[P, M * 3]`
    pub colors_sh: Param<Tensor<B, 2>>,
    /// `[P, 1]`
    pub opacities: Param<Tensor<B, 2>>,
    /// `[P, 3]`
    pub positions: Param<Tensor<B, 2>>,
    /// `[P, 4]`
    pub rotations: Param<Tensor<B, 2>>,
    /// `[P, 3]`
    pub scalings: Param<Tensor<B, 2>>,
}

impl<B: Backend> fmt::Debug for Gaussian3dScene<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct(&format!("Gaussian3dScene<{}>", B::name()))
            .field("device", &self.device())
            .field("point_count", &self.point_count())
            .field("size", &self.size_readable())
            .finish()
    }
}
