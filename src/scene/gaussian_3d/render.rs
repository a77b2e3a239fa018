pub use super::*;
pub use crate::render::{gaussian_3d::Gaussian3dRenderOptions, View};

use crate::{
    render::gaussian_3d::{render, ColorSource, RenderInput, ShapeSource},
    spherical_harmonics::SH_COUNT_MAX,
};
use burn::tensor::Int;
use std::fmt;

#[derive(Clone)]
pub struct Gaussian3dRenderOutput<B: Backend> {
    /// `[3, I_y, I_x]`
    pub colors_rgb_2d: Tensor<B, 3>,
    /// `[I_y, I_x]`
    pub depths_2d: Tensor<B, 2>,
    /// `[P]`
    pub radii: Tensor<B, 1, Int>,
    /// `[I_y, I_x]`
    pub transmittances: Tensor<B, 2>,
}

impl<B: Backend> Gaussian3dScene<B> {
    /// Rendering the scene on the host.
    ///
    /// The properties are read back from the device,
    /// and the outputs are written to it.
    pub fn render(
        &self,
        view: &View,
        options: &Gaussian3dRenderOptions,
    ) -> Result<Gaussian3dRenderOutput<B>, Error> {
        let device = self.device();

        let colors_sh = into_vec(self.get_colors_sh())?;
        let opacities = into_vec(self.get_opacities())?;
        let positions = into_vec(self.get_positions())?;
        let rotations = into_vec(self.get_rotations())?;
        let scalings = into_vec(self.get_scalings())?;

        let output = render(
            RenderInput {
                colors: ColorSource::Sh {
                    colors_sh: cast_slice(&colors_sh)?,
                    colors_sh_count: SH_COUNT_MAX,
                },
                opacities: &opacities,
                positions: cast_slice(&positions)?,
                shapes: ShapeSource::Transform {
                    rotations: cast_slice(&rotations)?,
                    scalings: cast_slice(&scalings)?,
                },
            },
            view,
            options,
        )?;

        let image_size_x = view.image_width as usize;
        let image_size_y = view.image_height as usize;
        let point_count = output.radii.len();
        let radii = output
            .radii
            .into_iter()
            .map(|radius| radius.min(i32::MAX as u32) as i32)
            .collect::<Vec<_>>();

        Ok(Gaussian3dRenderOutput {
            colors_rgb_2d: Tensor::from_data(
                TensorData::new(
                    output.colors_rgb_2d,
                    [3, image_size_y, image_size_x],
                )
                .convert::<B::FloatElem>(),
                &device,
            ),
            depths_2d: Tensor::from_data(
                TensorData::new(output.depths_2d, [image_size_y, image_size_x])
                    .convert::<B::FloatElem>(),
                &device,
            ),
            radii: Tensor::from_data(
                TensorData::new(radii, [point_count]).convert::<B::IntElem>(),
                &device,
            ),
            transmittances: Tensor::from_data(
                TensorData::new(
                    output.transmittances,
                    [image_size_y, image_size_x],
                )
                .convert::<B::FloatElem>(),
                &device,
            ),
        })
    }
}

impl<B: Backend> fmt::Debug for Gaussian3dRenderOutput<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct(&format!("Gaussian3dRenderOutput<{}>", B::name()))
            .field("colors_rgb_2d.dims()", &self.colors_rgb_2d.dims())
            .field("depths_2d.dims()", &self.depths_2d.dims())
            .field("radii.dims()", &self.radii.dims())
            .field("transmittances.dims()", &self.transmittances.dims())
            .finish()
    }
}

fn into_vec<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<f32>, Error> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|error| Error::TensorData(format!("{error:?}")))
}

fn cast_slice<T: bytemuck::Pod>(values: &[f32]) -> Result<&[T], Error> {
    bytemuck::try_cast_slice(values)
        .map_err(|error| Error::TensorData(error.to_string()))
}
