pub use super::*;
pub use crate::scene::point::{Point, Points};

use crate::spherical_harmonics::{SH_COEF, SH_COLOR_OFFSET, SH_COUNT_MAX};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use std::{fmt, iter};

/// Initializing a scene from a point cloud.
#[derive(Clone)]
pub struct Gaussian3dSceneConfig<B: Backend> {
    pub device: B::Device,
    /// The initial opacity of every point.
    pub opacity: f32,
    pub points: Points,
    /// The seed of the random scalings.
    pub seed: u64,
}

impl<B: Backend> fmt::Debug for Gaussian3dSceneConfig<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.debug_struct("Gaussian3dSceneConfig")
            .field("device", &self.device)
            .field("opacity", &self.opacity)
            .field("points.len()", &self.points.len())
            .field("seed", &self.seed)
            .finish()
    }
}

impl<B: Backend> Default for Gaussian3dSceneConfig<B> {
    fn default() -> Self {
        Self {
            device: Default::default(),
            opacity: 0.1,
            points: vec![Default::default()],
            seed: 0x3D65,
        }
    }
}

impl<B: Backend> TryFrom<Gaussian3dSceneConfig<B>> for Gaussian3dScene<B> {
    type Error = Error;

    /// The colors of points become the SH coefficients of degree 0,
    /// the rotations are identities,
    /// and the isotropic scalings are sampled from a log-normal distribution.
    fn try_from(config: Gaussian3dSceneConfig<B>) -> Result<Self, Self::Error> {
        let device = config.device;
        // P
        let point_count = config.points.len();

        if point_count == 0 {
            return Err(Error::validation("points.len() (0)", "greater than 0"));
        }
        if !(config.opacity > 0.0 && config.opacity < 1.0) {
            return Err(Error::validation(
                format!("opacity ({})", config.opacity),
                "in (0, 1)",
            ));
        }

        // [P, M * 3] <- [P, M, 3]
        let colors_sh = config
            .points
            .iter()
            .flat_map(|point| {
                point
                    .color_rgb
                    .map(|c| (c - SH_COLOR_OFFSET) / SH_COEF.0[0] as f32)
                    .into_iter()
                    .chain(iter::repeat(0.0).take((SH_COUNT_MAX - 1) * 3))
            })
            .collect::<Vec<f32>>();

        // [P, 3]
        let positions = config
            .points
            .iter()
            .flat_map(|point| point.position.map(|p| p as f32))
            .collect::<Vec<f32>>();

        // [P, 4] (x, y, z, w)
        let rotations = [0.0_f32, 0.0, 0.0, 1.0].repeat(point_count);

        // [P, 3]
        let distribution = LogNormal::new(0.0, std::f32::consts::E)
            .map_err(|error| Error::validation(error.to_string(), "valid"))?;
        let mut sample_max = f32::EPSILON;
        let samples = distribution
            .sample_iter(StdRng::seed_from_u64(config.seed))
            .take(point_count)
            .map(|sample: f32| {
                let sample = sample.max(f32::EPSILON);
                sample_max = sample_max.max(sample);
                sample
            })
            .collect::<Vec<_>>();
        let scalings = samples
            .into_iter()
            .flat_map(|sample| [(sample / sample_max).sqrt().max(f32::EPSILON); 3])
            .collect::<Vec<f32>>();

        let tensor = |values: Vec<f32>, channel_count: usize| {
            Tensor::<B, 2>::from_data(
                TensorData::new(values, [point_count, channel_count])
                    .convert::<B::FloatElem>(),
                &device,
            )
        };

        Ok(Self {
            colors_sh: Param::from_tensor(tensor(colors_sh, SH_COUNT_MAX * 3)),
            opacities: Param::from_tensor(Self::make_inner_opacities(
                Tensor::full([point_count, 1], config.opacity, &device),
            )),
            positions: Param::from_tensor(tensor(positions, 3)),
            rotations: Param::from_tensor(tensor(rotations, 4)),
            scalings: Param::from_tensor(Self::make_inner_scalings(tensor(
                scalings, 3,
            ))),
        })
    }
}

impl<B: Backend> Gaussian3dScene<B> {
    /// Exporting the scene as a point cloud.
    ///
    /// The colors are evaluated from the SH coefficients of degree 0.
    pub fn to_points(&self) -> Result<Points, Error> {
        let point_count = self.point_count();

        let colors_rgb = self
            .get_colors_sh()
            .slice([0..point_count, 0..3])
            .mul_scalar(SH_COEF.0[0])
            .add_scalar(SH_COLOR_OFFSET)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|error| Error::TensorData(format!("{error:?}")))?;
        let positions = self
            .get_positions()
            .into_data()
            .convert::<f64>()
            .to_vec::<f64>()
            .map_err(|error| Error::TensorData(format!("{error:?}")))?;

        Ok(colors_rgb
            .chunks_exact(3)
            .zip(positions.chunks_exact(3))
            .map(|(color_rgb, position)| Point {
                color_rgb: [color_rgb[0], color_rgb[1], color_rgb[2]],
                position: [position[0], position[1], position[2]],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn points() -> Points {
        vec![
            Point {
                color_rgb: [1.0, 0.5, 0.0],
                position: [0.0, -0.5, 0.2],
            },
            Point {
                color_rgb: [0.5, 1.0, 0.2],
                position: [1.0, 0.0, -0.3],
            },
            Point {
                color_rgb: [0.0, 0.0, 0.0],
                position: [0.5, 2.0, 4.0],
            },
        ]
    }

    #[test]
    fn scene_from_config_shapes() {
        let config = Gaussian3dSceneConfig::<NdArray<f32>> {
            points: points(),
            ..Default::default()
        };

        let scene = Gaussian3dScene::try_from(config).unwrap();

        assert_eq!(scene.get_colors_sh().dims(), [3, 48]);
        assert_eq!(scene.get_opacities().dims(), [3, 1]);
        assert_eq!(scene.get_positions().dims(), [3, 3]);
        assert_eq!(scene.get_rotations().dims(), [3, 4]);
        assert_eq!(scene.get_scalings().dims(), [3, 3]);

        Tensor::<NdArray<f32>, 2>::full([3, 1], 0.1, &scene.device())
            .into_data()
            .assert_approx_eq(&scene.get_opacities().into_data(), 5);

        let scalings = scene
            .get_scalings()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!(scalings.iter().all(|s| *s > 0.0 && *s <= 1.0));
        scalings.chunks_exact(3).for_each(|scaling| {
            assert_eq!(scaling[0], scaling[1]);
            assert_eq!(scaling[1], scaling[2]);
        });
    }

    #[test]
    fn scene_from_config_is_seeded() {
        let config = Gaussian3dSceneConfig::<NdArray<f32>> {
            points: points(),
            ..Default::default()
        };

        let scene_1 = Gaussian3dScene::try_from(config.to_owned()).unwrap();
        let scene_2 = Gaussian3dScene::try_from(config).unwrap();

        scene_1
            .get_scalings()
            .into_data()
            .assert_approx_eq(&scene_2.get_scalings().into_data(), 6);
    }

    #[test]
    fn scene_from_config_invalid() {
        let config = Gaussian3dSceneConfig::<NdArray<f32>> {
            points: vec![],
            ..Default::default()
        };
        assert!(Gaussian3dScene::try_from(config).is_err());

        let config = Gaussian3dSceneConfig::<NdArray<f32>> {
            opacity: 1.0,
            ..Default::default()
        };
        assert!(Gaussian3dScene::try_from(config).is_err());
    }

    #[test]
    fn scene_to_points() {
        let config = Gaussian3dSceneConfig::<NdArray<f32>> {
            points: points(),
            ..Default::default()
        };

        let output = Gaussian3dScene::try_from(config).unwrap().to_points().unwrap();

        output.iter().zip(points()).for_each(|(output, target)| {
            output.color_rgb.iter().zip(target.color_rgb).for_each(|(o, t)| {
                assert!((o - t).abs() < 1e-5, "{o} != {t}");
            });
            output.position.iter().zip(target.position).for_each(|(o, t)| {
                assert!((o - t).abs() < 1e-6, "{o} != {t}");
            });
        });
    }
}
