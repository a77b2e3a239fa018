//! Rasterizing the points into pixels.

pub use super::*;

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;
use std::{array, ops::Range};

/// Arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Arguments {
    /// `[R, G, B]`
    pub background_color_rgb: [f32; 3],
    /// `I_x`
    pub image_size_x: u32,
    /// `I_y`
    pub image_size_y: u32,
    /// `I_x / T_x`
    pub tile_count_x: u32,
    /// `I_y / T_y`
    pub tile_count_y: u32,
}

/// Inputs.
#[derive(Clone, Copy, Debug)]
pub struct Inputs<'a> {
    /// `[T]`
    pub point_indices: &'a [u32],
    /// `[P]`
    pub points: &'a [ProjectedPoint],
    /// `[(I_y / T_y) * (I_x / T_x)]`
    pub tile_point_ranges: &'a [Range<u32>],
}

/// Outputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outputs {
    /// `[3, I_y, I_x]`
    pub colors_rgb_2d: Vec<f32>,
    /// `[I_y, I_x]`
    pub depths_2d: Vec<f32>,
    /// `[I_y, I_x]`
    ///
    /// The count of points visited up to the last blended one.
    pub pixel_contributor_counts: Vec<u32>,
    /// `[P]`
    ///
    /// The count of pixels each point is blended into.
    pub point_rendered_counts: Vec<u32>,
    /// `[I_y, I_x]`
    pub transmittances: Vec<f32>,
}

/// The count of points staged at once, one per pixel of a tile.
pub const BATCH_SIZE: usize = (TILE_SIZE_X * TILE_SIZE_Y) as usize;
/// The maximum of alpha.
pub const OPACITY_MAX: f32 = 0.99;
/// The minimum of alpha to be blended.
pub const OPACITY_MIN: f32 = 1.0 / 255.0;
/// The transmittance below which a pixel is saturated.
pub const TRANSMITTANCE_MIN: f32 = 1e-4;

/// The point record staged for a batch.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct StagedPoint {
    pub color_rgb: [f32; 3],
    pub conic_opacity: [f32; 4],
    pub depth: f32,
    pub index: u32,
    pub position_2d: [f32; 2],
}

/// The blending state of a pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelState {
    pub color_rgb: [f32; 3],
    /// The count of visited points.
    pub contributor_count: u32,
    /// The count of visited points up to the last blended one.
    pub contributor_count_last: u32,
    pub depth: f32,
    pub is_done: bool,
    pub transmittance: f32,
}

impl StagedPoint {
    #[inline]
    pub fn new(
        point: &ProjectedPoint,
        index: u32,
    ) -> Self {
        Self {
            color_rgb: point.color_rgb,
            conic_opacity: point.conic_opacity,
            depth: point.depth,
            index,
            position_2d: point.position_2d,
        }
    }
}

impl PixelState {
    /// A pixel outside the image is done from the start.
    #[inline]
    pub fn new(is_inside: bool) -> Self {
        Self {
            color_rgb: [0.0; 3],
            contributor_count: 0,
            contributor_count_last: 0,
            depth: 0.0,
            is_done: !is_inside,
            transmittance: 1.0,
        }
    }

    /// Blending the point into the pixel centered at `position`.
    ///
    /// Returns `true` if the point contributes to the pixel.
    pub fn blend(
        &mut self,
        point: &StagedPoint,
        position: [f32; 2],
    ) -> bool {
        self.contributor_count += 1;

        let [a, b, c, opacity] = point.conic_opacity;
        let dx = point.position_2d[0] - position[0];
        let dy = point.position_2d[1] - position[1];
        let power = -0.5 * (a * dx * dx + c * dy * dy) - b * dx * dy;
        if power > 0.0 {
            return false;
        }

        let alpha = (opacity * power.exp()).min(OPACITY_MAX);
        if alpha < OPACITY_MIN {
            return false;
        }

        let transmittance_next = self.transmittance * (1.0 - alpha);
        if transmittance_next < TRANSMITTANCE_MIN {
            self.is_done = true;
            return false;
        }

        let weight = alpha * self.transmittance;
        self.color_rgb[0] += point.color_rgb[0] * weight;
        self.color_rgb[1] += point.color_rgb[1] * weight;
        self.color_rgb[2] += point.color_rgb[2] * weight;
        self.depth += point.depth * weight;
        self.transmittance = transmittance_next;
        self.contributor_count_last = self.contributor_count;
        true
    }
}

/// The pixels of a tile and the counts of pixels each point is blended into.
#[derive(Clone, Debug)]
struct TileOutputs {
    pixels: [PixelState; BATCH_SIZE],
    point_rendered_counts: Vec<(u32, u32)>,
}

/// Rasterizing the points into pixels.
///
/// Each tile is rasterized independently, and its pixels are written back
/// in tile order, so the outputs are deterministic.
pub fn main(
    arguments: &Arguments,
    inputs: &Inputs,
) -> Result<Outputs, Error> {
    validate(arguments, inputs)?;

    let image_size_x = arguments.image_size_x as usize;
    let image_size_y = arguments.image_size_y as usize;
    let pixel_count = image_size_x * image_size_y;
    let tile_count = inputs.tile_point_ranges.len();

    let tiles = (0..tile_count)
        .into_par_iter()
        .map(|tile_index| rasterize_tile(arguments, inputs, tile_index))
        .collect::<Vec<_>>();

    let mut outputs = Outputs {
        colors_rgb_2d: vec![0.0; 3 * pixel_count],
        depths_2d: vec![0.0; pixel_count],
        pixel_contributor_counts: vec![0; pixel_count],
        point_rendered_counts: vec![0; inputs.points.len()],
        transmittances: vec![0.0; pixel_count],
    };

    for (tile_index, tile) in tiles.into_iter().enumerate() {
        let (pixel_x_min, pixel_y_min) = pixel_offset(arguments, tile_index);

        for (lane, pixel) in tile.pixels.iter().enumerate() {
            let (x, y) = lane_position(pixel_x_min, pixel_y_min, lane);
            let (x, y) = (x as usize, y as usize);
            if x >= image_size_x || y >= image_size_y {
                continue;
            }

            let pixel_index = y * image_size_x + x;
            for channel in 0..3 {
                outputs.colors_rgb_2d[channel * pixel_count + pixel_index] =
                    pixel.color_rgb[channel]
                        + pixel.transmittance
                            * arguments.background_color_rgb[channel];
            }
            outputs.depths_2d[pixel_index] = pixel.depth;
            outputs.pixel_contributor_counts[pixel_index] =
                pixel.contributor_count_last;
            outputs.transmittances[pixel_index] = pixel.transmittance;
        }

        for (index, count) in tile.point_rendered_counts {
            outputs.point_rendered_counts[index as usize] += count;
        }
    }

    Ok(outputs)
}

/// Compositing the sorted points of a tile front to back.
///
/// Each batch has two phases:
///
/// 1. Loading: the points of the batch are staged collectively.
/// 2. Computing: every pixel that is not done blends the staged points in order.
///
/// The tile finishes once every pixel is done or the points are exhausted.
fn rasterize_tile(
    arguments: &Arguments,
    inputs: &Inputs,
    tile_index: usize,
) -> TileOutputs {
    let (pixel_x_min, pixel_y_min) = pixel_offset(arguments, tile_index);
    let mut pixels = array::from_fn::<_, BATCH_SIZE, _>(|lane| {
        let (x, y) = lane_position(pixel_x_min, pixel_y_min, lane);
        PixelState::new(x < arguments.image_size_x && y < arguments.image_size_y)
    });

    let range = &inputs.tile_point_ranges[tile_index];
    let point_indices =
        &inputs.point_indices[range.start as usize..range.end as usize];
    let mut staged_points = [StagedPoint::zeroed(); BATCH_SIZE];
    let mut point_rendered_counts = Vec::new();

    for batch in point_indices.chunks(BATCH_SIZE) {
        if pixels.iter().all(|pixel| pixel.is_done) {
            break;
        }

        // Loading

        let batch_points = &mut staged_points[..batch.len()];
        batch_points.iter_mut().zip(batch).for_each(|(staged, index)| {
            *staged = StagedPoint::new(&inputs.points[*index as usize], *index);
        });

        // Computing

        let mut batch_counts = [0_u32; BATCH_SIZE];
        for (lane, pixel) in pixels.iter_mut().enumerate() {
            if pixel.is_done {
                continue;
            }

            let (x, y) = lane_position(pixel_x_min, pixel_y_min, lane);
            let position = [x as f32, y as f32];
            for (slot, point) in batch_points.iter().enumerate() {
                if pixel.blend(point, position) {
                    batch_counts[slot] += 1;
                }
                if pixel.is_done {
                    break;
                }
            }
        }

        point_rendered_counts.extend(
            batch_points
                .iter()
                .zip(batch_counts)
                .filter(|(_, count)| *count > 0)
                .map(|(point, count)| (point.index, count)),
        );
    }

    TileOutputs {
        pixels,
        point_rendered_counts,
    }
}

/// Checking the bounds of the sorted points.
fn validate(
    arguments: &Arguments,
    inputs: &Inputs,
) -> Result<(), Error> {
    let tile_count =
        arguments.tile_count_x as usize * arguments.tile_count_y as usize;
    if inputs.tile_point_ranges.len() != tile_count {
        return Err(Error::validation(
            format!(
                "tile_point_ranges.len() ({})",
                inputs.tile_point_ranges.len()
            ),
            format!("{tile_count}"),
        ));
    }

    let tile_point_count = inputs.point_indices.len();
    if let Some((tile_index, range)) = inputs
        .tile_point_ranges
        .iter()
        .enumerate()
        .find(|(_, range)| {
            range.start > range.end || range.end as usize > tile_point_count
        })
    {
        return Err(Error::validation(
            format!("tile_point_ranges[{tile_index}] ({range:?})"),
            format!("in bounds of {tile_point_count} point indices"),
        ));
    }

    let point_count = inputs.points.len();
    if let Some(index) = inputs
        .point_indices
        .iter()
        .find(|index| **index as usize >= point_count)
    {
        return Err(Error::validation(
            format!("point index ({index})"),
            format!("less than {point_count}"),
        ));
    }

    Ok(())
}

#[inline]
fn pixel_offset(
    arguments: &Arguments,
    tile_index: usize,
) -> (u32, u32) {
    let tile_index = tile_index as u32;
    (
        tile_index % arguments.tile_count_x * TILE_SIZE_X,
        tile_index / arguments.tile_count_x * TILE_SIZE_Y,
    )
}

#[inline]
fn lane_position(
    pixel_x_min: u32,
    pixel_y_min: u32,
    lane: usize,
) -> (u32, u32) {
    let lane = lane as u32;
    (
        pixel_x_min + lane % TILE_SIZE_X,
        pixel_y_min + lane / TILE_SIZE_X,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments(
        image_size_x: u32,
        image_size_y: u32,
        background_color_rgb: [f32; 3],
    ) -> Arguments {
        let (tile_count_x, tile_count_y) =
            tile_counts(image_size_x, image_size_y);
        Arguments {
            background_color_rgb,
            image_size_x,
            image_size_y,
            tile_count_x,
            tile_count_y,
        }
    }

    fn opaque_point(
        position_2d: [f32; 2],
        color_rgb: [f32; 3],
    ) -> ProjectedPoint {
        ProjectedPoint {
            color_rgb,
            conic_opacity: [1e-6, 0.0, 1e-6, 1.0],
            depth: 2.0,
            position_2d,
            radius: 8,
            ..Default::default()
        }
    }

    fn staged(
        opacity: f32,
        color_rgb: [f32; 3],
    ) -> StagedPoint {
        StagedPoint {
            color_rgb,
            conic_opacity: [1.0, 0.0, 1.0, opacity],
            depth: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn main_single_opaque_point() {
        let arguments = arguments(32, 32, [0.1, 0.1, 0.1]);
        let points = [opaque_point([8.0, 8.0], [0.2, 0.4, 0.8])];
        let tile_point_ranges = [0..1, 0..0, 0..0, 0..0];

        let outputs = main(
            &arguments,
            &Inputs {
                point_indices: &[0],
                points: &points,
                tile_point_ranges: &tile_point_ranges,
            },
        )
        .unwrap();

        let pixel_count = 32 * 32;
        assert_eq!(outputs.colors_rgb_2d.len(), 3 * pixel_count);
        assert_eq!(outputs.point_rendered_counts, vec![256]);

        for y in 0..32 {
            for x in 0..32 {
                let pixel_index = y * 32 + x;
                let transmittance = outputs.transmittances[pixel_index];
                let color_red = outputs.colors_rgb_2d[pixel_index];
                let color_blue = outputs.colors_rgb_2d[2 * pixel_count + pixel_index];

                if x < 16 && y < 16 {
                    assert!((transmittance - 0.01).abs() < 1e-3);
                    assert!((color_red - (0.99 * 0.2 + 0.001)).abs() < 1e-3);
                    assert!((color_blue - (0.99 * 0.8 + 0.001)).abs() < 1e-3);
                    assert!((outputs.depths_2d[pixel_index] - 1.98).abs() < 1e-3);
                    assert_eq!(outputs.pixel_contributor_counts[pixel_index], 1);
                } else {
                    assert_eq!(transmittance, 1.0);
                    assert_eq!(color_red, 0.1);
                    assert_eq!(color_blue, 0.1);
                    assert_eq!(outputs.depths_2d[pixel_index], 0.0);
                    assert_eq!(outputs.pixel_contributor_counts[pixel_index], 0);
                }
            }
        }
    }

    #[test]
    fn main_partial_tiles_are_cropped() {
        let arguments = arguments(20, 18, [0.0, 0.5, 1.0]);
        assert_eq!((arguments.tile_count_x, arguments.tile_count_y), (2, 2));

        let outputs = main(
            &arguments,
            &Inputs {
                point_indices: &[],
                points: &[],
                tile_point_ranges: &[0..0, 0..0, 0..0, 0..0],
            },
        )
        .unwrap();

        let pixel_count = 20 * 18;
        assert_eq!(outputs.transmittances, vec![1.0; pixel_count]);
        assert_eq!(outputs.colors_rgb_2d[..pixel_count], vec![0.0; pixel_count]);
        assert_eq!(
            outputs.colors_rgb_2d[pixel_count..2 * pixel_count],
            vec![0.5; pixel_count]
        );
        assert_eq!(outputs.colors_rgb_2d[2 * pixel_count..], vec![1.0; pixel_count]);
    }

    #[test]
    fn main_invalid_range_is_error() {
        let arguments = arguments(16, 16, [0.0; 3]);
        let points = [opaque_point([8.0, 8.0], [1.0; 3])];

        let error = main(
            &arguments,
            &Inputs {
                point_indices: &[0],
                points: &points,
                tile_point_ranges: &[0..2],
            },
        )
        .unwrap_err();
        assert!(matches!(error, Error::Validation(..)), "{error}");

        let error = main(
            &arguments,
            &Inputs {
                point_indices: &[1],
                points: &points,
                tile_point_ranges: &[0..1],
            },
        )
        .unwrap_err();
        assert!(matches!(error, Error::Validation(..)), "{error}");

        let error = main(
            &arguments,
            &Inputs {
                point_indices: &[0],
                points: &points,
                tile_point_ranges: &[0..1, 0..0],
            },
        )
        .unwrap_err();
        assert!(matches!(error, Error::Validation(..)), "{error}");
    }

    #[test]
    fn blend_stops_when_saturated() {
        let mut pixel = PixelState::new(true);

        assert!(pixel.blend(&staged(1.0, [1.0, 0.0, 0.0]), [0.0, 0.0]));
        assert!((pixel.transmittance - 0.01).abs() < 1e-6);
        assert!(pixel.blend(&staged(0.5, [0.0, 1.0, 0.0]), [0.0, 0.0]));
        assert!((pixel.transmittance - 0.005).abs() < 1e-6);
        assert!(!pixel.blend(&staged(1.0, [0.0, 0.0, 1.0]), [0.0, 0.0]));

        assert!(pixel.is_done);
        assert_eq!(pixel.contributor_count, 3);
        assert_eq!(pixel.contributor_count_last, 2);
        assert_eq!(pixel.color_rgb[2], 0.0);
        assert!((pixel.transmittance - 0.005).abs() < 1e-6);
    }

    #[test]
    fn blend_skips_faint_points() {
        let mut pixel = PixelState::new(true);

        // alpha = exp(-0.5 * 16) is below 1 / 255
        assert!(!pixel.blend(&staged(1.0, [1.0; 3]), [4.0, 0.0]));
        assert!(!pixel.blend(&staged(0.001, [1.0; 3]), [0.0, 0.0]));

        assert_eq!(pixel.transmittance, 1.0);
        assert_eq!(pixel.color_rgb, [0.0; 3]);
        assert_eq!(pixel.contributor_count, 2);
        assert_eq!(pixel.contributor_count_last, 0);
        assert!(!pixel.is_done);
    }

    #[test]
    fn blend_skips_positive_power() {
        let mut pixel = PixelState::new(true);
        let point = StagedPoint {
            conic_opacity: [0.0, 1.0, 0.0, 1.0],
            ..Default::default()
        };

        // power = -b dx dy > 0
        assert!(!pixel.blend(&point, [1.0, -1.0]));
        assert_eq!(pixel.transmittance, 1.0);
    }

    #[test]
    fn blend_transmittance_is_non_increasing() {
        let mut pixel = PixelState::new(true);
        let mut transmittance = pixel.transmittance;

        for step in 0..64 {
            let opacity = (step as f32 * 0.37).fract();
            let offset = (step % 5) as f32 * 0.5;
            pixel.blend(&staged(opacity, [1.0; 3]), [offset, 0.0]);

            assert!(pixel.transmittance <= transmittance);
            assert!(pixel.transmittance >= TRANSMITTANCE_MIN);
            transmittance = pixel.transmittance;
            if pixel.is_done {
                break;
            }
        }
    }

    #[test]
    fn pixel_outside_is_done() {
        assert!(PixelState::new(false).is_done);
        assert!(!PixelState::new(true).is_done);
    }
}
