pub mod arena;
pub mod forward;
pub mod kernel;

pub use crate::{error::Error, render::view::View};
pub use arena::{FrameArena, ProjectedPoint};
pub use burn::config::Config;
pub use forward::{ColorSource, RenderInput, RenderOutput, ShapeSource};
pub use kernel::sort::{RankSortSegment, TilePointOrder, TilePointSorter};

use crate::spherical_harmonics::{sh_count, SH_DEGREE_MAX};
use kernel::*;
use rayon::prelude::*;
use std::f64::consts::PI;

#[derive(Config, Debug, PartialEq)]
pub struct Gaussian3dRenderOptions {
    #[config(default = "[0.0, 0.0, 0.0]")]
    /// `[R, G, B]` composited behind the points.
    pub background_color_rgb: [f32; 3],

    #[config(default = "SH_DEGREE_MAX")]
    /// It should be no more than [`SH_DEGREE_MAX`].
    pub colors_sh_degree_max: u32,

    #[config(default = "f32::MAX")]
    /// The farthest visible view-space depth.
    pub depth_far: f32,

    #[config(default = 0.2)]
    /// The nearest view-space depth, exclusive.
    pub depth_near: f32,

    #[config(default = false)]
    /// Skipping the frustum test if the points are culled in advance.
    pub is_prefiltered: bool,

    #[config(default = 1.0)]
    /// The factor of all scalings.
    pub scaling_modifier: f32,
}

/// Rendering the points with the default sorter, [`RankSortSegment`].
///
/// ## Examples
///
/// ```rust
/// use gausplat_rasterizer::render::{gaussian_3d::*, View};
///
/// let view = View {
///     field_of_view_x: std::f64::consts::FRAC_PI_2,
///     field_of_view_y: std::f64::consts::FRAC_PI_2,
///     image_height: 32,
///     image_width: 32,
///     view_position: [0.0; 3],
///     view_transform: View::transform(
///         &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
///         &[0.0; 3],
///     ),
/// };
/// let input = RenderInput {
///     colors: ColorSource::Rgb(&[[1.0, 0.0, 0.0]]),
///     opacities: &[0.9],
///     positions: &[[0.0, 0.0, 4.0]],
///     shapes: ShapeSource::Transform {
///         rotations: &[[0.0, 0.0, 0.0, 1.0]],
///         scalings: &[[0.1; 3]],
///     },
/// };
///
/// let output = render(input, &view, &Default::default()).unwrap();
///
/// assert_eq!(output.colors_rgb_2d.len(), 3 * 32 * 32);
/// assert!(output.radii[0] > 0);
/// ```
pub fn render(
    input: RenderInput,
    view: &View,
    options: &Gaussian3dRenderOptions,
) -> Result<RenderOutput, Error> {
    render_with(input, view, options, &RankSortSegment)
}

/// Rendering the points with the given sorter.
///
/// 1. Validate the input.
/// 2. Transform the points into the frame arena.
/// 3. Duplicate the visible points into tiles and sort them.
/// 4. Rasterize the sorted points of each tile.
pub fn render_with<S: TilePointSorter + ?Sized>(
    input: RenderInput,
    view: &View,
    options: &Gaussian3dRenderOptions,
    sorter: &S,
) -> Result<RenderOutput, Error> {
    #[cfg(debug_assertions)]
    log::debug!(target: "gausplat::rasterizer::gaussian_3d::render", "start");

    validate(&input, view, options)?;

    // Specifying the arguments

    let arguments_transform = transform::Arguments::new(view, options);
    let transform::Arguments {
        image_size_x,
        image_size_y,
        tile_count_x,
        tile_count_y,
        ..
    } = arguments_transform;

    let mut arena = FrameArena::new(input.point_count());

    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat::rasterizer::gaussian_3d::render",
        "arena > size ({})",
        arena.size_readable(),
    );

    // Launching the kernels

    transform::main(&arguments_transform, &input, &mut arena);

    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat::rasterizer::gaussian_3d::render",
        "transform > visible count ({})",
        arena.visible_count(),
    );

    let order = sorter.sort(&arena.points, tile_count_x, tile_count_y)?;

    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat::rasterizer::gaussian_3d::render",
        "sort > tile point count ({})",
        order.tile_point_count(),
    );

    let outputs_rasterize = rasterize::main(
        &rasterize::Arguments {
            background_color_rgb: options.background_color_rgb,
            image_size_x,
            image_size_y,
            tile_count_x,
            tile_count_y,
        },
        &rasterize::Inputs {
            point_indices: &order.point_indices,
            points: &arena.points,
            tile_point_ranges: &order.tile_point_ranges,
        },
    )?;

    #[cfg(debug_assertions)]
    log::debug!(target: "gausplat::rasterizer::gaussian_3d::render", "rasterize");

    // Consuming the arena

    let FrameArena {
        covariances_3d,
        points,
    } = arena;
    let is_colors_sh = matches!(input.colors, ColorSource::Sh { .. });
    let is_shapes_transform =
        matches!(input.shapes, ShapeSource::Transform { .. });

    Ok(RenderOutput {
        colors_rgb_2d: outputs_rasterize.colors_rgb_2d,
        colors_rgb_3d: is_colors_sh
            .then(|| points.iter().map(|point| point.color_rgb).collect()),
        conics_opacities: points.iter().map(|point| point.conic_opacity).collect(),
        covariances_3d: is_shapes_transform.then_some(covariances_3d),
        depths: points.iter().map(|point| point.depth).collect(),
        depths_2d: outputs_rasterize.depths_2d,
        is_colors_rgb_3d_clamped: points
            .iter()
            .map(|point| point.is_color_rgb_clamped)
            .collect(),
        pixel_contributor_counts: outputs_rasterize.pixel_contributor_counts,
        point_rendered_counts: outputs_rasterize.point_rendered_counts,
        positions_2d: points.iter().map(|point| point.position_2d).collect(),
        radii: points.iter().map(|point| point.radius).collect(),
        tile_point_count: order.tile_point_count(),
        tile_touched_counts: points
            .iter()
            .map(|point| point.tile_touched_count)
            .collect(),
        transmittances: outputs_rasterize.transmittances,
    })
}

/// Marking the points whose view-space depth lies in the frustum.
///
/// It is the frustum test of rendering without the prefiltering.
pub fn mark_visible(
    positions: &[[f32; 3]],
    view: &View,
    options: &Gaussian3dRenderOptions,
) -> Result<Vec<bool>, Error> {
    validate_view(view)?;

    let arguments = transform::Arguments {
        is_prefiltered: false,
        ..transform::Arguments::new(view, options)
    };

    Ok(positions
        .par_iter()
        .map(|position| transform::is_visible(&arguments, *position))
        .collect())
}

fn validate(
    input: &RenderInput,
    view: &View,
    options: &Gaussian3dRenderOptions,
) -> Result<(), Error> {
    let point_count = input.point_count();
    if point_count == 0 {
        return Err(Error::validation("point_count (0)", "greater than 0"));
    }

    validate_view(view)?;

    let colors_sh_degree_max = options.colors_sh_degree_max;
    if colors_sh_degree_max > SH_DEGREE_MAX {
        return Err(Error::validation(
            format!("colors_sh_degree_max ({colors_sh_degree_max})"),
            format!("no more than {SH_DEGREE_MAX}"),
        ));
    }
    if !(options.depth_near < options.depth_far) {
        return Err(Error::validation(
            format!("depth_near ({})", options.depth_near),
            format!("less than depth_far ({})", options.depth_far),
        ));
    }
    if !options.scaling_modifier.is_finite() {
        return Err(Error::validation(
            format!("scaling_modifier ({})", options.scaling_modifier),
            "finite",
        ));
    }

    validate_len("opacities", input.opacities.len(), point_count)?;
    if let Some(opacity) = input
        .opacities
        .iter()
        .find(|opacity| !(0.0..=1.0).contains(*opacity))
    {
        return Err(Error::validation(
            format!("opacity ({opacity})"),
            "in [0, 1]",
        ));
    }

    match input.colors {
        ColorSource::Sh {
            colors_sh,
            colors_sh_count,
        } => {
            let colors_sh_count_min = sh_count(colors_sh_degree_max);
            if colors_sh_count < colors_sh_count_min {
                return Err(Error::validation(
                    format!("colors_sh_count ({colors_sh_count})"),
                    format!("at least {colors_sh_count_min}"),
                ));
            }
            validate_len(
                "colors_sh",
                colors_sh.len(),
                point_count.saturating_mul(colors_sh_count),
            )?;
        },
        ColorSource::Rgb(colors_rgb) => {
            validate_len("colors_rgb", colors_rgb.len(), point_count)?;
        },
    }

    match input.shapes {
        ShapeSource::Transform {
            rotations,
            scalings,
        } => {
            validate_len("rotations", rotations.len(), point_count)?;
            validate_len("scalings", scalings.len(), point_count)?;
        },
        ShapeSource::Covariance(covariances_3d) => {
            validate_len("covariances_3d", covariances_3d.len(), point_count)?;
        },
    }

    Ok(())
}

fn validate_view(view: &View) -> Result<(), Error> {
    let image_size_x = view.image_width;
    let image_size_y = view.image_height;
    if image_size_x == 0 || image_size_y == 0 {
        return Err(Error::validation(
            format!("image size ({image_size_x} x {image_size_y})"),
            "greater than 0",
        ));
    }

    let (tile_count_x, tile_count_y) = tile_counts(image_size_x, image_size_y);
    let tile_count = tile_count_x as u64 * tile_count_y as u64;
    if tile_count > u32::MAX as u64 {
        return Err(Error::validation(
            format!("tile count ({tile_count})"),
            format!("no more than {}", u32::MAX),
        ));
    }

    for (name, field_of_view) in [
        ("field_of_view_x", view.field_of_view_x),
        ("field_of_view_y", view.field_of_view_y),
    ] {
        if !(field_of_view > 0.0 && field_of_view < PI) {
            return Err(Error::validation(
                format!("{name} ({field_of_view})"),
                "in (0, π)",
            ));
        }
    }

    if !view.view_transform.iter().flatten().all(|value| value.is_finite()) {
        return Err(Error::validation("view_transform", "finite"));
    }
    if !view.view_position.iter().all(|value| value.is_finite()) {
        return Err(Error::validation("view_position", "finite"));
    }

    Ok(())
}

#[inline]
fn validate_len(
    name: &str,
    len: usize,
    len_expected: usize,
) -> Result<(), Error> {
    if len != len_expected {
        return Err(Error::validation(
            format!("{name}.len() ({len})"),
            format!("{len_expected}"),
        ));
    }
    Ok(())
}

impl Default for Gaussian3dRenderOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
