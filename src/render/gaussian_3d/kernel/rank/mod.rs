//! Ranking the points.

pub use super::*;

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;
use std::mem;

/// Arguments.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Arguments {
    /// `I_x / T_x`
    pub tile_count_x: u32,
}

/// Inputs.
#[derive(Clone, Copy, Debug)]
pub struct Inputs<'a> {
    /// `[P]`
    pub points: &'a [ProjectedPoint],
    /// `T`
    pub tile_point_count: usize,
    /// `[P]`
    pub tile_touched_offsets: &'a [u32],
}

/// Outputs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Outputs {
    /// `[T]`
    pub point_keys: Vec<PointKeyAndIndex>,
}

/// The sort key of a point instance and the index of its point.
///
/// The key is `[tile_index, depth_key]`,
/// so the order is by tile first and then by depth.
/// The index breaks the ties.
#[repr(C)]
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Pod,
    Zeroable,
)]
pub struct PointKeyAndIndex {
    pub key: [u32; 2],
    pub index: u32,
}

impl PointKeyAndIndex {
    #[inline]
    pub fn tile_index(&self) -> u32 {
        self.key[0]
    }
}

/// Mapping the depth to bits whose unsigned order is the order of depths.
///
/// ## Examples
///
/// ```rust
/// use gausplat_rasterizer::render::gaussian_3d::kernel::rank::depth_key;
///
/// assert!(depth_key(-1.0) < depth_key(0.0));
/// assert!(depth_key(0.5) < depth_key(2.0));
/// ```
#[inline]
pub fn depth_key(depth: f32) -> u32 {
    let bits = bytemuck::cast::<f32, u32>(depth);
    if bits & 0x8000_0000 == 0 {
        bits | 0x8000_0000
    } else {
        !bits
    }
}

/// Ranking the points.
///
/// Each point writes one key for every tile it touches,
/// starting from its offset in `tile_touched_offsets`.
pub fn main(
    arguments: &Arguments,
    inputs: &Inputs,
) -> Outputs {
    let mut point_keys =
        vec![PointKeyAndIndex::zeroed(); inputs.tile_point_count];

    // Splitting the keys into the slices owned by each point
    let mut slices = Vec::with_capacity(inputs.points.len());
    let mut rest = point_keys.as_mut_slice();
    let ends = inputs
        .tile_touched_offsets
        .iter()
        .skip(1)
        .map(|offset| *offset as usize)
        .chain([inputs.tile_point_count]);
    let mut start = 0;
    for end in ends {
        let (slice, tail) = mem::take(&mut rest).split_at_mut(end - start);
        slices.push(slice);
        rest = tail;
        start = end;
    }

    slices
        .into_par_iter()
        .zip(inputs.points.par_iter())
        .enumerate()
        .for_each(|(index, (slice, point))| {
            let depth_key = depth_key(point.depth);
            slice
                .iter_mut()
                .zip(point.tile_bound.tile_indices(arguments.tile_count_x))
                .for_each(|(point_key, tile_index)| {
                    *point_key = PointKeyAndIndex {
                        key: [tile_index, depth_key],
                        index: index as u32,
                    };
                });
        });

    Outputs { point_keys }
}
