//! Sorting the points by tile and depth.

pub use super::*;

use rayon::slice::ParallelSliceMut;
use std::ops::Range;

/// The point instances ordered by tile and then by ascending depth.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TilePointOrder {
    /// `[T]`
    pub point_indices: Vec<u32>,
    /// `[(I_y / T_y) * (I_x / T_x)]`
    ///
    /// `point_indices[range]` lists the points touching the tile.
    pub tile_point_ranges: Vec<Range<u32>>,
}

impl TilePointOrder {
    /// `T`, the count of point instances after duplication.
    #[inline]
    pub fn tile_point_count(&self) -> usize {
        self.point_indices.len()
    }
}

/// Duplicating the points into tiles and sorting them.
///
/// For each tile, the output should list every visible point whose
/// tile bound contains the tile, in ascending depth.
pub trait TilePointSorter {
    fn sort(
        &self,
        points: &[ProjectedPoint],
        tile_count_x: u32,
        tile_count_y: u32,
    ) -> Result<TilePointOrder, Error>;
}

/// The default sorter.
///
/// 1. Scan the tile-touched counts into offsets.
/// 2. Rank the keys of every point instance.
/// 3. Sort the keys in parallel.
/// 4. Segment the sorted keys into tiles.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RankSortSegment;

impl TilePointSorter for RankSortSegment {
    fn sort(
        &self,
        points: &[ProjectedPoint],
        tile_count_x: u32,
        tile_count_y: u32,
    ) -> Result<TilePointOrder, Error> {
        if points.len() > u32::MAX as usize {
            return Err(Error::validation(
                format!("point_count ({})", points.len()),
                format!("no more than {}", u32::MAX),
            ));
        }

        let tile_touched_counts = points
            .iter()
            .map(|point| point.tile_touched_count)
            .collect::<Vec<_>>();
        let outputs_scan = scan::add(&tile_touched_counts);
        if outputs_scan.total > u32::MAX as usize {
            return Err(Error::validation(
                format!("tile_point_count ({})", outputs_scan.total),
                format!("no more than {}", u32::MAX),
            ));
        }

        let mut point_keys = rank::main(
            &rank::Arguments { tile_count_x },
            &rank::Inputs {
                points,
                tile_point_count: outputs_scan.total,
                tile_touched_offsets: &outputs_scan.values,
            },
        )
        .point_keys;

        point_keys.par_sort_unstable();

        let tile_point_ranges = segment::main(
            &segment::Arguments {
                tile_count_x,
                tile_count_y,
            },
            &segment::Inputs {
                point_keys: &point_keys,
            },
        )
        .tile_point_ranges;

        Ok(TilePointOrder {
            point_indices: point_keys.iter().map(|key| key.index).collect(),
            tile_point_ranges,
        })
    }
}
