//! Segmenting the sorted keys into tiles.

pub use super::*;

use std::ops::Range;

/// Arguments.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Arguments {
    /// `I_x / T_x`
    pub tile_count_x: u32,
    /// `I_y / T_y`
    pub tile_count_y: u32,
}

/// Inputs.
#[derive(Clone, Copy, Debug)]
pub struct Inputs<'a> {
    /// `[T]`, sorted by tile.
    pub point_keys: &'a [PointKeyAndIndex],
}

/// Outputs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Outputs {
    /// `[(I_y / T_y) * (I_x / T_x)]`
    ///
    /// The tiles without points have empty ranges.
    pub tile_point_ranges: Vec<Range<u32>>,
}

/// Segmenting the sorted keys into the point range of each tile.
pub fn main(
    arguments: &Arguments,
    inputs: &Inputs,
) -> Outputs {
    let tile_count =
        arguments.tile_count_x as usize * arguments.tile_count_y as usize;
    let mut tile_point_ranges = vec![0..0; tile_count];

    for (offset, point_key) in inputs.point_keys.iter().enumerate() {
        let offset = offset as u32;
        if let Some(range) =
            tile_point_ranges.get_mut(point_key.tile_index() as usize)
        {
            if range.is_empty() {
                *range = offset..offset + 1;
            } else {
                range.end = offset + 1;
            }
        }
    }

    Outputs { tile_point_ranges }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tile_index: u32) -> PointKeyAndIndex {
        PointKeyAndIndex {
            key: [tile_index, 0],
            index: 0,
        }
    }

    #[test]
    fn main_segments() {
        let point_keys = [key(0), key(0), key(2), key(3), key(3), key(3)];

        let outputs = main(
            &Arguments {
                tile_count_x: 2,
                tile_count_y: 3,
            },
            &Inputs {
                point_keys: &point_keys,
            },
        );

        assert_eq!(
            outputs.tile_point_ranges,
            vec![0..2, 0..0, 2..3, 3..6, 0..0, 0..0]
        );
    }

    #[test]
    fn main_empty() {
        let outputs = main(
            &Arguments {
                tile_count_x: 2,
                tile_count_y: 2,
            },
            &Inputs { point_keys: &[] },
        );

        assert_eq!(outputs.tile_point_ranges, vec![0..0; 4]);
    }
}
