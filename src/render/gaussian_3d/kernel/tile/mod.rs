//! Binning the points into tiles.

/// `T_x`
pub const TILE_SIZE_X: u32 = 16;
/// `T_y`
pub const TILE_SIZE_Y: u32 = 16;

/// The rectangle of tiles touched by a point.
///
/// It is half-open, i.e., `[x_min, x_max) x [y_min, y_max)`,
/// and it is clipped to the tile grid.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct TileBound {
    pub x_max: u32,
    pub x_min: u32,
    pub y_max: u32,
    pub y_min: u32,
}

impl TileBound {
    /// Bounding the square of half-size `radius` centered at `position_2d`.
    pub fn from_position(
        position_2d: [f32; 2],
        radius: u32,
        tile_count_x: u32,
        tile_count_y: u32,
    ) -> Self {
        let radius = radius as f32;
        let [x, y] = position_2d;
        let tile_size_x = TILE_SIZE_X as f32;
        let tile_size_y = TILE_SIZE_Y as f32;
        let bound = |value: f32, count: u32| (value as i64).clamp(0, count as i64) as u32;

        Self {
            x_max: bound((x + radius + tile_size_x - 1.0) / tile_size_x, tile_count_x),
            x_min: bound((x - radius) / tile_size_x, tile_count_x),
            y_max: bound((y + radius + tile_size_y - 1.0) / tile_size_y, tile_count_y),
            y_min: bound((y - radius) / tile_size_y, tile_count_y),
        }
    }

    /// The count of touched tiles, i.e., the rectangle area in tiles.
    #[inline]
    pub fn touched_count(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min) * self.y_max.saturating_sub(self.y_min)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.touched_count() == 0
    }

    /// Tile indices in row-major order, i.e., `y * tile_count_x + x`.
    pub fn tile_indices(
        &self,
        tile_count_x: u32,
    ) -> impl Iterator<Item = u32> {
        let Self {
            x_max,
            x_min,
            y_max,
            y_min,
        } = *self;
        (y_min..y_max).flat_map(move |y| (x_min..x_max).map(move |x| y * tile_count_x + x))
    }
}

/// `I_x / T_x` and `I_y / T_y`, rounded up.
#[inline]
pub const fn tile_counts(
    image_size_x: u32,
    image_size_y: u32,
) -> (u32, u32) {
    (
        image_size_x.div_ceil(TILE_SIZE_X),
        image_size_y.div_ceil(TILE_SIZE_Y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_counts_round_up() {
        assert_eq!(tile_counts(64, 64), (4, 4));
        assert_eq!(tile_counts(65, 17), (5, 2));
        assert_eq!(tile_counts(1, 1), (1, 1));
    }

    #[test]
    fn from_position_centered() {
        let bound = TileBound::from_position([31.5, 31.5], 4, 4, 4);

        assert_eq!(
            bound,
            TileBound {
                x_max: 3,
                x_min: 1,
                y_max: 3,
                y_min: 1,
            }
        );
        assert_eq!(bound.touched_count(), 4);
        assert_eq!(bound.tile_indices(4).collect::<Vec<_>>(), vec![5, 6, 9, 10]);
    }

    #[test]
    fn from_position_clipped_to_grid() {
        let bound = TileBound::from_position([-3.0, 70.0], 10, 4, 4);

        assert_eq!(bound.x_min, 0);
        assert_eq!(bound.x_max, 1);
        assert_eq!(bound.y_min, 3);
        assert_eq!(bound.y_max, 4);
        assert_eq!(bound.touched_count(), 1);
    }

    #[test]
    fn from_position_outside_is_empty() {
        let bound = TileBound::from_position([-100.0, 20.0], 3, 4, 4);
        assert!(bound.is_empty());
        assert_eq!(bound.tile_indices(4).count(), 0);

        let bound = TileBound::from_position([20.0, 500.0], 3, 4, 4);
        assert!(bound.is_empty());
    }

    #[test]
    fn from_position_nan_is_empty() {
        let bound = TileBound::from_position([f32::NAN, f32::NAN], 3, 4, 4);
        assert!(bound.is_empty());
    }

    #[test]
    fn touched_count_matches_tile_indices() {
        let bound = TileBound::from_position([40.0, 10.0], 20, 5, 3);
        assert_eq!(
            bound.touched_count() as usize,
            bound.tile_indices(5).count()
        );
    }
}
