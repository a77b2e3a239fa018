//! CPU kernels.

pub mod rank;
pub mod rasterize;
pub mod scan;
pub mod segment;
pub mod sort;
pub mod tile;
pub mod transform;

pub use super::{
    ColorSource, Error, FrameArena, Gaussian3dRenderOptions, ProjectedPoint,
    RenderInput, ShapeSource, View,
};
pub use rank::PointKeyAndIndex;
pub use tile::{tile_counts, TileBound, TILE_SIZE_X, TILE_SIZE_Y};
