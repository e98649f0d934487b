//! Sparse, unbounded pixel canvas.
//!
//! Pixels live in fixed-size tiles hanging off a quadtree whose root doubles
//! toward any coordinate written outside it. Tiles are allocated on first
//! write; unwritten space reads as zero.

mod bounds;
mod canvas;
mod config;
mod error;
mod node;
mod region;
mod tile;

pub use canvas::{AllocatedTile, AllocatedTiles, Canvas};
pub use config::{CanvasConfig, DEFAULT_TILE_SIZE, FormatPreset};
pub use error::CanvasError;
pub use model::{PixelFormat, PixelFormatError, Rect};
pub use node::{QuadNode, Quadrant};
pub use region::{Raster, RegionView, RegionViewMut};
pub use tile::Tile;
