//! Data model shared by the canvas engine: rectangles, pixel formats and the
//! per-packing codecs that move samples in and out of tile storage.

mod codec;
mod format;
mod rect;

pub use codec::{
    BlockCopy, ComponentCodec, MultiPixelPackedCodec, RegionCodec, SinglePixelPackedCodec,
    TileGeometry,
};
pub use format::{Packing, PixelFormat, PixelFormatError};
pub use rect::Rect;
