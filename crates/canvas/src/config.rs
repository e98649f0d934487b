use model::PixelFormat;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::CanvasError;

pub const DEFAULT_TILE_SIZE: u32 = 128;

const_assert!(DEFAULT_TILE_SIZE.is_power_of_two());

/// Built-in pixel formats selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatPreset {
    #[default]
    IntArgb,
    IntRgb,
    FourByteAbgr,
    ByteGray,
    Packed {
        bits_per_pixel: u32,
    },
}

impl FormatPreset {
    pub fn pixel_format(self) -> Result<PixelFormat, CanvasError> {
        Ok(match self {
            FormatPreset::IntArgb => PixelFormat::int_argb(),
            FormatPreset::IntRgb => PixelFormat::int_rgb(),
            FormatPreset::FourByteAbgr => PixelFormat::four_byte_abgr(),
            FormatPreset::ByteGray => PixelFormat::byte_gray(),
            FormatPreset::Packed { bits_per_pixel } => PixelFormat::packed(bits_per_pixel)?,
        })
    }
}

/// Construction-time canvas parameters. The tile size cannot change once a
/// canvas exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub tile_size: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub format: FormatPreset,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            origin_x: 0,
            origin_y: 0,
            format: FormatPreset::default(),
        }
    }
}

impl CanvasConfig {
    pub fn with_tile_size(tile_size: u32) -> Self {
        Self {
            tile_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CanvasError> {
        validate_tile_size(self.tile_size)
    }
}

pub(crate) fn validate_tile_size(tile_size: u32) -> Result<(), CanvasError> {
    // Tiles must be addressable with i32 coordinates on both sides of an origin.
    if !tile_size.is_power_of_two() || tile_size > 1 << 30 {
        return Err(CanvasError::InvalidTileSize(tile_size));
    }
    Ok(())
}
