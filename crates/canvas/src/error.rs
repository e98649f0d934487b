use std::fmt;

use model::PixelFormatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasError {
    /// Reaching the coordinate would push the tree extent outside the `i32`
    /// domain.
    CoordinateOverflow { x: i64, y: i64 },
    BufferTooSmall { required: usize, actual: usize },
    BandIndexOutOfRange { band: usize, band_count: usize },
    /// The rect spans more tile cells than one call can enumerate.
    RegionTooLarge { width: u32, height: u32 },
    UnsupportedPixelFormat(PixelFormatError),
    InvalidTileSize(u32),
}

impl From<PixelFormatError> for CanvasError {
    fn from(value: PixelFormatError) -> Self {
        Self::UnsupportedPixelFormat(value)
    }
}

impl fmt::Display for CanvasError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::CoordinateOverflow { x, y } => {
                write!(
                    formatter,
                    "coordinate ({x}, {y}) is outside the representable canvas extent"
                )
            }
            CanvasError::BufferTooSmall { required, actual } => {
                write!(
                    formatter,
                    "buffer holds {actual} samples but {required} are required"
                )
            }
            CanvasError::BandIndexOutOfRange { band, band_count } => {
                write!(
                    formatter,
                    "band index {band} out of range for {band_count} bands"
                )
            }
            CanvasError::RegionTooLarge { width, height } => {
                write!(
                    formatter,
                    "region {width}x{height} spans too many tiles to enumerate"
                )
            }
            CanvasError::UnsupportedPixelFormat(error) => {
                write!(formatter, "unsupported pixel format: {error}")
            }
            CanvasError::InvalidTileSize(size) => {
                write!(formatter, "tile size {size} is not a non-zero power of two")
            }
        }
    }
}

impl std::error::Error for CanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CanvasError::UnsupportedPixelFormat(error) => Some(error),
            _ => None,
        }
    }
}
