use std::fmt;

use smallvec::SmallVec;

use crate::codec::{
    ComponentCodec, MultiPixelPackedCodec, RegionCodec, SinglePixelPackedCodec, low_mask,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormatError {
    ZeroBands,
    BandOffsetOutOfStride,
    EmptyMask,
    NonContiguousMask(u32),
    UnsupportedBitsPerPixel(u32),
    UnsupportedSampleBits(u32),
    AlphaBandOutOfRange { band: usize, band_count: usize },
    PixelWordTooWide { bits: u32 },
}

impl fmt::Display for PixelFormatError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormatError::ZeroBands => {
                write!(formatter, "pixel format must have at least one band")
            }
            PixelFormatError::BandOffsetOutOfStride => {
                write!(formatter, "component band offset lies outside the pixel stride")
            }
            PixelFormatError::EmptyMask => write!(formatter, "packed band mask is empty"),
            PixelFormatError::NonContiguousMask(mask) => {
                write!(formatter, "packed band mask {mask:#010x} is not contiguous")
            }
            PixelFormatError::UnsupportedBitsPerPixel(bits) => {
                write!(formatter, "multi-pixel packing does not support {bits} bits per pixel")
            }
            PixelFormatError::UnsupportedSampleBits(bits) => {
                write!(formatter, "component storage does not support {bits}-bit samples")
            }
            PixelFormatError::AlphaBandOutOfRange { band, band_count } => {
                write!(
                    formatter,
                    "alpha band {band} is outside a format with {band_count} bands"
                )
            }
            PixelFormatError::PixelWordTooWide { bits } => {
                write!(
                    formatter,
                    "pixel needs {bits} bits and does not fit a 32-bit pixel word"
                )
            }
        }
    }
}

impl std::error::Error for PixelFormatError {}

/// Native storage layout of the bands inside a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packing {
    Component(ComponentCodec),
    SinglePixelPacked(SinglePixelPackedCodec),
    MultiPixelPacked(MultiPixelPackedCodec),
}

impl Packing {
    pub fn codec(&self) -> &dyn RegionCodec {
        match self {
            Packing::Component(codec) => codec,
            Packing::SinglePixelPacked(codec) => codec,
            Packing::MultiPixelPacked(codec) => codec,
        }
    }
}

/// Immutable description of how a canvas stores its pixels.
///
/// The alpha band is always supplied by the caller; nothing is inferred from
/// the band count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    band_count: usize,
    band_offsets: SmallVec<[usize; 4]>,
    packing: Packing,
    alpha_band: Option<usize>,
}

impl PixelFormat {
    pub fn new(packing: Packing, alpha_band: Option<usize>) -> Result<Self, PixelFormatError> {
        let band_count = packing.codec().band_count();
        if band_count == 0 {
            return Err(PixelFormatError::ZeroBands);
        }
        if let Some(band) = alpha_band.filter(|&band| band >= band_count) {
            return Err(PixelFormatError::AlphaBandOutOfRange { band, band_count });
        }
        let band_offsets = match &packing {
            Packing::Component(codec) => codec.band_offsets().iter().copied().collect(),
            Packing::SinglePixelPacked(_) | Packing::MultiPixelPacked(_) => {
                SmallVec::from_elem(0, band_count)
            }
        };
        Ok(Self {
            band_count,
            band_offsets,
            packing,
            alpha_band,
        })
    }

    /// 32-bit ARGB packed into one word, bands ordered red, green, blue, alpha.
    pub fn int_argb() -> Self {
        Self::single_pixel_packed(&[0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000], Some(3))
    }

    /// 24-bit RGB packed into one word, no alpha.
    pub fn int_rgb() -> Self {
        Self::single_pixel_packed(&[0x00FF_0000, 0x0000_FF00, 0x0000_00FF], None)
    }

    /// Four 8-bit components stored alpha, blue, green, red; bands are still
    /// ordered red, green, blue, alpha.
    pub fn four_byte_abgr() -> Self {
        Self::component(4, &[3, 2, 1, 0], 8, Some(3))
    }

    pub fn byte_gray() -> Self {
        Self::component(1, &[0], 8, None)
    }

    pub fn packed(bits_per_pixel: u32) -> Result<Self, PixelFormatError> {
        let codec = MultiPixelPackedCodec::new(bits_per_pixel)?;
        Self::new(Packing::MultiPixelPacked(codec), None)
    }

    fn single_pixel_packed(masks: &[u32], alpha_band: Option<usize>) -> Self {
        SinglePixelPackedCodec::new(masks)
            .and_then(|codec| Self::new(Packing::SinglePixelPacked(codec), alpha_band))
            .expect("built-in packed format")
    }

    fn component(
        pixel_stride: usize,
        band_offsets: &[usize],
        sample_bits: u32,
        alpha_band: Option<usize>,
    ) -> Self {
        ComponentCodec::new(pixel_stride, band_offsets, sample_bits)
            .and_then(|codec| Self::new(Packing::Component(codec), alpha_band))
            .expect("built-in component format")
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    pub fn band_offsets(&self) -> &[usize] {
        &self.band_offsets
    }

    pub fn packing(&self) -> &Packing {
        &self.packing
    }

    pub fn alpha_band(&self) -> Option<usize> {
        self.alpha_band
    }

    pub fn codec(&self) -> &dyn RegionCodec {
        self.packing.codec()
    }

    /// Whether a decoded pixel differs from the transparent default.
    pub fn is_contributing(&self, samples: &[u32]) -> bool {
        match self.alpha_band {
            Some(alpha) => samples.get(alpha).is_some_and(|&value| value != 0),
            None => samples.iter().any(|&value| value != 0),
        }
    }

    /// Packs decoded samples into the format's 32-bit pixel word.
    ///
    /// Single-pixel-packed formats use their native word and multi-pixel-packed
    /// formats use the lone sample. Component formats with three or four 8-bit
    /// bands build an ARGB word (alpha in bits 24-31, colour bands at 16, 8
    /// and 0); other component layouts place band `b` at bit `b * sample_bits`.
    pub fn pack_pixel(&self, samples: &[u32]) -> Result<u32, PixelFormatError> {
        match &self.packing {
            Packing::SinglePixelPacked(codec) => Ok(samples
                .iter()
                .take(self.band_count)
                .enumerate()
                .fold(0, |word, (band, &value)| codec.pack(word, band, value))),
            Packing::MultiPixelPacked(codec) => {
                Ok(samples.first().copied().unwrap_or(0) & codec.max_value())
            }
            Packing::Component(codec) => {
                let bits = self.component_word_bits(codec)?;
                let mask = low_mask(bits);
                Ok(samples
                    .iter()
                    .take(self.band_count)
                    .enumerate()
                    .fold(0, |word, (band, &value)| {
                        word | ((value & mask) << self.component_shift(band, bits))
                    }))
            }
        }
    }

    /// Inverse of [`PixelFormat::pack_pixel`]; `out` receives `band_count`
    /// samples and any extra slots are zeroed.
    pub fn unpack_pixel(&self, word: u32, out: &mut [u32]) -> Result<(), PixelFormatError> {
        let stored = self.band_count.min(out.len());
        match &self.packing {
            Packing::SinglePixelPacked(codec) => {
                for (band, slot) in out[..stored].iter_mut().enumerate() {
                    *slot = codec.unpack(word, band);
                }
            }
            Packing::MultiPixelPacked(codec) => {
                if let Some(slot) = out.first_mut() {
                    *slot = word & codec.max_value();
                }
            }
            Packing::Component(codec) => {
                let bits = self.component_word_bits(codec)?;
                for (band, slot) in out[..stored].iter_mut().enumerate() {
                    *slot = (word >> self.component_shift(band, bits)) & low_mask(bits);
                }
            }
        }
        out[stored..].fill(0);
        Ok(())
    }

    /// Bit position of `band` inside a component pixel word.
    fn component_shift(&self, band: usize, bits: u32) -> u32 {
        if bits != 8 || !matches!(self.band_count, 3 | 4) {
            return band as u32 * bits;
        }
        let alpha = self.alpha_band.or((self.band_count == 4).then_some(3));
        if alpha == Some(band) {
            return 24;
        }
        let colour_rank = (0..band).filter(|&other| Some(other) != alpha).count() as u32;
        16 - colour_rank * 8
    }

    fn component_word_bits(&self, codec: &ComponentCodec) -> Result<u32, PixelFormatError> {
        let bits = codec.sample_bits();
        let total = bits.saturating_mul(self.band_count as u32);
        if total > u32::BITS {
            return Err(PixelFormatError::PixelWordTooWide { bits: total });
        }
        Ok(bits)
    }
}
