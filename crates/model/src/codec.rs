use bitvec::field::BitField;
use bitvec::prelude::Msb0;
use bitvec::view::BitView;
use smallvec::SmallVec;

use crate::PixelFormatError;

/// Shape of one tile's backing store, in 32-bit storage words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Width and height of the tile in pixels.
    pub size: usize,
    /// Words between the starts of two consecutive rows.
    pub scanline_stride: usize,
}

impl TileGeometry {
    pub const fn storage_len(self) -> usize {
        self.size * self.scanline_stride
    }
}

/// A rectangular copy between tile-local pixels and a caller buffer.
///
/// The buffer is row-major with `buffer_width` pixels per row; the block lands
/// at `(buffer_x, buffer_y)` inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockCopy {
    pub tile_x: usize,
    pub tile_y: usize,
    pub width: usize,
    pub height: usize,
    pub buffer_x: usize,
    pub buffer_y: usize,
    pub buffer_width: usize,
}

impl BlockCopy {
    fn buffer_pixel(&self, col: usize, row: usize) -> usize {
        (self.buffer_y + row) * self.buffer_width + self.buffer_x + col
    }
}

/// Converts between a tile's native storage and canonical per-band samples.
///
/// Coordinates are tile-local and must lie inside `geometry`; `storage` must be
/// exactly `geometry.storage_len()` words long.
pub trait RegionCodec {
    fn band_count(&self) -> usize;

    fn scanline_stride(&self, tile_size: usize) -> usize;

    fn read_sample(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
    ) -> u32;

    fn write_sample(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
        value: u32,
    );

    fn geometry(&self, tile_size: usize) -> TileGeometry {
        TileGeometry {
            size: tile_size,
            scanline_stride: self.scanline_stride(tile_size),
        }
    }

    /// Fills `out` with the pixel's bands; slots past `band_count` are zeroed.
    fn read_pixel(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        out: &mut [u32],
    ) {
        let stored = self.band_count().min(out.len());
        for (band, slot) in out[..stored].iter_mut().enumerate() {
            *slot = self.read_sample(storage, geometry, x, y, band);
        }
        out[stored..].fill(0);
    }

    fn write_pixel(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        samples: &[u32],
    ) {
        for (band, &value) in samples.iter().take(self.band_count()).enumerate() {
            self.write_sample(storage, geometry, x, y, band, value);
        }
    }

    /// Decodes a block into a band-interleaved buffer holding `bands` samples
    /// per pixel.
    fn read_block(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        block: &BlockCopy,
        bands: usize,
        dst: &mut [u32],
    ) {
        for row in 0..block.height {
            for col in 0..block.width {
                let start = block.buffer_pixel(col, row) * bands;
                self.read_pixel(
                    storage,
                    geometry,
                    block.tile_x + col,
                    block.tile_y + row,
                    &mut dst[start..start + bands],
                );
            }
        }
    }

    fn write_block(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        block: &BlockCopy,
        bands: usize,
        src: &[u32],
    ) {
        for row in 0..block.height {
            for col in 0..block.width {
                let start = block.buffer_pixel(col, row) * bands;
                self.write_pixel(
                    storage,
                    geometry,
                    block.tile_x + col,
                    block.tile_y + row,
                    &src[start..start + bands],
                );
            }
        }
    }

    /// Decodes one band of a block into a buffer holding one sample per pixel.
    fn read_band_block(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        block: &BlockCopy,
        band: usize,
        dst: &mut [u32],
    ) {
        for row in 0..block.height {
            for col in 0..block.width {
                dst[block.buffer_pixel(col, row)] = self.read_sample(
                    storage,
                    geometry,
                    block.tile_x + col,
                    block.tile_y + row,
                    band,
                );
            }
        }
    }

    fn write_band_block(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        block: &BlockCopy,
        band: usize,
        src: &[u32],
    ) {
        for row in 0..block.height {
            for col in 0..block.width {
                self.write_sample(
                    storage,
                    geometry,
                    block.tile_x + col,
                    block.tile_y + row,
                    band,
                    src[block.buffer_pixel(col, row)],
                );
            }
        }
    }
}

pub(crate) fn low_mask(bits: u32) -> u32 {
    if bits >= u32::BITS {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// One storage word per sample; a pixel spans `pixel_stride` words and band
/// `b` sits at word `band_offsets[b]` within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCodec {
    pixel_stride: usize,
    band_offsets: SmallVec<[usize; 4]>,
    sample_bits: u32,
}

impl ComponentCodec {
    pub fn new(
        pixel_stride: usize,
        band_offsets: &[usize],
        sample_bits: u32,
    ) -> Result<Self, PixelFormatError> {
        if band_offsets.is_empty() {
            return Err(PixelFormatError::ZeroBands);
        }
        if band_offsets.iter().any(|&offset| offset >= pixel_stride) {
            return Err(PixelFormatError::BandOffsetOutOfStride);
        }
        if !matches!(sample_bits, 8 | 16 | 32) {
            return Err(PixelFormatError::UnsupportedSampleBits(sample_bits));
        }
        Ok(Self {
            pixel_stride,
            band_offsets: band_offsets.iter().copied().collect(),
            sample_bits,
        })
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    pub fn band_offsets(&self) -> &[usize] {
        &self.band_offsets
    }

    pub fn sample_bits(&self) -> u32 {
        self.sample_bits
    }

    fn index(&self, geometry: TileGeometry, x: usize, y: usize, band: usize) -> usize {
        y * geometry.scanline_stride + x * self.pixel_stride + self.band_offsets[band]
    }
}

impl RegionCodec for ComponentCodec {
    fn band_count(&self) -> usize {
        self.band_offsets.len()
    }

    fn scanline_stride(&self, tile_size: usize) -> usize {
        tile_size * self.pixel_stride
    }

    fn read_sample(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
    ) -> u32 {
        storage[self.index(geometry, x, y, band)]
    }

    fn write_sample(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
        value: u32,
    ) {
        storage[self.index(geometry, x, y, band)] = value & low_mask(self.sample_bits);
    }
}

/// All bands of a pixel share one storage word; band `b` occupies
/// `masks[b]`, shifted down by `shifts[b]` when decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePixelPackedCodec {
    masks: SmallVec<[u32; 4]>,
    shifts: SmallVec<[u32; 4]>,
}

impl SinglePixelPackedCodec {
    /// Shifts are derived from the masks, which must each be one contiguous
    /// run of set bits.
    pub fn new(masks: &[u32]) -> Result<Self, PixelFormatError> {
        if masks.is_empty() {
            return Err(PixelFormatError::ZeroBands);
        }
        let mut shifts = SmallVec::with_capacity(masks.len());
        for &mask in masks {
            if mask == 0 {
                return Err(PixelFormatError::EmptyMask);
            }
            let shift = mask.trailing_zeros();
            let run = mask >> shift;
            if run & run.wrapping_add(1) != 0 {
                return Err(PixelFormatError::NonContiguousMask(mask));
            }
            shifts.push(shift);
        }
        Ok(Self {
            masks: masks.iter().copied().collect(),
            shifts,
        })
    }

    pub fn masks(&self) -> &[u32] {
        &self.masks
    }

    pub fn shifts(&self) -> &[u32] {
        &self.shifts
    }

    pub fn unpack(&self, word: u32, band: usize) -> u32 {
        (word & self.masks[band]) >> self.shifts[band]
    }

    pub fn pack(&self, word: u32, band: usize, value: u32) -> u32 {
        let mask = self.masks[band];
        (word & !mask) | ((value << self.shifts[band]) & mask)
    }
}

impl RegionCodec for SinglePixelPackedCodec {
    fn band_count(&self) -> usize {
        self.masks.len()
    }

    fn scanline_stride(&self, tile_size: usize) -> usize {
        tile_size
    }

    fn read_sample(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
    ) -> u32 {
        self.unpack(storage[y * geometry.scanline_stride + x], band)
    }

    fn write_sample(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
        value: u32,
    ) {
        let word = &mut storage[y * geometry.scanline_stride + x];
        *word = self.pack(*word, band, value);
    }

    fn read_pixel(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        out: &mut [u32],
    ) {
        let word = storage[y * geometry.scanline_stride + x];
        let stored = self.band_count().min(out.len());
        for (band, slot) in out[..stored].iter_mut().enumerate() {
            *slot = self.unpack(word, band);
        }
        out[stored..].fill(0);
    }

    fn write_pixel(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        samples: &[u32],
    ) {
        let word = &mut storage[y * geometry.scanline_stride + x];
        for (band, &value) in samples.iter().take(self.band_count()).enumerate() {
            *word = self.pack(*word, band, value);
        }
    }
}

/// Several single-band pixels per storage word, first pixel in the most
/// significant bits. Rows start on a word boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiPixelPackedCodec {
    bits_per_pixel: u32,
}

impl MultiPixelPackedCodec {
    pub fn new(bits_per_pixel: u32) -> Result<Self, PixelFormatError> {
        if !matches!(bits_per_pixel, 1 | 2 | 4 | 8 | 16 | 32) {
            return Err(PixelFormatError::UnsupportedBitsPerPixel(bits_per_pixel));
        }
        Ok(Self { bits_per_pixel })
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    pub fn max_value(&self) -> u32 {
        low_mask(self.bits_per_pixel)
    }

    fn bit_range(&self, geometry: TileGeometry, x: usize, y: usize) -> std::ops::Range<usize> {
        let bits = self.bits_per_pixel as usize;
        let start = y * geometry.scanline_stride * u32::BITS as usize + x * bits;
        start..start + bits
    }
}

impl RegionCodec for MultiPixelPackedCodec {
    fn band_count(&self) -> usize {
        1
    }

    fn scanline_stride(&self, tile_size: usize) -> usize {
        (tile_size * self.bits_per_pixel as usize).div_ceil(u32::BITS as usize)
    }

    fn read_sample(
        &self,
        storage: &[u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
    ) -> u32 {
        debug_assert_eq!(band, 0, "multi-pixel packed storage has a single band");
        storage.view_bits::<Msb0>()[self.bit_range(geometry, x, y)].load_be::<u32>()
    }

    fn write_sample(
        &self,
        storage: &mut [u32],
        geometry: TileGeometry,
        x: usize,
        y: usize,
        band: usize,
        value: u32,
    ) {
        debug_assert_eq!(band, 0, "multi-pixel packed storage has a single band");
        let range = self.bit_range(geometry, x, y);
        storage.view_bits_mut::<Msb0>()[range].store_be(value & self.max_value());
    }
}
