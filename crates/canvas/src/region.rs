use model::{BlockCopy, Rect};

use crate::node::QuadNode;
use crate::{Canvas, CanvasError};

/// Owned band-interleaved copy of a canvas region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub band_count: usize,
    pub samples: Vec<u32>,
}

impl Raster {
    /// Bands of the pixel at raster-local `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * self.band_count;
        self.samples.get(start..start + self.band_count)
    }
}

/// Copy geometry between `leaf` and a buffer laid out over `rect`, or `None`
/// when they do not overlap.
fn block_for(leaf: &QuadNode, rect: &Rect) -> Option<BlockCopy> {
    let bounds = leaf.bounds();
    let overlap = bounds.intersection(rect)?;
    Some(BlockCopy {
        tile_x: (overlap.left() - bounds.left()) as usize,
        tile_y: (overlap.top() - bounds.top()) as usize,
        width: overlap.width as usize,
        height: overlap.height as usize,
        buffer_x: (overlap.left() - rect.left()) as usize,
        buffer_y: (overlap.top() - rect.top()) as usize,
        buffer_width: rect.width as usize,
    })
}

fn check_band(band: usize, band_count: usize) -> Result<(), CanvasError> {
    if band >= band_count {
        return Err(CanvasError::BandIndexOutOfRange { band, band_count });
    }
    Ok(())
}

fn check_buffer(rect: &Rect, per_pixel: usize, actual: usize) -> Result<usize, CanvasError> {
    let required = rect.area().saturating_mul(per_pixel);
    if actual < required {
        return Err(CanvasError::BufferTooSmall { required, actual });
    }
    Ok(required)
}

/// Read-only bulk access. Buffers are row-major over the requested rect;
/// unallocated space decodes as zero.
#[derive(Debug, Clone, Copy)]
pub struct RegionView<'a> {
    canvas: &'a Canvas,
}

impl<'a> RegionView<'a> {
    pub(crate) fn new(canvas: &'a Canvas) -> Self {
        Self { canvas }
    }

    pub fn band_count(&self) -> usize {
        self.canvas.format().band_count()
    }

    /// Decodes `rect` into `dst`, `band_count` samples per pixel.
    pub fn get_region(&self, rect: &Rect, dst: &mut [u32]) -> Result<(), CanvasError> {
        let bands = self.band_count();
        let required = check_buffer(rect, bands, dst.len())?;
        let leaves = self.canvas.region_tiles(rect)?;
        dst[..required].fill(0);

        let codec = self.canvas.format().codec();
        for leaf in leaves.into_iter().flatten() {
            let (Some(tile), Some(block)) = (leaf.tile(), block_for(leaf, rect)) else {
                continue;
            };
            codec.read_block(tile.data(), tile.geometry(), &block, bands, dst);
        }
        Ok(())
    }

    pub fn get_region_vec(&self, rect: &Rect) -> Result<Vec<u32>, CanvasError> {
        let mut samples = vec![0; rect.area().saturating_mul(self.band_count())];
        self.get_region(rect, &mut samples)?;
        Ok(samples)
    }

    pub fn extract(&self, rect: &Rect) -> Result<Raster, CanvasError> {
        Ok(Raster {
            width: rect.width,
            height: rect.height,
            band_count: self.band_count(),
            samples: self.get_region_vec(rect)?,
        })
    }

    pub fn get_sample(&self, x: i32, y: i32, band: usize) -> Result<u32, CanvasError> {
        check_band(band, self.band_count())?;
        let Some(leaf) = self.canvas.locate(x, y) else {
            return Ok(0);
        };
        let (local_x, local_y) = leaf.local(x, y);
        Ok(leaf.tile().map_or(0, |tile| {
            tile.read_sample(self.canvas.format().codec(), local_x, local_y, band)
        }))
    }

    /// Decodes one band of `rect` into `dst`, one sample per pixel.
    pub fn get_samples(&self, rect: &Rect, band: usize, dst: &mut [u32]) -> Result<(), CanvasError> {
        check_band(band, self.band_count())?;
        let required = check_buffer(rect, 1, dst.len())?;
        let leaves = self.canvas.region_tiles(rect)?;
        dst[..required].fill(0);

        let codec = self.canvas.format().codec();
        for leaf in leaves.into_iter().flatten() {
            let (Some(tile), Some(block)) = (leaf.tile(), block_for(leaf, rect)) else {
                continue;
            };
            codec.read_band_block(tile.data(), tile.geometry(), &block, band, dst);
        }
        Ok(())
    }
}

/// Mutating bulk access. Every check runs before the first tile is touched,
/// so a failed call leaves the canvas unchanged.
#[derive(Debug)]
pub struct RegionViewMut<'a> {
    canvas: &'a mut Canvas,
}

impl<'a> RegionViewMut<'a> {
    pub(crate) fn new(canvas: &'a mut Canvas) -> Self {
        Self { canvas }
    }

    pub fn view(&self) -> RegionView<'_> {
        RegionView::new(&*self.canvas)
    }

    pub fn band_count(&self) -> usize {
        self.canvas.format().band_count()
    }

    /// Encodes `src`, `band_count` samples per pixel, into `rect`.
    pub fn set_region(&mut self, rect: &Rect, src: &[u32]) -> Result<(), CanvasError> {
        let bands = self.band_count();
        check_buffer(rect, bands, src.len())?;
        let (format, leaves) = self.canvas.materialize_region(rect)?;
        let codec = format.codec();
        for leaf in leaves {
            let Some(block) = block_for(leaf, rect) else {
                continue;
            };
            if let Some(tile) = leaf.tile_mut() {
                let geometry = tile.geometry();
                codec.write_block(tile.data_mut(), geometry, &block, bands, src);
            }
        }
        Ok(())
    }

    pub fn set_sample(&mut self, x: i32, y: i32, band: usize, value: u32) -> Result<(), CanvasError> {
        check_band(band, self.band_count())?;
        let (format, leaves) = self.canvas.materialize_region(&Rect::new(x, y, 1, 1))?;
        let codec = format.codec();
        for leaf in leaves {
            let (local_x, local_y) = leaf.local(x, y);
            if let Some(tile) = leaf.tile_mut() {
                tile.write_sample(codec, local_x, local_y, band, value);
            }
        }
        Ok(())
    }

    /// Encodes `src`, one sample per pixel, into band `band` of `rect`.
    pub fn set_samples(&mut self, rect: &Rect, band: usize, src: &[u32]) -> Result<(), CanvasError> {
        check_band(band, self.band_count())?;
        check_buffer(rect, 1, src.len())?;
        let (format, leaves) = self.canvas.materialize_region(rect)?;
        let codec = format.codec();
        for leaf in leaves {
            let Some(block) = block_for(leaf, rect) else {
                continue;
            };
            if let Some(tile) = leaf.tile_mut() {
                let geometry = tile.geometry();
                codec.write_band_block(tile.data_mut(), geometry, &block, band, src);
            }
        }
        Ok(())
    }
}
