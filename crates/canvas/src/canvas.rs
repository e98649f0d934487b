use std::cell::Cell;

use model::{PixelFormat, Rect, TileGeometry};
use smallvec::SmallVec;

use crate::config::{CanvasConfig, validate_tile_size};
use crate::node::{QuadNode, RootSlot};
use crate::region::{RegionView, RegionViewMut};
use crate::{CanvasError, Tile, bounds};

type PixelSamples = SmallVec<[u32; 4]>;

/// Unbounded pixel canvas backed by a growing quadtree of lazily allocated
/// tiles.
///
/// The logical bounds are memoized in a [`Cell`], so a canvas is `!Sync`.
#[derive(Debug)]
pub struct Canvas {
    root: RootSlot,
    format: PixelFormat,
    geometry: TileGeometry,
    bounds: Cell<Option<Rect>>,
}

/// An allocated tile together with the canvas coordinates of its top-left
/// pixel.
#[derive(Debug, Clone, Copy)]
pub struct AllocatedTile<'a> {
    pub x: i32,
    pub y: i32,
    pub tile: &'a Tile,
}

/// Depth-first walk over the allocated tiles of a canvas, quadrant order.
#[derive(Debug)]
pub struct AllocatedTiles<'a> {
    stack: Vec<&'a QuadNode>,
}

impl<'a> Iterator for AllocatedTiles<'a> {
    type Item = AllocatedTile<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            self.stack.extend(node.children().rev());
            if let Some(tile) = node.tile() {
                return Some(AllocatedTile {
                    x: node.x(),
                    y: node.y(),
                    tile,
                });
            }
        }
        None
    }
}

impl Canvas {
    /// Canvas storing `IntArgb` pixels with its root at `(origin_x, origin_y)`.
    pub fn new(tile_size: u32, origin_x: i32, origin_y: i32) -> Result<Self, CanvasError> {
        Self::with_format(tile_size, origin_x, origin_y, PixelFormat::int_argb())
    }

    pub fn with_format(
        tile_size: u32,
        origin_x: i32,
        origin_y: i32,
        format: PixelFormat,
    ) -> Result<Self, CanvasError> {
        validate_tile_size(tile_size)?;
        let geometry = format.codec().geometry(tile_size as usize);
        Ok(Self {
            root: RootSlot::new(origin_x, origin_y, tile_size)?,
            format,
            geometry,
            bounds: Cell::new(None),
        })
    }

    pub fn with_config(config: &CanvasConfig) -> Result<Self, CanvasError> {
        config.validate()?;
        Self::with_format(
            config.tile_size,
            config.origin_x,
            config.origin_y,
            config.format.pixel_format()?,
        )
    }

    pub fn tile_size(&self) -> u32 {
        self.root.tile_size()
    }

    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    pub fn root(&self) -> &QuadNode {
        self.root.node()
    }

    pub fn root_extent(&self) -> Rect {
        self.root.node().bounds()
    }

    /// Leaf containing `(x, y)` without modifying the tree. `None` when the
    /// point is outside the root or the covering subtree was never created.
    pub fn locate(&self, x: i32, y: i32) -> Option<&QuadNode> {
        self.root.locate(x, y)
    }

    /// Leaf containing `(x, y)` with its tile allocated, growing the root as
    /// needed. On error the tree is left untouched.
    pub fn locate_or_create(&mut self, x: i32, y: i32) -> Result<&mut QuadNode, CanvasError> {
        let leaf = self.root.leaf_or_create(x, y, self.geometry)?;
        self.bounds.set(None);
        Ok(leaf)
    }

    /// One entry per tile-grid cell overlapping `rect`, column by column.
    pub fn region_tiles(&self, rect: &Rect) -> Result<Vec<Option<&QuadNode>>, CanvasError> {
        Ok(self
            .root
            .grid_probes(rect)?
            .into_iter()
            .map(|(x, y)| self.root.locate(x, y))
            .collect())
    }

    /// Materializes every tile overlapping `rect` and returns the leaves.
    pub fn region_tiles_mut(&mut self, rect: &Rect) -> Result<Vec<&mut QuadNode>, CanvasError> {
        let (_, leaves) = self.materialize_region(rect)?;
        Ok(leaves)
    }

    /// Split borrow of the format and the leaves overlapping `rect`, all with
    /// tiles allocated. Growth for the whole region is checked up front.
    pub(crate) fn materialize_region(
        &mut self,
        rect: &Rect,
    ) -> Result<(&PixelFormat, Vec<&mut QuadNode>), CanvasError> {
        let probes = self.root.grid_probes(rect)?;
        if probes.is_empty() {
            return Ok((&self.format, Vec::new()));
        }
        self.root.plan_growth(probes.iter().copied())?;
        for &(x, y) in &probes {
            self.root.leaf_or_create(x, y, self.geometry)?;
        }
        self.bounds.set(None);
        Ok((&self.format, self.root.leaves_in_mut(rect)))
    }

    /// Format-defined pixel word at `(x, y)`; unwritten space reads as zero.
    pub fn get_pixel(&self, x: i32, y: i32) -> Result<u32, CanvasError> {
        let mut samples = PixelSamples::from_elem(0, self.format.band_count());
        self.read_samples(x, y, &mut samples);
        Ok(self.format.pack_pixel(&samples)?)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, value: u32) -> Result<(), CanvasError> {
        let mut samples = PixelSamples::from_elem(0, self.format.band_count());
        self.format.unpack_pixel(value, &mut samples)?;
        self.write_samples(x, y, &samples)
    }

    /// Decoded bands of the pixel at `(x, y)`. Slots past the band count are
    /// zeroed.
    pub fn get_pixel_samples(&self, x: i32, y: i32, out: &mut [u32]) -> Result<(), CanvasError> {
        self.check_pixel_buffer(out.len())?;
        self.read_samples(x, y, out);
        Ok(())
    }

    pub fn set_pixel_samples(&mut self, x: i32, y: i32, samples: &[u32]) -> Result<(), CanvasError> {
        self.check_pixel_buffer(samples.len())?;
        self.write_samples(x, y, samples)
    }

    /// Shifts the content of the tile holding `(x, y)` by `(dx, dy)` pixels.
    /// Returns `false` when that tile was never allocated.
    pub fn shift_tile(&mut self, x: i32, y: i32, dx: i32, dy: i32) -> bool {
        let Some(tile) = self.root.locate_mut(x, y).and_then(QuadNode::tile_mut) else {
            return false;
        };
        tile.shift(self.format.codec(), dx, dy);
        self.bounds.set(None);
        true
    }

    /// Smallest rectangle holding every contributing pixel, recomputed only
    /// after a mutation.
    pub fn logical_bounds(&self) -> Rect {
        if let Some(bounds) = self.bounds.get() {
            return bounds;
        }
        let bounds = bounds::scan(self.root.node(), &self.format);
        self.bounds.set(Some(bounds));
        bounds
    }

    /// Forces the next [`Canvas::logical_bounds`] call to rescan.
    pub fn mark_dirty(&self) {
        self.bounds.set(None);
    }

    pub fn allocated_leaf_count(&self) -> usize {
        self.allocated_tiles().count()
    }

    pub fn allocated_tiles(&self) -> AllocatedTiles<'_> {
        AllocatedTiles {
            stack: vec![self.root.node()],
        }
    }

    pub fn region(&self) -> RegionView<'_> {
        RegionView::new(self)
    }

    pub fn region_mut(&mut self) -> RegionViewMut<'_> {
        RegionViewMut::new(self)
    }

    fn check_pixel_buffer(&self, actual: usize) -> Result<(), CanvasError> {
        let required = self.format.band_count();
        if actual < required {
            return Err(CanvasError::BufferTooSmall { required, actual });
        }
        Ok(())
    }

    fn read_samples(&self, x: i32, y: i32, out: &mut [u32]) {
        match self.root.locate(x, y).and_then(|leaf| Some((leaf, leaf.tile()?))) {
            Some((leaf, tile)) => {
                let (local_x, local_y) = leaf.local(x, y);
                tile.read_pixel(self.format.codec(), local_x, local_y, out);
            }
            None => out.fill(0),
        }
    }

    fn write_samples(&mut self, x: i32, y: i32, samples: &[u32]) -> Result<(), CanvasError> {
        let leaf = self.root.leaf_or_create(x, y, self.geometry)?;
        let (local_x, local_y) = leaf.local(x, y);
        if let Some(tile) = leaf.tile_mut() {
            tile.write_pixel(self.format.codec(), local_x, local_y, samples);
        }
        self.bounds.set(None);
        Ok(())
    }
}
