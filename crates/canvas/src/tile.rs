use model::{RegionCodec, TileGeometry};

/// Square pixel buffer owned by one quadtree leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    geometry: TileGeometry,
    data: Box<[u32]>,
}

impl Tile {
    /// All-default tile; every storage word starts at zero.
    pub fn blank(geometry: TileGeometry) -> Self {
        Self {
            geometry,
            data: vec![0; geometry.storage_len()].into_boxed_slice(),
        }
    }

    pub fn geometry(&self) -> TileGeometry {
        self.geometry
    }

    pub fn size(&self) -> usize {
        self.geometry.size
    }

    /// Raw storage words in the layout described by the canvas format.
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    pub fn read_pixel(&self, codec: &dyn RegionCodec, x: usize, y: usize, out: &mut [u32]) {
        codec.read_pixel(&self.data, self.geometry, x, y, out);
    }

    pub fn write_pixel(&mut self, codec: &dyn RegionCodec, x: usize, y: usize, samples: &[u32]) {
        codec.write_pixel(&mut self.data, self.geometry, x, y, samples);
    }

    pub fn read_sample(&self, codec: &dyn RegionCodec, x: usize, y: usize, band: usize) -> u32 {
        codec.read_sample(&self.data, self.geometry, x, y, band)
    }

    pub fn write_sample(
        &mut self,
        codec: &dyn RegionCodec,
        x: usize,
        y: usize,
        band: usize,
        value: u32,
    ) {
        codec.write_sample(&mut self.data, self.geometry, x, y, band, value);
    }

    /// Moves the content by `(dx, dy)` into a fresh buffer. Pixels pushed past
    /// an edge are dropped and vacated pixels read as default.
    pub fn shift(&mut self, codec: &dyn RegionCodec, dx: i32, dy: i32) {
        let geometry = self.geometry;
        let mut shifted = vec![0; self.data.len()].into_boxed_slice();
        let size = geometry.size as i64;
        let (dx, dy) = (dx as i64, dy as i64);
        let columns = (-dx).max(0)..(size - dx).min(size);
        let rows = (-dy).max(0)..(size - dy).min(size);

        for y in rows {
            for x in columns.clone() {
                let (from_x, from_y) = (x as usize, y as usize);
                let (to_x, to_y) = ((x + dx) as usize, (y + dy) as usize);
                for band in 0..codec.band_count() {
                    let value = codec.read_sample(&self.data, geometry, from_x, from_y, band);
                    codec.write_sample(&mut shifted, geometry, to_x, to_y, band, value);
                }
            }
        }
        self.data = shifted;
    }
}
