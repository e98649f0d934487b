use bitvec::prelude::{BitVec, Lsb0};
use model::{PixelFormat, Rect};
use smallvec::SmallVec;
use tracing::debug;

use crate::Tile;
use crate::node::QuadNode;

/// Half-open `i64` edges accumulated while scanning tiles.
#[derive(Debug, Clone, Copy)]
struct Edges {
    left: i64,
    top: i64,
    right: i64,
    bottom: i64,
}

impl Edges {
    fn union(self, other: Edges) -> Edges {
        Edges {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Smallest rectangle holding every contributing pixel under `root`, or
/// [`Rect::ZERO`] when nothing contributes.
pub(crate) fn scan(root: &QuadNode, format: &PixelFormat) -> Rect {
    let mut stack = vec![root];
    let mut scanned = 0usize;
    let mut edges: Option<Edges> = None;
    while let Some(node) = stack.pop() {
        stack.extend(node.children());
        let Some(tile) = node.tile() else {
            continue;
        };
        scanned += 1;
        if let Some(found) = tile_edges(tile, format, node.x(), node.y()) {
            edges = Some(edges.map_or(found, |current| current.union(found)));
        }
    }

    let bounds = edges
        .and_then(|edges| Rect::from_edges(edges.left, edges.top, edges.right, edges.bottom))
        .unwrap_or(Rect::ZERO);
    debug!(tiles = scanned, ?bounds, "recomputed logical bounds");
    bounds
}

fn tile_edges(tile: &Tile, format: &PixelFormat, origin_x: i32, origin_y: i32) -> Option<Edges> {
    let size = tile.size();
    let codec = format.codec();
    let mut rows: BitVec<usize, Lsb0> = BitVec::repeat(false, size);
    let mut columns: BitVec<usize, Lsb0> = BitVec::repeat(false, size);
    let mut samples: SmallVec<[u32; 4]> = SmallVec::from_elem(0, format.band_count());

    for y in 0..size {
        for x in 0..size {
            tile.read_pixel(codec, x, y, &mut samples);
            if format.is_contributing(&samples) {
                rows.set(y, true);
                columns.set(x, true);
            }
        }
    }

    let (origin_x, origin_y) = (i64::from(origin_x), i64::from(origin_y));
    Some(Edges {
        left: origin_x + columns.first_one()? as i64,
        top: origin_y + rows.first_one()? as i64,
        right: origin_x + columns.last_one()? as i64 + 1,
        bottom: origin_y + rows.last_one()? as i64 + 1,
    })
}
