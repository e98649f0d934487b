use model::{Rect, TileGeometry};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{CanvasError, Tile};

/// Child slot of an internal node. Ties on the midline go to the
/// higher-coordinate side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    const fn from_sides(right: bool, bottom: bool) -> Self {
        match (right, bottom) {
            (false, false) => Quadrant::TopLeft,
            (true, false) => Quadrant::TopRight,
            (false, true) => Quadrant::BottomLeft,
            (true, true) => Quadrant::BottomRight,
        }
    }

    const fn is_right(self) -> bool {
        matches!(self, Quadrant::TopRight | Quadrant::BottomRight)
    }

    const fn is_bottom(self) -> bool {
        matches!(self, Quadrant::BottomLeft | Quadrant::BottomRight)
    }
}

/// Square region `[x, x + size) × [y, y + size)` whose edges stay inside the
/// `i32` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Extent {
    x: i32,
    y: i32,
    size: u32,
}

const DOMAIN_END: i64 = i32::MAX as i64 + 1;

/// Largest tile grid a single region call may walk.
const MAX_GRID_CELLS: usize = isize::MAX as usize / size_of::<(i32, i32)>();

impl Extent {
    pub(crate) fn new(x: i32, y: i32, size: u32) -> Option<Self> {
        let extent = Self { x, y, size };
        (extent.right() <= DOMAIN_END && extent.bottom() <= DOMAIN_END).then_some(extent)
    }

    fn left(self) -> i64 {
        i64::from(self.x)
    }

    fn top(self) -> i64 {
        i64::from(self.y)
    }

    fn right(self) -> i64 {
        self.left() + i64::from(self.size)
    }

    fn bottom(self) -> i64 {
        self.top() + i64::from(self.size)
    }

    pub(crate) fn rect(self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }

    pub(crate) fn contains(self, px: i64, py: i64) -> bool {
        px >= self.left() && px < self.right() && py >= self.top() && py < self.bottom()
    }

    pub(crate) fn quadrant(self, px: i64, py: i64) -> Quadrant {
        let half = i64::from(self.size / 2);
        Quadrant::from_sides(px >= self.left() + half, py >= self.top() + half)
    }

    fn child(self, quadrant: Quadrant) -> Self {
        let half = self.size / 2;
        // Children never reach past the parent's right/bottom edge, so the
        // offsets stay inside i32.
        let offset = |side: bool| if side { half as i64 } else { 0 };
        Self {
            x: (self.left() + offset(quadrant.is_right())) as i32,
            y: (self.top() + offset(quadrant.is_bottom())) as i32,
            size: half,
        }
    }

    /// Doubles the extent toward `(px, py)`. On each axis the origin moves back
    /// by the old size only when the point lies before the current extent.
    /// Returns the new extent and the quadrant the old extent occupies in it.
    fn grown_toward(self, px: i64, py: i64) -> Option<(Extent, Quadrant)> {
        let size = i64::from(self.size);
        let new_size = self.size.checked_mul(2)?;
        let new_x = if px < self.left() { self.left() - size } else { self.left() };
        let new_y = if py < self.top() { self.top() - size } else { self.top() };
        let grown = Extent::new(
            i32::try_from(new_x).ok()?,
            i32::try_from(new_y).ok()?,
            new_size,
        )?;
        let quadrant = Quadrant::from_sides(self.left() >= new_x + size, self.top() >= new_y + size);
        Some((grown, quadrant))
    }

    /// Every doubling needed before the extent contains `(px, py)`.
    fn growth_steps(
        self,
        px: i64,
        py: i64,
    ) -> Result<SmallVec<[(Extent, Quadrant); 8]>, CanvasError> {
        let mut steps = SmallVec::new();
        let mut current = self;
        while !current.contains(px, py) {
            let (grown, quadrant) = current
                .grown_toward(px, py)
                .ok_or(CanvasError::CoordinateOverflow { x: px, y: py })?;
            steps.push((grown, quadrant));
            current = grown;
        }
        Ok(steps)
    }

    fn grown_to_fit(self, px: i64, py: i64) -> Result<Extent, CanvasError> {
        Ok(self
            .growth_steps(px, py)?
            .last()
            .map_or(self, |&(extent, _)| extent))
    }
}

/// Quadtree node: a leaf owning an optional tile, or an internal node owning
/// up to four children.
#[derive(Debug)]
pub struct QuadNode {
    extent: Extent,
    tile: Option<Tile>,
    children: Option<[Option<Box<QuadNode>>; 4]>,
}

impl QuadNode {
    fn new(extent: Extent, tile_size: u32) -> Self {
        Self {
            extent,
            tile: None,
            children: (extent.size > tile_size).then(Default::default),
        }
    }

    pub fn x(&self) -> i32 {
        self.extent.x
    }

    pub fn y(&self) -> i32 {
        self.extent.y
    }

    pub fn size(&self) -> u32 {
        self.extent.size
    }

    pub fn bounds(&self) -> Rect {
        self.extent.rect()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.extent.contains(i64::from(x), i64::from(y))
    }

    pub fn quadrant(&self, x: i32, y: i32) -> Quadrant {
        self.extent.quadrant(i64::from(x), i64::from(y))
    }

    pub fn child(&self, quadrant: Quadrant) -> Option<&QuadNode> {
        self.children.as_ref()?[quadrant.index()].as_deref()
    }

    pub fn tile(&self) -> Option<&Tile> {
        self.tile.as_ref()
    }

    pub fn tile_mut(&mut self) -> Option<&mut Tile> {
        self.tile.as_mut()
    }

    pub(crate) fn children(&self) -> impl DoubleEndedIterator<Item = &QuadNode> {
        self.children.iter().flatten().flatten().map(|child| &**child)
    }

    /// Offset of `(x, y)` from the node origin. The point must lie inside.
    pub(crate) fn local(&self, x: i32, y: i32) -> (usize, usize) {
        (
            (i64::from(x) - self.extent.left()) as usize,
            (i64::from(y) - self.extent.top()) as usize,
        )
    }

    fn collect_leaves_mut<'a>(&'a mut self, rect: &Rect, out: &mut Vec<&'a mut QuadNode>) {
        if !self.extent.rect().intersects(rect) {
            return;
        }
        if self.is_leaf() {
            out.push(self);
            return;
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut().flatten() {
                child.collect_leaves_mut(rect, out);
            }
        }
    }
}

/// Sole owner of the tree root. Growth swaps a new, larger root into the slot
/// with the previous root attached as one of its children.
#[derive(Debug)]
pub(crate) struct RootSlot {
    node: Box<QuadNode>,
    tile_size: u32,
}

impl RootSlot {
    pub(crate) fn new(x: i32, y: i32, tile_size: u32) -> Result<Self, CanvasError> {
        let extent = Extent::new(x, y, tile_size).ok_or(CanvasError::CoordinateOverflow {
            x: i64::from(x),
            y: i64::from(y),
        })?;
        Ok(Self {
            node: Box::new(QuadNode::new(extent, tile_size)),
            tile_size,
        })
    }

    pub(crate) fn node(&self) -> &QuadNode {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut QuadNode {
        &mut self.node
    }

    pub(crate) fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub(crate) fn locate(&self, x: i32, y: i32) -> Option<&QuadNode> {
        let mut node = &*self.node;
        if !node.contains(x, y) {
            return None;
        }
        while let Some(children) = &node.children {
            node = children[node.quadrant(x, y).index()].as_deref()?;
        }
        Some(node)
    }

    pub(crate) fn locate_mut(&mut self, x: i32, y: i32) -> Option<&mut QuadNode> {
        let mut node = &mut *self.node;
        if !node.contains(x, y) {
            return None;
        }
        while !node.is_leaf() {
            let quadrant = node.quadrant(x, y);
            node = node.children.as_mut()?[quadrant.index()].as_deref_mut()?;
        }
        Some(node)
    }

    /// Checks that every point can be brought inside the tree, visiting them
    /// in order, without touching the tree.
    pub(crate) fn plan_growth(
        &self,
        points: impl IntoIterator<Item = (i32, i32)>,
    ) -> Result<(), CanvasError> {
        let mut extent = self.node.extent;
        for (x, y) in points {
            extent = extent.grown_to_fit(i64::from(x), i64::from(y))?;
        }
        Ok(())
    }

    fn grow_to_fit(&mut self, x: i32, y: i32) -> Result<(), CanvasError> {
        let steps = self.node.extent.growth_steps(i64::from(x), i64::from(y))?;
        for (extent, quadrant) in steps {
            debug!(
                from = ?self.node.extent.rect(),
                to = ?extent.rect(),
                "growing canvas root"
            );
            let grown = Box::new(QuadNode::new(extent, self.tile_size));
            let previous = std::mem::replace(&mut self.node, grown);
            if let Some(children) = self.node.children.as_mut() {
                children[quadrant.index()] = Some(previous);
            }
        }
        Ok(())
    }

    /// Returns the leaf containing `(x, y)`, growing the root and creating
    /// intermediate nodes as needed, with its tile materialized.
    pub(crate) fn leaf_or_create(
        &mut self,
        x: i32,
        y: i32,
        geometry: TileGeometry,
    ) -> Result<&mut QuadNode, CanvasError> {
        self.grow_to_fit(x, y)?;
        let tile_size = self.tile_size;
        let (px, py) = (i64::from(x), i64::from(y));
        let mut node = &mut *self.node;
        while !node.is_leaf() {
            let extent = node.extent;
            let quadrant = extent.quadrant(px, py);
            let children = node.children.get_or_insert_with(Default::default);
            node = &mut **children[quadrant.index()]
                .get_or_insert_with(|| Box::new(QuadNode::new(extent.child(quadrant), tile_size)));
        }
        if node.tile.is_none() {
            trace!(x = node.extent.x, y = node.extent.y, "materializing tile");
            node.tile = Some(Tile::blank(geometry));
        }
        Ok(node)
    }

    /// Leaves overlapping `rect`, in tree order.
    pub(crate) fn leaves_in_mut(&mut self, rect: &Rect) -> Vec<&mut QuadNode> {
        let mut leaves = Vec::new();
        self.node.collect_leaves_mut(rect, &mut leaves);
        leaves
    }

    /// One probe point per tile-grid cell overlapping `rect`, column by column.
    ///
    /// Cells are aligned to the tile lattice of the tree, which matches
    /// `floor_div(coord, tile_size) * tile_size` when the root origin is
    /// tile aligned. Each probe lies inside both the cell and `rect`.
    pub(crate) fn grid_probes(&self, rect: &Rect) -> Result<Vec<(i32, i32)>, CanvasError> {
        let Some((last_x, last_y)) = rect.last_pixel() else {
            if rect.is_empty() {
                return Ok(Vec::new());
            }
            return Err(CanvasError::CoordinateOverflow {
                x: rect.right() - 1,
                y: rect.bottom() - 1,
            });
        };
        let step = i64::from(self.tile_size);
        let phase_x = self.node.extent.left().rem_euclid(step);
        let phase_y = self.node.extent.top().rem_euclid(step);
        let align = |coord: i64, phase: i64| (coord - phase).div_euclid(step) * step + phase;

        let (start_x, end_x) = (align(rect.left(), phase_x), align(i64::from(last_x), phase_x));
        let (start_y, end_y) = (align(rect.top(), phase_y), align(i64::from(last_y), phase_y));
        let columns = (end_x - start_x) / step + 1;
        let rows = (end_y - start_y) / step + 1;
        let cells = columns
            .checked_mul(rows)
            .and_then(|cells| usize::try_from(cells).ok())
            .filter(|&cells| cells <= MAX_GRID_CELLS)
            .ok_or(CanvasError::RegionTooLarge {
                width: rect.width,
                height: rect.height,
            })?;

        let mut probes = Vec::with_capacity(cells);
        for column in 0..columns {
            let cell_x = start_x + column * step;
            for row in 0..rows {
                let cell_y = start_y + row * step;
                // Clamped into the rect, which is inside the i32 domain.
                probes.push((
                    cell_x.max(rect.left()) as i32,
                    cell_y.max(rect.top()) as i32,
                ));
            }
        }
        Ok(probes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midline_ties_go_to_higher_quadrant() {
        let extent = Extent::new(0, 0, 128).expect("extent");
        assert_eq!(extent.quadrant(64, 64), Quadrant::BottomRight);
        assert_eq!(extent.quadrant(63, 63), Quadrant::TopLeft);
        assert_eq!(extent.quadrant(64, 0), Quadrant::TopRight);
        assert_eq!(extent.quadrant(0, 64), Quadrant::BottomLeft);
    }

    #[test]
    fn growth_toward_low_side_shifts_origin() {
        let extent = Extent::new(0, 0, 128).expect("extent");
        let (grown, quadrant) = extent.grown_toward(-1, -1).expect("grow");
        assert_eq!(grown, Extent::new(-128, -128, 256).expect("extent"));
        assert_eq!(quadrant, Quadrant::BottomRight);
    }

    #[test]
    fn growth_toward_high_side_keeps_origin() {
        let extent = Extent::new(0, 0, 128).expect("extent");
        let (grown, quadrant) = extent.grown_toward(200, -5).expect("grow");
        assert_eq!(grown, Extent::new(0, -128, 256).expect("extent"));
        assert_eq!(quadrant, Quadrant::BottomLeft);
    }

    #[test]
    fn growth_steps_repeat_until_contained() {
        let extent = Extent::new(0, 0, 128).expect("extent");
        let steps = extent.growth_steps(1000, 0).expect("steps");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2].0, Extent::new(0, 0, 1024).expect("extent"));
        assert!(steps.iter().all(|&(_, quadrant)| quadrant == Quadrant::TopLeft));
    }

    #[test]
    fn growth_past_domain_is_rejected() {
        let extent = Extent::new(0, 0, 128).expect("extent");
        assert_eq!(
            extent.growth_steps(i64::from(i32::MIN), 0),
            Err(CanvasError::CoordinateOverflow {
                x: i64::from(i32::MIN),
                y: 0
            })
        );
        assert!(extent.growth_steps(i64::from(i32::MAX), 0).is_ok());
    }

    #[test]
    fn children_partition_parent() {
        let extent = Extent::new(-256, 512, 256).expect("extent");
        let children: Vec<Extent> = Quadrant::ALL.iter().map(|&q| extent.child(q)).collect();
        assert_eq!(
            children,
            vec![
                Extent::new(-256, 512, 128).expect("extent"),
                Extent::new(-128, 512, 128).expect("extent"),
                Extent::new(-256, 640, 128).expect("extent"),
                Extent::new(-128, 640, 128).expect("extent"),
            ]
        );
    }

    #[test]
    fn grid_probes_step_tile_cells_column_major() {
        let root = RootSlot::new(0, 0, 128).expect("root");
        let probes = root.grid_probes(&Rect::new(100, 100, 60, 60)).expect("probes");
        assert_eq!(probes, vec![(100, 100), (100, 128), (128, 100), (128, 128)]);
        assert!(root.grid_probes(&Rect::new(0, 0, 0, 5)).expect("empty").is_empty());
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let root = RootSlot::new(0, 0, 1).expect("root");
        let rect = Rect::new(i32::MIN, i32::MIN, u32::MAX, u32::MAX);
        assert_eq!(
            root.grid_probes(&rect),
            Err(CanvasError::RegionTooLarge {
                width: u32::MAX,
                height: u32::MAX
            })
        );
    }

    #[test]
    fn grid_probes_follow_unaligned_origin() {
        let root = RootSlot::new(5, 0, 128).expect("root");
        let probes = root.grid_probes(&Rect::new(6, 0, 1, 1)).expect("probes");
        assert_eq!(probes, vec![(6, 0)]);
        let probes = root.grid_probes(&Rect::new(130, 0, 10, 1)).expect("probes");
        assert_eq!(probes, vec![(130, 0), (133, 0)]);
    }
}
