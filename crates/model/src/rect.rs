/// Half-open integer rectangle `[x, x + width) × [y, y + height)`.
///
/// Edges are evaluated in `i64` so a rectangle touching `i32::MAX` still has a
/// representable right/bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const ZERO: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from half-open `i64` edges. Returns `None` when the
    /// edges are inverted or the origin does not fit in `i32`.
    pub fn from_edges(left: i64, top: i64, right: i64, bottom: i64) -> Option<Self> {
        if right < left || bottom < top {
            return None;
        }
        Some(Self {
            x: i32::try_from(left).ok()?,
            y: i32::try_from(top).ok()?,
            width: u32::try_from(right - left).ok()?,
            height: u32::try_from(bottom - top).ok()?,
        })
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn left(&self) -> i64 {
        self.x as i64
    }

    pub const fn top(&self) -> i64 {
        self.y as i64
    }

    pub const fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub const fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub const fn contains(&self, px: i32, py: i32) -> bool {
        let (px, py) = (px as i64, py as i64);
        px >= self.left() && px < self.right() && py >= self.top() && py < self.bottom()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Non-empty overlap of two rectangles.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Rect::from_edges(left, top, right, bottom)
    }

    /// Inclusive bottom-right pixel, or `None` when the rectangle is empty or
    /// that pixel lies outside the `i32` domain.
    pub fn last_pixel(&self) -> Option<(i32, i32)> {
        if self.is_empty() {
            return None;
        }
        let last_x = i32::try_from(self.right() - 1).ok()?;
        let last_y = i32::try_from(self.bottom() - 1).ok()?;
        Some((last_x, last_y))
    }

    /// Number of pixels, saturating on targets where it exceeds `usize`.
    pub fn area(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_clips_to_overlap() {
        let region = Rect::new(100, 100, 60, 60);
        let tile = Rect::new(128, 0, 128, 128);
        assert_eq!(region.intersection(&tile), Some(Rect::new(128, 100, 32, 28)));
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::new(0, 0, 128, 128);
        let b = Rect::new(128, 0, 128, 128);
        assert_eq!(a.intersection(&b), None);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn last_pixel_rejects_edges_past_i32_max() {
        assert_eq!(Rect::new(i32::MAX, 0, 1, 1).last_pixel(), Some((i32::MAX, 0)));
        assert_eq!(Rect::new(i32::MAX, 0, 2, 1).last_pixel(), None);
        assert_eq!(Rect::new(5, 5, 0, 3).last_pixel(), None);
    }

    #[test]
    fn contains_is_half_open() {
        let rect = Rect::new(-10, -10, 16, 16);
        assert!(rect.contains(-10, -10));
        assert!(rect.contains(5, 5));
        assert!(!rect.contains(6, 5));
        assert!(!rect.contains(5, 6));
    }

    #[test]
    fn from_edges_rejects_inverted_edges() {
        assert_eq!(Rect::from_edges(4, 0, 2, 1), None);
        assert_eq!(Rect::from_edges(-10, -10, 6, 6), Some(Rect::new(-10, -10, 16, 16)));
    }
}
