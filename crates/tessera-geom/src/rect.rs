use super::{Expanse, Point};

/// An axis-aligned rectangle with a signed origin and an unsigned size.
///
/// A rectangle with a zero dimension is empty: it contains no points and
/// intersects nothing.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

/// Clamp a 64-bit span back into the `u32` range.
fn span(from: i64, to: i64) -> u32 {
    (to - from).clamp(0, i64::from(u32::MAX)) as u32
}

/// Clamp a 64-bit coordinate back into the `i32` range.
fn coord(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl Rect {
    /// Construct a new rectangle.
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Construct a rectangle at a point with a given size.
    pub const fn at(tl: Point, size: Expanse) -> Self {
        Self {
            x: tl.x,
            y: tl.y,
            w: size.w,
            h: size.h,
        }
    }

    /// Construct a rectangle from inclusive corner coordinates. Returns an
    /// empty rectangle if the corners are inverted.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            w: span(i64::from(x1), i64::from(x2) + 1),
            h: span(i64::from(y1), i64::from(y2) + 1),
        }
    }

    /// A zero-sized rectangle at the origin.
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Top-left corner.
    pub fn tl(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Size of the rectangle.
    pub fn size(&self) -> Expanse {
        Expanse::new(self.w, self.h)
    }

    /// Exclusive right edge, as a 64-bit value to avoid overflow.
    fn right64(&self) -> i64 {
        i64::from(self.x) + i64::from(self.w)
    }

    /// Exclusive bottom edge, as a 64-bit value to avoid overflow.
    fn bottom64(&self) -> i64 {
        i64::from(self.y) + i64::from(self.h)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        coord(self.right64())
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        coord(self.bottom64())
    }

    /// The inclusive bottom-right corner, or `None` for an empty rectangle.
    pub fn last(&self) -> Option<Point> {
        if self.is_empty() {
            None
        } else {
            Some(Point::new(
                coord(self.right64() - 1),
                coord(self.bottom64() - 1),
            ))
        }
    }

    /// True if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Does this rectangle contain the point?
    pub fn contains(&self, p: Point) -> bool {
        let (px, py) = (i64::from(p.x), i64::from(p.y));
        !self.is_empty()
            && px >= i64::from(self.x)
            && px < self.right64()
            && py >= i64::from(self.y)
            && py < self.bottom64()
    }

    /// Does this rectangle completely enclose `other`? Empty rectangles are
    /// enclosed by everything.
    pub fn contains_rect(&self, other: &Self) -> bool {
        other.is_empty()
            || (!self.is_empty()
                && other.x >= self.x
                && other.y >= self.y
                && other.right64() <= self.right64()
                && other.bottom64() <= self.bottom64())
    }

    /// Compute the intersection of two rectangles. Returns `None` if they do
    /// not overlap.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let x = i64::from(self.x.max(other.x));
        let y = i64::from(self.y.max(other.y));
        let r = self.right64().min(other.right64());
        let b = self.bottom64().min(other.bottom64());
        if r > x && b > y {
            Some(Self::new(coord(x), coord(y), span(x, r), span(y, b)))
        } else {
            None
        }
    }

    /// Do the two rectangles share at least one point?
    pub fn intersects(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }

    /// The bounding box of two rectangles. Empty rectangles contribute nothing.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = i64::from(self.x.min(other.x));
        let y = i64::from(self.y.min(other.y));
        let r = self.right64().max(other.right64());
        let b = self.bottom64().max(other.bottom64());
        Self::new(coord(x), coord(y), span(x, r), span(y, b))
    }

    /// Shift the rectangle by an offset.
    pub fn translate(&self, by: Point) -> Self {
        Self {
            x: self.x.saturating_add(by.x),
            y: self.y.saturating_add(by.y),
            w: self.w,
            h: self.h,
        }
    }

    /// The same rectangle moved to the origin.
    pub fn at_origin(&self) -> Self {
        Self::at(Point::zero(), self.size())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn intersect() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.intersect(&Rect::new(5, 5, 10, 10)), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 5, 5)), None);
        assert_eq!(a.intersect(&Rect::new(-5, -5, 6, 6)), Some(Rect::new(0, 0, 1, 1)));
        assert_eq!(a.intersect(&Rect::new(2, 2, 0, 4)), None);
    }

    #[test]
    fn union_ignores_empty() {
        let a = Rect::new(3, 3, 2, 2);
        assert_eq!(a.union(&Rect::zero()), a);
        assert_eq!(Rect::zero().union(&a), a);
        assert_eq!(a.union(&Rect::new(-1, 10, 1, 1)), Rect::new(-1, 3, 6, 8));
    }

    #[test]
    fn corners() {
        let r = Rect::from_corners(10, 10, 59, 29);
        assert_eq!(r, Rect::new(10, 10, 50, 20));
        assert_eq!(r.last(), Some(Point::new(59, 29)));
        assert!(Rect::from_corners(5, 5, 4, 9).is_empty());
        assert_eq!(Rect::zero().last(), None);
    }

    #[test]
    fn contains() {
        let r = Rect::new(-2, -2, 4, 4);
        assert!(r.contains(Point::new(-2, -2)));
        assert!(r.contains(Point::new(1, 1)));
        assert!(!r.contains(Point::new(2, 1)));
        assert!(r.contains_rect(&Rect::new(-1, -1, 2, 2)));
        assert!(!r.contains_rect(&Rect::new(-1, -1, 4, 2)));
        assert!(r.contains_rect(&Rect::new(100, 100, 0, 0)));
    }

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (-50i32..50, -50i32..50, 0u32..40, 0u32..40).prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn union_encloses_both(a in rect_strategy(), b in rect_strategy()) {
            let u = a.union(&b);
            prop_assert!(u.contains_rect(&a));
            prop_assert!(u.contains_rect(&b));
        }

        #[test]
        fn intersection_is_enclosed(a in rect_strategy(), b in rect_strategy()) {
            if let Some(i) = a.intersect(&b) {
                prop_assert!(!i.is_empty());
                prop_assert!(a.contains_rect(&i));
                prop_assert!(b.contains_rect(&i));
            } else {
                prop_assert!(a.is_empty() || b.is_empty()
                    || a.right() <= b.x || b.right() <= a.x
                    || a.bottom() <= b.y || b.bottom() <= a.y);
            }
        }

        #[test]
        fn translate_roundtrip(r in rect_strategy(), dx in -100i32..100, dy in -100i32..100) {
            let by = Point::new(dx, dy);
            prop_assert_eq!(r.translate(by).translate(-by), r);
        }
    }
}
