use super::{Expanse, Point, Rect};

/// A thickness as a coordinate offset, saturating at `i32::MAX`.
fn signed(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Per-edge thickness of a decoration frame around window content.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Insets {
    /// Left edge thickness.
    pub left: u32,
    /// Top edge thickness, usually holding the title.
    pub top: u32,
    /// Right edge thickness.
    pub right: u32,
    /// Bottom edge thickness.
    pub bottom: u32,
}

impl Insets {
    /// Construct insets from explicit edges.
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Zero insets: no frame.
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// True if every edge is zero.
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Combined left and right thickness.
    pub fn horizontal(&self) -> u32 {
        self.left.saturating_add(self.right)
    }

    /// Combined top and bottom thickness.
    pub fn vertical(&self) -> u32 {
        self.top.saturating_add(self.bottom)
    }

    /// Offset of the content origin within the outer rectangle.
    pub fn origin(&self) -> Point {
        Point::new(signed(self.left), signed(self.top))
    }

    /// Outer size needed to hold `content` inside the frame.
    pub fn wrap(&self, content: Expanse) -> Expanse {
        Expanse::new(
            content.w.saturating_add(self.horizontal()),
            content.h.saturating_add(self.vertical()),
        )
    }

    /// Content size left inside an outer size.
    pub fn inner(&self, outer: Expanse) -> Expanse {
        Expanse::new(
            outer.w.saturating_sub(self.horizontal()),
            outer.h.saturating_sub(self.vertical()),
        )
    }
}

/// The edge rectangles of a frame extracted from an outer rectangle.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct FrameRects {
    /// Top edge, full width.
    pub top: Rect,
    /// Bottom edge, full width.
    pub bottom: Rect,
    /// Left edge, between top and bottom.
    pub left: Rect,
    /// Right edge, between top and bottom.
    pub right: Rect,
    /// The content rectangle inside the frame.
    pub content: Rect,
}

impl FrameRects {
    /// Split `outer` into frame edges and content. Edges larger than the
    /// outer rectangle collapse to empty rectangles.
    pub fn new(outer: Rect, insets: Insets) -> Self {
        let inner = insets.inner(outer.size());
        let content = Rect::at(outer.tl() + insets.origin(), inner);
        let top_h = insets.top.min(outer.h);
        let bottom_h = insets.bottom.min(outer.h.saturating_sub(top_h));
        let mid_h = outer.h.saturating_sub(top_h + bottom_h);
        let left_w = insets.left.min(outer.w);
        let right_w = insets.right.min(outer.w.saturating_sub(left_w));
        let mid_y = outer.y.saturating_add(signed(top_h));
        Self {
            top: Rect::new(outer.x, outer.y, outer.w, top_h),
            bottom: Rect::new(outer.x, outer.bottom().saturating_sub(signed(bottom_h)), outer.w, bottom_h),
            left: Rect::new(outer.x, mid_y, left_w, mid_h),
            right: Rect::new(outer.right().saturating_sub(signed(right_w)), mid_y, right_w, mid_h),
            content,
        }
    }

    /// Iterate the non-empty edge rectangles.
    pub fn edges(&self) -> impl Iterator<Item = Rect> + '_ {
        [self.top, self.bottom, self.left, self.right]
            .into_iter()
            .filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_and_inner() {
        let i = Insets::new(2, 20, 2, 2);
        assert_eq!(i.wrap(Expanse::new(200, 100)), Expanse::new(204, 122));
        assert_eq!(i.inner(Expanse::new(204, 122)), Expanse::new(200, 100));
        assert_eq!(i.inner(Expanse::new(1, 1)), Expanse::new(0, 0));
    }

    #[test]
    fn frame_rects() {
        let f = FrameRects::new(Rect::new(10, 10, 20, 30), Insets::new(1, 5, 2, 3));
        assert_eq!(f.top, Rect::new(10, 10, 20, 5));
        assert_eq!(f.bottom, Rect::new(10, 37, 20, 3));
        assert_eq!(f.left, Rect::new(10, 15, 1, 22));
        assert_eq!(f.right, Rect::new(28, 15, 2, 22));
        assert_eq!(f.content, Rect::new(11, 15, 17, 22));
        assert_eq!(f.edges().count(), 4);

        let none = FrameRects::new(Rect::new(0, 0, 5, 5), Insets::zero());
        assert_eq!(none.edges().count(), 0);
        assert_eq!(none.content, Rect::new(0, 0, 5, 5));
    }

    #[test]
    fn oversized_insets_saturate() {
        let i = Insets::new(u32::MAX, 3, 0, 0);
        assert_eq!(i.origin(), Point::new(i32::MAX, 3));
        let f = FrameRects::new(Rect::new(0, 0, 4, 4), Insets::new(0, 0, u32::MAX, 0));
        assert_eq!(f.right, Rect::new(0, 0, 4, 4));
    }
}
