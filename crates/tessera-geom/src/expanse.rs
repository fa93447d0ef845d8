use super::{Error, Point, Rect, Result};

/// An `Expanse` is a rectangle that has a width and height but no location.
/// Window and node sizes are expressed as an `Expanse`.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Expanse {
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl Expanse {
    /// Construct a new expanse.
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// The area of this expanse.
    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }

    /// True if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Return the expanse unchanged, or an error if either dimension is zero.
    pub fn non_empty(self) -> Result<Self> {
        if self.is_empty() {
            Err(Error::Empty {
                w: self.w,
                h: self.h,
            })
        } else {
            Ok(self)
        }
    }

    /// Return a `Rect` with the same dimensions as the `Expanse`, but a location at (0, 0).
    pub fn rect(&self) -> Rect {
        Rect::at(Point::zero(), *self)
    }

    /// True if this expanse can completely enclose the target in both dimensions.
    pub fn contains(&self, other: &Self) -> bool {
        self.w >= other.w && self.h >= other.h
    }
}

impl From<Rect> for Expanse {
    fn from(r: Rect) -> Self {
        Self { w: r.w, h: r.h }
    }
}

impl From<(u32, u32)> for Expanse {
    fn from(v: (u32, u32)) -> Self {
        Self { w: v.0, h: v.1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty() {
        assert_eq!(Expanse::new(3, 4).non_empty(), Ok(Expanse::new(3, 4)));
        assert_eq!(
            Expanse::new(0, 4).non_empty(),
            Err(Error::Empty { w: 0, h: 4 })
        );
        assert_eq!(Expanse::new(3, 4).area(), 12);
        assert!(Expanse::new(3, 4).contains(&Expanse::new(3, 1)));
    }
}
