//! Core geometry types: Axis, Size, Region.
//!
//! Layout works in `f32` internally and publishes integer [`Region`]s, rounding
//! each edge to the nearest unit.

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

/// The direction a one-dimensional layout runs along.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Left to right; the main size is the width.
    #[default]
    Horizontal,
    /// Top to bottom; the main size is the height.
    Vertical,
}

impl Axis {
    /// The perpendicular axis.
    #[inline]
    pub const fn cross(self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

/// A 2D size (width x height).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// A zero-sized size.
    pub const ZERO: Size = Size { width: 0, height: 0 };

    /// Create a new size.
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// The extent along `axis`.
    #[inline]
    pub const fn along(self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Total area (width * height).
    #[inline]
    pub const fn area(self) -> i32 {
        self.width * self.height
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// A rectangular region defined by position and size.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    /// An empty region at the origin.
    pub const EMPTY: Region = Region { x: 0, y: 0, width: 0, height: 0 };

    /// Create a new region.
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a region from main/cross extents along `axis`, relative to
    /// `origin`. Coordinates are rounded to the nearest unit.
    pub fn from_axis(
        origin: Region,
        axis: Axis,
        main_start: f32,
        main_len: f32,
        cross_start: f32,
        cross_len: f32,
    ) -> Region {
        let (ms, ml) = (main_start.round() as i32, main_len.round() as i32);
        let (cs, cl) = (cross_start.round() as i32, cross_len.round() as i32);
        match axis {
            Axis::Horizontal => Region::new(origin.x + ms, origin.y + cs, ml, cl),
            Axis::Vertical => Region::new(origin.x + cs, origin.y + ms, cl, ml),
        }
    }

    /// The right edge (exclusive): `x + width`.
    #[inline]
    pub const fn right(self) -> i32 {
        self.x + self.width
    }

    /// The bottom edge (exclusive): `y + height`.
    #[inline]
    pub const fn bottom(self) -> i32 {
        self.y + self.height
    }

    /// The dimensions as a [`Size`].
    #[inline]
    pub const fn size(self) -> Size {
        Size { width: self.width, height: self.height }
    }

    /// Whether the region has no area.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Whether the point (x, y) lies inside this region.
    #[inline]
    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether `other` is entirely contained within this region.
    #[inline]
    pub const fn contains_region(self, other: Region) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_cross() {
        assert_eq!(Axis::Horizontal.cross(), Axis::Vertical);
        assert_eq!(Axis::Vertical.cross(), Axis::Horizontal);
    }

    #[test]
    fn size_along() {
        let s = Size::new(30, 10);
        assert_eq!(s.along(Axis::Horizontal), 30);
        assert_eq!(s.along(Axis::Vertical), 10);
        assert_eq!(s.area(), 300);
    }

    #[test]
    fn region_from_axis_horizontal() {
        let origin = Region::new(5, 7, 100, 50);
        let r = Region::from_axis(origin, Axis::Horizontal, 10.4, 20.6, 0.0, 50.0);
        assert_eq!(r, Region::new(15, 7, 21, 50));
    }

    #[test]
    fn region_from_axis_vertical_swaps() {
        let origin = Region::new(0, 0, 40, 90);
        let r = Region::from_axis(origin, Axis::Vertical, 30.0, 10.0, 2.0, 36.0);
        assert_eq!(r, Region::new(2, 30, 36, 10));
    }

    #[test]
    fn region_edges_and_contains() {
        let r = Region::new(2, 3, 10, 5);
        assert_eq!(r.right(), 12);
        assert_eq!(r.bottom(), 8);
        assert!(r.contains(2, 3));
        assert!(!r.contains(12, 3));
        assert!(r.contains_region(Region::new(3, 4, 2, 2)));
        assert!(!r.contains_region(Region::new(0, 0, 2, 2)));
        assert!(Region::EMPTY.is_empty());
        assert_eq!(r.size(), Size::new(10, 5));
    }
}
