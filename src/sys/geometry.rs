use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

/// An axis-aligned rectangle. Whether `origin` is the top-left or the
/// bottom-left corner depends on the coordinate space the rect came from; see
/// [`crate::sys::screen::CoordinateConverter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self { Self { origin, size } }

    pub const fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Point::new(x, y), Size::new(width, height))
    }

    pub fn max(&self) -> Point {
        Point::new(self.origin.x + self.size.width, self.origin.y + self.size.height)
    }

    /// Inclusive on the min edges, exclusive on the max edges.
    pub fn contains(&self, point: Point) -> bool {
        let max = self.max();
        point.x >= self.origin.x && point.x < max.x && point.y >= self.origin.y && point.y < max.y
    }

    /// Grows the rect by `amount` on every side.
    pub fn outset(&self, amount: f64) -> Rect {
        Rect::from_xywh(
            self.origin.x - amount,
            self.origin.y - amount,
            self.size.width + 2.0 * amount,
            self.size.height + 2.0 * amount,
        )
    }

    pub fn with_origin(&self, origin: Point) -> Rect { Rect::new(origin, self.size) }

    pub fn with_height(&self, height: f64) -> Rect {
        Rect::new(self.origin, Size::new(self.size.width, height))
    }

    /// Exact comparison of origin and size. Frames read back from the window
    /// server are compared bit-for-bit; no tolerance is applied.
    pub fn same_as(&self, other: &Rect) -> bool { self == other }
}
