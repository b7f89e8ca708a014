//! Conversion between the two screen coordinate conventions in play.
//!
//! The window-control surface reports and accepts frames with the origin at
//! the top-left of the primary screen and Y growing downwards. Overlay panels
//! and the pointer feed use the origin at the bottom-left with Y growing
//! upwards. Both are anchored to the primary screen, so converting only needs
//! its height.

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateConverter {
    screen_height: Option<f64>,
}

impl CoordinateConverter {
    pub fn new(screen_height: Option<f64>) -> Self { Self { screen_height } }

    pub fn screen_height(&self) -> Option<f64> { self.screen_height }

    /// Converts the top edge of a span of `height` to the bottom edge in the
    /// flipped space. Without a known screen height this is the identity.
    pub fn to_bottom_origin(&self, y_top: f64, height: f64) -> f64 {
        match self.screen_height {
            Some(screen_height) => screen_height - y_top - height,
            None => y_top,
        }
    }

    pub fn to_top_origin(&self, y_bottom: f64, height: f64) -> f64 {
        match self.screen_height {
            Some(screen_height) => screen_height - y_bottom - height,
            None => y_bottom,
        }
    }

    pub fn rect_to_bottom_origin(&self, rect: Rect) -> Rect {
        let y = self.to_bottom_origin(rect.origin.y, rect.size.height);
        rect.with_origin(Point::new(rect.origin.x, y))
    }

    /// Points have no extent, so the conversion is the zero-height case.
    pub fn point_to_top_origin(&self, point: Point) -> Point {
        Point::new(point.x, self.to_top_origin(point.y, 0.0))
    }
}
