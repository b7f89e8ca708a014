//! Geometry shared by both synchronization directions.
//!
//! Group frames and window frames are top-left origin. Overlay frames and drop
//! targets are bottom-left origin, matching the panel and pointer surfaces.

use crate::common::config::Settings;
use crate::sys::geometry::{Point, Rect};
use crate::sys::screen::CoordinateConverter;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutEngine {
    overlay_height: f64,
    drop_target_padding: f64,
    converter: CoordinateConverter,
}

impl LayoutEngine {
    pub fn new(settings: &Settings, screen_height: Option<f64>) -> Self {
        LayoutEngine {
            overlay_height: settings.overlay_height,
            drop_target_padding: settings.drop_target_padding,
            converter: CoordinateConverter::new(screen_height),
        }
    }

    pub fn overlay_height(&self) -> f64 { self.overlay_height }

    pub fn converter(&self) -> CoordinateConverter { self.converter }

    pub fn set_screen_height(&mut self, screen_height: Option<f64>) {
        self.converter = CoordinateConverter::new(screen_height);
    }

    /// The strip sits directly above the window's top edge, spanning its
    /// width.
    pub fn overlay_frame(&self, group_frame: Rect) -> Rect {
        let strip = Rect::from_xywh(
            group_frame.origin.x,
            group_frame.origin.y - self.overlay_height,
            group_frame.size.width,
            self.overlay_height,
        );
        self.converter.rect_to_bottom_origin(strip)
    }

    /// Where the active window's top-left corner goes when the panel was
    /// dragged to `panel_frame`.
    pub fn window_origin_for_panel(&self, panel_frame: Rect) -> Point {
        let panel_top = self.converter.to_top_origin(panel_frame.origin.y, panel_frame.size.height);
        Point::new(panel_frame.origin.x, panel_top + self.overlay_height)
    }

    /// The group's position and width with the window's own height.
    pub fn window_frame(&self, group_frame: Rect, window_height: f64) -> Rect {
        group_frame.with_height(window_height)
    }

    /// Area a dragged window can be released over to join the group.
    pub fn drop_target(&self, group_frame: Rect) -> Rect {
        self.overlay_frame(group_frame).outset(self.drop_target_padding)
    }
}
