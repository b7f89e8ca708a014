//! The overlay panel surface. Rendering lives outside this crate; the engine
//! only positions panels, shows and hides them, and tells them when their tab
//! list changed.
//!
//! Panels report user drags back by sending
//! [`Event::OverlayDragged`](crate::actor::reactor::Event::OverlayDragged)
//! into the reactor.

use super::geometry::{Rect, Size};
use crate::model::GroupId;
use crate::model::server::TabData;

pub trait OverlayPanel: Send {
    /// `frame` is in the bottom-left-origin convention.
    fn set_frame(&mut self, frame: Rect, animate: bool);
    fn order_front(&mut self);
    fn order_out(&mut self);
    fn close(&mut self);
    fn refresh_tabs(&mut self, tabs: &[TabData], active: Option<usize>);
}

pub trait OverlayFactory: Send + Sync {
    fn create(&self, group: GroupId, initial_size: Size) -> Box<dyn OverlayPanel>;
}
