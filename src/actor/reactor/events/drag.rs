use tracing::trace;

use crate::actor::reactor::Reactor;
use crate::model::GroupId;
use crate::sys::geometry::Rect;

pub struct DragEventHandler;

impl DragEventHandler {
    pub fn handle_mouse_down(reactor: &mut Reactor) {
        reactor.drag_tracker.mouse_down();
        trace!(state = %reactor.drag_tracker.state(), "Button pressed");
    }

    pub fn handle_mouse_up(reactor: &mut Reactor) {
        reactor.drag_tracker.mouse_up();
        trace!(state = %reactor.drag_tracker.state(), "Button released");
    }

    /// A drag implies the button is held even if the press was missed.
    pub fn handle_mouse_dragged(reactor: &mut Reactor) {
        if !reactor.drag_tracker.is_sampling() {
            reactor.drag_tracker.mouse_down();
        }
    }

    pub fn handle_overlay_dragged(reactor: &mut Reactor, group: GroupId, frame: Rect) {
        if !reactor.registry.update_group_frame(group, frame) {
            trace!(?group, "Overlay dragged for unknown group");
        }
    }

    pub fn handle_tick(reactor: &mut Reactor) {
        let Some(update) = reactor.drag_tracker.sample(reactor.windows.as_ref()) else {
            return;
        };
        if !reactor.registry.sync_group_to_window(update.wid, Some(update.frame)) {
            trace!(wid = ?update.wid, "Discarding sample for window that is no longer active");
            reactor.drag_tracker.untrack(update.wid);
        }
    }
}
