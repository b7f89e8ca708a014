use tracing::{debug, trace, warn};

use crate::actor::reactor::Reactor;
use crate::actor::window_observer::ObserverEvent;
use crate::sys::notification::WindowNotification;
use crate::sys::window::WindowId;

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_notification(reactor: &mut Reactor, notification: WindowNotification) {
        let kind: &'static str = (&notification).into();
        for event in reactor.registry.translate_notification(notification) {
            trace!(kind, event = <&'static str>::from(&event), "Window event");
            match event {
                ObserverEvent::WindowDestroyed(wid) => Self::handle_window_destroyed(reactor, wid),
                ObserverEvent::WindowMoved(wid) | ObserverEvent::WindowResized(wid) => {
                    Self::handle_window_frame_changed(reactor, wid)
                }
                ObserverEvent::WindowTitleChanged(wid, title) => {
                    Self::handle_window_title_changed(reactor, wid, title)
                }
            }
        }
    }

    pub fn handle_window_destroyed(reactor: &mut Reactor, wid: WindowId) {
        reactor.drag_tracker.untrack(wid);
        if reactor.registry.remove_destroyed_window(wid) {
            debug!(?wid, "Grouped window went away");
        }
    }

    /// Hands the window to the drag tracker and brings the overlay along
    /// right away. Background tabs are ignored.
    pub fn handle_window_frame_changed(reactor: &mut Reactor, wid: WindowId) {
        if !reactor.registry.is_active_window(wid) {
            trace!(?wid, "Ignoring frame change of background tab");
            return;
        }
        let Some(handle) = reactor.registry.window_handle(wid) else {
            return;
        };
        let frame = match reactor.windows.frame(handle) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(?wid, %err, "Could not read frame after move");
                return;
            }
        };
        reactor.drag_tracker.track(wid, handle, frame);
        reactor.registry.sync_group_to_window(wid, Some(frame));
    }

    pub fn handle_window_title_changed(reactor: &mut Reactor, wid: WindowId, title: String) {
        reactor.registry.update_title(wid, title);
    }
}
