//! Subscription surface for asynchronous window lifecycle notifications.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::window::{WindowHandle, WindowId, WindowResult, pid_t};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NotificationKinds: u8 {
        const DESTROYED = 1 << 0;
        const MOVED = 1 << 1;
        const RESIZED = 1 << 2;
        const TITLE_CHANGED = 1 << 3;
    }
}

/// A notification as produced by the platform, before any filtering.
///
/// These may arrive for windows that are no longer observed; the window
/// observer is responsible for dropping those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
pub enum WindowNotification {
    Destroyed(WindowId),
    Moved(WindowId),
    Resized(WindowId),
    TitleChanged(WindowId, String),
    ApplicationTerminated(pid_t),
}

impl WindowNotification {
    pub fn window(&self) -> Option<WindowId> {
        match self {
            WindowNotification::Destroyed(wid)
            | WindowNotification::Moved(wid)
            | WindowNotification::Resized(wid)
            | WindowNotification::TitleChanged(wid, _) => Some(*wid),
            WindowNotification::ApplicationTerminated(_) => None,
        }
    }
}

/// Consumed capability for (un)subscribing to lifecycle notifications.
///
/// Delivery itself happens out of band: implementations forward
/// [`WindowNotification`]s into the reactor's event channel.
pub trait NotificationSource: Send + Sync {
    fn subscribe(
        &self,
        handle: WindowHandle,
        wid: WindowId,
        kinds: NotificationKinds,
    ) -> WindowResult<()>;
    fn unsubscribe(&self, wid: WindowId);
    fn watch_process(&self, pid: pid_t);
    fn unwatch_process(&self, pid: pid_t);
}
