//! Smooth overlay movement while a grouped window is being dragged.
//!
//! Move notifications from the platform are coalesced and arrive late, which
//! makes an overlay that follows them visibly lag behind the window. While the
//! primary button is held the tracker polls the one window that is moving, at
//! twice the display refresh rate, and reports every change it sees. The
//! reactor drives [`DragTracker::sample`] from a timer on its own event loop.
//!
//! States:
//! - `Idle`: nothing tracked, no timer.
//! - `Waiting`: a window is registered but the button is up; the next button
//!   press starts sampling.
//! - `Armed`: sampling. Leaves for `Idle` once the window has been stationary
//!   for `stationary_threshold` samples and the button has been released.

use std::time::Duration;

use strum::Display;
use tracing::{debug, trace};

use crate::common::config::DragTrackerSettings;
use crate::sys::geometry::Rect;
use crate::sys::window::{WindowHandle, WindowId, WindowSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TrackerState {
    Idle,
    Waiting,
    Armed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub wid: WindowId,
    pub frame: Rect,
}

#[derive(Debug, Clone, Copy)]
struct TrackedWindow {
    wid: WindowId,
    handle: WindowHandle,
    last_frame: Rect,
}

pub struct DragTracker {
    settings: DragTrackerSettings,
    tracked: Option<TrackedWindow>,
    stationary_samples: u32,
    sampling: bool,
    button_down: bool,
}

impl DragTracker {
    pub fn new(settings: DragTrackerSettings) -> Self {
        DragTracker {
            settings,
            tracked: None,
            stationary_samples: 0,
            sampling: false,
            button_down: false,
        }
    }

    pub fn state(&self) -> TrackerState {
        match (&self.tracked, self.sampling) {
            (None, _) => TrackerState::Idle,
            (Some(_), false) => TrackerState::Waiting,
            (Some(_), true) => TrackerState::Armed,
        }
    }

    pub fn is_sampling(&self) -> bool { self.sampling }

    pub fn tracked_window(&self) -> Option<WindowId> { self.tracked.map(|t| t.wid) }

    pub fn sample_interval(&self) -> Duration { self.settings.sample_interval() }

    pub fn update_settings(&mut self, settings: DragTrackerSettings) { self.settings = settings; }

    /// Registers `wid` as the window to follow, replacing any previous one.
    /// `frame` is its current frame and becomes the baseline for deltas.
    pub fn track(&mut self, wid: WindowId, handle: WindowHandle, frame: Rect) {
        if self.tracked_window() != Some(wid) {
            debug!(?wid, "Tracking window for drag");
        }
        self.tracked = Some(TrackedWindow { wid, handle, last_frame: frame });
        self.stationary_samples = 0;
        if self.button_down && !self.sampling {
            self.start();
        }
    }

    /// Forgets `wid` if it is the tracked window.
    pub fn untrack(&mut self, wid: WindowId) {
        if self.tracked_window() == Some(wid) {
            self.stop();
        }
    }

    pub fn mouse_down(&mut self) {
        self.button_down = true;
        if self.tracked.is_some() && !self.sampling {
            self.start();
        }
    }

    /// Releasing the button does not stop sampling by itself; it only allows
    /// the stationary check to end it.
    pub fn mouse_up(&mut self) { self.button_down = false; }

    pub fn stop(&mut self) {
        if self.sampling {
            trace!(wid = ?self.tracked_window(), "Drag sampling stopped");
        }
        self.sampling = false;
        self.tracked = None;
        self.stationary_samples = 0;
    }

    fn start(&mut self) {
        trace!(wid = ?self.tracked_window(), "Drag sampling started");
        self.sampling = true;
        self.stationary_samples = 0;
    }

    /// Takes one sample of the tracked window. Returns its new frame if it
    /// changed since the previous sample.
    pub fn sample(&mut self, windows: &dyn WindowSystem) -> Option<FrameUpdate> {
        if !self.sampling {
            return None;
        }
        let Some(tracked) = self.tracked else {
            self.stop();
            return None;
        };
        let frame = match windows.frame(tracked.handle) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(wid = ?tracked.wid, %err, "Tracked window unreadable; stopping");
                self.stop();
                return None;
            }
        };

        if !frame.same_as(&tracked.last_frame) {
            self.stationary_samples = 0;
            self.tracked = Some(TrackedWindow { last_frame: frame, ..tracked });
            return Some(FrameUpdate { wid: tracked.wid, frame });
        }

        self.stationary_samples += 1;
        if self.stationary_samples >= self.settings.stationary_threshold && !self.button_down {
            self.stop();
        }
        None
    }
}
