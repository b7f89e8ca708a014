//! The window observer subscribes to lifecycle notifications for grouped
//! windows and turns raw platform notifications into the four callbacks the
//! reactor acts on.
//!
//! Raw notifications reach the reactor asynchronously and may be queued
//! behind a call to [`WindowObserver::stop_observing`]. Filtering happens on
//! the reactor thread against the current subscription set, so once
//! `stop_observing` returns nothing more is delivered for that window even if
//! the platform already had notifications in flight.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use strum::IntoStaticStr;
use tracing::{debug, trace};

use crate::common::collections::HashMap;
use crate::sys::notification::{NotificationKinds, NotificationSource, WindowNotification};
use crate::sys::window::{WindowHandle, WindowId, WindowResult, pid_t};

#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum ObserverEvent {
    WindowDestroyed(WindowId),
    WindowMoved(WindowId),
    WindowResized(WindowId),
    WindowTitleChanged(WindowId, String),
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    pid: pid_t,
}

pub struct WindowObserver {
    source: Arc<dyn NotificationSource>,
    observed: HashMap<WindowId, Observation>,
    /// Number of observed windows per process; the termination feed is
    /// watched while this is non-zero.
    watched_processes: HashMap<pid_t, usize>,
}

impl WindowObserver {
    pub fn new(source: Arc<dyn NotificationSource>) -> Self {
        WindowObserver {
            source,
            observed: HashMap::default(),
            watched_processes: HashMap::default(),
        }
    }

    pub fn observe(&mut self, handle: WindowHandle, wid: WindowId, pid: pid_t) -> WindowResult<()> {
        if self.observed.contains_key(&wid) {
            trace!(?wid, "Already observing window");
            return Ok(());
        }
        self.source.subscribe(handle, wid, NotificationKinds::all())?;
        self.observed.insert(wid, Observation { pid });

        let count = self.watched_processes.entry(pid).or_insert(0);
        if *count == 0 {
            self.source.watch_process(pid);
        }
        *count += 1;
        debug!(?wid, pid, "Observing window");
        Ok(())
    }

    /// Returns whether the window was being observed.
    pub fn stop_observing(&mut self, wid: WindowId) -> bool {
        let Some(observation) = self.observed.remove(&wid) else {
            return false;
        };
        self.source.unsubscribe(wid);
        self.release_process(observation.pid);
        debug!(?wid, "Stopped observing window");
        true
    }

    pub fn stop_observing_all(&mut self) {
        for (wid, _) in self.observed.drain() {
            self.source.unsubscribe(wid);
        }
        for (pid, _) in self.watched_processes.drain() {
            self.source.unwatch_process(pid);
        }
    }

    pub fn is_observing(&self, wid: WindowId) -> bool { self.observed.contains_key(&wid) }

    pub fn observed_count(&self) -> usize { self.observed.len() }

    fn release_process(&mut self, pid: pid_t) {
        if let Entry::Occupied(mut entry) = self.watched_processes.entry(pid) {
            *entry.get_mut() -= 1;
            if *entry.get() == 0 {
                entry.remove();
                self.source.unwatch_process(pid);
            }
        }
    }

    /// Maps a raw notification to the callbacks it should produce. Process
    /// termination fans out to one destruction per observed window of that
    /// process; anything about an unobserved window is dropped.
    pub fn translate(&self, notification: WindowNotification) -> Vec<ObserverEvent> {
        let wid = match &notification {
            WindowNotification::ApplicationTerminated(pid) => {
                let mut windows: Vec<WindowId> = self
                    .observed
                    .iter()
                    .filter(|(_, observation)| observation.pid == *pid)
                    .map(|(wid, _)| *wid)
                    .collect();
                windows.sort();
                debug!(pid, ?windows, "Owning process terminated");
                return windows.into_iter().map(ObserverEvent::WindowDestroyed).collect();
            }
            other => other.window(),
        };
        let Some(wid) = wid.filter(|wid| self.observed.contains_key(wid)) else {
            trace!(?notification, "Dropping notification for unobserved window");
            return Vec::new();
        };
        let event = match notification {
            WindowNotification::Destroyed(_) => ObserverEvent::WindowDestroyed(wid),
            WindowNotification::Moved(_) => ObserverEvent::WindowMoved(wid),
            WindowNotification::Resized(_) => ObserverEvent::WindowResized(wid),
            WindowNotification::TitleChanged(_, title) => {
                ObserverEvent::WindowTitleChanged(wid, title)
            }
            WindowNotification::ApplicationTerminated(_) => return Vec::new(),
        };
        vec![event]
    }
}
