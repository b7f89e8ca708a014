//! An in-memory window server.
//!
//! [`VirtualDesktop`] implements every surface in [`crate::sys`] on top of a
//! shared table of fake windows. It behaves like a real window server where it
//! matters to the engine: writing a frame emits moved/resized notifications to
//! subscribers, destroyed windows stop answering, and process termination is
//! only reported to watchers of that process. The simulation methods stand in
//! for the user and for other applications.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::Platform;
use super::geometry::{Point, Rect, Size};
use super::notification::{NotificationKinds, NotificationSource, WindowNotification};
use super::overlay::{OverlayFactory, OverlayPanel};
use super::screen::CoordinateConverter;
use super::window::{
    AppInfo, WindowError, WindowHandle, WindowId, WindowResult, WindowSystem, pid_t,
};
use crate::common::collections::{HashMap, HashSet};
use crate::model::GroupId;
use crate::model::server::TabData;

/// Description of a window to place on the desktop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub id: u32,
    pub pid: pid_t,
    /// Top-left origin.
    pub frame: Rect,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub fullscreen: bool,
}

impl WindowSpec {
    pub fn new(id: u32, pid: pid_t, frame: Rect) -> Self {
        WindowSpec {
            id,
            pid,
            frame,
            title: format!("Window {id}"),
            app: format!("App {pid}"),
            bundle_id: None,
            fullscreen: false,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn fullscreen(mut self) -> Self {
        self.fullscreen = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualWindow {
    pub handle: WindowHandle,
    pub id: WindowId,
    pub pid: pid_t,
    pub title: String,
    pub frame: Rect,
    pub minimized: bool,
    pub fullscreen: bool,
}

/// A write or action the engine performed on a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowCall {
    SetFrame(WindowId, Rect),
    Minimize(WindowId),
    Unminimize(WindowId),
    Raise(WindowId),
}

impl WindowCall {
    pub fn window(&self) -> WindowId {
        match *self {
            WindowCall::SetFrame(wid, _)
            | WindowCall::Minimize(wid)
            | WindowCall::Unminimize(wid)
            | WindowCall::Raise(wid) => wid,
        }
    }
}

/// What an overlay panel has been told so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    pub initial_size: Size,
    /// Bottom-left origin.
    pub frame: Option<Rect>,
    pub visible: bool,
    pub closed: bool,
    pub tabs: Vec<TabData>,
    pub active: Option<usize>,
    pub frame_writes: usize,
    pub animated_writes: usize,
}

type NotificationSink = Box<dyn Fn(WindowNotification) + Send + Sync>;

#[derive(Default)]
struct DesktopState {
    screen_height: Option<f64>,
    windows: BTreeMap<WindowId, VirtualWindow>,
    handles: HashMap<WindowHandle, WindowId>,
    /// Back to front.
    stacking: Vec<WindowId>,
    apps: HashMap<pid_t, AppInfo>,
    subscriptions: HashMap<WindowId, NotificationKinds>,
    watched_processes: HashSet<pid_t>,
    pending: Vec<WindowNotification>,
    sink: Option<NotificationSink>,
    overlays: BTreeMap<GroupId, OverlayState>,
    calls: Vec<WindowCall>,
    rejecting_writes: HashSet<WindowId>,
    next_handle: u64,
}

impl DesktopState {
    fn resolve(&self, handle: WindowHandle) -> Option<WindowId> {
        self.handles.get(&handle).copied()
    }

    fn emit(&mut self, notification: WindowNotification) {
        let wanted = match &notification {
            WindowNotification::ApplicationTerminated(pid) => self.watched_processes.contains(pid),
            other => {
                let kind = match other {
                    WindowNotification::Destroyed(_) => NotificationKinds::DESTROYED,
                    WindowNotification::Moved(_) => NotificationKinds::MOVED,
                    WindowNotification::Resized(_) => NotificationKinds::RESIZED,
                    _ => NotificationKinds::TITLE_CHANGED,
                };
                other
                    .window()
                    .and_then(|wid| self.subscriptions.get(&wid))
                    .is_some_and(|kinds| kinds.contains(kind))
            }
        };
        if !wanted {
            return;
        }
        trace!(?notification, "Emitting notification");
        match &self.sink {
            Some(sink) => sink(notification),
            None => self.pending.push(notification),
        }
    }

    fn apply_frame(&mut self, wid: WindowId, frame: Rect) -> bool {
        let Some(window) = self.windows.get_mut(&wid) else {
            return false;
        };
        let old = window.frame;
        window.frame = frame;
        if old.origin != frame.origin {
            self.emit(WindowNotification::Moved(wid));
        }
        if old.size != frame.size {
            self.emit(WindowNotification::Resized(wid));
        }
        true
    }

    fn writable(&self, handle: WindowHandle) -> Option<WindowId> {
        self.resolve(handle).filter(|wid| !self.rejecting_writes.contains(wid))
    }

    fn remove_window(&mut self, wid: WindowId) -> Option<VirtualWindow> {
        let window = self.windows.remove(&wid)?;
        self.handles.remove(&window.handle);
        self.stacking.retain(|w| *w != wid);
        self.subscriptions.remove(&wid);
        Some(window)
    }
}

#[derive(Clone, Default)]
pub struct VirtualDesktop {
    state: Arc<Mutex<DesktopState>>,
}

impl VirtualDesktop {
    pub fn new(screen_height: Option<f64>) -> Self {
        let desktop = VirtualDesktop::default();
        {
            let mut state = desktop.state.lock();
            state.screen_height = screen_height;
            state.next_handle = 1000;
        }
        desktop
    }

    pub fn platform(&self) -> Platform {
        Platform {
            windows: Arc::new(self.clone()),
            notifications: Arc::new(self.clone()),
            overlays: Arc::new(self.clone()),
        }
    }

    /// Delivers notifications to `sink` as they happen instead of queueing
    /// them for [`take_notifications`](Self::take_notifications).
    pub fn forward_notifications(&self, sink: impl Fn(WindowNotification) + Send + Sync + 'static) {
        let mut state = self.state.lock();
        for notification in state.pending.drain(..) {
            sink(notification);
        }
        state.sink = Some(Box::new(sink));
    }

    pub fn take_notifications(&self) -> Vec<WindowNotification> {
        std::mem::take(&mut self.state.lock().pending)
    }

    pub fn set_screen_height(&self, height: Option<f64>) { self.state.lock().screen_height = height; }

    /// Opens a window in front of all others.
    pub fn add_window(&self, spec: WindowSpec) -> WindowHandle {
        let mut state = self.state.lock();
        let handle = WindowHandle::new(state.next_handle);
        state.next_handle += 1;
        let id = WindowId::new(spec.id);
        state.apps.entry(spec.pid).or_insert_with(|| AppInfo {
            name: spec.app.clone(),
            bundle_id: spec.bundle_id.clone(),
        });
        state.windows.insert(id, VirtualWindow {
            handle,
            id,
            pid: spec.pid,
            title: spec.title,
            frame: spec.frame,
            minimized: false,
            fullscreen: spec.fullscreen,
        });
        state.handles.insert(handle, id);
        state.stacking.retain(|w| *w != id);
        state.stacking.push(id);
        handle
    }

    pub fn handle_of(&self, wid: WindowId) -> Option<WindowHandle> {
        self.state.lock().windows.get(&wid).map(|w| w.handle)
    }

    pub fn window(&self, wid: WindowId) -> Option<VirtualWindow> {
        self.state.lock().windows.get(&wid).cloned()
    }

    /// Window ids from back to front.
    pub fn stacking_order(&self) -> Vec<WindowId> { self.state.lock().stacking.clone() }

    /// Moves or resizes a window the way its owner or the user would.
    pub fn move_window(&self, wid: WindowId, frame: Rect) -> bool {
        self.state.lock().apply_frame(wid, frame)
    }

    /// Changes a frame without notifying subscribers, like a move the
    /// window server has not reported yet.
    pub fn move_window_quietly(&self, wid: WindowId, frame: Rect) -> bool {
        match self.state.lock().windows.get_mut(&wid) {
            Some(window) => {
                window.frame = frame;
                true
            }
            None => false,
        }
    }

    pub fn set_title(&self, wid: WindowId, title: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        let title = title.into();
        let Some(window) = state.windows.get_mut(&wid) else {
            return false;
        };
        window.title = title.clone();
        state.emit(WindowNotification::TitleChanged(wid, title));
        true
    }

    pub fn destroy_window(&self, wid: WindowId) -> bool {
        let mut state = self.state.lock();
        if !state.windows.contains_key(&wid) {
            return false;
        }
        state.emit(WindowNotification::Destroyed(wid));
        state.remove_window(wid);
        true
    }

    /// Closes every window of `pid` without per-window notifications, as a
    /// crashing process would.
    pub fn terminate_app(&self, pid: pid_t) -> usize {
        let mut state = self.state.lock();
        let owned: Vec<WindowId> =
            state.windows.values().filter(|w| w.pid == pid).map(|w| w.id).collect();
        for wid in &owned {
            state.remove_window(*wid);
        }
        state.apps.remove(&pid);
        state.emit(WindowNotification::ApplicationTerminated(pid));
        owned.len()
    }

    /// Makes every write and action on `wid` fail, or stop failing.
    pub fn reject_writes(&self, wid: WindowId, reject: bool) {
        let mut state = self.state.lock();
        if reject {
            state.rejecting_writes.insert(wid);
        } else {
            state.rejecting_writes.remove(&wid);
        }
    }

    pub fn take_calls(&self) -> Vec<WindowCall> { std::mem::take(&mut self.state.lock().calls) }

    pub fn is_subscribed(&self, wid: WindowId) -> bool {
        self.state.lock().subscriptions.contains_key(&wid)
    }

    pub fn is_process_watched(&self, pid: pid_t) -> bool {
        self.state.lock().watched_processes.contains(&pid)
    }

    pub fn overlay(&self, group: GroupId) -> Option<OverlayState> {
        self.state.lock().overlays.get(&group).cloned()
    }

    pub fn overlays(&self) -> Vec<(GroupId, OverlayState)> {
        self.state.lock().overlays.iter().map(|(id, o)| (*id, o.clone())).collect()
    }

    /// Places an overlay where the user dropped it. The engine learns about
    /// this through [`Event::OverlayDragged`](crate::actor::reactor::Event::OverlayDragged).
    pub fn drag_overlay(&self, group: GroupId, frame: Rect) -> bool {
        match self.state.lock().overlays.get_mut(&group) {
            Some(overlay) if !overlay.closed => {
                overlay.frame = Some(frame);
                true
            }
            _ => false,
        }
    }
}

impl WindowSystem for VirtualDesktop {
    fn frame(&self, handle: WindowHandle) -> WindowResult<Rect> {
        let state = self.state.lock();
        state
            .resolve(handle)
            .and_then(|wid| state.windows.get(&wid))
            .map(|w| w.frame)
            .ok_or(WindowError::AttributeReadFailed { handle, attribute: "frame" })
    }

    fn set_frame(&self, handle: WindowHandle, frame: Rect) -> WindowResult<()> {
        let mut state = self.state.lock();
        let wid = state
            .writable(handle)
            .ok_or(WindowError::AttributeWriteFailed { handle, attribute: "frame" })?;
        state.calls.push(WindowCall::SetFrame(wid, frame));
        state.apply_frame(wid, frame);
        Ok(())
    }

    fn title(&self, handle: WindowHandle) -> Option<String> {
        let state = self.state.lock();
        state.resolve(handle).and_then(|wid| state.windows.get(&wid)).map(|w| w.title.clone())
    }

    fn minimize(&self, handle: WindowHandle) -> WindowResult<()> {
        let mut state = self.state.lock();
        let wid =
            state.writable(handle).ok_or(WindowError::ActionFailed { handle, action: "minimize" })?;
        state.calls.push(WindowCall::Minimize(wid));
        if let Some(window) = state.windows.get_mut(&wid) {
            window.minimized = true;
        }
        Ok(())
    }

    fn unminimize(&self, handle: WindowHandle) -> WindowResult<()> {
        let mut state = self.state.lock();
        let wid = state
            .writable(handle)
            .ok_or(WindowError::ActionFailed { handle, action: "unminimize" })?;
        state.calls.push(WindowCall::Unminimize(wid));
        if let Some(window) = state.windows.get_mut(&wid) {
            window.minimized = false;
        }
        Ok(())
    }

    fn raise(&self, handle: WindowHandle) -> WindowResult<()> {
        let mut state = self.state.lock();
        let wid =
            state.writable(handle).ok_or(WindowError::ActionFailed { handle, action: "raise" })?;
        state.calls.push(WindowCall::Raise(wid));
        state.stacking.retain(|w| *w != wid);
        state.stacking.push(wid);
        Ok(())
    }

    fn is_fullscreen(&self, handle: WindowHandle) -> bool {
        let state = self.state.lock();
        state
            .resolve(handle)
            .and_then(|wid| state.windows.get(&wid))
            .is_some_and(|w| w.fullscreen)
    }

    fn window_id(&self, handle: WindowHandle) -> Option<WindowId> { self.state.lock().resolve(handle) }

    fn handle_for(&self, wid: WindowId) -> Option<WindowHandle> { self.handle_of(wid) }

    fn owner_pid(&self, handle: WindowHandle) -> Option<pid_t> {
        let state = self.state.lock();
        state.resolve(handle).and_then(|wid| state.windows.get(&wid)).map(|w| w.pid)
    }

    fn app_info(&self, pid: pid_t) -> Option<AppInfo> { self.state.lock().apps.get(&pid).cloned() }

    fn primary_screen_height(&self) -> Option<f64> { self.state.lock().screen_height }

    fn window_at(
        &self,
        point: Point,
        exclude: &dyn Fn(pid_t, WindowId) -> bool,
    ) -> Option<(WindowHandle, WindowId)> {
        let state = self.state.lock();
        let point = CoordinateConverter::new(state.screen_height).point_to_top_origin(point);
        state
            .stacking
            .iter()
            .rev()
            .filter_map(|wid| state.windows.get(wid))
            .filter(|w| !w.minimized && w.frame.contains(point))
            .find(|w| !exclude(w.pid, w.id))
            .map(|w| (w.handle, w.id))
    }
}

impl NotificationSource for VirtualDesktop {
    fn subscribe(
        &self,
        handle: WindowHandle,
        wid: WindowId,
        kinds: NotificationKinds,
    ) -> WindowResult<()> {
        let mut state = self.state.lock();
        if state.resolve(handle) != Some(wid) {
            return Err(WindowError::ActionFailed { handle, action: "subscribe" });
        }
        state.subscriptions.insert(wid, kinds);
        Ok(())
    }

    fn unsubscribe(&self, wid: WindowId) { self.state.lock().subscriptions.remove(&wid); }

    fn watch_process(&self, pid: pid_t) { self.state.lock().watched_processes.insert(pid); }

    fn unwatch_process(&self, pid: pid_t) { self.state.lock().watched_processes.remove(&pid); }
}

impl OverlayFactory for VirtualDesktop {
    fn create(&self, group: GroupId, initial_size: Size) -> Box<dyn OverlayPanel> {
        self.state.lock().overlays.insert(group, OverlayState {
            initial_size,
            ..Default::default()
        });
        Box::new(VirtualOverlay { group, desktop: self.clone() })
    }
}

struct VirtualOverlay {
    group: GroupId,
    desktop: VirtualDesktop,
}

impl VirtualOverlay {
    fn update(&self, f: impl FnOnce(&mut OverlayState)) {
        if let Some(overlay) = self.desktop.state.lock().overlays.get_mut(&self.group) {
            f(overlay);
        }
    }
}

impl OverlayPanel for VirtualOverlay {
    fn set_frame(&mut self, frame: Rect, animate: bool) {
        self.update(|o| {
            o.frame = Some(frame);
            o.frame_writes += 1;
            if animate {
                o.animated_writes += 1;
            }
        });
    }

    fn order_front(&mut self) { self.update(|o| o.visible = true); }

    fn order_out(&mut self) { self.update(|o| o.visible = false); }

    fn close(&mut self) {
        self.update(|o| {
            o.visible = false;
            o.closed = true;
        });
    }

    fn refresh_tabs(&mut self, tabs: &[TabData], active: Option<usize>) {
        self.update(|o| {
            o.tabs = tabs.to_vec();
            o.active = active;
        });
    }
}
