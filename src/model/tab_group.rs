use slotmap::new_key_type;

use crate::sys::geometry::Rect;
use crate::sys::window::{AppInfo, WindowHandle, WindowId, pid_t};

/// Height of the tab strip drawn above every group's active window.
pub const DEFAULT_OVERLAY_HEIGHT: f64 = 36.0;

new_key_type! {
    /// Process-unique identifier of a tab group. Keys are versioned, so an id
    /// is never reused by a later group.
    pub struct GroupId;
}

/// One externally-owned window that has been accepted into a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedWindow {
    pub id: WindowId,
    pub pid: pid_t,
    pub handle: WindowHandle,
    pub title: String,
    pub app: AppInfo,
    original_frame: Rect,
}

impl ManagedWindow {
    pub fn new(
        id: WindowId,
        pid: pid_t,
        handle: WindowHandle,
        title: String,
        app: AppInfo,
        original_frame: Rect,
    ) -> Self {
        Self { id, pid, handle, title, app, original_frame }
    }

    /// Where the window was when it joined its group. This is where it goes
    /// back to when it leaves.
    pub fn original_frame(&self) -> Rect { self.original_frame }
}

#[derive(Debug, Clone)]
pub struct TabGroup {
    id: GroupId,
    tabs: Vec<ManagedWindow>,
    active_tab_index: Option<usize>,
    /// Top-left-origin geometry the active window should occupy.
    pub frame: Rect,
    is_minimized: bool,
}

impl TabGroup {
    pub fn new(id: GroupId, first: ManagedWindow) -> Self {
        let frame = first.original_frame();
        Self {
            id,
            tabs: vec![first],
            active_tab_index: Some(0),
            frame,
            is_minimized: false,
        }
    }

    pub fn id(&self) -> GroupId { self.id }

    pub fn tabs(&self) -> &[ManagedWindow] { &self.tabs }

    pub fn len(&self) -> usize { self.tabs.len() }

    pub fn is_empty(&self) -> bool { self.tabs.is_empty() }

    pub fn active_tab_index(&self) -> Option<usize> { self.active_tab_index }

    pub fn active_window(&self) -> Option<&ManagedWindow> {
        self.active_tab_index.and_then(|idx| self.tabs.get(idx))
    }

    pub fn is_active(&self, wid: WindowId) -> bool {
        self.active_window().is_some_and(|w| w.id == wid)
    }

    pub fn is_minimized(&self) -> bool { self.is_minimized }

    pub(crate) fn set_minimized(&mut self, minimized: bool) { self.is_minimized = minimized; }

    pub fn index_of(&self, wid: WindowId) -> Option<usize> {
        self.tabs.iter().position(|w| w.id == wid)
    }

    pub(crate) fn tab_mut(&mut self, wid: WindowId) -> Option<&mut ManagedWindow> {
        self.tabs.iter_mut().find(|w| w.id == wid)
    }

    /// Appends a tab without touching the active slot.
    pub(crate) fn push(&mut self, window: ManagedWindow) {
        self.tabs.push(window);
        if self.active_tab_index.is_none() {
            self.active_tab_index = Some(0);
        }
    }

    /// Returns false if `index` is out of range.
    pub(crate) fn set_active(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }
        self.active_tab_index = Some(index);
        true
    }

    /// Removes the tab at `index`.
    ///
    /// Removing at or before the active slot shifts the active index down by
    /// one as long as it is not already zero, so that the same window stays
    /// active when an earlier tab goes away.
    pub(crate) fn remove_tab(&mut self, index: usize) -> Option<ManagedWindow> {
        if index >= self.tabs.len() {
            return None;
        }
        let removed = self.tabs.remove(index);
        self.active_tab_index = match self.active_tab_index {
            _ if self.tabs.is_empty() => None,
            Some(active) if index <= active && active > 0 => Some(active - 1),
            Some(active) => Some(active.min(self.tabs.len() - 1)),
            None => Some(0),
        };
        Some(removed)
    }

    /// Moves the tab at `from` to `to`, keeping the same window active.
    pub(crate) fn move_tab(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tabs.len() || to >= self.tabs.len() {
            return false;
        }
        if from == to {
            return true;
        }
        let active_wid = self.active_window().map(|w| w.id);
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        self.active_tab_index = active_wid.and_then(|wid| self.index_of(wid));
        true
    }
}
