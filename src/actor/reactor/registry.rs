//! The group registry owns every tab group, the reverse window index and the
//! overlay panels. It is the only place where group structure changes.
//!
//! Operations on windows the registry has already accepted never fail: the
//! platform may refuse a frame write or a minimize, in which case the failure
//! is logged and the model carries on as if it had succeeded.

use std::sync::Arc;

use slotmap::SlotMap;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::actor::window_observer::{ObserverEvent, WindowObserver};
use crate::common::collections::HashMap;
use crate::common::config::Settings;
use crate::layout_engine::LayoutEngine;
use crate::model::server::{GroupData, tab_data};
use crate::model::{GroupError, GroupId, ManagedWindow, TabGroup};
use crate::sys::Platform;
use crate::sys::geometry::{Point, Rect, Size};
use crate::sys::notification::WindowNotification;
use crate::sys::overlay::{OverlayFactory, OverlayPanel};
use crate::sys::window::{WindowHandle, WindowId, WindowResult, WindowSystem, pid_t};

/// A disagreement between the groups and the reverse index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexViolation {
    #[error("window {0} is indexed to {1:?} but that group does not hold it")]
    Orphan(WindowId, GroupId),
    #[error("window {0} is in group {1:?} but indexed to {2:?}")]
    Misindexed(WindowId, GroupId, Option<GroupId>),
    #[error("window {0} appears in more than one tab")]
    Duplicate(WindowId),
    #[error("group {0:?} has no tabs")]
    EmptyGroup(GroupId),
    #[error("group {0:?} has active index {1:?} with {2} tabs")]
    BadActiveIndex(GroupId, Option<usize>, usize),
    #[error("group {0:?} has no overlay")]
    MissingOverlay(GroupId),
    #[error("group ordering does not match the group set")]
    OrderMismatch,
}

pub struct GroupRegistry {
    animate_overlay: bool,
    layout: LayoutEngine,
    windows: Arc<dyn WindowSystem>,
    overlay_factory: Arc<dyn OverlayFactory>,
    observer: WindowObserver,
    groups: SlotMap<GroupId, TabGroup>,
    /// Creation order; lookups by point return the first match in this order.
    order: Vec<GroupId>,
    window_to_group: HashMap<WindowId, GroupId>,
    overlays: HashMap<GroupId, Box<dyn OverlayPanel>>,
}

fn best_effort(result: WindowResult<()>, wid: WindowId, what: &str) {
    if let Err(err) = result {
        warn!(?wid, %err, "Could not {what}; continuing");
    }
}

impl GroupRegistry {
    pub fn new(settings: &Settings, platform: &Platform) -> Self {
        let screen_height = platform.windows.primary_screen_height();
        GroupRegistry {
            animate_overlay: settings.animate_overlay,
            layout: LayoutEngine::new(settings, screen_height),
            windows: platform.windows.clone(),
            overlay_factory: platform.overlays.clone(),
            observer: WindowObserver::new(platform.notifications.clone()),
            groups: SlotMap::default(),
            order: Vec::new(),
            window_to_group: HashMap::default(),
            overlays: HashMap::default(),
        }
    }

    /// Applies new settings. Existing overlays are repositioned; windows are
    /// left where they are.
    pub fn update_settings(&mut self, settings: &Settings) {
        let screen_height = self.layout.converter().screen_height();
        self.layout = LayoutEngine::new(settings, screen_height);
        self.animate_overlay = settings.animate_overlay;
        self.reposition_overlays();
    }

    pub fn set_screen_height(&mut self, screen_height: Option<f64>) {
        if self.layout.converter().screen_height() == screen_height {
            return;
        }
        debug!(?screen_height, "Screen height changed");
        self.layout.set_screen_height(screen_height);
        self.reposition_overlays();
    }

    fn reposition_overlays(&mut self) {
        for gid in &self.order {
            let (Some(group), Some(overlay)) = (self.groups.get(*gid), self.overlays.get_mut(gid))
            else {
                continue;
            };
            overlay.set_frame(self.layout.overlay_frame(group.frame), false);
        }
    }

    fn resolve(&self, handle: WindowHandle) -> Result<(WindowId, pid_t), GroupError> {
        let wid = self.windows.window_id(handle).ok_or(GroupError::HandleUnreadable)?;
        let pid = self.windows.owner_pid(handle).ok_or(GroupError::HandleUnreadable)?;
        if self.window_to_group.contains_key(&wid) {
            return Err(GroupError::AlreadyGrouped(wid));
        }
        Ok((wid, pid))
    }

    fn wrap(&self, handle: WindowHandle, wid: WindowId, pid: pid_t) -> Result<ManagedWindow, GroupError> {
        let frame = self.windows.frame(handle).map_err(|err| {
            debug!(?wid, %err, "Cannot capture frame of window");
            GroupError::HandleUnreadable
        })?;
        let title = self.windows.title(handle).unwrap_or_default();
        let app = self.windows.app_info(pid).unwrap_or_default();
        Ok(ManagedWindow::new(wid, pid, handle, title, app, frame))
    }

    pub fn create_group(&mut self, handle: WindowHandle) -> Result<GroupId, GroupError> {
        let (wid, pid) = self.resolve(handle)?;
        let window = self.wrap(handle, wid, pid)?;
        let frame = window.original_frame();

        let gid = self.groups.insert_with_key(|gid| TabGroup::new(gid, window));
        self.order.push(gid);
        self.window_to_group.insert(wid, gid);

        let mut overlay = self
            .overlay_factory
            .create(gid, Size::new(frame.size.width, self.layout.overlay_height()));
        overlay.order_front();
        self.overlays.insert(gid, overlay);

        self.layout_group(gid, self.animate_overlay);
        self.observe(handle, wid, pid);
        self.refresh_overlay(gid);
        info!(?gid, ?wid, "Created group");
        self.check_index();
        Ok(gid)
    }

    pub fn add_window(&mut self, handle: WindowHandle, gid: GroupId) -> Result<(), GroupError> {
        if !self.groups.contains_key(gid) {
            return Err(GroupError::UnknownGroup(gid));
        }
        let (wid, pid) = self.resolve(handle)?;
        let window = self.wrap(handle, wid, pid)?;

        best_effort(self.windows.minimize(handle), wid, "minimize incoming window");
        if let Some(group) = self.groups.get_mut(gid) {
            group.push(window);
        }
        self.window_to_group.insert(wid, gid);
        self.observe(handle, wid, pid);
        self.refresh_overlay(gid);
        info!(?gid, ?wid, "Added window to group");
        self.check_index();
        Ok(())
    }

    fn observe(&mut self, handle: WindowHandle, wid: WindowId, pid: pid_t) {
        if let Err(err) = self.observer.observe(handle, wid, pid) {
            warn!(?wid, %err, "Could not observe window; it will not follow external changes");
        }
    }

    /// Takes `wid` out of its group and puts it back where it was before it
    /// joined. Returns false if the window was not grouped.
    pub fn remove_window(&mut self, wid: WindowId) -> bool { self.detach(wid, true) }

    /// Forgets a window that no longer exists. Nothing is written to it.
    pub fn remove_destroyed_window(&mut self, wid: WindowId) -> bool { self.detach(wid, false) }

    fn detach(&mut self, wid: WindowId, restore: bool) -> bool {
        let Some(&gid) = self.window_to_group.get(&wid) else {
            trace!(?wid, "Window is not grouped");
            return false;
        };
        self.observer.stop_observing(wid);

        let Some(group) = self.groups.get_mut(gid) else {
            self.window_to_group.remove(&wid);
            return false;
        };
        let Some(index) = group.index_of(wid) else {
            self.window_to_group.remove(&wid);
            return false;
        };
        let was_active = group.active_tab_index() == Some(index);

        if restore {
            let window = &group.tabs()[index];
            restore_window(self.windows.as_ref(), window);
            best_effort(self.windows.raise(window.handle), wid, "raise released window");
        }
        group.remove_tab(index);
        self.window_to_group.remove(&wid);
        debug!(?gid, ?wid, restore, "Removed window from group");

        if group.is_empty() {
            self.dissolve_group(gid);
            return true;
        }
        if was_active && !group.is_minimized() {
            self.show_active(gid);
        }
        self.refresh_overlay(gid);
        self.check_index();
        true
    }

    /// Un-minimizes, raises and lays out the active window.
    fn show_active(&mut self, gid: GroupId) {
        let Some(active) = self.groups.get(gid).and_then(|g| g.active_window()) else {
            return;
        };
        let (wid, handle) = (active.id, active.handle);
        best_effort(self.windows.unminimize(handle), wid, "unminimize active window");
        best_effort(self.windows.raise(handle), wid, "raise active window");
        self.layout_group(gid, self.animate_overlay);
    }

    /// Returns whether anything changed.
    pub fn activate_tab(&mut self, gid: GroupId, index: usize) -> bool {
        let Some(group) = self.groups.get_mut(gid) else {
            return false;
        };
        if index >= group.len() {
            trace!(?gid, index, "Tab index out of range");
            return false;
        }
        let was_minimized = group.is_minimized();
        let previous = group.active_tab_index();
        if previous == Some(index) && !was_minimized {
            return false;
        }

        if previous != Some(index) {
            if let Some(current) = group.active_window() {
                best_effort(self.windows.minimize(current.handle), current.id, "minimize tab");
            }
        }
        group.set_active(index);
        group.set_minimized(false);
        if was_minimized {
            if let Some(overlay) = self.overlays.get_mut(&gid) {
                overlay.order_front();
            }
        }
        debug!(?gid, index, "Activated tab");
        self.show_active(gid);
        self.refresh_overlay(gid);
        self.check_index();
        true
    }

    /// Reorders a tab. The active window stays active.
    pub fn move_tab(&mut self, gid: GroupId, from: usize, to: usize) -> bool {
        let moved = self.groups.get_mut(gid).is_some_and(|g| g.move_tab(from, to));
        if moved {
            debug!(?gid, from, to, "Moved tab");
            self.refresh_overlay(gid);
            self.check_index();
        }
        moved
    }

    pub fn minimize_group(&mut self, gid: GroupId) -> bool {
        let Some(group) = self.groups.get_mut(gid) else {
            return false;
        };
        if group.is_minimized() {
            return false;
        }
        for window in group.tabs() {
            best_effort(self.windows.minimize(window.handle), window.id, "minimize tab");
        }
        group.set_minimized(true);
        if let Some(overlay) = self.overlays.get_mut(&gid) {
            overlay.order_out();
        }
        debug!(?gid, "Minimized group");
        true
    }

    pub fn restore_group(&mut self, gid: GroupId) -> bool {
        let Some(group) = self.groups.get_mut(gid) else {
            return false;
        };
        if !group.is_minimized() {
            return false;
        }
        group.set_minimized(false);
        if let Some(overlay) = self.overlays.get_mut(&gid) {
            overlay.order_front();
        }
        debug!(?gid, "Restored group");
        self.show_active(gid);
        self.refresh_overlay(gid);
        true
    }

    /// Releases every window of the group, restoring each one, then closes
    /// the overlay. Returns false if the group no longer exists.
    pub fn dissolve_group(&mut self, gid: GroupId) -> bool {
        let Some(group) = self.groups.get(gid) else {
            return false;
        };
        for window in group.tabs() {
            self.observer.stop_observing(window.id);
            restore_window(self.windows.as_ref(), window);
            self.window_to_group.remove(&window.id);
        }
        if let Some(mut overlay) = self.overlays.remove(&gid) {
            overlay.close();
        }
        self.groups.remove(gid);
        self.order.retain(|g| *g != gid);
        info!(?gid, "Dissolved group");
        self.check_index();
        true
    }

    pub fn dissolve_all_groups(&mut self) {
        for gid in self.order.clone() {
            self.dissolve_group(gid);
        }
    }

    /// Cancels every lifecycle subscription. Used on teardown before the
    /// groups are dissolved.
    pub fn stop_notifications(&mut self) { self.observer.stop_observing_all(); }

    pub fn translate_notification(&self, notification: WindowNotification) -> Vec<ObserverEvent> {
        self.observer.translate(notification)
    }

    pub fn is_observing(&self, wid: WindowId) -> bool { self.observer.is_observing(wid) }

    pub fn update_title(&mut self, wid: WindowId, title: String) -> bool {
        let Some(&gid) = self.window_to_group.get(&wid) else {
            return false;
        };
        let Some(tab) = self.groups.get_mut(gid).and_then(|g| g.tab_mut(wid)) else {
            return false;
        };
        tab.title = title;
        self.refresh_overlay(gid);
        true
    }

    /// Window drives panel: adopts the active window's frame as the group
    /// frame and moves the overlay along. `frame` is read from the window if
    /// not given. Returns false if `wid` is not the active window of a group.
    pub fn sync_group_to_window(&mut self, wid: WindowId, frame: Option<Rect>) -> bool {
        let Some(&gid) = self.window_to_group.get(&wid) else {
            return false;
        };
        let Some(group) = self.groups.get_mut(gid) else {
            return false;
        };
        let Some(active) = group.active_window().filter(|w| w.id == wid) else {
            return false;
        };
        let frame = match frame {
            Some(frame) => frame,
            None => match self.windows.frame(active.handle) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(?wid, %err, "Could not read frame of active window");
                    return false;
                }
            },
        };
        if group.frame.same_as(&frame) {
            return true;
        }
        trace!(?gid, ?frame, "Group follows window");
        group.frame = frame;
        if let Some(overlay) = self.overlays.get_mut(&gid) {
            overlay.set_frame(self.layout.overlay_frame(frame), false);
        }
        true
    }

    /// Panel drives window: the user dropped the overlay at `panel_frame`
    /// (bottom-left origin), so the active window moves underneath it.
    pub fn update_group_frame(&mut self, gid: GroupId, panel_frame: Rect) -> bool {
        let Some(group) = self.groups.get_mut(gid) else {
            return false;
        };
        let origin = self.layout.window_origin_for_panel(panel_frame);
        group.frame = group.frame.with_origin(origin);
        debug!(?gid, ?origin, "Window follows overlay");
        self.position_active_window(gid);
        true
    }

    /// Moves the active window to the group frame, keeping its own height,
    /// then records the resulting frame on the group. Fullscreen windows are
    /// left alone.
    fn position_active_window(&mut self, gid: GroupId) {
        let Some(group) = self.groups.get_mut(gid) else {
            return;
        };
        let Some(active) = group.active_window() else {
            return;
        };
        let (wid, handle) = (active.id, active.handle);
        let fallback_height = active.original_frame().size.height;
        if self.windows.is_fullscreen(handle) {
            trace!(?wid, "Active window is fullscreen; not moving it");
            return;
        }
        let current = self.windows.frame(handle).ok();
        let height = current.map_or(fallback_height, |f| f.size.height);
        let target = self.layout.window_frame(group.frame, height);
        if current.is_none_or(|f| !f.same_as(&target)) {
            best_effort(self.windows.set_frame(handle, target), wid, "position active window");
        }
        group.frame = target;
    }

    /// Lays out the group: the active window goes to the group frame and the
    /// overlay goes on top of it.
    pub fn layout_group(&mut self, gid: GroupId, animate: bool) {
        self.position_active_window(gid);
        let Some(group) = self.groups.get(gid) else {
            return;
        };
        if let Some(overlay) = self.overlays.get_mut(&gid) {
            overlay.set_frame(self.layout.overlay_frame(group.frame), animate);
        }
    }

    fn refresh_overlay(&mut self, gid: GroupId) {
        let (Some(group), Some(overlay)) = (self.groups.get(gid), self.overlays.get_mut(&gid))
        else {
            return;
        };
        overlay.refresh_tabs(&tab_data(group), group.active_tab_index());
    }

    pub fn group(&self, gid: GroupId) -> Option<&TabGroup> { self.groups.get(gid) }

    /// Groups in creation order.
    pub fn groups(&self) -> impl Iterator<Item = &TabGroup> + '_ {
        self.order.iter().filter_map(|gid| self.groups.get(*gid))
    }

    pub fn group_count(&self) -> usize { self.order.len() }

    pub fn find_group(&self, wid: WindowId) -> Option<GroupId> {
        self.window_to_group.get(&wid).copied()
    }

    pub fn is_window_in_group(&self, wid: WindowId) -> bool {
        self.window_to_group.contains_key(&wid)
    }

    pub fn is_active_window(&self, wid: WindowId) -> bool {
        self.find_group(wid)
            .and_then(|gid| self.groups.get(gid))
            .is_some_and(|g| g.is_active(wid))
    }

    pub fn window_handle(&self, wid: WindowId) -> Option<WindowHandle> {
        let group = self.groups.get(self.find_group(wid)?)?;
        group.tabs().iter().find(|w| w.id == wid).map(|w| w.handle)
    }

    /// First visible group whose padded overlay contains `point` (bottom-left
    /// origin).
    pub fn find_group_at(&self, point: Point) -> Option<GroupId> {
        self.groups()
            .filter(|g| !g.is_minimized())
            .find(|g| self.layout.drop_target(g.frame).contains(point))
            .map(|g| g.id())
    }

    /// Topmost window under `point` that belongs to neither this process nor
    /// any group.
    pub fn window_under(&self, point: Point) -> Option<(WindowHandle, WindowId)> {
        let own_pid = std::process::id() as pid_t;
        self.windows.window_at(point, &|pid, wid| {
            pid == own_pid || self.window_to_group.contains_key(&wid)
        })
    }

    pub fn group_data(&self, gid: GroupId) -> Option<GroupData> {
        self.groups.get(gid).map(GroupData::from)
    }

    pub fn snapshot(&self) -> Vec<GroupData> { self.groups().map(GroupData::from).collect() }

    /// Checks that the reverse index is exactly the union of all tabs and
    /// that every group is well formed.
    pub fn verify_index(&self) -> Result<(), IndexViolation> {
        if self.order.len() != self.groups.len()
            || self.order.iter().any(|gid| !self.groups.contains_key(*gid))
        {
            return Err(IndexViolation::OrderMismatch);
        }
        let mut seen = HashMap::default();
        for (gid, group) in &self.groups {
            if group.is_empty() {
                return Err(IndexViolation::EmptyGroup(gid));
            }
            match group.active_tab_index() {
                Some(index) if index < group.len() => {}
                active => return Err(IndexViolation::BadActiveIndex(gid, active, group.len())),
            }
            if !self.overlays.contains_key(&gid) {
                return Err(IndexViolation::MissingOverlay(gid));
            }
            for window in group.tabs() {
                if seen.insert(window.id, gid).is_some() {
                    return Err(IndexViolation::Duplicate(window.id));
                }
                let indexed = self.window_to_group.get(&window.id).copied();
                if indexed != Some(gid) {
                    return Err(IndexViolation::Misindexed(window.id, gid, indexed));
                }
            }
        }
        for (wid, gid) in &self.window_to_group {
            if !seen.contains_key(wid) {
                return Err(IndexViolation::Orphan(*wid, *gid));
            }
        }
        Ok(())
    }

    fn check_index(&self) { debug_assert_eq!(self.verify_index(), Ok(())); }
}

/// Puts a window back at its original frame and un-minimizes it. Failures
/// are logged and do not stop the caller.
fn restore_window(windows: &dyn WindowSystem, window: &ManagedWindow) {
    best_effort(
        windows.set_frame(window.handle, window.original_frame()),
        window.id,
        "restore window frame",
    );
    best_effort(windows.unminimize(window.handle), window.id, "unminimize released window");
}
