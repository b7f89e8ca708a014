use tracing::{debug, warn};

use crate::actor::reactor::{Command, GroupSelector, Reactor};
use crate::model::{GroupError, GroupId};
use crate::sys::geometry::Point;
use crate::sys::window::{WindowHandle, WindowId};

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_command(reactor: &mut Reactor, command: Command) {
        debug!(?command, "Handling command");
        match command {
            Command::CreateGroup { window } => Self::handle_create_group(reactor, window),
            Command::AddWindow { window, group } => Self::handle_add_window(reactor, window, group),
            Command::DropWindow { window, point } => Self::handle_drop_window(reactor, window, point),
            Command::GroupWindowAt { point } => Self::handle_group_window_at(reactor, point),
            Command::RemoveWindow { window } => {
                reactor.registry.remove_window(window);
            }
            Command::ActivateTab { group, index } => {
                if let Some(gid) = reactor.resolve_group(group) {
                    reactor.registry.activate_tab(gid, index);
                }
            }
            Command::NextTab(group) => Self::handle_cycle_tab(reactor, group, true),
            Command::PrevTab(group) => Self::handle_cycle_tab(reactor, group, false),
            Command::MoveTab { group, from, to } => {
                if let Some(gid) = reactor.resolve_group(group) {
                    reactor.registry.move_tab(gid, from, to);
                }
            }
            Command::MinimizeGroup(group) => {
                if let Some(gid) = reactor.resolve_group(group) {
                    reactor.registry.minimize_group(gid);
                }
            }
            Command::RestoreGroup(group) => {
                if let Some(gid) = reactor.resolve_group(group) {
                    reactor.registry.restore_group(gid);
                }
            }
            Command::DissolveGroup(group) => {
                if let Some(gid) = reactor.resolve_group(group) {
                    reactor.registry.dissolve_group(gid);
                }
            }
            Command::DissolveAll => reactor.registry.dissolve_all_groups(),
        }
    }

    fn handle_create_group(reactor: &mut Reactor, window: WindowId) {
        let Some(handle) = window_handle(reactor, window) else {
            return;
        };
        if let Err(err) = reactor.registry.create_group(handle) {
            warn!(?window, %err, "Could not create group");
        }
    }

    fn handle_add_window(reactor: &mut Reactor, window: WindowId, group: GroupSelector) {
        let (Some(gid), Some(handle)) = (reactor.resolve_group(group), window_handle(reactor, window))
        else {
            return;
        };
        add_to_group(reactor, handle, gid);
    }

    fn handle_drop_window(reactor: &mut Reactor, window: WindowId, point: Point) {
        if reactor.registry.is_window_in_group(window) {
            debug!(?window, "Dropped window is already grouped");
            return;
        }
        let Some(handle) = window_handle(reactor, window) else {
            return;
        };
        match reactor.registry.find_group_at(point) {
            Some(gid) => add_to_group(reactor, handle, gid),
            None => {
                if let Err(err) = reactor.registry.create_group(handle) {
                    warn!(?window, %err, "Could not create group for dropped window");
                }
            }
        }
    }

    fn handle_group_window_at(reactor: &mut Reactor, point: Point) {
        let Some((handle, wid)) = reactor.registry.window_under(point) else {
            debug!(?point, "No ungrouped window under point");
            return;
        };
        if let Err(err) = reactor.registry.create_group(handle) {
            warn!(?wid, %err, "Could not create group");
        }
    }

    /// Activates the next or previous tab, wrapping at either end.
    fn handle_cycle_tab(reactor: &mut Reactor, group: GroupSelector, forward: bool) {
        let Some(gid) = reactor.resolve_group(group) else {
            return;
        };
        let Some(group) = reactor.registry.group(gid) else {
            return;
        };
        let len = group.len();
        let Some(active) = group.active_tab_index() else {
            return;
        };
        let index = if forward { (active + 1) % len } else { (active + len - 1) % len };
        reactor.registry.activate_tab(gid, index);
    }
}

fn add_to_group(reactor: &mut Reactor, handle: WindowHandle, gid: GroupId) {
    match reactor.registry.add_window(handle, gid) {
        Ok(()) => {}
        Err(err @ GroupError::AlreadyGrouped(_)) => debug!(%err, "Window not added"),
        Err(err) => warn!(?gid, %err, "Could not add window to group"),
    }
}

fn window_handle(reactor: &Reactor, window: WindowId) -> Option<WindowHandle> {
    let handle = reactor.windows.handle_for(window);
    if handle.is_none() {
        warn!(?window, "Unknown window");
    }
    handle
}
