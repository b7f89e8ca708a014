//! Read-only snapshots of the group model, handed to overlays, queries and the
//! CLI. Nothing here is ever fed back into the registry.

use serde::{Deserialize, Serialize};

use super::tab_group::{GroupId, ManagedWindow, TabGroup};
use crate::sys::geometry::Rect;
use crate::sys::window::{WindowId, pid_t};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabData {
    pub window_id: WindowId,
    pub pid: pid_t,
    pub title: String,
    pub app_name: String,
    pub bundle_id: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    pub id: GroupId,
    pub frame: Rect,
    pub active_tab_index: Option<usize>,
    pub is_minimized: bool,
    pub tabs: Vec<TabData>,
}

impl TabData {
    pub fn from_window(window: &ManagedWindow, is_active: bool) -> Self {
        TabData {
            window_id: window.id,
            pid: window.pid,
            title: window.title.clone(),
            app_name: window.app.name.clone(),
            bundle_id: window.app.bundle_id.clone(),
            is_active,
        }
    }
}

impl From<&TabGroup> for GroupData {
    fn from(group: &TabGroup) -> Self {
        let active = group.active_tab_index();
        GroupData {
            id: group.id(),
            frame: group.frame,
            active_tab_index: active,
            is_minimized: group.is_minimized(),
            tabs: tab_data(group),
        }
    }
}

pub fn tab_data(group: &TabGroup) -> Vec<TabData> {
    let active = group.active_tab_index();
    group
        .tabs()
        .iter()
        .enumerate()
        .map(|(idx, window)| TabData::from_window(window, Some(idx) == active))
        .collect()
}
