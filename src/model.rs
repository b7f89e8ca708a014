pub mod server;
pub mod tab_group;

use thiserror::Error;

pub use tab_group::{DEFAULT_OVERLAY_HEIGHT, GroupId, ManagedWindow, TabGroup};

use crate::sys::window::WindowId;

/// Reasons the registry refuses to take a window.
///
/// Failures to manipulate a window once it is grouped are not represented
/// here; those are logged and never surface to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    #[error("window {0} already belongs to a group")]
    AlreadyGrouped(WindowId),
    #[error("window handle could not be resolved to a window and owning process")]
    HandleUnreadable,
    #[error("group {0:?} does not exist")]
    UnknownGroup(GroupId),
}
