//! The window-control surface: everything the engine is allowed to ask of
//! windows it does not own.
//!
//! Implementations wrap whatever native mechanism the host platform offers.
//! All frames crossing this boundary are in the top-left-origin convention.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{Point, Rect};

#[allow(non_camel_case_types)]
pub type pid_t = i32;

/// Opaque identifier of a window, stable for the window's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    pub const fn new(id: u32) -> Self { Self(id) }

    pub fn as_u32(&self) -> u32 { self.0 }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Token handed out by a [`WindowSystem`] that refers to one native window
/// element. It is only meaningful to the surface that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub const fn new(raw: u64) -> Self { Self(raw) }

    pub fn raw(&self) -> u64 { self.0 }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// Display metadata of the application that owns a window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    /// Identifier the overlay uses to look up the application icon.
    pub bundle_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("failed to read {attribute} of window {handle}")]
    AttributeReadFailed { handle: WindowHandle, attribute: &'static str },
    #[error("failed to write {attribute} of window {handle}")]
    AttributeWriteFailed { handle: WindowHandle, attribute: &'static str },
    #[error("window {handle} rejected {action}")]
    ActionFailed { handle: WindowHandle, action: &'static str },
}

pub type WindowResult<T> = Result<T, WindowError>;

/// Consumed capability for reading and manipulating external windows.
pub trait WindowSystem: Send + Sync {
    fn frame(&self, handle: WindowHandle) -> WindowResult<Rect>;
    fn set_frame(&self, handle: WindowHandle, frame: Rect) -> WindowResult<()>;
    fn title(&self, handle: WindowHandle) -> Option<String>;
    fn minimize(&self, handle: WindowHandle) -> WindowResult<()>;
    fn unminimize(&self, handle: WindowHandle) -> WindowResult<()>;
    fn raise(&self, handle: WindowHandle) -> WindowResult<()>;
    fn is_fullscreen(&self, handle: WindowHandle) -> bool;
    fn window_id(&self, handle: WindowHandle) -> Option<WindowId>;
    /// Looks a window up by identifier, for callers that only know its id.
    fn handle_for(&self, wid: WindowId) -> Option<WindowHandle>;
    fn owner_pid(&self, handle: WindowHandle) -> Option<pid_t>;
    fn app_info(&self, pid: pid_t) -> Option<AppInfo>;

    /// Height of the primary screen, the reference for coordinate flipping.
    fn primary_screen_height(&self) -> Option<f64>;

    /// Topmost normal-layer window under `point` (bottom-left origin) for
    /// which `exclude` returns false.
    fn window_at(
        &self,
        point: Point,
        exclude: &dyn Fn(pid_t, WindowId) -> bool,
    ) -> Option<(WindowHandle, WindowId)>;
}
