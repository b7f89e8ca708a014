//! Platform surfaces the engine consumes, and the geometry they speak in.

pub mod geometry;
pub mod notification;
pub mod overlay;
pub mod screen;
pub mod virtual_desktop;
pub mod window;

use std::sync::Arc;

use notification::NotificationSource;
use overlay::OverlayFactory;
use window::WindowSystem;

/// The set of platform capabilities a reactor is wired to.
#[derive(Clone)]
pub struct Platform {
    pub windows: Arc<dyn WindowSystem>,
    pub notifications: Arc<dyn NotificationSource>,
    pub overlays: Arc<dyn OverlayFactory>,
}
