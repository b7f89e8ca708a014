//! The reactor is the single coordination context.
//!
//! Pointer events, lifecycle notifications, overlay drags and commands from
//! the shell all arrive here as [`Event`]s and are handled one at a time on the
//! reactor thread. The drag tracker's sampling timer runs on the same loop, so
//! no model state is ever touched from two places at once.

mod events;
mod query;
pub mod registry;
mod replay;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use events::command::CommandEventHandler;
use events::drag::DragEventHandler;
use events::window::WindowEventHandler;
use parking_lot::Mutex;
pub use query::{QueryRequest, ReactorQueryHandle};
use registry::GroupRegistry;
pub use replay::{ReplayOutcome, Scenario, Step, replay};
use serde::{Deserialize, Serialize};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::actor::{self, drag_tracker::DragTracker};
use crate::common::config::Config;
use crate::model::GroupId;
use crate::sys::Platform;
use crate::sys::geometry::{Point, Rect};
use crate::sys::notification::WindowNotification;
use crate::sys::window::{WindowId, WindowSystem};

pub type Sender = actor::Sender<Event>;
type Receiver = actor::Receiver<Event>;

#[derive(Clone)]
pub struct ReactorHandle {
    sender: Sender,
    queries: ReactorQueryHandle,
    thread: Arc<Mutex<Option<thread::JoinHandle<()>>>>,
}

impl ReactorHandle {
    fn new(sender: Sender, queries: ReactorQueryHandle, thread: thread::JoinHandle<()>) -> Self {
        Self {
            sender,
            queries,
            thread: Arc::new(Mutex::new(Some(thread))),
        }
    }

    pub fn sender(&self) -> Sender { self.sender.clone() }

    pub fn send(&self, event: Event) { self.sender.send(event) }

    /// Asks the reactor to tear down and waits until it has.
    pub fn shutdown(&self) {
        self.sender.send(Event::Shutdown);
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                error!("Reactor thread panicked");
            }
        }
    }
}

impl std::ops::Deref for ReactorHandle {
    type Target = ReactorQueryHandle;

    fn deref(&self) -> &Self::Target { &self.queries }
}

#[derive(Debug)]
pub enum Event {
    /// The primary screen changed size. Overlays are repositioned; windows
    /// stay where they are.
    ScreenParametersChanged { screen_height: Option<f64> },

    /// A raw lifecycle notification from the platform. Notifications for
    /// windows that are no longer observed are dropped on arrival.
    WindowNotification(WindowNotification),

    /// Primary button pressed. Locations are bottom-left origin.
    MouseDown(Point),
    MouseUp(Point),
    MouseDragged(Point),

    /// The user finished dragging an overlay panel to `frame` (bottom-left
    /// origin).
    OverlayDragged { group: GroupId, frame: Rect },

    ConfigUpdated(Box<Config>),

    Command(Command),

    Query(QueryRequest),

    /// Stop notifications and tracking, dissolve every group, and exit.
    Shutdown,
}

/// How a command addresses a group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GroupSelector {
    Id(GroupId),
    /// The group that holds this window.
    Containing(WindowId),
    /// The group whose overlay is under this point (bottom-left origin).
    At(Point),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    CreateGroup { window: WindowId },
    AddWindow { window: WindowId, group: GroupSelector },
    /// A window was dragged and released at `point`. It joins the group whose
    /// overlay is there, or starts a new group if there is none.
    DropWindow { window: WindowId, point: Point },
    /// Groups the topmost ungrouped window under `point`.
    GroupWindowAt { point: Point },
    RemoveWindow { window: WindowId },
    ActivateTab { group: GroupSelector, index: usize },
    NextTab(GroupSelector),
    PrevTab(GroupSelector),
    MoveTab { group: GroupSelector, from: usize, to: usize },
    MinimizeGroup(GroupSelector),
    RestoreGroup(GroupSelector),
    DissolveGroup(GroupSelector),
    DissolveAll,
}

pub struct Reactor {
    config: Config,
    windows: Arc<dyn WindowSystem>,
    registry: GroupRegistry,
    drag_tracker: DragTracker,
    stopped: bool,
}

impl Reactor {
    pub fn spawn(config: Config, platform: Platform) -> ReactorHandle {
        let (events_tx, events) = actor::channel();
        let reactor = Reactor::new(config, &platform);
        let queries = ReactorQueryHandle::new(events_tx.clone());
        let thread = thread::Builder::new()
            .name("reactor".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!(%err, "Could not start reactor runtime");
                        return;
                    }
                };
                runtime.block_on(Reactor::run(reactor, events));
            })
            .expect("failed to spawn reactor thread");
        ReactorHandle::new(events_tx, queries, thread)
    }

    pub fn new(config: Config, platform: &Platform) -> Reactor {
        Reactor {
            registry: GroupRegistry::new(&config.settings, platform),
            drag_tracker: DragTracker::new(config.settings.drag_tracker.clone()),
            windows: platform.windows.clone(),
            config,
            stopped: false,
        }
    }

    pub fn registry(&self) -> &GroupRegistry { &self.registry }

    pub fn drag_tracker(&self) -> &DragTracker { &self.drag_tracker }

    pub fn config(&self) -> &Config { &self.config }

    pub fn is_stopped(&self) -> bool { self.stopped }

    fn sample_ticker(period: Duration) -> Interval {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    async fn run(mut reactor: Reactor, mut events: Receiver) {
        let mut ticker = Self::sample_ticker(reactor.drag_tracker.sample_interval());
        loop {
            let sampling = reactor.drag_tracker.is_sampling();
            tokio::select! {
                event = events.recv() => {
                    let Some((span, event)) = event else {
                        debug!("Event channel closed");
                        break;
                    };
                    let _guard = span.enter();
                    reactor.handle_event(event);
                    if reactor.is_stopped() {
                        return;
                    }
                    let period = reactor.drag_tracker.sample_interval();
                    if ticker.period() != period {
                        ticker = Self::sample_ticker(period);
                    }
                }
                _ = ticker.tick(), if sampling => reactor.on_drag_tick(),
            }
        }
        reactor.shutdown();
    }

    #[instrument(name = "reactor::handle_event", skip(self), fields(event = ?event))]
    pub fn handle_event(&mut self, event: Event) {
        if self.stopped {
            trace!("Ignoring event after shutdown");
            return;
        }
        match event {
            Event::ScreenParametersChanged { screen_height } => {
                self.registry.set_screen_height(screen_height);
            }
            Event::WindowNotification(notification) => {
                WindowEventHandler::handle_notification(self, notification);
            }
            Event::MouseDown(_) => DragEventHandler::handle_mouse_down(self),
            Event::MouseUp(_) => DragEventHandler::handle_mouse_up(self),
            Event::MouseDragged(_) => DragEventHandler::handle_mouse_dragged(self),
            Event::OverlayDragged { group, frame } => {
                DragEventHandler::handle_overlay_dragged(self, group, frame);
            }
            Event::ConfigUpdated(config) => self.update_config(*config),
            Event::Command(command) => CommandEventHandler::handle_command(self, command),
            Event::Query(request) => self.handle_query_request(request),
            Event::Shutdown => self.shutdown(),
        }
        self.release_stale_drag();
    }

    /// One tick of the drag sampling timer.
    pub fn on_drag_tick(&mut self) { DragEventHandler::handle_tick(self); }

    fn update_config(&mut self, config: Config) {
        if config == self.config {
            return;
        }
        if let Err(err) = config.validate() {
            warn!("Ignoring invalid config update: {err:#}");
            return;
        }
        info!("Applying updated config");
        self.registry.update_settings(&config.settings);
        self.drag_tracker.update_settings(config.settings.drag_tracker.clone());
        self.config = config;
    }

    pub fn resolve_group(&self, selector: GroupSelector) -> Option<GroupId> {
        let gid = match selector {
            GroupSelector::Id(gid) => self.registry.group(gid).map(|_| gid),
            GroupSelector::Containing(wid) => self.registry.find_group(wid),
            GroupSelector::At(point) => self.registry.find_group_at(point),
        };
        if gid.is_none() {
            debug!(?selector, "No group matches selector");
        }
        gid
    }

    /// Only the active window of a group is worth following.
    fn release_stale_drag(&mut self) {
        if let Some(wid) = self.drag_tracker.tracked_window()
            && !self.registry.is_active_window(wid)
        {
            trace!(?wid, "Tracked window is no longer an active tab");
            self.drag_tracker.untrack(wid);
        }
    }

    /// Stops all notifications and the drag loop, then releases every group.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        info!("Shutting down");
        self.registry.stop_notifications();
        self.drag_tracker.stop();
        self.registry.dissolve_all_groups();
        self.stopped = true;
    }
}
