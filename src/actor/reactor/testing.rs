use std::thread;
use std::time::{Duration, Instant};

use super::replay::settle;
use super::{Command, Event, Reactor};
use crate::common::config::Config;
use crate::model::server::GroupData;
use crate::model::{GroupError, GroupId, TabGroup};
use crate::sys::geometry::Rect;
use crate::sys::virtual_desktop::{OverlayState, VirtualDesktop, VirtualWindow, WindowCall, WindowSpec};
use crate::sys::window::{WindowHandle, WindowId, pid_t};

pub const SCREEN_HEIGHT: f64 = 1000.0;

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect { Rect::from_xywh(x, y, width, height) }

pub fn wid(id: u32) -> WindowId { WindowId::new(id) }

/// Polls `check` for up to two seconds, for tests against a spawned reactor.
pub fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    check()
}

/// A reactor wired to a fresh virtual desktop. Every event is followed by
/// delivering the notifications it caused, the way the platform would.
pub struct Harness {
    pub desktop: VirtualDesktop,
    pub reactor: Reactor,
}

impl Harness {
    pub fn new() -> Self { Self::with_config(Config::default()) }

    pub fn with_config(config: Config) -> Self {
        let desktop = VirtualDesktop::new(Some(SCREEN_HEIGHT));
        let reactor = Reactor::new(config, &desktop.platform());
        Harness { desktop, reactor }
    }

    pub fn open(&self, id: u32, pid: pid_t, frame: Rect) -> WindowId {
        self.desktop.add_window(WindowSpec::new(id, pid, frame));
        wid(id)
    }

    pub fn handle(&self, wid: WindowId) -> WindowHandle {
        self.desktop.handle_of(wid).expect("window is open")
    }

    pub fn event(&mut self, event: Event) {
        self.reactor.handle_event(event);
        self.settle();
    }

    pub fn command(&mut self, command: Command) { self.event(Event::Command(command)); }

    pub fn settle(&mut self) {
        settle(&mut self.reactor, &self.desktop).expect("notifications settle");
    }

    pub fn tick(&mut self, count: usize) {
        for _ in 0..count {
            self.reactor.on_drag_tick();
            self.settle();
        }
    }

    pub fn try_create_group(&mut self, wid: WindowId) -> Result<GroupId, GroupError> {
        let handle = self.handle(wid);
        let result = self.reactor.registry.create_group(handle);
        self.settle();
        result
    }

    pub fn create_group(&mut self, wid: WindowId) -> GroupId {
        self.try_create_group(wid).expect("group created")
    }

    pub fn add(&mut self, wid: WindowId, gid: GroupId) {
        let handle = self.handle(wid);
        self.reactor.registry.add_window(handle, gid).expect("window added");
        self.settle();
    }

    /// A group of `ids`, all owned by `pid`, with the first window active.
    pub fn group_of(&mut self, pid: pid_t, ids: &[u32]) -> GroupId {
        for (n, id) in ids.iter().enumerate() {
            let offset = 20.0 * n as f64;
            self.open(*id, pid, rect(100.0 + offset, 200.0 + offset, 600.0, 400.0 + offset));
        }
        let gid = self.create_group(wid(ids[0]));
        for id in &ids[1..] {
            self.add(wid(*id), gid);
        }
        gid
    }

    pub fn group(&self, gid: GroupId) -> &TabGroup {
        self.reactor.registry.group(gid).expect("group exists")
    }

    pub fn groups(&self) -> Vec<GroupData> { self.reactor.registry.snapshot() }

    pub fn tab_ids(&self, gid: GroupId) -> Vec<u32> {
        self.group(gid).tabs().iter().map(|w| w.id.as_u32()).collect()
    }

    pub fn active(&self, gid: GroupId) -> Option<u32> {
        self.group(gid).active_window().map(|w| w.id.as_u32())
    }

    pub fn window(&self, wid: WindowId) -> VirtualWindow {
        self.desktop.window(wid).expect("window is open")
    }

    pub fn frame(&self, wid: WindowId) -> Rect { self.window(wid).frame }

    pub fn overlay(&self, gid: GroupId) -> OverlayState {
        self.desktop.overlay(gid).expect("overlay was created")
    }

    pub fn calls(&self) -> Vec<WindowCall> { self.desktop.take_calls() }

    pub fn assert_consistent(&self) {
        assert_eq!(self.reactor.registry.verify_index(), Ok(()));
    }
}
