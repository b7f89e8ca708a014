//! Deterministic replay of a scripted session against the virtual desktop.
//!
//! A scenario lists the windows on screen and a sequence of steps: commands
//! for the reactor, and things the user or other applications do to windows.
//! After each step every notification the virtual desktop produced is fed
//! back into the reactor until it goes quiet.

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};

use super::{Command, Event, GroupSelector, Reactor};
use crate::common::config::Config;
use crate::model::server::GroupData;
use crate::sys::geometry::{Point, Rect};
use crate::sys::virtual_desktop::{VirtualDesktop, WindowSpec};
use crate::sys::window::{WindowId, pid_t};

/// Rounds of notification delivery after which a step is considered to be
/// feeding back into itself.
const MAX_SETTLE_ROUNDS: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub screen_height: Option<f64>,
    #[serde(default)]
    pub windows: Vec<WindowSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    Command(Command),
    OpenWindow(WindowSpec),
    /// Moves or resizes a window as its owner would (top-left origin).
    MoveWindow { window: WindowId, frame: Rect },
    SetTitle { window: WindowId, title: String },
    DestroyWindow(WindowId),
    TerminateApp(pid_t),
    MouseDown(Point),
    MouseUp(Point),
    MouseDragged(Point),
    /// Runs this many drag sampling ticks.
    Tick(u32),
    /// The user drags a group's overlay to `frame` (bottom-left origin).
    DragOverlay { group: GroupSelector, frame: Rect },
    ScreenHeight(Option<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutcome {
    pub steps: usize,
    pub groups: Vec<GroupData>,
}

impl Scenario {
    pub fn read(path: &Path) -> anyhow::Result<Scenario> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Scenario> { Ok(ron::from_str(text)?) }
}

impl ReplayOutcome {
    pub fn to_json(&self) -> anyhow::Result<String> { Ok(serde_json::to_string_pretty(self)?) }

    pub fn to_tree(&self) -> anyhow::Result<String> {
        let groups = self
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| {
                let f = group.frame;
                let mut desc = format!(
                    "group {index} at ({}, {}) {}x{}",
                    f.origin.x, f.origin.y, f.size.width, f.size.height
                );
                if group.is_minimized {
                    desc.push_str(" [minimized]");
                }
                let tabs = group
                    .tabs
                    .iter()
                    .map(|tab| {
                        let marker = if tab.is_active { "*" } else { " " };
                        format!("{marker} {} {:?} ({})", tab.window_id, tab.title, tab.app_name)
                    })
                    .collect();
                ascii_tree::Tree::Node(desc, vec![ascii_tree::Tree::Leaf(tabs)])
            })
            .collect();
        let root = ascii_tree::Tree::Node(format!("{} groups", self.groups.len()), groups);
        let mut out = String::new();
        ascii_tree::write_tree(&mut out, &root)?;
        Ok(out)
    }
}

/// Runs `scenario` to completion and returns the groups that exist at the
/// end, before teardown.
pub fn replay(scenario: &Scenario, config: Config) -> anyhow::Result<ReplayOutcome> {
    let desktop = VirtualDesktop::new(scenario.screen_height);
    for spec in &scenario.windows {
        desktop.add_window(spec.clone());
    }
    let mut reactor = Reactor::new(config, &desktop.platform());

    for (index, step) in scenario.steps.iter().enumerate() {
        let _span = info_span!("replay_step", index).entered();
        debug!(?step, "Replaying step");
        apply_step(&mut reactor, &desktop, step).with_context(|| format!("step {index}"))?;
        settle(&mut reactor, &desktop).with_context(|| format!("step {index}"))?;
        if let Err(violation) = reactor.registry().verify_index() {
            bail!("step {index} left the registry inconsistent: {violation}");
        }
    }

    let groups = reactor.registry().snapshot();
    reactor.shutdown();
    Ok(ReplayOutcome { steps: scenario.steps.len(), groups })
}

fn apply_step(reactor: &mut Reactor, desktop: &VirtualDesktop, step: &Step) -> anyhow::Result<()> {
    match step {
        Step::Command(command) => reactor.handle_event(Event::Command(command.clone())),
        Step::OpenWindow(spec) => {
            desktop.add_window(spec.clone());
        }
        Step::MoveWindow { window, frame } => {
            if !desktop.move_window(*window, *frame) {
                bail!("no window {window} to move");
            }
        }
        Step::SetTitle { window, title } => {
            if !desktop.set_title(*window, title.clone()) {
                bail!("no window {window} to rename");
            }
        }
        Step::DestroyWindow(window) => {
            if !desktop.destroy_window(*window) {
                bail!("no window {window} to destroy");
            }
        }
        Step::TerminateApp(pid) => {
            if desktop.terminate_app(*pid) == 0 {
                warn!(pid, "Terminated process had no windows");
            }
        }
        Step::MouseDown(point) => reactor.handle_event(Event::MouseDown(*point)),
        Step::MouseUp(point) => reactor.handle_event(Event::MouseUp(*point)),
        Step::MouseDragged(point) => reactor.handle_event(Event::MouseDragged(*point)),
        Step::Tick(count) => {
            for _ in 0..*count {
                reactor.on_drag_tick();
                settle(reactor, desktop)?;
            }
        }
        Step::DragOverlay { group, frame } => {
            let Some(gid) = reactor.resolve_group(*group) else {
                bail!("no group matches {group:?}");
            };
            desktop.drag_overlay(gid, *frame);
            reactor.handle_event(Event::OverlayDragged { group: gid, frame: *frame });
        }
        Step::ScreenHeight(height) => {
            desktop.set_screen_height(*height);
            reactor.handle_event(Event::ScreenParametersChanged { screen_height: *height });
        }
    }
    Ok(())
}

/// Delivers pending notifications until none are left.
pub(super) fn settle(reactor: &mut Reactor, desktop: &VirtualDesktop) -> anyhow::Result<()> {
    for _ in 0..MAX_SETTLE_ROUNDS {
        let notifications = desktop.take_notifications();
        if notifications.is_empty() {
            return Ok(());
        }
        for notification in notifications {
            reactor.handle_event(Event::WindowNotification(notification));
        }
    }
    bail!("notifications did not settle after {MAX_SETTLE_ROUNDS} rounds")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SCENARIO: &str = r#"(
        screen_height: Some(1000.0),
        windows: [
            (id: 1, pid: 10, frame: (origin: (x: 0.0, y: 100.0), size: (width: 800.0, height: 600.0)), title: "Mail"),
            (id: 2, pid: 20, frame: (origin: (x: 300.0, y: 300.0), size: (width: 500.0, height: 400.0)), title: "Notes"),
        ],
        steps: [
            Command(CreateGroup(window: 1)),
            Command(DropWindow(window: 2, point: (x: 400.0, y: 920.0))),
            Command(NextTab(Containing(1))),
            SetTitle(window: 2, title: "Notes - draft"),
        ],
    )"#;

    #[test]
    fn replays_grouping_session() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let outcome = replay(&scenario, Config::default()).unwrap();

        assert_eq!(outcome.steps, 4);
        assert_eq!(outcome.groups.len(), 1);
        let group = &outcome.groups[0];
        assert_eq!(group.active_tab_index, Some(1));
        let titles: Vec<_> = group.tabs.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Mail", "Notes - draft"]);
        // The second window took the group's position and width, but kept its height.
        assert_eq!(group.frame, Rect::from_xywh(0.0, 100.0, 800.0, 400.0));
    }

    #[test]
    fn renders_tree_and_json() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let outcome = replay(&scenario, Config::default()).unwrap();

        let tree = outcome.to_tree().unwrap();
        assert!(tree.contains("1 groups"));
        assert!(tree.contains("* 2 \"Notes - draft\""));

        let json: serde_json::Value = serde_json::from_str(&outcome.to_json().unwrap()).unwrap();
        assert_eq!(json["groups"][0]["tabs"][1]["is_active"], true);
    }

    #[test]
    fn unknown_window_fails_with_step_context() {
        let scenario = Scenario::parse("(steps: [DestroyWindow(9)])").unwrap();
        let err = replay(&scenario, Config::default()).unwrap_err();
        assert_eq!(format!("{err}"), "step 0");
        assert!(format!("{err:#}").contains("no window 9 to destroy"));
    }
}
