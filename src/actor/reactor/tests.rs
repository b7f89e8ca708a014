use pretty_assertions::assert_eq;
use test_log::test;

use super::testing::*;
use super::*;
use crate::actor::drag_tracker::TrackerState;
use crate::model::GroupError;
use crate::sys::geometry::Size;
use crate::sys::virtual_desktop::{VirtualDesktop, WindowCall, WindowSpec};
use crate::sys::window::{WindowHandle, pid_t};

#[test]
fn create_group_wraps_window_and_shows_overlay() {
    let mut h = Harness::new();
    let w = h.open(1, 10, rect(100.0, 200.0, 600.0, 400.0));
    let gid = h.create_group(w);

    let group = h.group(gid);
    assert_eq!(group.len(), 1);
    assert_eq!(group.active_tab_index(), Some(0));
    assert_eq!(group.frame, rect(100.0, 200.0, 600.0, 400.0));
    assert!(h.reactor.registry().is_window_in_group(w));
    assert_eq!(h.reactor.registry().find_group(w), Some(gid));

    let overlay = h.overlay(gid);
    assert!(overlay.visible);
    assert_eq!(overlay.frame, Some(rect(100.0, 800.0, 600.0, 36.0)));
    assert_eq!(overlay.initial_size, Size::new(600.0, 36.0));
    assert_eq!(overlay.active, Some(0));
    assert_eq!(overlay.tabs.len(), 1);
    assert_eq!(overlay.tabs[0].title, "Window 1");

    assert!(h.desktop.is_subscribed(w));
    assert!(h.desktop.is_process_watched(10));
    h.assert_consistent();
}

#[test]
fn grouping_rejects_grouped_and_unresolvable_windows() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);

    assert_eq!(h.try_create_group(wid(1)), Err(GroupError::AlreadyGrouped(wid(1))));
    let grouped = h.handle(wid(2));
    assert_eq!(h.reactor.registry.add_window(grouped, gid), Err(GroupError::AlreadyGrouped(wid(2))));
    assert_eq!(
        h.reactor.registry.create_group(WindowHandle::new(4242)),
        Err(GroupError::HandleUnreadable)
    );

    let w3 = h.open(3, 10, rect(0.0, 0.0, 100.0, 100.0));
    h.reactor.registry.dissolve_group(gid);
    let handle = h.handle(w3);
    assert_eq!(h.reactor.registry.add_window(handle, gid), Err(GroupError::UnknownGroup(gid)));
    h.assert_consistent();
}

#[test]
fn adding_minimizes_incoming_window_and_keeps_active_tab() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);
    let w2 = h.open(2, 20, rect(500.0, 500.0, 300.0, 300.0));
    h.calls();

    h.add(w2, gid);

    assert_eq!(h.calls(), vec![WindowCall::Minimize(w2)]);
    assert!(h.window(w2).minimized);
    assert_eq!(h.tab_ids(gid), vec![1, 2]);
    assert_eq!(h.active(gid), Some(1));
    let overlay = h.overlay(gid);
    assert_eq!(overlay.tabs.len(), 2);
    assert!(overlay.tabs[0].is_active);
    assert!(!overlay.tabs[1].is_active);
    assert!(h.desktop.is_process_watched(20));
}

#[test]
fn add_then_remove_restores_the_window() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);
    h.calls();

    h.command(Command::RemoveWindow { window: wid(2) });

    assert_eq!(h.calls(), vec![
        WindowCall::SetFrame(wid(2), rect(120.0, 220.0, 600.0, 420.0)),
        WindowCall::Unminimize(wid(2)),
        WindowCall::Raise(wid(2)),
    ]);
    assert!(!h.window(wid(2)).minimized);
    assert_eq!(h.desktop.stacking_order().last(), Some(&wid(2)));
    assert_eq!(h.tab_ids(gid), vec![1]);
    assert_eq!(h.active(gid), Some(1));
    assert!(!h.reactor.registry().is_window_in_group(wid(2)));
    assert!(!h.desktop.is_subscribed(wid(2)));
    assert!(!h.reactor.registry().is_observing(wid(2)));
    assert!(h.reactor.registry().is_observing(wid(1)));
    assert!(h.desktop.is_process_watched(10));
    assert_eq!(h.overlay(gid).tabs.len(), 1);
    h.assert_consistent();
}

#[test]
fn removing_last_tab_dissolves_group() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);

    h.command(Command::RemoveWindow { window: wid(1) });

    assert!(h.groups().is_empty());
    assert!(h.overlay(gid).closed);
    assert!(!h.desktop.is_process_watched(10));
    h.assert_consistent();

    // Removing an ungrouped window is a no-op.
    h.calls();
    assert!(!h.reactor.registry.remove_window(wid(1)));
    assert!(h.calls().is_empty());
}

#[test]
fn removal_keeps_the_same_window_active() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2, 3]);
    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 2 });
    assert_eq!(h.active(gid), Some(3));

    h.command(Command::RemoveWindow { window: wid(1) });
    assert_eq!(h.tab_ids(gid), vec![2, 3]);
    assert_eq!(h.group(gid).active_tab_index(), Some(1));
    assert_eq!(h.active(gid), Some(3));

    // Removing the active tab shows the one before it.
    h.command(Command::RemoveWindow { window: wid(3) });
    assert_eq!(h.tab_ids(gid), vec![2]);
    assert_eq!(h.active(gid), Some(2));
    assert!(!h.window(wid(2)).minimized);
    assert_eq!(h.frame(wid(2)), rect(100.0, 200.0, 600.0, 420.0));
    assert_eq!(h.frame(wid(3)), rect(140.0, 240.0, 600.0, 440.0));
    h.assert_consistent();
}

#[test]
fn destroying_background_tab_leaves_active_window_alone() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2, 3]);
    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 2 });
    let active_frame = h.frame(wid(3));
    h.calls();

    h.desktop.destroy_window(wid(2));
    h.settle();

    assert_eq!(h.tab_ids(gid), vec![1, 3]);
    assert_eq!(h.active(gid), Some(3));
    assert!(h.calls().is_empty());
    assert_eq!(h.frame(wid(3)), active_frame);
    assert_eq!(h.overlay(gid).tabs.len(), 2);

    // A late duplicate is harmless.
    h.event(Event::WindowNotification(WindowNotification::Destroyed(wid(2))));
    assert_eq!(h.tab_ids(gid), vec![1, 3]);
    h.assert_consistent();
}

#[test]
fn destroying_active_window_shows_next_tab() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);

    h.desktop.destroy_window(wid(1));
    h.settle();

    assert_eq!(h.tab_ids(gid), vec![2]);
    assert!(!h.window(wid(2)).minimized);
    assert_eq!(h.frame(wid(2)), rect(100.0, 200.0, 600.0, 420.0));
}

#[test]
fn process_termination_removes_all_its_windows() {
    let mut h = Harness::new();
    let first = h.group_of(10, &[1, 2]);
    let w3 = h.open(3, 20, rect(0.0, 500.0, 300.0, 300.0));
    let w4 = h.open(4, 10, rect(10.0, 510.0, 300.0, 300.0));
    let second = h.create_group(w3);
    h.add(w4, second);

    h.desktop.terminate_app(10);
    h.settle();

    assert_eq!(h.groups().len(), 1);
    assert!(h.reactor.registry().group(first).is_none());
    assert!(h.overlay(first).closed);
    assert_eq!(h.tab_ids(second), vec![3]);
    assert!(!h.desktop.is_process_watched(10));
    h.assert_consistent();
}

#[test]
fn notifications_in_flight_are_dropped_after_removal() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);

    // The move is queued but not yet delivered when the window leaves.
    h.desktop.move_window(wid(1), rect(700.0, 50.0, 600.0, 400.0));
    h.reactor.registry.remove_window(wid(1));
    h.settle();

    assert_eq!(h.active(gid), Some(2));
    assert_eq!(h.group(gid).frame, rect(100.0, 200.0, 600.0, 420.0));
    assert_ne!(h.reactor.drag_tracker().tracked_window(), Some(wid(1)));
    h.assert_consistent();
}

#[test]
fn activating_a_tab_swaps_visible_window() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2, 3]);
    h.calls();

    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 1 });

    assert_eq!(h.calls(), vec![
        WindowCall::Minimize(wid(1)),
        WindowCall::Unminimize(wid(2)),
        WindowCall::Raise(wid(2)),
        WindowCall::SetFrame(wid(2), rect(100.0, 200.0, 600.0, 420.0)),
    ]);
    assert_eq!(h.group(gid).frame, rect(100.0, 200.0, 600.0, 420.0));
    let overlay = h.overlay(gid);
    assert_eq!(overlay.active, Some(1));
    assert!(overlay.tabs[1].is_active);

    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 1 });
    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 7 });
    assert!(h.calls().is_empty());
    assert_eq!(h.active(gid), Some(2));
}

#[test]
fn tab_cycling_wraps_around() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2, 3]);

    h.command(Command::PrevTab(GroupSelector::Containing(wid(1))));
    assert_eq!(h.active(gid), Some(3));
    h.command(Command::NextTab(GroupSelector::Containing(wid(1))));
    assert_eq!(h.active(gid), Some(1));
    h.command(Command::NextTab(GroupSelector::Id(gid)));
    assert_eq!(h.active(gid), Some(2));
}

#[test]
fn moving_a_tab_keeps_the_active_window() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2, 3]);
    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 1 });

    h.command(Command::MoveTab { group: GroupSelector::Id(gid), from: 1, to: 0 });

    assert_eq!(h.tab_ids(gid), vec![2, 1, 3]);
    assert_eq!(h.group(gid).active_tab_index(), Some(0));
    assert_eq!(h.active(gid), Some(2));
    let order: Vec<_> = h.overlay(gid).tabs.iter().map(|t| t.window_id.as_u32()).collect();
    assert_eq!(order, vec![2, 1, 3]);
}

#[test]
fn activating_in_minimized_group_restores_it() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);
    h.command(Command::MinimizeGroup(GroupSelector::Id(gid)));
    assert!(h.group(gid).is_minimized());
    assert!(!h.overlay(gid).visible);

    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 0 });

    assert!(!h.group(gid).is_minimized());
    assert!(h.overlay(gid).visible);
    assert!(!h.window(wid(1)).minimized);
    assert!(h.window(wid(2)).minimized);
}

#[test]
fn minimize_and_restore_are_idempotent() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);

    assert!(h.reactor.registry.minimize_group(gid));
    assert!(h.window(wid(1)).minimized);
    assert!(h.window(wid(2)).minimized);
    h.calls();
    assert!(!h.reactor.registry.minimize_group(gid));
    assert!(h.calls().is_empty());

    assert!(h.reactor.registry.restore_group(gid));
    h.settle();
    assert!(h.overlay(gid).visible);
    assert!(!h.window(wid(1)).minimized);
    assert!(h.window(wid(2)).minimized);
    h.calls();
    assert!(!h.reactor.registry.restore_group(gid));
    assert!(h.calls().is_empty());
}

#[test]
fn removing_from_minimized_group_keeps_it_minimized() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2, 3]);
    h.command(Command::MinimizeGroup(GroupSelector::Id(gid)));
    h.settle();
    h.calls();

    h.command(Command::RemoveWindow { window: wid(1) });
    h.settle();

    assert_eq!(h.calls(), vec![
        WindowCall::SetFrame(wid(1), rect(100.0, 200.0, 600.0, 400.0)),
        WindowCall::Unminimize(wid(1)),
        WindowCall::Raise(wid(1)),
    ]);
    assert!(!h.window(wid(1)).minimized);
    assert!(h.group(gid).is_minimized());
    assert_eq!(h.tab_ids(gid), vec![2, 3]);
    assert_eq!(h.active(gid), Some(2));
    assert!(h.window(wid(2)).minimized);
    assert!(h.window(wid(3)).minimized);
    assert!(!h.overlay(gid).visible);

    h.command(Command::RemoveWindow { window: wid(3) });
    h.settle();
    assert!(h.calls().iter().all(|call| call.window() == wid(3)));
    assert!(h.window(wid(2)).minimized);
    assert!(!h.overlay(gid).visible);

    h.command(Command::RestoreGroup(GroupSelector::Id(gid)));
    h.settle();
    assert!(!h.window(wid(2)).minimized);
    assert!(h.overlay(gid).visible);
    h.assert_consistent();
}

#[test]
fn dissolving_restores_every_window_once() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2, 3]);
    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 1 });

    h.command(Command::DissolveGroup(GroupSelector::Containing(wid(2))));

    assert!(h.groups().is_empty());
    assert!(h.overlay(gid).closed);
    let originals = [
        (1, rect(100.0, 200.0, 600.0, 400.0)),
        (2, rect(120.0, 220.0, 600.0, 420.0)),
        (3, rect(140.0, 240.0, 600.0, 440.0)),
    ];
    for (id, frame) in originals {
        let window = h.window(wid(id));
        assert_eq!(window.frame, frame, "window {id}");
        assert!(!window.minimized, "window {id}");
        assert!(!h.desktop.is_subscribed(wid(id)));
    }

    h.calls();
    assert!(!h.reactor.registry.dissolve_group(gid));
    assert!(h.calls().is_empty());
    h.assert_consistent();
}

#[test]
fn window_move_carries_overlay_without_feedback() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);
    h.calls();
    let writes_before = h.overlay(gid).frame_writes;

    h.desktop.move_window(wid(1), rect(300.0, 150.0, 640.0, 400.0));
    h.settle();

    assert_eq!(h.group(gid).frame, rect(300.0, 150.0, 640.0, 400.0));
    let overlay = h.overlay(gid);
    assert_eq!(overlay.frame, Some(rect(300.0, 850.0, 640.0, 36.0)));
    assert_eq!(overlay.frame_writes, writes_before + 1);
    assert_eq!(overlay.animated_writes, 0);
    assert!(h.calls().is_empty());
}

#[test]
fn background_tab_moves_are_ignored() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);
    let frame = h.group(gid).frame;

    h.desktop.move_window(wid(2), rect(0.0, 0.0, 200.0, 200.0));
    h.settle();

    assert_eq!(h.group(gid).frame, frame);
    assert_eq!(h.reactor.drag_tracker().tracked_window(), None);
}

#[test]
fn drag_handoff_goes_idle_after_eighth_still_sample() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);
    let point = Point::new(400.0, 790.0);

    h.event(Event::MouseDown(point));
    h.desktop.move_window(wid(1), rect(120.0, 210.0, 600.0, 400.0));
    h.settle();
    assert_eq!(h.reactor.drag_tracker().state(), TrackerState::Armed);

    // Samples pick up moves before the coalesced notification arrives.
    h.desktop.move_window(wid(1), rect(160.0, 260.0, 600.0, 400.0));
    h.tick(1);
    assert_eq!(h.overlay(gid).frame, Some(rect(160.0, 740.0, 600.0, 36.0)));

    h.event(Event::MouseUp(point));
    h.tick(7);
    assert_eq!(h.reactor.drag_tracker().state(), TrackerState::Armed);
    h.tick(1);
    assert_eq!(h.reactor.drag_tracker().state(), TrackerState::Idle);
    h.tick(2);
    assert_eq!(h.reactor.drag_tracker().state(), TrackerState::Idle);
}

#[test]
fn tracked_window_leaving_group_stops_tracking() {
    let mut h = Harness::new();
    h.group_of(10, &[1, 2]);
    h.event(Event::MouseDown(Point::new(0.0, 0.0)));
    h.desktop.move_window(wid(1), rect(120.0, 210.0, 600.0, 400.0));
    h.settle();
    assert_eq!(h.reactor.drag_tracker().tracked_window(), Some(wid(1)));

    h.command(Command::RemoveWindow { window: wid(1) });

    assert_ne!(h.reactor.drag_tracker().tracked_window(), Some(wid(1)));
}

#[test]
fn dragging_overlay_moves_active_window() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);
    h.calls();
    let dropped = rect(400.0, 500.0, 600.0, 36.0);

    h.desktop.drag_overlay(gid, dropped);
    h.event(Event::OverlayDragged { group: gid, frame: dropped });

    assert_eq!(h.calls(), vec![WindowCall::SetFrame(wid(1), rect(400.0, 500.0, 600.0, 400.0))]);
    assert_eq!(h.group(gid).frame, rect(400.0, 500.0, 600.0, 400.0));
    assert_eq!(h.overlay(gid).frame, Some(dropped));
}

#[test]
fn fullscreen_active_window_is_never_repositioned() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);
    let full = rect(0.0, 0.0, 1600.0, 1000.0);
    h.desktop.add_window(WindowSpec::new(2, 10, full).fullscreen());
    h.add(wid(2), gid);
    h.calls();

    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 1 });

    assert_eq!(h.calls(), vec![
        WindowCall::Minimize(wid(1)),
        WindowCall::Unminimize(wid(2)),
        WindowCall::Raise(wid(2)),
    ]);
    assert_eq!(h.frame(wid(2)), full);
}

#[test]
fn drop_target_lookup_returns_first_visible_group() {
    let mut h = Harness::new();
    let first = h.group_of(10, &[1]);
    let w5 = h.open(5, 50, rect(150.0, 210.0, 600.0, 400.0));
    let second = h.create_group(w5);
    let point = Point::new(200.0, 800.0);

    assert_eq!(h.reactor.registry().find_group_at(point), Some(first));
    h.reactor.registry.minimize_group(first);
    assert_eq!(h.reactor.registry().find_group_at(point), Some(second));
    assert_eq!(h.reactor.registry().find_group_at(Point::new(50.0, 50.0)), None);
}

#[test]
fn dropping_window_on_overlay_joins_group() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);
    let w2 = h.open(2, 20, rect(0.0, 0.0, 300.0, 300.0));
    let w3 = h.open(3, 30, rect(0.0, 600.0, 300.0, 300.0));

    // Inside the padding just above the strip.
    h.command(Command::DropWindow { window: w2, point: Point::new(650.0, 840.0) });
    assert_eq!(h.tab_ids(gid), vec![1, 2]);

    h.command(Command::DropWindow { window: w3, point: Point::new(50.0, 50.0) });
    assert_eq!(h.groups().len(), 2);
    assert!(h.reactor.registry().find_group(w3).is_some_and(|g| g != gid));
}

#[test]
fn group_window_at_skips_own_and_grouped_windows() {
    let mut h = Harness::new();
    let w1 = h.open(1, 10, rect(0.0, 0.0, 500.0, 500.0));
    let w2 = h.open(2, 20, rect(100.0, 100.0, 500.0, 500.0));
    let own_pid = std::process::id() as pid_t;
    h.open(3, own_pid, rect(150.0, 150.0, 300.0, 300.0));
    h.create_group(w2);

    h.command(Command::GroupWindowAt { point: Point::new(200.0, 800.0) });

    assert_eq!(h.reactor.registry().group_count(), 2);
    assert!(h.reactor.registry().is_window_in_group(w1));
    assert!(!h.reactor.registry().is_window_in_group(wid(3)));
}

#[test]
fn screen_change_moves_only_overlays() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);
    h.calls();

    h.event(Event::ScreenParametersChanged { screen_height: Some(800.0) });

    assert_eq!(h.overlay(gid).frame, Some(rect(100.0, 600.0, 600.0, 36.0)));
    assert!(h.calls().is_empty());
}

#[test]
fn title_changes_reach_the_overlay() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);

    h.desktop.set_title(wid(2), "Inbox (3)");
    h.settle();

    assert_eq!(h.group(gid).tabs()[1].title, "Inbox (3)");
    assert_eq!(h.overlay(gid).tabs[1].title, "Inbox (3)");
}

#[test]
fn platform_failures_never_roll_back_the_model() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1, 2]);
    h.desktop.reject_writes(wid(2), true);

    h.command(Command::ActivateTab { group: GroupSelector::Id(gid), index: 1 });
    assert_eq!(h.active(gid), Some(2));
    assert!(h.window(wid(2)).minimized);

    h.command(Command::RemoveWindow { window: wid(2) });
    assert_eq!(h.tab_ids(gid), vec![1]);
    assert!(!h.window(wid(1)).minimized);
    assert!(h.calls().iter().all(|call| call.window() != wid(2)));
    h.assert_consistent();
}

#[test]
fn config_update_relayouts_overlays() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);
    let mut config = Config::default();
    config.settings.overlay_height = 20.0;

    h.event(Event::ConfigUpdated(Box::new(config.clone())));

    assert_eq!(h.overlay(gid).frame, Some(rect(100.0, 800.0, 600.0, 20.0)));
    assert_eq!(h.reactor.config(), &config);
}

#[test]
fn invalid_config_update_is_ignored() {
    let mut h = Harness::new();
    let gid = h.group_of(10, &[1]);
    let mut config = Config::default();
    config.settings.drag_tracker.refresh_rate_hz = f64::INFINITY;
    config.settings.drop_target_padding = f64::NAN;

    h.event(Event::ConfigUpdated(Box::new(config)));

    assert_eq!(h.reactor.config(), &Config::default());
    assert_eq!(
        h.reactor.drag_tracker().sample_interval(),
        Config::default().settings.drag_tracker.sample_interval()
    );
    assert_eq!(h.overlay(gid).frame, Some(rect(100.0, 800.0, 600.0, 36.0)));
}

#[test]
fn animation_applies_to_layout_but_not_to_drags() {
    let mut config = Config::default();
    config.settings.animate_overlay = true;
    let mut h = Harness::with_config(config);
    let gid = h.group_of(10, &[1]);
    assert_eq!(h.overlay(gid).animated_writes, 1);

    h.desktop.move_window(wid(1), rect(0.0, 300.0, 600.0, 400.0));
    h.settle();
    assert_eq!(h.overlay(gid).animated_writes, 1);
}

#[test]
fn shutdown_cancels_everything_and_releases_windows() {
    let mut h = Harness::new();
    h.group_of(10, &[1, 2]);
    let w3 = h.open(3, 20, rect(0.0, 600.0, 300.0, 300.0));
    h.create_group(w3);
    h.event(Event::MouseDown(Point::new(0.0, 0.0)));
    h.desktop.move_window(wid(1), rect(120.0, 210.0, 600.0, 400.0));
    h.settle();

    h.event(Event::Shutdown);

    assert!(h.reactor.is_stopped());
    assert!(h.groups().is_empty());
    assert_eq!(h.reactor.drag_tracker().state(), TrackerState::Idle);
    for id in [1, 2, 3] {
        assert!(!h.desktop.is_subscribed(wid(id)));
        assert!(!h.window(wid(id)).minimized);
    }
    assert!(!h.desktop.is_process_watched(10));
    assert!(!h.desktop.is_process_watched(20));
    assert!(h.desktop.overlays().iter().all(|(_, o)| o.closed));

    h.command(Command::CreateGroup { window: wid(1) });
    assert!(h.groups().is_empty());
}

#[test]
fn index_stays_consistent_under_mixed_operations() {
    let mut h = Harness::new();
    let ids: Vec<u32> = (1..=6).collect();
    for id in &ids {
        h.open(*id, 10 + (*id as pid_t % 2), rect(*id as f64 * 30.0, 100.0, 400.0, 300.0));
    }

    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move |bound: usize| {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((seed >> 33) as usize) % bound
    };

    for _ in 0..400 {
        let id = ids[next(ids.len())];
        let window = wid(id);
        let groups: Vec<GroupId> = h.groups().iter().map(|g| g.id).collect();
        match next(6) {
            0 => h.command(Command::CreateGroup { window }),
            1 if !groups.is_empty() => {
                let group = GroupSelector::Id(groups[next(groups.len())]);
                h.command(Command::AddWindow { window, group });
            }
            2 => h.command(Command::RemoveWindow { window }),
            3 if !groups.is_empty() => {
                let group = GroupSelector::Id(groups[next(groups.len())]);
                h.command(Command::ActivateTab { group, index: next(4) });
            }
            4 if !groups.is_empty() => {
                let group = GroupSelector::Id(groups[next(groups.len())]);
                if next(2) == 0 {
                    h.command(Command::MinimizeGroup(group));
                } else {
                    h.command(Command::RestoreGroup(group));
                }
            }
            5 => {
                h.desktop.destroy_window(window);
                h.settle();
                h.open(id, 10 + (id as pid_t % 2), rect(id as f64 * 30.0, 100.0, 400.0, 300.0));
            }
            _ => {}
        }

        h.assert_consistent();
        for group in h.groups() {
            assert!(!group.tabs.is_empty());
            let active = group.active_tab_index.expect("non-empty group has an active tab");
            assert!(active < group.tabs.len());
        }
    }
}

#[test]
fn spawned_reactor_serves_commands_and_queries() {
    let desktop = VirtualDesktop::new(Some(SCREEN_HEIGHT));
    desktop.add_window(WindowSpec::new(1, 10, rect(0.0, 100.0, 500.0, 300.0)));
    desktop.add_window(WindowSpec::new(2, 10, rect(50.0, 150.0, 500.0, 300.0)));
    let handle = Reactor::spawn(Config::default(), desktop.platform());
    let sender = handle.sender();
    desktop.forward_notifications(move |n| sender.send(Event::WindowNotification(n)));

    handle.send(Event::Command(Command::CreateGroup { window: wid(1) }));
    handle.send(Event::Command(Command::AddWindow {
        window: wid(2),
        group: GroupSelector::Containing(wid(1)),
    }));

    let groups = handle.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].tabs.len(), 2);
    assert_eq!(handle.group_containing(wid(2)).map(|g| g.id), Some(groups[0].id));
    assert_eq!(handle.group_at(Point::new(100.0, 910.0)).map(|g| g.id), Some(groups[0].id));
    assert_eq!(handle.group_at(Point::new(100.0, 100.0)), None);

    desktop.destroy_window(wid(1));
    let groups = handle.groups();
    assert_eq!(groups[0].tabs.len(), 1);
    assert_eq!(groups[0].tabs[0].window_id, wid(2));

    handle.shutdown();
    assert!(!desktop.is_subscribed(wid(2)));
    assert_eq!(desktop.window(wid(2)).map(|w| w.frame), Some(rect(50.0, 150.0, 500.0, 300.0)));
    assert!(handle.groups().is_empty());
    assert_eq!(handle.tracker_state(), None);
}

#[test]
fn spawned_reactor_samples_unreported_moves_on_its_timer() {
    let desktop = VirtualDesktop::new(Some(SCREEN_HEIGHT));
    desktop.add_window(WindowSpec::new(1, 10, rect(0.0, 100.0, 500.0, 300.0)));
    let handle = Reactor::spawn(Config::default(), desktop.platform());
    let sender = handle.sender();
    desktop.forward_notifications(move |n| sender.send(Event::WindowNotification(n)));
    handle.send(Event::Command(Command::CreateGroup { window: wid(1) }));

    // A reported move while the button is held starts sampling.
    handle.send(Event::MouseDown(Point::new(10.0, 890.0)));
    desktop.move_window(wid(1), rect(10.0, 110.0, 500.0, 300.0));
    assert_eq!(handle.tracker_state(), Some(TrackerState::Armed));

    // Changing the rate mid-drag replaces the timer.
    let mut config = Config::default();
    config.settings.drag_tracker.refresh_rate_hz = 250.0;
    handle.send(Event::ConfigUpdated(Box::new(config)));

    let dragged = rect(80.0, 140.0, 500.0, 300.0);
    desktop.move_window_quietly(wid(1), dragged);
    assert!(
        eventually(|| handle.group_containing(wid(1)).map(|g| g.frame) == Some(dragged)),
        "group never followed the unreported move"
    );
    assert_eq!(handle.tracker_state(), Some(TrackerState::Armed));

    handle.send(Event::MouseUp(Point::new(90.0, 860.0)));
    assert!(
        eventually(|| handle.tracker_state() == Some(TrackerState::Idle)),
        "tracker kept sampling after the window settled"
    );
    assert_eq!(handle.groups()[0].frame, dragged);

    handle.shutdown();
}
