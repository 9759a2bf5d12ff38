use pretty_assertions::assert_eq;

use super::engine::{EngineId, GestureCoordinator, NavEvent, ScrollEvent};
use crate::common::config::GestureSettings;

const WIDTH: f64 = 1000.0;
const FRAME: f64 = 1.0 / 60.0;

fn coordinator() -> GestureCoordinator {
    GestureCoordinator::new(GestureSettings::default())
}

/// Feeds `steps` changed events totalling `total_px`, each at `px_per_sec`.
fn drag(
    coordinator: &mut GestureCoordinator,
    id: EngineId,
    total_px: f64,
    px_per_sec: f64,
    steps: usize,
) {
    let dx = total_px / steps as f64;
    let dt = dx.abs() / px_per_sec;
    for _ in 0..steps {
        let _ = coordinator.handle_scroll(id, ScrollEvent::changed(dx, dt));
    }
}

fn last_offset(events: &[(EngineId, NavEvent)], id: EngineId) -> Option<(usize, f64)> {
    events.iter().rev().find_map(|(e, ev)| match ev {
        NavEvent::OffsetChanged { base_index, offset } if *e == id => Some((*base_index, *offset)),
        _ => None,
    })
}

/// Ticks until the engine goes idle, returning the committed index if one
/// fired. Panics if the settle never lands.
fn settle(coordinator: &mut GestureCoordinator, id: EngineId) -> (Option<usize>, usize) {
    let mut committed = None;
    for ticks in 1..=2000 {
        let response = coordinator.tick(FRAME);
        for event in response.for_engine(id) {
            if let NavEvent::IndexCommitted { index } = event {
                committed = Some(*index);
            }
        }
        if coordinator.is_idle(id) {
            return (committed, ticks);
        }
    }
    panic!("settle did not finish within 2000 ticks");
}

mod commit_decision {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test_log::test]
    fn fast_flick_commits_on_velocity_not_position() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        // 0.3 host widths of travel at 600 px/s: under the drag threshold,
        // over the flick threshold.
        drag(&mut coordinator, id, 300.0, 600.0, 10);
        let response = coordinator.handle_scroll(id, ScrollEvent::ended());

        assert!(response
            .for_engine(id)
            .any(|e| matches!(e, NavEvent::GestureEnded { committed: true })));
        let (committed, _) = settle(&mut coordinator, id);
        assert_eq!(committed, Some(0));
        assert_eq!(coordinator.active_index(id), Some(0));
    }

    #[test]
    fn slow_short_drag_reverts() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 200.0, 100.0, 10);
        let response = coordinator.handle_scroll(id, ScrollEvent::ended());

        assert!(response
            .for_engine(id)
            .any(|e| matches!(e, NavEvent::GestureEnded { committed: false })));
        let (committed, _) = settle(&mut coordinator, id);
        assert_eq!(committed, None);
        assert_eq!(coordinator.active_index(id), Some(1));
    }

    #[test]
    fn slow_long_drag_commits_on_position() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 600.0, 100.0, 12);
        let _ = coordinator.handle_scroll(id, ScrollEvent::ended());

        let (committed, _) = settle(&mut coordinator, id);
        assert_eq!(committed, Some(0));
    }

    #[test]
    fn negative_drag_commits_toward_higher_index() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, -600.0, 100.0, 12);
        let _ = coordinator.handle_scroll(id, ScrollEvent::ended());

        let (committed, _) = settle(&mut coordinator, id);
        assert_eq!(committed, Some(2));
    }

    #[test]
    fn huge_drag_still_commits_a_single_step() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 2, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 2700.0, 100.0, 27);
        let _ = coordinator.handle_scroll(id, ScrollEvent::ended());

        let (committed, _) = settle(&mut coordinator, id);
        assert_eq!(committed, Some(1));
    }

    #[test]
    fn flick_at_edge_does_not_commit() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 0, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 300.0, 600.0, 10);
        let response = coordinator.handle_scroll(id, ScrollEvent::ended());

        assert!(response
            .for_engine(id)
            .any(|e| matches!(e, NavEvent::GestureEnded { committed: false })));
        let (committed, _) = settle(&mut coordinator, id);
        assert_eq!(committed, None);
        assert_eq!(coordinator.active_index(id), Some(0));
    }

    #[test]
    fn cancellation_reverts_to_committed_state() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 700.0, 800.0, 10);
        let response = coordinator.handle_scroll(id, ScrollEvent::cancelled());

        assert!(response
            .for_engine(id)
            .any(|e| matches!(e, NavEvent::GestureEnded { committed: false })));
        let (committed, _) = settle(&mut coordinator, id);
        assert_eq!(committed, None);
        assert_eq!(coordinator.active_index(id), Some(1));
    }
}

mod offsets_and_resistance {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn in_bounds_drag_maps_one_to_one() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        let response = coordinator.handle_scroll(id, ScrollEvent::changed(250.0, 0.016));

        let (base, offset) = last_offset(&response.events, id).expect("offset event");
        assert_eq!(base, 1);
        assert!((offset - 250.0).abs() < 1e-9);
    }

    #[test]
    fn drag_past_edge_is_rubber_banded() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 0, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        let response = coordinator.handle_scroll(id, ScrollEvent::changed(500.0, 0.016));

        let (_, offset) = last_offset(&response.events, id).expect("offset event");
        assert!(offset > 0.0);
        assert!(offset < 500.0, "edge travel must be sub-linear, got {offset}");
        // Asymptotic bound: dimension / coefficient host widths.
        assert!(offset < WIDTH / 0.55);
    }

    #[test]
    fn harder_pushes_yield_diminishing_travel() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(2, 0, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        let first = coordinator.handle_scroll(id, ScrollEvent::changed(300.0, 0.016));
        let (_, offset_a) = last_offset(&first.events, id).unwrap();
        let second = coordinator.handle_scroll(id, ScrollEvent::changed(300.0, 0.016));
        let (_, offset_b) = last_offset(&second.events, id).unwrap();

        let gained = offset_b - offset_a;
        assert!(gained > 0.0);
        assert!(gained < offset_a, "second push must travel less than the first");
    }

    #[test]
    fn new_gesture_adopts_settle_offset_without_a_jump() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 600.0, 100.0, 6);
        let _ = coordinator.handle_scroll(id, ScrollEvent::ended());

        // Part-way through the settle toward index 0.
        let mut settle_offset = None;
        for _ in 0..5 {
            let response = coordinator.tick(FRAME);
            settle_offset = last_offset(&response.events, id);
        }
        let (settle_base, settle_px) = settle_offset.expect("still settling");
        assert_eq!(settle_base, 0);
        assert!(!coordinator.is_idle(id));

        let response = coordinator.handle_scroll(id, ScrollEvent::began());
        let (begin_base, begin_px) = last_offset(&response.events, id).expect("offset event");

        // Index 0 never committed, so the gesture restarts in index 1's
        // coordinate; the same visual position is one full width away.
        assert_eq!(begin_base, 1);
        assert!((begin_px - (WIDTH + settle_px)).abs() < 1e-6);
    }

    #[test]
    fn offset_events_carry_no_velocity() {
        // Indicator feedback is position-only by construction; this pins
        // the event shape so velocity cannot sneak in.
        let mut coordinator = coordinator();
        let id = coordinator.register_host(2, 0, WIDTH, None);
        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        let response = coordinator.handle_scroll(id, ScrollEvent::changed(-100.0, 0.016));
        for event in response.for_engine(id) {
            match event {
                NavEvent::OffsetChanged { .. } => {}
                other => panic!("unexpected event during drag: {other:?}"),
            }
        }
    }
}

mod settling {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn settle_ends_exactly_on_target() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 600.0, 100.0, 6);
        let _ = coordinator.handle_scroll(id, ScrollEvent::ended());

        let mut final_offset = None;
        for _ in 0..2000 {
            let response = coordinator.tick(FRAME);
            if let Some(pair) = last_offset(&response.events, id) {
                final_offset = Some(pair);
            }
            if coordinator.is_idle(id) {
                break;
            }
        }
        assert_eq!(final_offset, Some((0, 0.0)), "must snap exactly to the target");
    }

    #[test]
    fn slow_motion_stretches_settle_but_not_tracking() {
        let ticks_to_commit = |slow: bool| {
            let settings = GestureSettings { slow_motion: slow, ..GestureSettings::default() };
            let mut coordinator = GestureCoordinator::new(settings);
            let id = coordinator.register_host(3, 1, WIDTH, None);
            let _ = coordinator.handle_scroll(id, ScrollEvent::began());

            // Tracking is never time-scaled: the same drag lands on the
            // same offset regardless of the debug flag.
            let response = coordinator.handle_scroll(id, ScrollEvent::changed(600.0, 0.1));
            let (_, offset) = last_offset(&response.events, id).unwrap();
            assert!((offset - 600.0).abs() < 1e-9);

            let _ = coordinator.handle_scroll(id, ScrollEvent::ended());
            let (committed, ticks) = settle(&mut coordinator, id);
            assert_eq!(committed, Some(0));
            ticks
        };

        let normal = ticks_to_commit(false);
        let slowed = ticks_to_commit(true);
        assert!(
            slowed > normal * 5,
            "slow motion should stretch settling, got {normal} vs {slowed}"
        );
    }

    #[test]
    fn tick_without_gesture_is_silent() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);
        let response = coordinator.tick(FRAME);
        assert!(response.is_empty());
        assert!(coordinator.is_idle(id));
    }
}

mod bubbling {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nested() -> (GestureCoordinator, EngineId, EngineId) {
        let mut coordinator = coordinator();
        let parent = coordinator.register_host(3, 1, WIDTH, None);
        let child = coordinator.register_host(2, 0, WIDTH, Some(parent));
        (coordinator, parent, child)
    }

    #[test]
    fn edge_gesture_forwards_to_parent() {
        let (mut coordinator, parent, child) = nested();

        let _ = coordinator.handle_scroll(child, ScrollEvent::began());
        // Child sits at its first stage; leftward travel has nowhere to go.
        let response = coordinator.handle_scroll(child, ScrollEvent::changed(200.0, 0.016));

        assert!(response
            .for_engine(child)
            .any(|e| matches!(e, NavEvent::BubbledToParent)));
        // Child pinned at its edge, no rubber banding locally.
        let (_, child_offset) = last_offset(
            &response
                .events
                .iter()
                .filter(|(id, _)| *id == child)
                .cloned()
                .collect::<Vec<_>>(),
            child,
        )
        .unwrap();
        assert_eq!(child_offset, 0.0);
        // Parent picked the motion up.
        let parent_offset = last_offset(&response.events, parent);
        assert!(parent_offset.is_some());
    }

    #[test_log::test]
    fn parent_commits_bubbled_gesture() {
        let (mut coordinator, parent, child) = nested();

        let _ = coordinator.handle_scroll(child, ScrollEvent::began());
        for _ in 0..12 {
            let _ = coordinator.handle_scroll(child, ScrollEvent::changed(50.0, 0.5));
        }
        let _ = coordinator.handle_scroll(child, ScrollEvent::ended());

        let (committed, _) = settle(&mut coordinator, parent);
        assert_eq!(committed, Some(0));
        assert_eq!(coordinator.active_index(child), Some(0));
    }

    #[test]
    fn reversal_returns_the_gesture_to_the_child() {
        let (mut coordinator, parent, child) = nested();

        let _ = coordinator.handle_scroll(child, ScrollEvent::began());
        let _ = coordinator.handle_scroll(child, ScrollEvent::changed(200.0, 0.016));
        assert!(!coordinator.is_idle(parent));

        // Reverse: the parent is told the nested gesture ended and the
        // child resumes from its edge.
        let response = coordinator.handle_scroll(child, ScrollEvent::changed(-300.0, 0.016));

        let (base, offset) = last_offset(&response.events, child).expect("child offset");
        assert_eq!(base, 0);
        assert!((offset - (-300.0)).abs() < 1e-9, "no double-counted motion, got {offset}");
        assert!(response
            .for_engine(parent)
            .any(|e| matches!(e, NavEvent::GestureEnded { .. })));
    }

    #[test]
    fn without_a_parent_the_edge_rubber_bands_instead() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(2, 0, WIDTH, None);

        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        let response = coordinator.handle_scroll(id, ScrollEvent::changed(200.0, 0.016));

        assert!(!response.for_engine(id).any(|e| matches!(e, NavEvent::BubbledToParent)));
        let (_, offset) = last_offset(&response.events, id).unwrap();
        assert!(offset > 0.0 && offset < 200.0);
    }

    #[test]
    fn removing_parent_detaches_children() {
        let (mut coordinator, parent, child) = nested();
        coordinator.remove_host(parent);

        let _ = coordinator.handle_scroll(child, ScrollEvent::began());
        let response = coordinator.handle_scroll(child, ScrollEvent::changed(200.0, 0.016));
        assert!(!response.for_engine(child).any(|e| matches!(e, NavEvent::BubbledToParent)));
    }
}

mod host_sync {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sync_clamps_active_index() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(5, 4, WIDTH, None);
        coordinator.sync_host(id, 2, 4);
        assert_eq!(coordinator.active_index(id), Some(1));
        assert!(coordinator.is_idle(id));
    }

    #[test]
    fn sync_abandons_in_flight_settle() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, WIDTH, None);
        let _ = coordinator.handle_scroll(id, ScrollEvent::began());
        drag(&mut coordinator, id, 600.0, 100.0, 6);
        let _ = coordinator.handle_scroll(id, ScrollEvent::ended());
        assert!(!coordinator.is_idle(id));

        coordinator.sync_host(id, 3, 2);
        assert!(coordinator.is_idle(id));
        assert_eq!(coordinator.active_index(id), Some(2));
        assert!(coordinator.tick(FRAME).is_empty());
    }

    #[test]
    fn zero_width_host_ignores_input() {
        let mut coordinator = coordinator();
        let id = coordinator.register_host(3, 1, 0.0, None);
        let response = coordinator.handle_scroll(id, ScrollEvent::changed(100.0, 0.016));
        assert!(response.is_empty());
    }
}
