mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::Clock;
use ember_core::{Offset, Size, TextDirection};
use ember_widgets::{
    DismissDirection, DismissPhase, Dismissible, DismissibleConfig, DismissibleFrame,
    DragEndDetails, DragStartDetails, DragUpdateDetails, KeepAlive, ResizePhase, Velocity,
    DEFAULT_DISMISS_THRESHOLD, MIN_FLING_VELOCITY, MIN_FLING_VELOCITY_DELTA,
};

const WIDTH: f32 = 400.0;
const HEIGHT: f32 = 60.0;

struct Row {
    widget: Dismissible<&'static str>,
    dismissed: Rc<RefCell<Vec<DismissDirection>>>,
    resizes: Rc<Cell<u32>>,
}

fn row(clock: &Clock, config: DismissibleConfig) -> Row {
    let dismissed = Rc::new(RefCell::new(Vec::new()));
    let resizes = Rc::new(Cell::new(0));
    let (d, r) = (dismissed.clone(), resizes.clone());
    let widget = Dismissible::builder()
        .config(config)
        .background("delete")
        .size(Size::new(WIDTH, HEIGHT))
        .on_dismissed(move |direction| d.borrow_mut().push(direction))
        .on_resize(move || r.set(r.get() + 1))
        .debug_label("row")
        .build(&clock.handle())
        .unwrap();
    Row {
        widget,
        dismissed,
        resizes,
    }
}

fn swipe(widget: &Dismissible<&'static str>, delta: Offset, velocity: Velocity) {
    widget
        .handle_drag_start(DragStartDetails::default())
        .unwrap();
    widget
        .handle_drag_update(DragUpdateDetails::new(delta))
        .unwrap();
    widget
        .handle_drag_end(DragEndDetails::new(velocity))
        .unwrap();
}

// ============================================================================
// Snap-back
// ============================================================================

#[test]
fn test_short_drags_snap_back() {
    let below_threshold = WIDTH * DEFAULT_DISMISS_THRESHOLD - 1.0;
    for dx in [5.0, 40.0, 120.0, below_threshold, -5.0, -120.0, -below_threshold] {
        let mut clock = Clock::new();
        let row = row(&clock, DismissibleConfig::default());
        swipe(&row.widget, Offset::new(dx, 0.0), Velocity::new(100.0, 0.0));
        assert_eq!(row.widget.phase(), DismissPhase::SnappingBack, "dx={dx}");

        clock.settle();
        assert_eq!(row.widget.progress(), 0.0, "dx={dx}");
        assert_eq!(row.widget.phase(), DismissPhase::Idle, "dx={dx}");
        assert_eq!(row.widget.dismiss_direction(), DismissDirection::None, "dx={dx}");
        assert!(row.dismissed.borrow().is_empty(), "dx={dx}");
    }
}

#[test]
fn test_slow_fling_below_minimum_snaps_back() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(
        &row.widget,
        Offset::new(20.0, 0.0),
        Velocity::new(MIN_FLING_VELOCITY - 50.0, 0.0),
    );
    clock.settle();
    assert_eq!(row.widget.progress(), 0.0);
    assert!(row.dismissed.borrow().is_empty());
}

// ============================================================================
// Flings
// ============================================================================

#[test]
fn test_fling_dominant_axis_commits() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(20.0, 0.0), Velocity::new(800.0, 100.0));
    assert_eq!(row.widget.phase(), DismissPhase::Committing);

    clock.settle();
    assert_eq!(*row.dismissed.borrow(), vec![DismissDirection::StartToEnd]);
}

#[test]
fn test_fling_with_large_cross_velocity_is_not_a_fling() {
    assert!(750.0 - 500.0 < MIN_FLING_VELOCITY_DELTA);

    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(20.0, 0.0), Velocity::new(750.0, 500.0));
    assert_eq!(row.widget.phase(), DismissPhase::SnappingBack);

    clock.settle();
    assert_eq!(row.widget.progress(), 0.0);
    assert!(row.dismissed.borrow().is_empty());
}

#[test]
fn test_fling_against_drag_snaps_back() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(200.0, 0.0), Velocity::new(-900.0, 0.0));
    assert_eq!(row.widget.phase(), DismissPhase::SnappingBack);
    assert_eq!(row.widget.dismiss_direction(), DismissDirection::StartToEnd);

    clock.settle();
    assert_eq!(row.widget.progress(), 0.0);
    assert_eq!(row.widget.drag_extent(), 0.0);
    assert!(row.dismissed.borrow().is_empty());
}

#[test]
fn test_fling_follows_reading_direction() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    row.widget.set_text_direction(TextDirection::Rtl);
    swipe(&row.widget, Offset::new(20.0, 0.0), Velocity::new(1200.0, 0.0));

    clock.settle();
    assert_eq!(*row.dismissed.borrow(), vec![DismissDirection::EndToStart]);
}

// ============================================================================
// Disabled directions
// ============================================================================

#[test]
fn test_threshold_of_one_never_dismisses() {
    for threshold in [1.0, 1.5] {
        let config = DismissibleConfig::default().threshold(DismissDirection::StartToEnd, threshold);
        let gestures = [
            (Offset::new(300.0, 0.0), Velocity::ZERO),
            (Offset::new(WIDTH, 0.0), Velocity::ZERO),
            (Offset::new(20.0, 0.0), Velocity::new(2000.0, 0.0)),
            (Offset::new(WIDTH * 2.0, 0.0), Velocity::new(3000.0, 0.0)),
        ];
        for (delta, velocity) in gestures {
            let mut clock = Clock::new();
            let row = row(&clock, config.clone());
            swipe(&row.widget, delta, velocity);
            clock.settle();

            assert!(row.dismissed.borrow().is_empty(), "{delta:?} {velocity:?}");
            assert_eq!(row.widget.progress(), 0.0, "{delta:?} {velocity:?}");
        }
    }
}

#[test]
fn test_disabled_direction_leaves_other_direction_working() {
    let mut clock = Clock::new();
    let config = DismissibleConfig::default().threshold(DismissDirection::StartToEnd, 1.0);
    let row = row(&clock, config);
    swipe(&row.widget, Offset::new(-300.0, 0.0), Velocity::ZERO);
    clock.settle();
    assert_eq!(*row.dismissed.borrow(), vec![DismissDirection::EndToStart]);
}

// ============================================================================
// Commit and resize
// ============================================================================

#[test]
fn test_resize_timeline() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(300.0, 0.0), Velocity::ZERO);

    // Remaining quarter of the 200 ms move
    clock.frame();
    clock.advance(60);
    assert_eq!(row.widget.resize_phase(), ResizePhase::Resizing);
    assert_eq!(row.widget.resize_factor(), Some(1.0));

    // First resize frame starts the timeline
    clock.advance(16);
    let start = clock.now_ms();
    let sample = |clock: &mut Clock, at_ms: u64| {
        let now = clock.now_ms();
        clock.advance(start + at_ms - now);
        row.widget.resize_factor().unwrap()
    };

    assert_eq!(sample(&mut clock, 30), 1.0);
    assert_eq!(sample(&mut clock, 60), 1.0);
    assert_eq!(sample(&mut clock, 110), 1.0);
    assert!((sample(&mut clock, 120) - 1.0).abs() < 1e-4);
    let mid = sample(&mut clock, 210);
    assert!(mid > 0.0 && mid < 1.0);
    assert!(row.dismissed.borrow().is_empty());

    assert_eq!(sample(&mut clock, 300), 0.0);
    assert_eq!(row.widget.resize_phase(), ResizePhase::Done);
    assert_eq!(*row.dismissed.borrow(), vec![DismissDirection::StartToEnd]);
    assert!(row.resizes.get() >= 4);

    // Nothing more after completion
    clock.settle();
    assert_eq!(row.dismissed.borrow().len(), 1);
}

#[test]
fn test_collapsing_frame_keeps_prior_size() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(300.0, 0.0), Velocity::ZERO);
    clock.frame();
    clock.advance(60);

    row.widget.set_size(Size::new(WIDTH, 10.0));
    match row.widget.frame() {
        DismissibleFrame::Collapsing {
            size_factor,
            size,
            background,
            ..
        } => {
            assert_eq!(size_factor, 1.0);
            assert_eq!(size, Size::new(WIDTH, HEIGHT));
            assert_eq!(background, Some("delete"));
        }
        other => panic!("expected collapsing frame, got {other:?}"),
    }
}

#[test]
fn test_no_resize_duration_dismisses_on_move_completion() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default().resize_duration_ms(None));
    swipe(&row.widget, Offset::new(300.0, 0.0), Velocity::ZERO);
    clock.frame();
    clock.advance(60);

    assert_eq!(*row.dismissed.borrow(), vec![DismissDirection::StartToEnd]);
    assert_eq!(row.widget.resize_phase(), ResizePhase::None);
    assert_eq!(row.widget.phase(), DismissPhase::Dismissed);
}

#[test]
fn test_full_drag_commits_on_release() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(WIDTH + 50.0, 0.0), Velocity::ZERO);
    assert_eq!(row.widget.resize_phase(), ResizePhase::Resizing);
    clock.settle();
    assert_eq!(row.dismissed.borrow().len(), 1);
}

#[test]
#[should_panic(expected = "rendered after on_dismissed")]
fn test_render_after_dismissal_panics() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(20.0, 0.0), Velocity::new(1000.0, 0.0));
    clock.settle();
    assert_eq!(row.dismissed.borrow().len(), 1);

    let _ = row.widget.frame();
}

// ============================================================================
// Interruption
// ============================================================================

#[test]
fn test_drag_catches_animation_in_flight() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(120.0, 0.0), Velocity::ZERO);
    clock.frame();
    clock.advance(32);

    let before = match row.widget.frame() {
        DismissibleFrame::Sliding { translation, .. } => translation,
        other => panic!("unexpected frame {other:?}"),
    };
    assert!(before.x > 0.0 && before.x < 120.0);

    row.widget
        .handle_drag_start(DragStartDetails::default())
        .unwrap();
    assert_eq!(row.widget.phase(), DismissPhase::Dragging);
    assert!((row.widget.drag_extent() - before.x).abs() < 1e-3);

    clock.advance(16);
    match row.widget.frame() {
        DismissibleFrame::Sliding { translation, .. } => {
            assert!((translation.x - before.x).abs() < 1e-3)
        }
        other => panic!("unexpected frame {other:?}"),
    }

    // Continue the drag past the threshold and let go
    row.widget
        .handle_drag_update(DragUpdateDetails::new(Offset::new(200.0, 0.0)))
        .unwrap();
    row.widget
        .handle_drag_end(DragEndDetails::new(Velocity::ZERO))
        .unwrap();
    clock.settle();
    assert_eq!(row.dismissed.borrow().len(), 1);
}

#[test]
fn test_drag_catches_reverse_fling_on_same_side() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(200.0, 0.0), Velocity::new(-900.0, 0.0));
    clock.frame();
    clock.advance(16);

    let before = match row.widget.frame() {
        DismissibleFrame::Sliding { translation, .. } => translation,
        other => panic!("unexpected frame {other:?}"),
    };
    assert!(before.x > 0.0 && before.x < 200.0);

    row.widget
        .handle_drag_start(DragStartDetails::default())
        .unwrap();
    assert!((row.widget.drag_extent() - before.x).abs() < 1e-3);
    assert_eq!(row.widget.dismiss_direction(), DismissDirection::StartToEnd);
    match row.widget.frame() {
        DismissibleFrame::Sliding { translation, .. } => {
            assert!((translation.x - before.x).abs() < 1e-3)
        }
        other => panic!("unexpected frame {other:?}"),
    }
}

#[test]
fn test_input_ignored_while_resizing() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(300.0, 0.0), Velocity::ZERO);
    clock.frame();
    clock.advance(60);
    assert_eq!(row.widget.phase(), DismissPhase::Resizing);

    swipe(&row.widget, Offset::new(-300.0, 0.0), Velocity::ZERO);
    assert_eq!(row.widget.phase(), DismissPhase::Resizing);
    clock.settle();
    assert_eq!(*row.dismissed.borrow(), vec![DismissDirection::StartToEnd]);
}

// ============================================================================
// Vertical and keep-alive
// ============================================================================

#[test]
fn test_up_only_uses_secondary_background() {
    let mut clock = Clock::new();
    let dismissed = Rc::new(RefCell::new(Vec::new()));
    let sink = dismissed.clone();
    let card = Dismissible::builder()
        .config(DismissibleConfig::new(DismissDirection::Up))
        .background("archive")
        .secondary_background("delete")
        .size(Size::new(WIDTH, 200.0))
        .on_dismissed(move |direction| sink.borrow_mut().push(direction))
        .build(&clock.handle())
        .unwrap();

    card.handle_drag_start(DragStartDetails::default()).unwrap();
    card.handle_drag_update(DragUpdateDetails::new(Offset::new(0.0, 30.0)))
        .unwrap();
    assert_eq!(card.drag_extent(), 0.0);

    card.handle_drag_update(DragUpdateDetails::new(Offset::new(0.0, -150.0)))
        .unwrap();
    match card.frame() {
        DismissibleFrame::Sliding {
            slide, background, ..
        } => {
            assert!((slide.y + 0.75).abs() < 1e-6);
            assert_eq!(background, Some("delete"));
        }
        other => panic!("unexpected frame {other:?}"),
    }

    card.handle_drag_end(DragEndDetails::new(Velocity::ZERO))
        .unwrap();
    clock.settle();
    assert_eq!(*dismissed.borrow(), vec![DismissDirection::Up]);
}

#[test]
fn test_keep_alive_through_resize() {
    let mut clock = Clock::new();
    let row = row(&clock, DismissibleConfig::default());
    swipe(&row.widget, Offset::new(300.0, 0.0), Velocity::ZERO);
    assert!(row.widget.wants_keep_alive());

    clock.frame();
    clock.advance(60);
    assert!(row.widget.wants_keep_alive());

    clock.settle();
    assert!(!row.widget.wants_keep_alive());
}
