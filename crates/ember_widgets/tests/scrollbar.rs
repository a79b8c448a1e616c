mod common;

use common::{Clock, FRAME_MS};
use ember_animation::AnimationStatus;
use ember_core::{AxisDirection, TargetPlatform};
use ember_widgets::{
    ScrollMetrics, ScrollNotification, Scrollbar, ScrollbarConfig, ScrollbarFrame,
};

fn metrics(pixels: f32) -> ScrollMetrics {
    ScrollMetrics {
        pixels,
        min_scroll_extent: 0.0,
        max_scroll_extent: 1200.0,
        viewport_dimension: 400.0,
        axis_direction: AxisDirection::Down,
    }
}

fn scrollbar(clock: &Clock, platform: TargetPlatform) -> Scrollbar {
    Scrollbar::new(&clock.handle(), platform, ScrollbarConfig::default()).unwrap()
}

/// Move the clock to `ms` since the test began
fn at(clock: &mut Clock, ms: u64) {
    let now = clock.now_ms();
    clock.advance(ms - now);
}

#[test]
fn test_fade_in_then_out_after_idle() {
    let mut clock = Clock::new();
    let mut bar = scrollbar(&clock, TargetPlatform::Android);
    assert_eq!(bar.frame(), ScrollbarFrame::Hidden);

    let bubbled = bar
        .handle_scroll_notification(&ScrollNotification::Update(metrics(100.0)))
        .unwrap();
    assert!(!bubbled);
    assert_eq!(bar.controller().status(), AnimationStatus::Forward);
    assert!(bar.is_fade_out_pending());
    clock.frame();

    at(&mut clock, 150);
    let opacity = bar.opacity();
    assert!(opacity > 0.0 && opacity < 1.0);
    match bar.frame() {
        ScrollbarFrame::Thumb(thumb) => assert_eq!(thumb.opacity, opacity),
        other => panic!("expected thumb, got {other:?}"),
    }

    at(&mut clock, 300);
    assert_eq!(bar.opacity(), 1.0);
    assert_eq!(bar.controller().status(), AnimationStatus::Completed);

    at(&mut clock, 599);
    assert_eq!(bar.opacity(), 1.0);
    assert!(bar.is_fade_out_pending());

    at(&mut clock, 600);
    assert!(!bar.is_fade_out_pending());
    assert_eq!(bar.controller().status(), AnimationStatus::Reverse);

    at(&mut clock, 750);
    assert!(bar.opacity() < 1.0);

    at(&mut clock, 900);
    assert_eq!(bar.opacity(), 0.0);
    assert_eq!(bar.controller().status(), AnimationStatus::Dismissed);
    assert_eq!(bar.frame(), ScrollbarFrame::Hidden);
}

#[test]
fn test_each_update_restarts_idle_timer() {
    let mut clock = Clock::new();
    let mut bar = scrollbar(&clock, TargetPlatform::Linux);

    bar.handle_scroll_notification(&ScrollNotification::Update(metrics(0.0)))
        .unwrap();
    clock.frame();
    at(&mut clock, 400);
    bar.handle_scroll_notification(&ScrollNotification::Overscroll(metrics(-20.0)))
        .unwrap();
    assert_eq!(bar.controller().status(), AnimationStatus::Completed);

    at(&mut clock, 600);
    assert_eq!(bar.controller().status(), AnimationStatus::Completed);
    assert!(bar.is_fade_out_pending());

    at(&mut clock, 999);
    assert_eq!(bar.opacity(), 1.0);

    at(&mut clock, 1000);
    assert_eq!(bar.controller().status(), AnimationStatus::Reverse);
    clock.settle();
    assert_eq!(bar.opacity(), 0.0);
}

#[test]
fn test_scroll_during_fade_out_fades_back_in() {
    let mut clock = Clock::new();
    let mut bar = scrollbar(&clock, TargetPlatform::Windows);

    bar.handle_scroll_notification(&ScrollNotification::Update(metrics(50.0)))
        .unwrap();
    clock.frame();
    while clock.now_ms() < 700 {
        clock.advance(FRAME_MS);
    }
    assert_eq!(bar.controller().status(), AnimationStatus::Reverse);
    let fading = bar.opacity();
    assert!(fading < 1.0);

    bar.handle_scroll_notification(&ScrollNotification::Update(metrics(60.0)))
        .unwrap();
    assert_eq!(bar.controller().status(), AnimationStatus::Forward);
    clock.frame();
    clock.advance(FRAME_MS);
    assert!(bar.opacity() > fading);
    assert_eq!(bar.metrics(), Some(&metrics(60.0)));
}

#[test]
fn test_start_and_end_are_ignored() {
    let mut clock = Clock::new();
    let mut bar = scrollbar(&clock, TargetPlatform::Android);

    for notification in [
        ScrollNotification::Start(metrics(0.0)),
        ScrollNotification::End(metrics(0.0)),
    ] {
        assert!(!bar.handle_scroll_notification(&notification).unwrap());
    }
    assert!(!bar.is_fade_out_pending());
    assert_eq!(bar.controller().status(), AnimationStatus::Dismissed);
    assert!(bar.metrics().is_none());

    clock.settle();
    assert_eq!(bar.frame(), ScrollbarFrame::Hidden);
}

#[test]
fn test_native_platform_bypasses_fade() {
    let mut clock = Clock::new();
    let mut bar = scrollbar(&clock, TargetPlatform::Ios);

    assert!(!bar
        .handle_scroll_notification(&ScrollNotification::Update(metrics(100.0)))
        .unwrap());
    assert!(!bar.is_fade_out_pending());
    assert!(!bar.controller().is_animating());
    assert_eq!(bar.frame(), ScrollbarFrame::PlatformNative);

    clock.settle();
    assert_eq!(bar.opacity(), 0.0);
}

#[test]
fn test_switching_to_native_drops_fade() {
    let mut clock = Clock::new();
    let mut bar = scrollbar(&clock, TargetPlatform::Android);
    bar.handle_scroll_notification(&ScrollNotification::Update(metrics(100.0)))
        .unwrap();
    clock.frame();
    at(&mut clock, 100);

    bar.set_platform(TargetPlatform::Ios).unwrap();
    assert!(!bar.is_fade_out_pending());
    assert_eq!(bar.opacity(), 0.0);
    assert_eq!(bar.frame(), ScrollbarFrame::PlatformNative);

    bar.set_platform(TargetPlatform::Android).unwrap();
    assert_eq!(bar.frame(), ScrollbarFrame::Hidden);
    clock.settle();
    assert_eq!(bar.opacity(), 0.0);
}

#[test]
fn test_dropping_scrollbar_cancels_timer() {
    let mut clock = Clock::new();
    let mut bar = scrollbar(&clock, TargetPlatform::Android);
    bar.handle_scroll_notification(&ScrollNotification::Update(metrics(100.0)))
        .unwrap();
    drop(bar);

    clock.settle();
    assert!(!clock.scheduler.has_pending_work());
}
