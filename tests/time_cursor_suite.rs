use fxloop::time_cursor::{
    FINE_SCRUB_STEP, InputSnapshot, NEAR_END, SCRUB_STEP, TimeCursor, apply_input, fold,
};
use std::time::{Duration, Instant};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── fold ───────────────────────────────────────────────────────────────────

#[test]
fn fold_examples() {
    assert!(close(fold(-0.1), 0.9));
    assert!(close(fold(2.25), 0.25));
    assert_eq!(fold(1.0), 0.0);
    assert_eq!(fold(0.0), 0.0);
    assert!(close(fold(-3.75), 0.25));
}

#[test]
fn fold_stays_in_unit_interval() {
    let mut rng = fastrand::Rng::with_seed(7);
    for _ in 0..10_000 {
        let t = (rng.f64() - 0.5) * 1e6;
        let f = fold(t);
        assert!((0.0..1.0).contains(&f), "fold({t}) = {f}");
    }
}

// ── wall clock ─────────────────────────────────────────────────────────────

#[test]
fn raw_time_follows_the_cycle() {
    let start = Instant::now();
    let mut cursor = TimeCursor::with_start(start, Duration::from_secs(10));
    let t = cursor.advance(start + Duration::from_secs(3), &InputSnapshot::default());
    assert!(close(t, 0.3));
    let t = cursor.advance(start + Duration::from_secs(12), &InputSnapshot::default());
    assert!(close(t, 0.2));
    assert!(close(cursor.last_rendered_t(), 0.2));
}

#[test]
fn restart_rebases_the_clock() {
    let start = Instant::now();
    let mut cursor = TimeCursor::with_start(start, Duration::from_secs(10));
    cursor.restart(start + Duration::from_secs(5));
    let t = cursor.advance(start + Duration::from_secs(6), &InputSnapshot::default());
    assert!(close(t, 0.1));
}

// ── overrides ──────────────────────────────────────────────────────────────

#[test]
fn digit_pins_tenths() {
    let start = Instant::now();
    let mut cursor = TimeCursor::with_start(start, Duration::from_secs(10));
    let press = InputSnapshot {
        digit: Some(7),
        ..Default::default()
    };
    assert!(close(cursor.advance(start, &press), 0.7));
    // The pin holds while the clock moves on.
    let later = start + Duration::from_secs(4);
    assert!(close(cursor.advance(later, &InputSnapshot::default()), 0.7));
    assert_eq!(cursor.pinned(), Some(0.7));
}

#[test]
fn near_end_key_pins_just_before_wrap() {
    let pinned = apply_input(
        &InputSnapshot {
            near_end: true,
            ..Default::default()
        },
        None,
        0.0,
    );
    assert_eq!(pinned, Some(NEAR_END));
}

#[test]
fn digit_beats_scrub_in_the_same_frame() {
    let input = InputSnapshot {
        digit: Some(2),
        right: true,
        ..Default::default()
    };
    assert_eq!(apply_input(&input, Some(0.9), 0.9), Some(0.2));
}

#[test]
fn right_held_scrubs_forward_each_frame() {
    let start = Instant::now();
    let mut cursor = TimeCursor::with_start(start, Duration::from_secs(10));
    cursor.set_override(Some(0.5));
    cursor.advance(start, &InputSnapshot::default());
    let held = InputSnapshot {
        right: true,
        ..Default::default()
    };
    let mut t = 0.5;
    for frame in 1..=5 {
        let next = cursor.advance(start + Duration::from_millis(frame * 16), &held);
        assert!(close(next - t, SCRUB_STEP), "frame {frame}: {t} -> {next}");
        t = next;
    }
}

#[test]
fn shift_makes_the_scrub_finer() {
    let input = InputSnapshot {
        right: true,
        shift: true,
        ..Default::default()
    };
    let next = apply_input(&input, None, 0.5).unwrap();
    assert!(close(next - 0.5, FINE_SCRUB_STEP));
    assert!(close(FINE_SCRUB_STEP, 1.0 / 10_000.0));
}

#[test]
fn left_scrub_wraps_below_zero() {
    let start = Instant::now();
    let mut cursor = TimeCursor::with_start(start, Duration::from_secs(10));
    let left = InputSnapshot {
        left: true,
        ..Default::default()
    };
    let t = cursor.advance(start, &left);
    assert!(close(t, 1.0 - SCRUB_STEP));
}

#[test]
fn freeze_toggles() {
    let start = Instant::now();
    let mut cursor = TimeCursor::with_start(start, Duration::from_secs(10));
    let toggle = InputSnapshot {
        toggle_freeze: true,
        ..Default::default()
    };
    cursor.advance(start + Duration::from_secs(2), &InputSnapshot::default());
    let frozen = cursor.advance(start + Duration::from_secs(3), &toggle);
    assert!(close(frozen, 0.2));
    let still = cursor.advance(start + Duration::from_secs(5), &InputSnapshot::default());
    assert!(close(still, 0.2));
    let running = cursor.advance(start + Duration::from_secs(6), &toggle);
    assert!(close(running, 0.6));
    assert_eq!(cursor.pinned(), None);
}
