//! Detection feed buffering and thread lifecycle.
//!
//! Verifies that:
//! - Frames captured while the consumer is away stay buffered, in order
//! - The buffered frames keep the stability history warm across a cycle
//! - The feed thread exits cleanly when the feed is dropped

use std::time::Duration;

use armpick_core::feed::DetectionFeed;
use armpick_core::mocks::{ScriptedDetector, StaticCamera};
use armpick_core::{DetectionStabilizer, StabilizerCfg};
use armpick_traits::Detection;
use armpick_traits::clock::MonotonicClock;

/// Centres drift 1 px per frame: distinct frames, all within the default
/// 20 px tolerance of each other's neighbours.
fn drifting_script(n: usize) -> Vec<Vec<Detection>> {
    (0..n)
        .map(|i| {
            vec![Detection {
                x: 300.0 + i as f32,
                y: 220.0,
                w: 40.0,
                h: 40.0,
                confidence: 0.9,
            }]
        })
        .collect()
}

#[test]
fn frames_captured_while_the_consumer_is_busy_are_kept() {
    let feed = DetectionFeed::spawn(
        StaticCamera::default(),
        ScriptedDetector::new(drifting_script(64)),
        100,
        MonotonicClock::new(),
    );

    // Nobody drains while a pick cycle would be holding the arm.
    std::thread::sleep(Duration::from_millis(150));

    let reports = feed.drain();
    assert!(
        reports.len() >= 3,
        "only {} reports buffered",
        reports.len()
    );

    // The buffer must hold the individual frames, not just the latest one.
    let mut xs: Vec<i64> = reports
        .iter()
        .filter_map(|r| r.detections.first())
        .map(|d| d.x as i64)
        .collect();
    xs.dedup();
    assert!(xs.len() >= 3, "drained frames are not distinct: {xs:?}");

    // Replaying the backlog warms the gate, so a stable target is available
    // as soon as the cycle ends instead of a full history later.
    let mut gate = DetectionStabilizer::new(StabilizerCfg {
        history_size: 3,
        stability_threshold: 2,
        pixel_tolerance: 20.0,
    });
    let mut stable = Vec::new();
    for r in &reports {
        stable = gate.observe(&r.detections);
    }
    assert_eq!(stable.len(), 1);
}

#[test]
fn feed_thread_exits_on_drop() {
    let feed = DetectionFeed::spawn(
        StaticCamera::default(),
        ScriptedDetector::new(vec![vec![]]),
        50,
        MonotonicClock::new(),
    );

    std::thread::sleep(Duration::from_millis(40));

    // Drop joins the worker; the test passes if this returns promptly.
    drop(feed);
}
