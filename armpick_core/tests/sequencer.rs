use std::time::Duration;

use armpick_core::mocks::{ArmCommand, RecordingArm};
use armpick_core::{
    CycleOutcome, PickError, PlacementMode, Sequencer, WorkspaceBounds, WorkspacePoint, ZoneCfg,
    ZonePolicy,
};
use armpick_traits::Detection;
use armpick_traits::clock::ManualClock;

/// Detection whose centre lands on the middle of a 640x480 frame, which the
/// default mapping sends to (0, 275) with the table surface at z = 50.
fn centre_target() -> Detection {
    Detection {
        x: 300.0,
        y: 220.0,
        w: 40.0,
        h: 40.0,
        confidence: 0.9,
    }
}

fn tower_mode() -> PlacementMode {
    PlacementMode::Tower {
        base: WorkspacePoint::new(0.0, 250.0, 50.0),
        cup_height: 12.0,
    }
}

fn build(arm: RecordingArm, mode: PlacementMode) -> Sequencer {
    Sequencer::builder()
        .with_arm(arm)
        .with_placement(mode)
        .with_clock(Box::new(ManualClock::new()))
        .build()
        .expect("build sequencer")
}

#[test]
fn tower_placement_climbs_by_cup_height() {
    let arm = RecordingArm::new();
    let mut seq = build(arm, tower_mode());
    let target = centre_target();

    let mut heights = Vec::new();
    for _ in 0..3 {
        match seq.run_cycle(&target).expect("cycle ok") {
            CycleOutcome::Placed { placement } => heights.push(placement.z),
            other => panic!("expected placement, got {other:?}"),
        }
    }

    assert_eq!(heights, vec![50.0, 62.0, 74.0]);
    let ledger = seq.ledger_snapshot();
    assert_eq!(ledger.placed_count, 3);
    assert_eq!(ledger.stack_height, 36.0);
    assert!(!seq.is_busy());
}

#[test]
fn successful_cycle_issues_expected_command_shape() {
    let arm = RecordingArm::new();
    let log = arm.log();
    let mut seq = build(arm, tower_mode());

    let outcome = seq.run_cycle(&centre_target()).expect("cycle ok");
    assert!(outcome.is_placed());

    let log = log.lock().unwrap();
    // 9 full-pose moves (two HOMEs bracket the cycle) and 3 gripper moves
    // (open on approach, close to grasp, open to release).
    let joints = log
        .iter()
        .filter(|c| matches!(c, ArmCommand::Joints { .. }))
        .count();
    let grips = log
        .iter()
        .filter(|c| matches!(c, ArmCommand::Joint { id: 6, .. }))
        .count();
    assert_eq!(joints, 9);
    assert_eq!(grips, 3);
    // First command is the HOME pose, not a grasp.
    assert!(matches!(log[0], ArmCommand::Joints { .. }));
}

#[test]
fn out_of_bounds_source_fails_and_recovers_without_touching_ledger() {
    let arm = RecordingArm::new();
    let log = arm.log();
    // Shrink the cuboid so the mapped source point (y = 275) is outside.
    let bounds = WorkspaceBounds {
        y_max: 260.0,
        y_min: 100.0,
        ..WorkspaceBounds::default()
    };
    let mut seq = Sequencer::builder()
        .with_arm(arm)
        .with_placement(PlacementMode::Tower {
            base: WorkspacePoint::new(0.0, 250.0, 50.0),
            cup_height: 12.0,
        })
        .with_bounds(bounds)
        .with_clock(Box::new(ManualClock::new()))
        .build()
        .expect("build sequencer");

    match seq.run_cycle(&centre_target()).expect("cycle ok") {
        CycleOutcome::Failed {
            reason: PickError::OutOfBounds { y, .. },
        } => assert_eq!(y, 275.0),
        other => panic!("expected out-of-bounds failure, got {other:?}"),
    }

    assert_eq!(seq.ledger_snapshot().placed_count, 0);

    // The fault fired before any cycle motion, so the log holds exactly the
    // two-step recovery: gripper open, safe pose, home pose.
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 3);
    match &log[0] {
        ArmCommand::Joint { id: 6, angle_deg, .. } => assert_eq!(*angle_deg, 180.0),
        other => panic!("expected gripper open first, got {other:?}"),
    }
    match &log[1] {
        ArmCommand::Joints { angles_deg, .. } => {
            assert_eq!(&angles_deg[..5], &[90.0, 40.0, 50.0, 90.0, 90.0]);
        }
        other => panic!("expected safe pose second, got {other:?}"),
    }
    match &log[2] {
        ArmCommand::Joints { angles_deg, .. } => {
            assert_eq!(&angles_deg[..5], &[90.0; 5]);
        }
        other => panic!("expected home pose last, got {other:?}"),
    }
}

#[test]
fn slot_exhaustion_fails_with_zero_motion() {
    let arm = RecordingArm::new();
    let log = arm.log();
    let mut seq = build(
        arm,
        PlacementMode::Slot {
            slots: vec![WorkspacePoint::new(-50.0, 250.0, 50.0)],
        },
    );
    let target = centre_target();

    assert!(seq.run_cycle(&target).expect("cycle ok").is_placed());
    let commands_after_first = log.lock().unwrap().len();

    match seq.run_cycle(&target).expect("cycle ok") {
        CycleOutcome::Failed {
            reason: PickError::NoSlotsRemaining,
        } => {}
        other => panic!("expected slot exhaustion, got {other:?}"),
    }

    // Exhaustion is detected before any command goes out, and no recovery
    // runs for it either.
    assert_eq!(log.lock().unwrap().len(), commands_after_first);
    let ledger = seq.ledger_snapshot();
    assert_eq!(ledger.placed_count, 1);
    assert_eq!(ledger.next_slot_index, 1);
}

#[test]
fn zone_at_capacity_fails_without_mutating_counts() {
    let arm = RecordingArm::new();
    let mut seq = build(
        arm,
        PlacementMode::Zone {
            zones: vec![ZoneCfg {
                id: "left".into(),
                position: WorkspacePoint::new(-100.0, 250.0, 50.0),
                capacity: 1,
            }],
            policy: ZonePolicy::RoundRobin,
        },
    );
    let target = centre_target();

    assert!(seq.run_cycle(&target).expect("cycle ok").is_placed());
    match seq.run_cycle(&target).expect("cycle ok") {
        CycleOutcome::Failed {
            reason: PickError::ZoneFull(zone),
        } => assert_eq!(zone, "left"),
        other => panic!("expected full zone, got {other:?}"),
    }

    let ledger = seq.ledger_snapshot();
    assert_eq!(ledger.placed_count, 1);
    assert_eq!(ledger.zone_counts.get("left"), Some(&1));
}

#[test]
fn transport_fault_is_fatal_after_best_effort_recovery() {
    // First set_joints call (the opening HOME move) blows up.
    let arm = RecordingArm::new().fail_on_joints_call(1);
    let log = arm.log();
    let mut seq = build(arm, tower_mode());

    let err = seq.run_cycle(&centre_target()).expect_err("fatal fault");
    let pick = err.downcast_ref::<PickError>().expect("typed error");
    assert!(matches!(pick, PickError::Transport(_)));

    // Recovery still ran: the gripper-open command made it into the log.
    let log = log.lock().unwrap();
    assert!(
        log.iter()
            .any(|c| matches!(c, ArmCommand::Joint { id: 6, .. }))
    );
    assert_eq!(seq.ledger_snapshot().placed_count, 0);
}

#[test]
fn dwells_accumulate_on_the_injected_clock() {
    let clock = ManualClock::new();
    let handle = clock.clone();
    let mut seq = Sequencer::builder()
        .with_arm(RecordingArm::new())
        .with_placement(tower_mode())
        .with_clock(Box::new(clock))
        .build()
        .expect("build sequencer");

    assert!(seq.run_cycle(&centre_target()).expect("cycle ok").is_placed());

    // Every full-pose move dwells at least min_move + settle_pad (1 s with
    // defaults) and each of the three gripper commands settles for 1 s.
    assert!(handle.elapsed() >= Duration::from_secs(12));
}

#[test]
fn direct_recover_returns_arm_home() {
    let arm = RecordingArm::new();
    let log = arm.log();
    let mut seq = build(arm, tower_mode());

    seq.recover().expect("recovery ok");

    assert_eq!(seq.current_pose().0[..5], [90.0; 5]);
    assert_eq!(log.lock().unwrap().len(), 3);
}
