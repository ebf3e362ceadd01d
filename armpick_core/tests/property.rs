use armpick_core::{
    DetectionStabilizer, GripperState, JointLimits, JointPose, SolverCfg, StabilizerCfg,
    WorkspaceBounds, WorkspacePoint,
};
use armpick_core::pose::solve;
use armpick_traits::Detection;
use proptest::prelude::*;

prop_compose! {
    fn arb_pose()(angles in prop::array::uniform6(-90.0f32..360.0)) -> JointPose {
        JointPose(angles)
    }
}

prop_compose! {
    fn arb_point()(
        x in -400.0f32..400.0,
        y in -100.0f32..500.0,
        z in -50.0f32..400.0,
    ) -> WorkspacePoint {
        WorkspacePoint::new(x, y, z)
    }
}

proptest! {
    #[test]
    fn clamp_is_idempotent(pose in arb_pose()) {
        let limits = JointLimits::default();
        let once = limits.clamp(pose);
        let twice = limits.clamp(once);
        prop_assert_eq!(once.0, twice.0);
        prop_assert!(limits.contains(&once));
    }

    #[test]
    fn bounds_verdict_matches_inequalities(p in arb_point()) {
        let b = WorkspaceBounds::default();
        let inside = p.x >= b.x_min && p.x <= b.x_max
            && p.y >= b.y_min && p.y <= b.y_max
            && p.z >= b.z_min && p.z <= b.z_max;
        prop_assert_eq!(b.validate(&p).is_ok(), inside);
    }

    #[test]
    fn solved_poses_respect_joint_limits(
        x in -140.0f32..140.0,
        y in 210.0f32..340.0,
        z in 50.0f32..240.0,
    ) {
        let limits = JointLimits::default();
        let cfg = SolverCfg::default();
        let target = WorkspacePoint::new(x, y, z);
        if let Ok(pose) = solve(&target, GripperState::Open, None, &cfg, &limits) {
            prop_assert!(limits.contains(&pose));
        }
    }

    #[test]
    fn stable_output_is_subset_of_current_frame(
        frames in prop::collection::vec(
            prop::collection::vec((0.0f32..600.0, 0.0f32..440.0), 0..4),
            1..20,
        ),
    ) {
        let mut gate = DetectionStabilizer::new(StabilizerCfg::default());
        for frame in frames {
            let dets: Vec<Detection> = frame
                .iter()
                .map(|&(x, y)| Detection { x, y, w: 40.0, h: 40.0, confidence: 0.8 })
                .collect();
            let stable = gate.observe(&dets);
            for s in &stable {
                prop_assert!(dets.iter().any(|d| d == s));
            }
        }
    }
}
