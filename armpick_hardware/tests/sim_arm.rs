use armpick_hardware::{SimulatedArm, SimulatedCamera, SimulatedDetector};
use armpick_traits::{Detector, FrameSource, ServoArm};
use rstest::rstest;

#[rstest]
#[case(1)]
#[case(6)]
fn joint_roundtrip_through_sim_bus(#[case] id: u8) {
    let mut arm = SimulatedArm::new();
    arm.set_joint(id, 77.5, 800).expect("valid joint");
    assert_eq!(arm.read_joint(id).expect("valid joint"), 77.5);
}

#[rstest]
fn sim_detector_jitter_fits_the_default_stability_tolerance() {
    // The stability gate matches detections within 20 px per axis; the sim
    // jitter must stay well inside that or sim sessions would never warm up.
    let mut cam = SimulatedCamera::new();
    let mut det = SimulatedDetector::new();

    let mut centres = Vec::new();
    for _ in 0..50 {
        let frame = cam.grab().expect("frame");
        let dets = det.detect(&frame).expect("detections");
        centres.push(dets[0].center());
    }
    for window in centres.windows(2) {
        let (ax, ay) = window[0];
        let (bx, by) = window[1];
        assert!((ax - bx).abs() < 20.0);
        assert!((ay - by).abs() < 20.0);
    }
}
