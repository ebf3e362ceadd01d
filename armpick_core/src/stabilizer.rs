//! Detection stabilizer: turns noisy per-frame detections into targets that
//! have held still long enough to act on.
//!
//! The arm commits to a multi-second open-loop motion once it starts a
//! cycle, so a single-frame detection is never trusted. A detection becomes
//! a stable target only after its centre has stayed within a pixel tolerance
//! across enough recent frames.

use std::collections::VecDeque;

use armpick_traits::Detection;

use crate::config::StabilizerCfg;

/// Bounded history of recent detection frames plus the stability check.
///
/// Deterministic: the same history and tolerance always produce the same
/// stable set. The only side effect of `observe` is the history buffer.
///
/// Support is counted over the previous frames, never the current one, so a
/// `stability_threshold` at or above `history_size` is unsatisfiable; the
/// session runner and the TOML validation both reject such a config.
#[derive(Debug)]
pub struct DetectionStabilizer {
    cfg: StabilizerCfg,
    history: VecDeque<Vec<Detection>>,
}

impl DetectionStabilizer {
    pub fn new(cfg: StabilizerCfg) -> Self {
        let cap = cfg.history_size.max(1);
        Self {
            cfg,
            history: VecDeque::with_capacity(cap),
        }
    }

    /// Append one frame of detections and return the current-frame subset
    /// that is stable.
    ///
    /// Cold start: until `history_size` frames have been observed the result
    /// is empty, no matter how consistent the detections are. Two stable
    /// detections whose centres drift within tolerance of each other are
    /// reported as two targets; merging is deliberately not done here.
    pub fn observe(&mut self, detections: &[Detection]) -> Vec<Detection> {
        let cap = self.cfg.history_size.max(1);
        self.history.push_back(detections.to_vec());
        while self.history.len() > cap {
            self.history.pop_front();
        }

        if self.history.len() < cap {
            return Vec::new();
        }

        let current = self
            .history
            .back()
            .map(|f| f.as_slice())
            .unwrap_or_default();
        let stable: Vec<Detection> = current
            .iter()
            .filter(|d| self.support_for(d) >= self.cfg.stability_threshold)
            .copied()
            .collect();
        if !stable.is_empty() {
            tracing::debug!(
                candidates = current.len(),
                stable = stable.len(),
                "stable targets"
            );
        }
        stable
    }

    /// Number of previous frames containing a detection whose centre lies
    /// within the pixel tolerance of `det` (per-axis, matching the original
    /// firmware's check).
    fn support_for(&self, det: &Detection) -> usize {
        let (cx, cy) = det.center();
        let tol = self.cfg.pixel_tolerance;
        let n = self.history.len();
        self.history
            .iter()
            .take(n.saturating_sub(1))
            .filter(|frame| {
                frame.iter().any(|d| {
                    let (px, py) = d.center();
                    (px - cx).abs() <= tol && (py - cy).abs() <= tol
                })
            })
            .count()
    }

    /// Frames observed so far (saturates at `history_size`).
    pub fn warmth(&self) -> usize {
        self.history.len()
    }

    pub fn cfg(&self) -> &StabilizerCfg {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32) -> Detection {
        // Centre lands on (x, y): boxes are 40x40 with top-left offset.
        Detection {
            x: x - 20.0,
            y: y - 20.0,
            w: 40.0,
            h: 40.0,
            confidence: 0.9,
        }
    }

    fn cfg(history: usize, threshold: usize) -> StabilizerCfg {
        StabilizerCfg {
            history_size: history,
            stability_threshold: threshold,
            pixel_tolerance: 20.0,
        }
    }

    #[test]
    fn cold_start_returns_empty() {
        let mut s = DetectionStabilizer::new(cfg(5, 3));
        for _ in 0..4 {
            assert!(s.observe(&[det(100.0, 100.0)]).is_empty());
        }
        // Fifth identical frame warms the buffer up.
        assert_eq!(s.observe(&[det(100.0, 100.0)]).len(), 1);
    }

    #[test]
    fn threshold_at_history_minus_one_can_fire() {
        // Support comes from previous frames only, so history - 1 is the
        // largest threshold that is satisfiable at all. A steady detection
        // must reach it once the buffer is warm.
        let mut s = DetectionStabilizer::new(cfg(5, 4));
        for _ in 0..4 {
            assert!(s.observe(&[det(100.0, 100.0)]).is_empty());
        }
        for _ in 0..3 {
            assert_eq!(s.observe(&[det(100.0, 100.0)]).len(), 1);
        }
    }

    #[test]
    fn eviction_keeps_buffer_bounded() {
        let mut s = DetectionStabilizer::new(cfg(3, 2));
        for i in 0..20 {
            s.observe(&[det(i as f32, i as f32)]);
            assert!(s.warmth() <= 3);
        }
    }

    #[test]
    fn outlier_frame_does_not_contribute_support() {
        let mut s = DetectionStabilizer::new(cfg(5, 3));
        s.observe(&[det(100.0, 100.0)]);
        s.observe(&[det(105.0, 98.0)]);
        s.observe(&[det(98.0, 102.0)]);
        s.observe(&[det(300.0, 300.0)]);
        let stable = s.observe(&[det(102.0, 101.0)]);
        assert_eq!(stable.len(), 1);
        let (cx, cy) = stable[0].center();
        assert!((cx - 102.0).abs() < 1e-3 && (cy - 101.0).abs() < 1e-3);
    }

    #[test]
    fn perturbation_beyond_tolerance_drops_below_threshold() {
        let mut s = DetectionStabilizer::new(cfg(4, 3));
        s.observe(&[det(100.0, 100.0)]);
        s.observe(&[det(160.0, 100.0)]); // beyond 20 px
        s.observe(&[det(100.0, 100.0)]);
        // Only 2 of 3 previous frames support the current detection.
        assert!(s.observe(&[det(100.0, 100.0)]).is_empty());
    }

    #[test]
    fn nearby_stable_detections_stay_distinct() {
        let mut s = DetectionStabilizer::new(cfg(3, 2));
        let frame = [det(100.0, 100.0), det(112.0, 100.0)];
        s.observe(&frame);
        s.observe(&frame);
        let stable = s.observe(&frame);
        // Both are independently stable and mutually within tolerance;
        // they must still be two targets.
        assert_eq!(stable.len(), 2);
    }

    #[test]
    fn empty_frames_break_support() {
        let mut s = DetectionStabilizer::new(cfg(3, 2));
        s.observe(&[]);
        s.observe(&[]);
        assert!(s.observe(&[det(50.0, 50.0)]).is_empty());
    }
}
