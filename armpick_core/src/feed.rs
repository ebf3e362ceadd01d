//! Background detection feed.
//!
//! Spawns a thread that owns the camera and the detector, pushes per-frame
//! detection sets via a bounded channel, and tracks the last-ok timestamp
//! for watchdog logic. The channel is deep enough that frames captured while
//! a pick cycle is executing are retained, so the stability history keeps
//! advancing instead of going cold between cycles.
//!
//! Safety: each `DetectionFeed` spawns exactly one thread that is shut down
//! when the feed is dropped, preventing thread leaks.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use armpick_traits::clock::Clock;
use armpick_traits::{Detection, Detector, FrameSource};

/// One detector pass over one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame_size: (u32, u32),
    pub detections: Vec<Detection>,
}

/// Frames buffered while the consumer is busy. A pick cycle runs for several
/// seconds at 5 Hz capture, so 64 covers the worst case with room to spare.
const FEED_DEPTH: usize = 64;

pub struct DetectionFeed {
    rx: xch::Receiver<FrameReport>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl DetectionFeed {
    pub fn spawn<F, D, C>(mut camera: F, mut detector: D, hz: u32, clock: C) -> Self
    where
        F: FrameSource + Send + 'static,
        D: Detector + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(FEED_DEPTH);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let period = std::time::Duration::from_millis(crate::util::period_ms(hz));
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("feed thread received shutdown signal");
                    break;
                }

                match camera.grab().and_then(|frame| {
                    let dets = detector.detect(&frame)?;
                    Ok(FrameReport {
                        frame_size: frame.size(),
                        detections: dets,
                    })
                }) {
                    Ok(report) => {
                        // If the channel is full the oldest frame is the
                        // least interesting; drop this one and move on.
                        match tx.try_send(report) {
                            Ok(()) => {
                                let now = clock.ms_since(epoch);
                                last_ok_clone.store(now, Ordering::Relaxed);
                            }
                            Err(xch::TrySendError::Full(_)) => {
                                tracing::trace!("feed channel full, dropping frame");
                            }
                            Err(xch::TrySendError::Disconnected(_)) => {
                                tracing::debug!("feed consumer disconnected, exiting thread");
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        // Transient capture or inference failure; the
                        // runner's watchdog notices a sustained stall.
                        tracing::warn!(error = %e, "frame capture failed");
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("feed thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Drain every report produced since the last call, oldest first.
    ///
    /// The caller pushes each one through the stabilizer so detection
    /// history accumulated during a long arm move is never lost.
    pub fn drain(&self) -> Vec<FrameReport> {
        self.rx.try_iter().collect()
    }

    /// Milliseconds since the last successful frame, measured against this
    /// feed's own epoch.
    pub fn stalled_ms(&self) -> u64 {
        let now_ms = {
            let dur = Instant::now().saturating_duration_since(self.epoch);
            let ms = dur.as_millis();
            (ms.min(u128::from(u64::MAX))) as u64
        };
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for DetectionFeed {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between grabs or right after the in-flight
        // grab/detect completes, bounded by the camera timeout.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("feed thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "feed thread panicked during shutdown");
                }
            }
        }
    }
}
