use std::sync::Arc;

use parking_lot::Mutex;

/// Timing state owned by the scheduler thread.
#[derive(Debug, Clone)]
pub struct FrameState {
    /// Fixed at construction from the configured rate.
    pub(crate) target_frame_time_ms: f64,
    /// Calibrated once at startup.
    pub(crate) over_sleep_guard_ms: f64,
    /// Time spent in host work alone.
    pub(crate) raw_frame_time_ms: f64,
    /// Whole tick including sleep and busy-wait.
    pub(crate) cooked_frame_time_ms: f64,
    pub(crate) total_frames_rendered: u64,
    pub(crate) running: bool,
}

impl FrameState {
    pub(crate) fn new(target_hz: f64) -> Self {
        Self {
            target_frame_time_ms: 1000.0 / target_hz,
            over_sleep_guard_ms: 0.0,
            raw_frame_time_ms: 0.0,
            cooked_frame_time_ms: 0.0,
            total_frames_rendered: 0,
            running: false,
        }
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            target_frame_time_ms: self.target_frame_time_ms,
            over_sleep_guard_ms: self.over_sleep_guard_ms,
            raw_frame_time_ms: self.raw_frame_time_ms,
            cooked_frame_time_ms: self.cooked_frame_time_ms,
            total_frames_rendered: self.total_frames_rendered,
            running: self.running,
        }
    }
}

/// Read-only copy of [`FrameState`] handed to observers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub target_frame_time_ms: f64,
    pub over_sleep_guard_ms: f64,
    pub raw_frame_time_ms: f64,
    pub cooked_frame_time_ms: f64,
    pub total_frames_rendered: u64,
    pub running: bool,
}

impl FrameStats {
    /// The host work alone overran the frame budget.
    #[inline]
    pub fn is_lagging(&self) -> bool {
        self.raw_frame_time_ms > self.target_frame_time_ms
    }
}

/// Latest published stats, readable from any thread.
#[derive(Clone, Default)]
pub struct StatsCell {
    inner: Arc<Mutex<FrameStats>>,
}

impl StatsCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, stats: FrameStats) {
        *self.inner.lock() = stats;
    }

    pub fn get(&self) -> FrameStats {
        *self.inner.lock()
    }
}
