use log::info;

use crate::frame::FrameStats;

/// Frame-rate bookkeeping fed from published tick stats.
///
/// Time is taken from the ticks' own cooked durations rather than a wall
/// clock, so a period lasts exactly as long as the ticks that filled it.
pub struct Telemetry {
    pub fps: f64,
    pub avg_cooked_ms: f64,
    pub lagged_ticks: u64,
    pub ticks: u64,

    // fps accumulation
    period_ms: f64,
    period_frames: u32,
    period_raw_ms: f64,
    period_cooked_ms: f64,
    period_lagged: u64,
    fps_period_sec: f32,
    fps_enabled: bool,
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            fps: 0.0,
            avg_cooked_ms: 0.0,
            lagged_ticks: 0,
            ticks: 0,
            period_ms: 0.0,
            period_frames: 0,
            period_raw_ms: 0.0,
            period_cooked_ms: 0.0,
            period_lagged: 0,
            fps_period_sec: 1.0,
            fps_enabled: true,
        }
    }

    pub fn configure_fps_logging(&mut self, enabled: bool, period_sec: f32) {
        self.fps_enabled = enabled;
        self.fps_period_sec = period_sec.max(0.25);
    }

    pub fn frame_tick(&mut self, stats: &FrameStats) {
        self.ticks += 1;
        if stats.is_lagging() {
            self.lagged_ticks += 1;
            self.period_lagged += 1;
        }
        self.avg_cooked_ms += (stats.cooked_frame_time_ms - self.avg_cooked_ms) / self.ticks as f64;

        self.period_frames += 1;
        self.period_ms += stats.cooked_frame_time_ms;
        self.period_raw_ms += stats.raw_frame_time_ms;
        self.period_cooked_ms += stats.cooked_frame_time_ms;

        if self.period_ms < self.fps_period_sec as f64 * 1000.0 {
            return;
        }

        let frames = self.period_frames as f64;
        self.fps = frames * 1000.0 / self.period_ms.max(0.0001);

        if self.fps_enabled {
            info!(
                target: "telemetry",
                "fps={:.1} raw_ms={:.2} cooked_ms={:.2} lagged={}",
                self.fps,
                self.period_raw_ms / frames,
                self.period_cooked_ms / frames,
                self.period_lagged
            );
        }

        self.period_ms = 0.0;
        self.period_frames = 0;
        self.period_raw_ms = 0.0;
        self.period_cooked_ms = 0.0;
        self.period_lagged = 0;
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(raw: f64, cooked: f64) -> FrameStats {
        FrameStats {
            target_frame_time_ms: 1000.0 / 60.0,
            raw_frame_time_ms: raw,
            cooked_frame_time_ms: cooked,
            ..FrameStats::default()
        }
    }

    #[test]
    fn fps_updates_once_a_period_is_filled() {
        let mut t = Telemetry::new();
        for _ in 0..59 {
            t.frame_tick(&tick(2.0, 1000.0 / 60.0));
        }
        assert_eq!(t.fps, 0.0);
        t.frame_tick(&tick(2.0, 1000.0 / 60.0 + 0.001));
        assert!((t.fps - 60.0).abs() < 0.1);
    }

    #[test]
    fn counts_lagging_ticks() {
        let mut t = Telemetry::new();
        t.frame_tick(&tick(2.0, 16.7));
        t.frame_tick(&tick(20.0, 20.0));
        t.frame_tick(&tick(25.0, 25.0));
        assert_eq!(t.ticks, 3);
        assert_eq!(t.lagged_ticks, 2);
        assert!((t.avg_cooked_ms - 61.7 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn period_has_a_floor() {
        let mut t = Telemetry::new();
        t.configure_fps_logging(false, 0.0);
        for _ in 0..15 {
            t.frame_tick(&tick(1.0, 16.0));
        }
        assert_eq!(t.fps, 0.0);
        t.frame_tick(&tick(1.0, 16.0));
        assert!((t.fps - 62.5).abs() < 1e-9);
    }
}
