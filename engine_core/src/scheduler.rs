use std::thread::{self, JoinHandle};

use log::{debug, info, trace};

use crate::config::MIN_CALIBRATION_TRIALS;
use crate::error::{EngineError, EngineResult};
use crate::frame::{FrameState, FrameStats, StatsCell};
use crate::signals::ShutdownFlag;
use crate::time::{Clock, SystemClock};

/// What the scheduler drives once per tick.
///
/// Implementations decide where the work actually runs: in place for
/// headless runs, or handed to the thread that owns the window.
pub trait TickTarget {
    fn init(&mut self) -> EngineResult<()>;
    fn tick(&mut self, stats: &FrameStats) -> EngineResult<()>;
    fn destroy(&mut self) -> EngineResult<()>;
}

/// Outcome of the startup sleep-granularity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardCalibration {
    /// Observed elapsed whole milliseconds per 1 ms sleep, sorted ascending.
    pub samples: Vec<u64>,
    /// Smallest sample.
    pub guard_ms: u64,
}

/// Requests `trials` one-millisecond sleeps and keeps the shortest.
///
/// A zero reading is counted as 1 ms since no sleep is free.
pub fn calibrate<C: Clock + ?Sized>(clock: &C, trials: u32) -> GuardCalibration {
    let trials = trials.max(MIN_CALIBRATION_TRIALS) as usize;
    let mut samples = Vec::with_capacity(trials);
    for _ in 0..trials {
        let before = clock.now_ms();
        clock.sleep_ms(1);
        let delta = (clock.now_ms() - before).max(0.0) as u64;
        samples.push(delta.max(1));
    }
    samples.sort_unstable();
    let guard_ms = samples[0];
    GuardCalibration { samples, guard_ms }
}

/// Fixed-rate frame loop.
///
/// Each tick runs the host work, then sleeps for most of the remaining
/// budget and busy-waits the rest, so the wall-clock period lands on the
/// target despite coarse OS sleep granularity.
pub struct FrameScheduler<C: Clock = SystemClock> {
    clock: C,
    state: FrameState,
    shutdown: ShutdownFlag,
    published: StatsCell,
    calibration_trials: u32,
}

impl<C: Clock> FrameScheduler<C> {
    pub fn new(target_hz: f64, clock: C) -> EngineResult<Self> {
        if !target_hz.is_finite() || target_hz <= 0.0 {
            return Err(EngineError::InvalidRate(target_hz));
        }
        Ok(Self {
            clock,
            state: FrameState::new(target_hz),
            shutdown: ShutdownFlag::new(),
            published: StatsCell::new(),
            calibration_trials: 50,
        })
    }

    /// Share an externally owned stop flag (window close, Ctrl+C).
    pub fn with_shutdown(mut self, shutdown: ShutdownFlag) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_calibration_trials(mut self, trials: u32) -> Self {
        self.calibration_trials = trials.max(MIN_CALIBRATION_TRIALS);
        self
    }

    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    pub fn stats_cell(&self) -> StatsCell {
        self.published.clone()
    }

    pub fn stats(&self) -> FrameStats {
        self.state.stats()
    }

    pub fn target_frame_time_ms(&self) -> f64 {
        self.state.target_frame_time_ms
    }

    pub fn over_sleep_guard_ms(&self) -> f64 {
        self.state.over_sleep_guard_ms
    }

    pub fn calibrate_guard(&mut self) -> GuardCalibration {
        let calibration = calibrate(&self.clock, self.calibration_trials);
        self.state.over_sleep_guard_ms = calibration.guard_ms as f64;
        debug!(
            target: "scheduler",
            "guard calibrated: {} ms over {} trials (max {} ms)",
            calibration.guard_ms,
            calibration.samples.len(),
            calibration.samples.last().copied().unwrap_or_default()
        );
        calibration
    }

    /// Runs one tick: `work`, then compensation up to the frame budget.
    ///
    /// `work` receives the stats of the previous tick.
    pub fn tick<F>(&mut self, work: F) -> EngineResult<()>
    where
        F: FnOnce(&FrameStats) -> EngineResult<()>,
    {
        let start = self.clock.now_ms();
        let previous = self.state.stats();

        work(&previous)?;
        self.state.total_frames_rendered += 1;

        let target = self.state.target_frame_time_ms;
        let mut elapsed = self.clock.now_ms() - start;
        self.state.raw_frame_time_ms = elapsed;

        if elapsed < target {
            let wait_ms = target - elapsed - self.state.over_sleep_guard_ms;
            if wait_ms >= 1.0 {
                self.clock.sleep_ms(wait_ms as u64);
            }
            while elapsed < target {
                self.clock.relax();
                elapsed = self.clock.now_ms() - start;
            }
        } else {
            trace!(
                target: "scheduler",
                "tick {} lagging: {:.3} ms of {:.3} ms",
                self.state.total_frames_rendered,
                elapsed,
                target
            );
        }

        self.state.cooked_frame_time_ms = self.clock.now_ms() - start;
        self.published.publish(self.state.stats());
        Ok(())
    }

    #[inline]
    pub fn is_lagging(&self) -> bool {
        self.state.raw_frame_time_ms > self.state.target_frame_time_ms
    }

    /// Ask the loop to finish after the tick in flight.
    pub fn stop(&self) {
        self.shutdown.set();
    }

    /// Calibrate, `init`, tick until stopped, `destroy`. Blocks the caller.
    pub fn run<T: TickTarget + ?Sized>(&mut self, target: &mut T) -> EngineResult<()> {
        self.calibrate_guard();
        info!(
            target: "scheduler",
            "starting: {:.3} ms per frame, guard {} ms",
            self.state.target_frame_time_ms,
            self.state.over_sleep_guard_ms
        );

        self.state.running = true;
        self.published.publish(self.state.stats());

        target.init()?;

        while !self.shutdown.is_set() {
            self.tick(|stats| target.tick(stats))?;
        }

        self.state.running = false;
        self.published.publish(self.state.stats());

        target.destroy()?;
        info!(
            target: "scheduler",
            "stopped after {} frames",
            self.state.total_frames_rendered
        );
        Ok(())
    }
}

impl<C: Clock + 'static> FrameScheduler<C> {
    /// Spawns the loop thread; any loop error terminates the process.
    pub fn start<T>(self, target: T) -> EngineResult<SchedulerHandle>
    where
        T: TickTarget + Send + 'static,
    {
        self.spawn_inner(target, true)
    }

    /// Spawns the loop thread; the loop result comes back through
    /// [`SchedulerHandle::join`].
    pub fn spawn<T>(self, target: T) -> EngineResult<SchedulerHandle>
    where
        T: TickTarget + Send + 'static,
    {
        self.spawn_inner(target, false)
    }

    fn spawn_inner<T>(mut self, mut target: T, fatal_on_error: bool) -> EngineResult<SchedulerHandle>
    where
        T: TickTarget + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let stats = self.published.clone();

        let join = thread::Builder::new()
            .name("mainloop".to_string())
            .spawn(move || {
                let result = self.run(&mut target);
                match result {
                    Err(e) if fatal_on_error => crate::fatal::terminate(&e),
                    other => other,
                }
            })
            .map_err(|e| EngineError::Thread(e.to_string()))?;

        Ok(SchedulerHandle {
            shutdown,
            stats,
            join: Some(join),
        })
    }
}

/// Owner-side handle to a running scheduler thread.
pub struct SchedulerHandle {
    shutdown: ShutdownFlag,
    stats: StatsCell,
    join: Option<JoinHandle<EngineResult<()>>>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        self.shutdown.set();
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    pub fn stats(&self) -> FrameStats {
        self.stats.get()
    }

    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Waits for the loop thread and returns its result.
    pub fn join(mut self) -> EngineResult<()> {
        match self.join.take() {
            Some(j) => j
                .join()
                .map_err(|_| EngineError::Thread("mainloop panicked".to_string()))?,
            None => Ok(()),
        }
    }
}
