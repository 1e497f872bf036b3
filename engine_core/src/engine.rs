//! The per-tick work of the engine, independent of where it runs.

use log::{debug, info, warn};

use crate::chain::OffscreenChain;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::frame::FrameStats;
use crate::handoff::Job;
use crate::host::HostBridge;
use crate::input::{InputLatch, InputSender, KeyCode};
use crate::overlay::{DebugLevel, DiagnosticsOverlay};
use crate::phase::TickPhase;
use crate::scheduler::{FrameScheduler, TickTarget};
use crate::signals::ShutdownFlag;
use crate::surface::{Overlay, PresentChain, PresentationSurface, WindowHost};
use crate::telemetry::Telemetry;
use crate::time::{Clock, SystemClock};

pub const FULLSCREEN_KEY: KeyCode = KeyCode::F11;
pub const OVERLAY_KEY: KeyCode = KeyCode::F12;

/// A window-sized buffer chain that can also reshape its window.
pub trait Presenter: PresentChain + WindowHost {}

impl<T: PresentChain + WindowHost + ?Sized> Presenter for T {}

/// Everything one tick touches: the host, its input and its output.
///
/// Lives on the thread that owns the window; the scheduler only decides
/// when [`Runtime::execute`] runs.
pub struct Runtime<H: HostBridge> {
    host: H,
    input: InputLatch,
    surface: PresentationSurface,
    telemetry: Telemetry,
    debug_level: DebugLevel,
    start_fullscreen: bool,

    initialized: bool,
    destroyed: bool,
}

impl<H: HostBridge> Runtime<H> {
    pub fn new(config: &EngineConfig, host: H) -> Self {
        let mut telemetry = Telemetry::new();
        telemetry.configure_fps_logging(config.log_fps, config.fps_log_period_sec);

        Self {
            host,
            input: InputLatch::new(),
            surface: PresentationSurface::new(
                config.logical_width,
                config.logical_height,
                config.background_color(),
            ),
            telemetry,
            debug_level: config.debug_overlay,
            start_fullscreen: config.start_fullscreen,
            initialized: false,
            destroyed: false,
        }
    }

    pub fn input_sender(&self) -> InputSender {
        self.input.sender()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn surface(&self) -> &PresentationSurface {
        &self.surface
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn debug_level(&self) -> DebugLevel {
        self.debug_level
    }

    /// Drops held keys, e.g. when the window loses focus.
    pub fn release_keys(&mut self) {
        self.input.release_all();
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.surface.on_resize(width, height);
    }

    pub fn execute<P: Presenter + ?Sized>(&mut self, job: Job, presenter: &mut P) -> EngineResult<()> {
        match job {
            Job::Init => self.init(presenter),
            Job::Tick(stats) => self.tick(&stats, presenter),
            Job::Destroy => self.destroy(),
        }
    }

    pub fn init<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> EngineResult<()> {
        if self.initialized {
            warn!(target: "runtime", "init requested twice, ignoring");
            return Ok(());
        }
        self.initialized = true;

        let (w, h) = presenter.inner_size();
        self.surface.on_resize(w, h);
        if self.start_fullscreen {
            self.surface.toggle_fullscreen(presenter)?;
        }

        self.host
            .init()
            .map_err(|e| EngineError::host(TickPhase::Init, e))?;
        info!(target: "runtime", "host initialized");
        Ok(())
    }

    /// One frame: input, hotkeys, host update and render, present.
    ///
    /// `stats` are those of the previous tick.
    pub fn tick<P: Presenter + ?Sized>(&mut self, stats: &FrameStats, presenter: &mut P) -> EngineResult<()> {
        self.input.drain_events();
        self.handle_hotkeys(presenter)?;

        self.host
            .update(&self.input)
            .map_err(|e| EngineError::host(TickPhase::Update, e))?;
        self.host
            .render(self.surface.acquire_backbuffer())
            .map_err(|e| EngineError::host(TickPhase::Render, e))?;

        self.input.advance();

        if stats.total_frames_rendered > 0 {
            self.telemetry.frame_tick(stats);
        }

        let overlay = DiagnosticsOverlay {
            level: self.debug_level,
            stats: *stats,
            fps: self.telemetry.fps,
            lagged_ticks: self.telemetry.lagged_ticks,
        };
        let overlay: &dyn Overlay = &overlay;
        let report = self.surface.present(presenter, Some(overlay))?;
        if report.redraws > 0 || report.resubmits > 0 {
            debug!(
                target: "surface",
                "present retried: {} redraws, {} resubmits",
                report.redraws,
                report.resubmits
            );
        }
        Ok(())
    }

    pub fn destroy(&mut self) -> EngineResult<()> {
        if self.destroyed {
            warn!(target: "runtime", "destroy requested twice, ignoring");
            return Ok(());
        }
        self.destroyed = true;
        self.host
            .destroy()
            .map_err(|e| EngineError::host(TickPhase::Destroy, e))?;
        info!(target: "runtime", "host destroyed");
        Ok(())
    }

    fn handle_hotkeys<P: Presenter + ?Sized>(&mut self, presenter: &mut P) -> EngineResult<()> {
        if self.input.is_falling_edge(FULLSCREEN_KEY) {
            self.surface.toggle_fullscreen(presenter)?;
        }
        if self.input.is_falling_edge(OVERLAY_KEY) {
            self.debug_level = self.debug_level.cycle();
            info!(target: "runtime", "debug overlay: {}", self.debug_level.as_str());
        }
        Ok(())
    }
}

/// Runs the runtime in place on the scheduler thread against an
/// in-memory chain, stopping after a fixed number of ticks.
pub struct HeadlessTarget<H: HostBridge> {
    runtime: Runtime<H>,
    chain: OffscreenChain,
    remaining: u64,
    shutdown: ShutdownFlag,
}

impl<H: HostBridge> HeadlessTarget<H> {
    pub fn new(config: &EngineConfig, host: H, frames: u64, shutdown: ShutdownFlag) -> Self {
        let (lw, lh) = (config.logical_width, config.logical_height);
        let chain = OffscreenChain::new(lw * 2, lh * 2).with_display_size(lw * 4, lh * 4);
        if frames == 0 {
            shutdown.set();
        }
        Self {
            runtime: Runtime::new(config, host),
            chain,
            remaining: frames,
            shutdown,
        }
    }

    pub fn runtime(&self) -> &Runtime<H> {
        &self.runtime
    }

    pub fn chain(&self) -> &OffscreenChain {
        &self.chain
    }

    pub fn into_host(self) -> H {
        self.runtime.host
    }
}

impl<H: HostBridge> TickTarget for HeadlessTarget<H> {
    fn init(&mut self) -> EngineResult<()> {
        self.runtime.init(&mut self.chain)
    }

    fn tick(&mut self, stats: &FrameStats) -> EngineResult<()> {
        self.runtime.tick(stats, &mut self.chain)?;
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.shutdown.set();
        }
        Ok(())
    }

    fn destroy(&mut self) -> EngineResult<()> {
        self.runtime.destroy()
    }
}

/// Drives `host` for `frames` ticks at the configured rate without a window.
///
/// Returns the host and the stats of the last tick.
pub fn run_headless<H: HostBridge>(config: &EngineConfig, host: H, frames: u64) -> EngineResult<(H, FrameStats)> {
    let clock = SystemClock::new().with_spin_yield(config.spin_yield);
    run_headless_with_clock(config, host, frames, clock)
}

pub fn run_headless_with_clock<H, C>(
    config: &EngineConfig,
    host: H,
    frames: u64,
    clock: C,
) -> EngineResult<(H, FrameStats)>
where
    H: HostBridge,
    C: Clock,
{
    config.validate()?;
    let shutdown = ShutdownFlag::new();
    let mut scheduler = FrameScheduler::new(config.target_hz, clock)?
        .with_calibration_trials(config.calibration_trials())
        .with_shutdown(shutdown.clone());

    let mut target = HeadlessTarget::new(config, host, frames, shutdown);
    info!(target: "runtime", "headless run: {} frames at {} Hz", frames, config.target_hz);
    scheduler.run(&mut target)?;

    Ok((target.into_host(), scheduler.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{Backbuffer, Color};
    use crate::time::ManualClock;
    use anyhow::bail;

    #[derive(Default, Debug)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_update_at: Option<usize>,
        updates: usize,
    }

    impl HostBridge for Recorder {
        fn init(&mut self) -> anyhow::Result<()> {
            self.calls.push("init");
            Ok(())
        }

        fn update(&mut self, _input: &InputLatch) -> anyhow::Result<()> {
            self.updates += 1;
            if self.fail_update_at == Some(self.updates) {
                bail!("update exploded");
            }
            self.calls.push("update");
            Ok(())
        }

        fn render(&mut self, target: &mut Backbuffer) -> anyhow::Result<()> {
            target.draw().clear(Color::WHITE);
            self.calls.push("render");
            Ok(())
        }

        fn destroy(&mut self) -> anyhow::Result<()> {
            self.calls.push("destroy");
            Ok(())
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            logical_width: 8,
            logical_height: 6,
            calibration_trials: 30,
            log_fps: false,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn headless_calls_the_host_in_order() {
        let (host, stats) =
            run_headless_with_clock(&config(), Recorder::default(), 3, ManualClock::new()).unwrap();
        assert_eq!(
            host.calls,
            vec!["init", "update", "render", "update", "render", "update", "render", "destroy"]
        );
        assert_eq!(stats.total_frames_rendered, 3);
        assert!(!stats.running);
    }

    #[test]
    fn zero_frames_still_inits_and_destroys() {
        let (host, stats) =
            run_headless_with_clock(&config(), Recorder::default(), 0, ManualClock::new()).unwrap();
        assert_eq!(host.calls, vec!["init", "destroy"]);
        assert_eq!(stats.total_frames_rendered, 0);
    }

    #[test]
    fn host_error_carries_its_phase() {
        let host = Recorder {
            fail_update_at: Some(2),
            ..Recorder::default()
        };
        let err = run_headless_with_clock(&config(), host, 5, ManualClock::new()).unwrap_err();
        match err {
            EngineError::Host { phase, source } => {
                assert_eq!(phase, TickPhase::Update);
                assert_eq!(source.to_string(), "update exploded");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn invalid_rate_is_rejected_before_init() {
        let cfg = EngineConfig {
            target_hz: 0.0,
            ..config()
        };
        assert!(matches!(
            run_headless_with_clock(&cfg, Recorder::default(), 1, ManualClock::new()),
            Err(EngineError::InvalidRate(_))
        ));
    }

    #[test]
    fn f12_release_cycles_the_overlay() {
        let mut runtime = Runtime::new(&config(), Recorder::default());
        let mut chain = OffscreenChain::new(16, 12);
        let keys = runtime.input_sender();
        runtime.init(&mut chain).unwrap();
        assert_eq!(runtime.debug_level(), DebugLevel::Light);

        keys.key_pressed(OVERLAY_KEY);
        runtime.tick(&FrameStats::default(), &mut chain).unwrap();
        assert_eq!(runtime.debug_level(), DebugLevel::Light);

        keys.key_released(OVERLAY_KEY);
        runtime.tick(&FrameStats::default(), &mut chain).unwrap();
        assert_eq!(runtime.debug_level(), DebugLevel::Heavy);

        runtime.tick(&FrameStats::default(), &mut chain).unwrap();
        assert_eq!(runtime.debug_level(), DebugLevel::Heavy);
    }

    #[test]
    fn f11_tap_toggles_fullscreen_once() {
        let mut runtime = Runtime::new(&config(), Recorder::default());
        let mut chain = OffscreenChain::new(16, 12).with_display_size(64, 48);
        let keys = runtime.input_sender();
        runtime.init(&mut chain).unwrap();

        // Press and release land between the same two ticks.
        keys.key_pressed(FULLSCREEN_KEY);
        keys.key_released(FULLSCREEN_KEY);
        runtime.tick(&FrameStats::default(), &mut chain).unwrap();
        assert!(!runtime.surface().is_fullscreen());
        runtime.tick(&FrameStats::default(), &mut chain).unwrap();
        assert!(runtime.surface().is_fullscreen());
        assert_eq!(chain.inner_size(), (64, 48));
        assert_eq!(runtime.surface().scale_x(), 8.0);
    }

    #[test]
    fn start_fullscreen_applies_on_init() {
        let cfg = EngineConfig {
            start_fullscreen: true,
            ..config()
        };
        let mut runtime = Runtime::new(&cfg, Recorder::default());
        let mut chain = OffscreenChain::new(16, 12).with_display_size(32, 24);
        runtime.init(&mut chain).unwrap();
        assert!(runtime.surface().is_fullscreen());
        assert_eq!(runtime.surface().scale_x(), 4.0);
    }

    #[test]
    fn init_and_destroy_run_once() {
        let mut runtime = Runtime::new(&config(), Recorder::default());
        let mut chain = OffscreenChain::new(16, 12);
        runtime.execute(Job::Init, &mut chain).unwrap();
        runtime.execute(Job::Init, &mut chain).unwrap();
        runtime.execute(Job::Destroy, &mut chain).unwrap();
        runtime.execute(Job::Destroy, &mut chain).unwrap();
        assert_eq!(runtime.host().calls, vec!["init", "destroy"]);
    }

    #[test]
    fn tick_presents_the_rendered_frame() {
        let cfg = EngineConfig {
            debug_overlay: DebugLevel::None,
            ..config()
        };
        let mut runtime = Runtime::new(&cfg, Recorder::default());
        let mut chain = OffscreenChain::new(16, 12);
        runtime.init(&mut chain).unwrap();
        runtime.tick(&FrameStats::default(), &mut chain).unwrap();
        assert!(chain.front().iter().all(|&p| p == Color::WHITE.0));
        assert_eq!(chain.submits(), 1);
    }
}
