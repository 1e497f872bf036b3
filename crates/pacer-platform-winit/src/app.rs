use std::sync::Arc;

use log::{error, info, warn};
use pacer_core::{
    handoff::{self, HandoffReceiver, HandoffTarget, JobKind},
    input::InputSender,
    signals::ShutdownFlag,
    time::SystemClock,
    EngineConfig, EngineError, EngineResult, FrameScheduler, HostBridge, Runtime, SchedulerHandle,
};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::PhysicalKey,
    window::{WindowAttributes, WindowId},
};

use crate::events::UserEvent;
use crate::presenter::WinitPresenter;

struct App<H: HostBridge> {
    config: EngineConfig,
    runtime: Runtime<H>,
    input: InputSender,
    shutdown: ShutdownFlag,
    proxy: EventLoopProxy<UserEvent>,

    presenter: Option<WinitPresenter>,
    handoff: Option<HandoffReceiver>,
    scheduler: Option<SchedulerHandle>,

    error: Option<EngineError>,
}

impl<H: HostBridge> App<H> {
    fn new(config: EngineConfig, host: H, shutdown: ShutdownFlag, proxy: EventLoopProxy<UserEvent>) -> Self {
        let runtime = Runtime::new(&config, host);
        let input = runtime.input_sender();
        Self {
            config,
            runtime,
            input,
            shutdown,
            proxy,
            presenter: None,
            handoff: None,
            scheduler: None,
            error: None,
        }
    }

    fn window_id(&self) -> Option<WindowId> {
        self.presenter.as_ref().map(|p| p.window().id())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: EngineError) {
        error!(target: "platform", "{err}");
        self.error = Some(err);
        self.shutdown.set();
        event_loop.exit();
    }

    /// Window at half the display, centered; the logical size doubled when
    /// no monitor is reported.
    fn window_attributes(&self, event_loop: &ActiveEventLoop) -> WindowAttributes {
        let attrs = WindowAttributes::default().with_title(self.config.title.clone());
        match event_loop.primary_monitor() {
            Some(monitor) => {
                let display = monitor.size();
                let origin = monitor.position();
                let (w, h) = ((display.width / 2).max(1), (display.height / 2).max(1));
                attrs.with_inner_size(PhysicalSize::new(w, h)).with_position(PhysicalPosition::new(
                    origin.x + (display.width - w) as i32 / 2,
                    origin.y + (display.height - h) as i32 / 2,
                ))
            }
            None => attrs.with_inner_size(PhysicalSize::new(
                self.config.logical_width * 2,
                self.config.logical_height * 2,
            )),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> EngineResult<()> {
        let window = Arc::new(event_loop.create_window(self.window_attributes(event_loop))?);
        let size = window.inner_size();
        info!(target: "platform", "window created at {}x{}", size.width, size.height);

        self.presenter = Some(WinitPresenter::new(event_loop, window)?);
        self.runtime.on_resize(size.width, size.height);

        let proxy = self.proxy.clone();
        let (sender, receiver) =
            handoff::channel(Box::new(move || proxy.send_event(UserEvent::TickReady).is_ok()));
        self.handoff = Some(receiver);

        let clock = SystemClock::new().with_spin_yield(self.config.spin_yield);
        let scheduler = FrameScheduler::new(self.config.target_hz, clock)?
            .with_calibration_trials(self.config.calibration_trials())
            .with_shutdown(self.shutdown.clone());
        self.scheduler = Some(scheduler.start(HandoffTarget::new(sender))?);
        Ok(())
    }
}

impl<H: HostBridge> ApplicationHandler<UserEvent> for App<H> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.presenter.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if Some(id) != self.window_id() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!(target: "platform", "close requested");
                self.shutdown.set();
            }
            WindowEvent::Resized(size) => self.runtime.on_resize(size.width, size.height),
            WindowEvent::Focused(false) => self.runtime.release_keys(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key {
                    if event.state.is_pressed() {
                        self.input.key_pressed(code);
                    } else {
                        self.input.key_released(code);
                    }
                }
            }
            _ => {}
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        match event {
            UserEvent::TickReady => {
                let (Some(receiver), Some(presenter)) = (self.handoff.as_ref(), self.presenter.as_mut()) else {
                    return;
                };
                let runtime = &mut self.runtime;
                if receiver.poll(|job| runtime.execute(job, presenter)) == Some(JobKind::Destroy) {
                    event_loop.exit();
                }
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // Unblocks a scheduler still waiting on a reply.
        self.handoff = None;
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
            if let Err(e) = scheduler.join() {
                warn!(target: "platform", "scheduler ended with error: {e}");
            }
        }
        info!(target: "platform", "event loop exiting");
    }
}

/// Opens the window and runs `host` at the configured rate until the window
/// closes or Ctrl+C arrives.
pub fn run_winit_app<H: HostBridge>(config: EngineConfig, host: H) -> EngineResult<()> {
    let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
    let shutdown = ShutdownFlag::new();
    if let Err(e) = shutdown.install_ctrlc() {
        warn!(target: "platform", "ctrl-c handler not installed: {e}");
    }

    let mut app = App::new(config, host, shutdown, event_loop.create_proxy());
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
