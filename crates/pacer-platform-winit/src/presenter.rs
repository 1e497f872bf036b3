use std::num::NonZeroU32;
use std::sync::Arc;

use log::{debug, warn};
use pacer_core::{DrawTarget, EngineError, EngineResult, PresentChain, WindowHost};
use softbuffer::{Context, Surface};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event_loop::{ActiveEventLoop, OwnedDisplayHandle},
    window::Window,
};

/// softbuffer-backed chain for one window.
///
/// Frames are drawn into a staging buffer sized to the window and copied
/// into the softbuffer surface on submit.
pub struct WinitPresenter {
    window: Arc<Window>,
    context: Context<OwnedDisplayHandle>,
    surface: Surface<OwnedDisplayHandle, Arc<Window>>,

    staging: Vec<u32>,
    /// Window size when the current staging pass was acquired.
    acquired: (u32, u32),
    lost: bool,
}

fn surface_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Surface(e.to_string())
}

impl WinitPresenter {
    pub fn new(event_loop: &ActiveEventLoop, window: Arc<Window>) -> EngineResult<Self> {
        let context = Context::new(event_loop.owned_display_handle()).map_err(surface_err)?;
        let surface = Surface::new(&context, window.clone()).map_err(surface_err)?;
        Ok(Self {
            window,
            context,
            surface,
            staging: Vec::new(),
            acquired: (0, 0),
            lost: false,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn current_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width.max(1), size.height.max(1))
    }

    fn mark_lost(&mut self, what: &str, e: impl std::fmt::Display) {
        warn!(target: "platform", "{what}: {e}");
        self.lost = true;
    }
}

impl PresentChain for WinitPresenter {
    fn acquire(&mut self) -> EngineResult<DrawTarget<'_>> {
        let (w, h) = self.current_size();
        let len = w as usize * h as usize;
        if self.staging.len() != len {
            self.staging.resize(len, 0);
        }
        self.acquired = (w, h);
        Ok(DrawTarget::new(&mut self.staging, w, h))
    }

    fn contents_restored(&mut self) -> bool {
        // The window changed size under the pass; the staging frame no
        // longer matches what submit would present.
        self.current_size() != self.acquired
    }

    fn submit(&mut self) -> EngineResult<()> {
        self.lost = false;
        let (w, h) = self.acquired;
        let (Some(nw), Some(nh)) = (NonZeroU32::new(w), NonZeroU32::new(h)) else {
            self.lost = true;
            return Ok(());
        };
        if let Err(e) = self.surface.resize(nw, nh) {
            self.mark_lost("surface resize failed", e);
            return Ok(());
        }

        let mut buffer = match self.surface.buffer_mut() {
            Ok(b) => b,
            Err(e) => {
                warn!(target: "platform", "buffer acquire failed: {e}");
                self.lost = true;
                return Ok(());
            }
        };
        if buffer.len() != self.staging.len() {
            drop(buffer);
            self.lost = true;
            return Ok(());
        }
        for (dst, src) in buffer.iter_mut().zip(&self.staging) {
            *dst = src & 0x00FF_FFFF;
        }

        self.window.pre_present_notify();
        if let Err(e) = buffer.present() {
            self.mark_lost("present failed", e);
        }
        Ok(())
    }

    fn contents_lost(&mut self) -> bool {
        std::mem::take(&mut self.lost)
    }
}

impl WindowHost for WinitPresenter {
    fn inner_size(&self) -> (u32, u32) {
        self.current_size()
    }

    fn display_size(&self) -> Option<(u32, u32)> {
        self.window.current_monitor().map(|m| {
            let size = m.size();
            (size.width, size.height)
        })
    }

    fn set_decorated(&mut self, decorated: bool) {
        self.window.set_decorations(decorated);
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.window.set_cursor_visible(visible);
    }

    fn resize(&mut self, width: u32, height: u32) -> (u32, u32) {
        let applied = self
            .window
            .request_inner_size(PhysicalSize::new(width, height))
            .map(|s| (s.width, s.height))
            .unwrap_or((width, height));

        if let Some(monitor) = self.window.current_monitor() {
            let origin = monitor.position();
            let size = monitor.size();
            let x = origin.x + (size.width as i32 - applied.0 as i32) / 2;
            let y = origin.y + (size.height as i32 - applied.1 as i32) / 2;
            self.window.set_outer_position(PhysicalPosition::new(x, y));
        }
        debug!(target: "platform", "window resized to {}x{}", applied.0, applied.1);
        applied
    }

    fn recreate_chain(&mut self) -> EngineResult<()> {
        self.surface = Surface::new(&self.context, self.window.clone()).map_err(surface_err)?;
        self.staging.clear();
        self.acquired = (0, 0);
        self.lost = false;
        Ok(())
    }
}
