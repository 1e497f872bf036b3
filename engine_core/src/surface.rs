//! Fixed-resolution backbuffer presented, scaled and letterboxed, into a
//! window-sized buffer chain.

use log::{debug, info, warn};

use crate::error::EngineResult;
use crate::pixel::{Backbuffer, Color, DrawTarget};

/// Retries allowed per level of the present loop before the frame is dropped.
pub const MAX_PRESENT_RETRIES: u32 = 8;

/// Window-sized buffer set the surface presents through.
///
/// Any buffer may be invalidated by the windowing system at any moment,
/// independent of our draw calls; the two queries report when that happened.
pub trait PresentChain {
    /// Open a draw pass over the next buffer. The pass ends when the
    /// returned target is dropped.
    fn acquire(&mut self) -> EngineResult<DrawTarget<'_>>;

    /// The buffer drawn in the last pass was restored by the system while
    /// we drew; its contents are stale.
    fn contents_restored(&mut self) -> bool;

    /// Show the last drawn buffer and flush it to the display.
    fn submit(&mut self) -> EngineResult<()>;

    /// The submitted buffer was lost before it reached the display.
    fn contents_lost(&mut self) -> bool;
}

/// Window operations needed to switch between windowed and fullscreen.
pub trait WindowHost {
    fn inner_size(&self) -> (u32, u32);

    /// Resolution of the display the window is on, if known.
    fn display_size(&self) -> Option<(u32, u32)>;

    fn set_decorated(&mut self, decorated: bool);

    fn set_cursor_visible(&mut self, visible: bool);

    /// Request a new inner size; returns the size actually applied.
    fn resize(&mut self, width: u32, height: u32) -> (u32, u32);

    /// Tear down and rebuild the presentation chain for the window.
    fn recreate_chain(&mut self) -> EngineResult<()>;
}

/// Content drawn on top of the scaled image at window resolution.
pub trait Overlay {
    fn draw(&self, target: &mut DrawTarget<'_>);
}

/// Isotropic scale and centering offsets of the backbuffer in the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
}

impl ScaleTransform {
    pub fn identity(logical_width: u32, logical_height: u32) -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            scaled_width: logical_width,
            scaled_height: logical_height,
        }
    }

    /// Largest uniform scale that fits, never below 1, centered.
    ///
    /// A window smaller than the logical size keeps 1:1 and gets negative
    /// offsets, so the image is cropped around its center.
    pub fn fit(logical: (u32, u32), window: (u32, u32)) -> Self {
        let (lw, lh) = (logical.0 as f64, logical.1 as f64);
        let (ww, wh) = (window.0 as f64, window.1 as f64);

        let scale = (ww / lw).min(wh / lh).max(1.0);
        let scaled_w = lw * scale;
        let scaled_h = lh * scale;

        Self {
            scale,
            offset_x: (ww - scaled_w) / 2.0,
            offset_y: (wh - scaled_h) / 2.0,
            scaled_width: scaled_w as u32,
            scaled_height: scaled_h as u32,
        }
    }
}

/// How much retrying one `present` call took.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentReport {
    /// Inner passes repeated because the buffer was restored mid-draw.
    pub redraws: u32,
    /// Outer passes repeated because the buffer was lost after submit.
    pub resubmits: u32,
    /// Retries ran out and nothing was shown this frame.
    pub dropped: bool,
}

pub struct PresentationSurface {
    logical_width: u32,
    logical_height: u32,
    backbuffer: Backbuffer,
    background: Color,

    transform: ScaleTransform,
    window_size: (u32, u32),

    fullscreen: bool,
    windowed_size: Option<(u32, u32)>,
}

impl PresentationSurface {
    pub fn new(logical_width: u32, logical_height: u32, background: Color) -> Self {
        Self {
            logical_width,
            logical_height,
            backbuffer: Backbuffer::new(logical_width, logical_height),
            background,
            transform: ScaleTransform::identity(logical_width, logical_height),
            window_size: (logical_width, logical_height),
            fullscreen: false,
            windowed_size: None,
        }
    }

    #[inline]
    pub fn logical_size(&self) -> (u32, u32) {
        (self.logical_width, self.logical_height)
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    #[inline]
    pub fn scale_x(&self) -> f64 {
        self.transform.scale
    }

    #[inline]
    pub fn scale_y(&self) -> f64 {
        self.transform.scale
    }

    #[inline]
    pub fn offset(&self) -> (f64, f64) {
        (self.transform.offset_x, self.transform.offset_y)
    }

    pub fn transform(&self) -> &ScaleTransform {
        &self.transform
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn backbuffer(&self) -> &Backbuffer {
        &self.backbuffer
    }

    /// Render target for the host; persists across frames.
    pub fn acquire_backbuffer(&mut self) -> &mut Backbuffer {
        &mut self.backbuffer
    }

    /// Recompute scale and centering for a new window size. Idempotent.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.window_size = (width, height);
        self.transform = ScaleTransform::fit(self.logical_size(), (width, height));
        debug!(
            target: "surface",
            "resize {}x{}: scale {:.3}, offset ({:.1}, {:.1})",
            width,
            height,
            self.transform.scale,
            self.transform.offset_x,
            self.transform.offset_y
        );
    }

    /// Draw and show one frame, retrying until the chain reports neither a
    /// mid-draw restore nor a post-submit loss.
    pub fn present<C>(&mut self, chain: &mut C, overlay: Option<&dyn Overlay>) -> EngineResult<PresentReport>
    where
        C: PresentChain + ?Sized,
    {
        let mut report = PresentReport::default();

        loop {
            let mut inner_attempts = 0;
            loop {
                {
                    let mut target = chain.acquire()?;
                    let size = (target.width(), target.height());
                    if size != self.window_size {
                        // The chain resized ahead of the window event.
                        self.on_resize(size.0, size.1);
                    }
                    target.clear(self.background);
                    target.blit_scaled(&self.backbuffer, &self.transform);
                    if let Some(overlay) = overlay {
                        overlay.draw(&mut target);
                    }
                }

                if !chain.contents_restored() {
                    break;
                }
                inner_attempts += 1;
                report.redraws += 1;
                if inner_attempts > MAX_PRESENT_RETRIES {
                    warn!(target: "surface", "buffer keeps being restored mid-draw, dropping frame");
                    report.dropped = true;
                    return Ok(report);
                }
            }

            chain.submit()?;

            if !chain.contents_lost() {
                return Ok(report);
            }
            report.resubmits += 1;
            if report.resubmits > MAX_PRESENT_RETRIES {
                warn!(target: "surface", "buffer keeps being lost after submit, dropping frame");
                report.dropped = true;
                return Ok(report);
            }
        }
    }

    /// Switch between a borderless display-sized window with a hidden cursor
    /// and the previous windowed size.
    pub fn toggle_fullscreen<W>(&mut self, window: &mut W) -> EngineResult<()>
    where
        W: WindowHost + ?Sized,
    {
        let applied = if self.fullscreen {
            let display = window.display_size();
            let size = self
                .windowed_size
                .or_else(|| display.map(|(w, h)| (w / 2, h / 2)))
                .unwrap_or((self.logical_width, self.logical_height));
            window.set_decorated(true);
            let applied = window.resize(size.0, size.1);
            window.set_cursor_visible(true);
            applied
        } else {
            let current = window.inner_size();
            self.windowed_size = Some(current);
            let display = window.display_size().unwrap_or(current);
            window.set_decorated(false);
            let applied = window.resize(display.0, display.1);
            window.set_cursor_visible(false);
            applied
        };

        window.recreate_chain()?;
        self.fullscreen = !self.fullscreen;
        info!(
            target: "surface",
            "{} at {}x{}",
            if self.fullscreen { "fullscreen" } else { "windowed" },
            applied.0,
            applied.1
        );
        self.on_resize(applied.0, applied.1);
        Ok(())
    }
}
