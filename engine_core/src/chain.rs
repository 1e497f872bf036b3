//! In-memory presentation chain for headless runs and tests.

use crate::error::EngineResult;
use crate::pixel::DrawTarget;
use crate::surface::{PresentChain, WindowHost};

/// Double-buffered chain backed by plain vectors.
///
/// Also stands in for the window: decoration, cursor and size changes are
/// recorded so callers can inspect them. Restores and losses can be injected
/// to drive the present retry paths.
pub struct OffscreenChain {
    width: u32,
    height: u32,
    back: Vec<u32>,
    front: Vec<u32>,

    display: Option<(u32, u32)>,
    decorated: bool,
    cursor_visible: bool,

    pending_restores: u32,
    pending_losses: u32,

    acquires: u64,
    submits: u64,
    recreations: u64,
}

impl OffscreenChain {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            back: vec![0; len],
            front: vec![0; len],
            display: None,
            decorated: true,
            cursor_visible: true,
            pending_restores: 0,
            pending_losses: 0,
            acquires: 0,
            submits: 0,
            recreations: 0,
        }
    }

    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        self.display = Some((width, height));
        self
    }

    /// The next `n` draw passes report their buffer as restored.
    pub fn inject_restores(&mut self, n: u32) {
        self.pending_restores = n;
    }

    /// The next `n` submits report their buffer as lost.
    pub fn inject_losses(&mut self, n: u32) {
        self.pending_losses = n;
    }

    /// Contents of the last successful submit.
    pub fn front(&self) -> &[u32] {
        &self.front
    }

    pub fn acquires(&self) -> u64 {
        self.acquires
    }

    pub fn submits(&self) -> u64 {
        self.submits
    }

    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    pub fn is_decorated(&self) -> bool {
        self.decorated
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    fn take(counter: &mut u32) -> bool {
        if *counter == 0 {
            return false;
        }
        *counter -= 1;
        true
    }
}

impl PresentChain for OffscreenChain {
    fn acquire(&mut self) -> EngineResult<DrawTarget<'_>> {
        self.acquires += 1;
        Ok(DrawTarget::new(&mut self.back, self.width, self.height))
    }

    fn contents_restored(&mut self) -> bool {
        Self::take(&mut self.pending_restores)
    }

    fn submit(&mut self) -> EngineResult<()> {
        self.submits += 1;
        self.front.copy_from_slice(&self.back);
        Ok(())
    }

    fn contents_lost(&mut self) -> bool {
        Self::take(&mut self.pending_losses)
    }
}

impl WindowHost for OffscreenChain {
    fn inner_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn display_size(&self) -> Option<(u32, u32)> {
        self.display
    }

    fn set_decorated(&mut self, decorated: bool) {
        self.decorated = decorated;
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    fn resize(&mut self, width: u32, height: u32) -> (u32, u32) {
        let (width, height) = (width.max(1), height.max(1));
        self.width = width;
        self.height = height;
        let len = width as usize * height as usize;
        self.back.resize(len, 0);
        self.front.resize(len, 0);
        (width, height)
    }

    fn recreate_chain(&mut self) -> EngineResult<()> {
        let len = self.width as usize * self.height as usize;
        self.back = vec![0; len];
        self.front = vec![0; len];
        self.recreations += 1;
        Ok(())
    }
}
