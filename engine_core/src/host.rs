use crate::input::InputLatch;
use crate::pixel::Backbuffer;

/// The simulation driven by the engine.
///
/// `update` and `render` run once per tick, in that order, on the thread
/// that owns the window. The latch and backbuffer are only lent for the
/// duration of the call. Any error is fatal to the process.
pub trait HostBridge {
    fn init(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Advance the simulation. Edge queries on `input` are valid for this
    /// tick only.
    fn update(&mut self, input: &InputLatch) -> anyhow::Result<()>;

    /// Draw the current state at logical resolution. The backbuffer keeps
    /// last tick's contents; clearing is up to the host.
    fn render(&mut self, target: &mut Backbuffer) -> anyhow::Result<()>;

    fn destroy(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<H: HostBridge + ?Sized> HostBridge for Box<H> {
    fn init(&mut self) -> anyhow::Result<()> {
        (**self).init()
    }

    fn update(&mut self, input: &InputLatch) -> anyhow::Result<()> {
        (**self).update(input)
    }

    fn render(&mut self, target: &mut Backbuffer) -> anyhow::Result<()> {
        (**self).render(target)
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        (**self).destroy()
    }
}
