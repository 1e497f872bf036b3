/// User events injected into the winit loop from the scheduler thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    /// A job is waiting in the tick hand-off.
    TickReady,
}
