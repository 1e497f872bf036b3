pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod fatal;
pub mod frame;
pub mod handoff;
pub mod host;
pub mod input;
pub mod logsys;
pub mod overlay;
pub mod phase;
pub mod pixel;
pub mod scheduler;
pub mod signals;
pub mod surface;
pub mod telemetry;
pub mod time;

pub use crate::chain::OffscreenChain;
pub use crate::config::EngineConfig;
pub use crate::engine::{run_headless, Presenter, Runtime};
pub use crate::error::{EngineError, EngineResult};
pub use crate::frame::FrameStats;
pub use crate::host::HostBridge;
pub use crate::input::{InputLatch, KeyCode};
pub use crate::pixel::{Backbuffer, Color, DrawTarget};
pub use crate::scheduler::{FrameScheduler, SchedulerHandle, TickTarget};
pub use crate::surface::{PresentChain, PresentationSurface, WindowHost};
