use thiserror::Error;

use crate::phase::TickPhase;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("winit error: {0}")]
    Winit(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid target rate {0} Hz: must be positive and finite")]
    InvalidRate(f64),

    #[error("presentation surface error: {0}")]
    Surface(String),

    #[error("host failed during {phase}")]
    Host {
        phase: TickPhase,
        #[source]
        source: anyhow::Error,
    },

    #[error("tick hand-off closed: {0}")]
    Handoff(&'static str),

    #[error("scheduler thread error: {0}")]
    Thread(String),

    #[error("engine error: {0}")]
    Other(String),
}

impl EngineError {
    /// Wraps a host-side failure with the phase it escaped from.
    pub fn host(phase: TickPhase, source: anyhow::Error) -> Self {
        Self::Host { phase, source }
    }
}

impl From<winit::error::EventLoopError> for EngineError {
    fn from(e: winit::error::EventLoopError) -> Self {
        Self::Winit(e.to_string())
    }
}

impl From<winit::error::OsError> for EngineError {
    fn from(e: winit::error::OsError) -> Self {
        Self::Winit(e.to_string())
    }
}
