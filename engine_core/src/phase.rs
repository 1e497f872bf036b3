use std::fmt;

/// Where inside the host lifecycle a piece of work runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TickPhase {
    Init,
    Update,
    Render,
    Destroy,
}

impl TickPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TickPhase::Init => "init",
            TickPhase::Update => "update",
            TickPhase::Render => "render",
            TickPhase::Destroy => "destroy",
        }
    }
}

impl fmt::Display for TickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
