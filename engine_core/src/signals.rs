use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cooperative stop request shared by the scheduler, the window and Ctrl+C.
///
/// Setting it never interrupts a tick in flight; the scheduler looks at it
/// once per loop iteration.
#[derive(Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn install_ctrlc(&self) -> anyhow::Result<()> {
        let flag = self.flag.clone();
        ctrlc::set_handler(move || {
            log::info!(target: "runtime", "ctrl-c received, stopping");
            flag.store(true, Ordering::Release);
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_flag() {
        let a = ShutdownFlag::new();
        let b = a.clone();
        assert!(!b.is_set());
        a.set();
        assert!(b.is_set());
    }
}
