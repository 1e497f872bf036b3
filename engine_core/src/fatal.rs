//! Process-terminating failure paths.
//!
//! Host failures and broken invariants are programmer errors, not
//! operational faults: the loop does not try to recover a corrupted
//! simulation, it reports where things went wrong and exits non-zero.

use std::panic;

use crate::error::EngineError;

/// Exit status for every fatal path.
pub const FATAL_EXIT_CODE: i32 = 1;

/// Routes panics (assert!, unreachable!, index out of bounds) through a
/// single reporter that names the failing file and line, then exits.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "<non-string panic payload>".to_string());

        match info.location() {
            Some(loc) => {
                log::error!(
                    target: "fatal",
                    "assert tripped: {}:{} on thread '{}': {}",
                    loc.file(),
                    loc.line(),
                    name,
                    message
                );
                eprintln!("assert tripped: {}:{}: {}", loc.file(), loc.line(), message);
            }
            None => {
                log::error!(target: "fatal", "panic on thread '{}': {}", name, message);
                eprintln!("panic: {message}");
            }
        }
        std::process::exit(FATAL_EXIT_CODE);
    }));
}

/// Logs `err` with its cause chain and exits the process.
pub fn terminate(err: &EngineError) -> ! {
    let mut chain = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    log::error!(target: "fatal", "{chain}");
    eprintln!("fatal: {chain}");
    std::process::exit(FATAL_EXIT_CODE);
}
