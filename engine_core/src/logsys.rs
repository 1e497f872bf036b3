use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use env_logger::{Builder, Env};

/// Installs the process logger.
///
/// `RUST_LOG` overrides the default `info` filter. Lines look like
/// `[1712345678901] [INFO] [scheduler] guard calibrated`.
/// Calling this twice is harmless; the second call is ignored.
pub fn init() {
    let _ = builder().try_init();
}

/// Same as [`init`] but routes output through the test harness capture.
pub fn init_for_tests() {
    let _ = builder().is_test(true).try_init();
}

fn builder() -> Builder {
    let mut b = Builder::from_env(Env::default().default_filter_or("info"));
    b.format(|buf, record| {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        writeln!(
            buf,
            "[{}] [{}] [{}] {}",
            ms,
            record.level(),
            record.target(),
            record.args()
        )
    });
    b
}
