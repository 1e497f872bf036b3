use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Monotonic millisecond clock plus a coarse sleep primitive.
///
/// The sleep may overshoot by a platform-dependent quantum; the scheduler
/// calibrates for that at startup rather than trusting the request.
pub trait Clock: Send {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;

    /// Suspend the calling thread for at least `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);

    /// One iteration of the busy-wait tail. Must not suspend.
    fn relax(&self) {
        std::hint::spin_loop();
    }
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    yield_in_spin: bool,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            yield_in_spin: false,
        }
    }

    /// Yield to the OS scheduler on each busy-wait iteration.
    pub fn with_spin_yield(mut self, enabled: bool) -> Self {
        self.yield_in_spin = enabled;
        self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    #[inline]
    fn relax(&self) {
        if self.yield_in_spin {
            std::thread::yield_now();
        } else {
            std::hint::spin_loop();
        }
    }
}

/// Clock time added by each spin-wait relax on a [`ManualClock`].
const MANUAL_RELAX_STEP_MS: f64 = 0.01;

/// Deterministic clock for tests and replays.
///
/// Time only moves when someone calls [`ManualClock::advance`], sleeps, or
/// spins. Each sleep overshoots by the next scripted amount, or by the
/// default overshoot once the script runs dry.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualInner>>,
}

#[derive(Debug)]
struct ManualInner {
    now_ms: f64,
    default_overshoot_ms: f64,
    overshoots: VecDeque<f64>,
    sleeps: Vec<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualInner {
                now_ms: 0.0,
                default_overshoot_ms: 0.0,
                overshoots: VecDeque::new(),
                sleeps: Vec::new(),
            })),
        }
    }

    pub fn with_default_overshoot(self, ms: f64) -> Self {
        self.inner.lock().default_overshoot_ms = ms;
        self
    }

    /// Queue per-sleep overshoots, consumed in order.
    pub fn script_overshoots(&self, overshoots: impl IntoIterator<Item = f64>) {
        self.inner.lock().overshoots.extend(overshoots);
    }

    /// Simulate work taking `ms`.
    pub fn advance(&self, ms: f64) {
        self.inner.lock().now_ms += ms;
    }

    /// Every sleep request made so far, in milliseconds.
    pub fn sleeps(&self) -> Vec<u64> {
        self.inner.lock().sleeps.clone()
    }

    pub fn clear_sleeps(&self) {
        self.inner.lock().sleeps.clear();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.inner.lock().now_ms
    }

    fn sleep_ms(&self, ms: u64) {
        let mut g = self.inner.lock();
        let overshoot = g.overshoots.pop_front().unwrap_or(g.default_overshoot_ms);
        g.now_ms += ms as f64 + overshoot;
        g.sleeps.push(ms);
    }

    fn relax(&self) {
        let mut g = self.inner.lock();
        g.now_ms += MANUAL_RELAX_STEP_MS;
    }
}
