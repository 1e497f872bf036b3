//! Frame-latched keyboard state.
//!
//! Platform code pushes key events through an [`InputSender`] from its own
//! event path. The tick drains them into the latch before the host update,
//! so every query made during one tick sees the same state.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};

pub use winit::keyboard::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub pressed: bool,
    pub at: Instant,
}

/// Producer half handed to the platform event path.
#[derive(Clone)]
pub struct InputSender {
    tx: Sender<KeyEvent>,
}

impl InputSender {
    /// Returns false once the latch is gone.
    pub fn key_pressed(&self, code: KeyCode) -> bool {
        self.send(code, true)
    }

    pub fn key_released(&self, code: KeyCode) -> bool {
        self.send(code, false)
    }

    fn send(&self, code: KeyCode, pressed: bool) -> bool {
        self.tx
            .send(KeyEvent {
                code,
                pressed,
                at: Instant::now(),
            })
            .is_ok()
    }
}

pub struct InputLatch {
    /// Keys held right now.
    current: HashSet<KeyCode>,
    /// `current` as of the last `advance()`.
    previous: HashSet<KeyCode>,

    tx: Sender<KeyEvent>,
    rx: Receiver<KeyEvent>,
    /// Events held back because their key already changed this tick.
    deferred: VecDeque<KeyEvent>,
    touched: HashSet<KeyCode>,
}

impl InputLatch {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            current: HashSet::new(),
            previous: HashSet::new(),
            tx,
            rx,
            deferred: VecDeque::new(),
            touched: HashSet::new(),
        }
    }

    pub fn sender(&self) -> InputSender {
        InputSender {
            tx: self.tx.clone(),
        }
    }

    pub fn on_key_pressed(&mut self, code: KeyCode) {
        self.current.insert(code);
    }

    pub fn on_key_released(&mut self, code: KeyCode) {
        self.current.remove(&code);
    }

    /// Live state of the key.
    #[inline]
    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.current.contains(&code)
    }

    /// Went down since the last `advance()`.
    #[doc(alias = "is_key_down")]
    #[inline]
    pub fn is_rising_edge(&self, code: KeyCode) -> bool {
        self.current.contains(&code) && !self.previous.contains(&code)
    }

    /// Went up since the last `advance()`.
    #[doc(alias = "is_key_up")]
    #[inline]
    pub fn is_falling_edge(&self, code: KeyCode) -> bool {
        !self.current.contains(&code) && self.previous.contains(&code)
    }

    /// Snapshot `current` into `previous`.
    ///
    /// Exactly once per tick, after the host has made its edge queries.
    /// A second call in the same tick erases edges before anyone sees them.
    pub fn advance(&mut self) {
        self.previous.clone_from(&self.current);
    }

    /// Applies queued events in arrival order, at most one transition per key.
    ///
    /// When a key changes twice between two ticks (a quick tap), the second
    /// change is carried over to the next drain so both edges get a tick of
    /// their own. Returns the number of events applied.
    pub fn drain_events(&mut self) -> usize {
        self.touched.clear();
        let mut carry = VecDeque::new();
        let mut applied = 0;

        let backlog = std::mem::take(&mut self.deferred);
        for ev in backlog.into_iter().chain(self.rx.try_iter()) {
            if self.touched.contains(&ev.code) {
                carry.push_back(ev);
                continue;
            }
            if ev.pressed == self.current.contains(&ev.code) {
                // Auto-repeat or a duplicate release.
                continue;
            }
            if ev.pressed {
                self.current.insert(ev.code);
            } else {
                self.current.remove(&ev.code);
            }
            self.touched.insert(ev.code);
            applied += 1;
        }

        if let Some(oldest) = carry.front() {
            log::trace!(
                target: "input",
                "{} key events carried to next tick, oldest queued {:?} ago",
                carry.len(),
                oldest.at.elapsed()
            );
        }
        self.deferred = carry;
        applied
    }

    /// Events still waiting for a later tick.
    pub fn pending(&self) -> usize {
        self.deferred.len() + self.rx.len()
    }

    /// Forget every held key, e.g. after the window loses focus.
    ///
    /// Queued and carried events are dropped too, so none of them can
    /// re-press a key after the reset.
    pub fn release_all(&mut self) {
        self.current.clear();
        self.deferred.clear();
        while self.rx.try_recv().is_ok() {}
    }
}

impl Default for InputLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K: KeyCode = KeyCode::KeyK;

    #[test]
    fn starts_with_every_key_up() {
        let latch = InputLatch::new();
        assert!(!latch.is_pressed(K));
        assert!(!latch.is_rising_edge(K));
        assert!(!latch.is_falling_edge(K));
    }

    #[test]
    fn press_then_advance_consumes_the_edge() {
        let mut latch = InputLatch::new();
        latch.on_key_pressed(K);
        latch.advance();
        assert!(latch.is_pressed(K));
        assert!(!latch.is_rising_edge(K));
    }

    #[test]
    fn press_is_a_rising_edge_until_advance() {
        let mut latch = InputLatch::new();
        latch.on_key_pressed(K);
        assert!(latch.is_rising_edge(K));
        latch.advance();
        assert!(!latch.is_rising_edge(K));
    }

    #[test]
    fn release_after_advance_is_a_falling_edge() {
        let mut latch = InputLatch::new();
        latch.on_key_pressed(K);
        latch.advance();
        latch.on_key_released(K);
        assert!(latch.is_falling_edge(K));
        assert!(!latch.is_pressed(K));
        latch.advance();
        assert!(!latch.is_falling_edge(K));
    }

    #[test]
    fn double_advance_erases_an_edge() {
        let mut latch = InputLatch::new();
        latch.on_key_pressed(K);
        latch.advance();
        latch.advance();
        assert!(!latch.is_rising_edge(K));
    }

    #[test]
    fn queued_events_apply_on_drain() {
        let mut latch = InputLatch::new();
        let tx = latch.sender();
        assert!(tx.key_pressed(K));
        assert!(!latch.is_pressed(K));

        assert_eq!(latch.drain_events(), 1);
        assert!(latch.is_rising_edge(K));
    }

    #[test]
    fn tap_between_ticks_yields_both_edges() {
        let mut latch = InputLatch::new();
        let tx = latch.sender();
        tx.key_pressed(K);
        tx.key_released(K);

        latch.drain_events();
        assert!(latch.is_rising_edge(K));
        assert_eq!(latch.pending(), 1);
        latch.advance();

        latch.drain_events();
        assert!(latch.is_falling_edge(K));
        assert_eq!(latch.pending(), 0);
    }

    #[test]
    fn other_keys_are_not_held_back_by_a_deferred_key() {
        let mut latch = InputLatch::new();
        let tx = latch.sender();
        tx.key_pressed(K);
        tx.key_released(K);
        tx.key_pressed(KeyCode::KeyJ);

        latch.drain_events();
        assert!(latch.is_pressed(K));
        assert!(latch.is_pressed(KeyCode::KeyJ));
    }

    #[test]
    fn auto_repeat_is_ignored() {
        let mut latch = InputLatch::new();
        let tx = latch.sender();
        tx.key_pressed(K);
        tx.key_pressed(K);
        tx.key_pressed(K);
        assert_eq!(latch.drain_events(), 1);
        assert_eq!(latch.pending(), 2);
        latch.advance();
        // Deferred repeats are no-ops once they come up.
        assert_eq!(latch.drain_events(), 0);
        assert_eq!(latch.pending(), 0);
        assert!(latch.is_pressed(K));
    }

    #[test]
    fn release_all_discards_carried_transitions() {
        let mut latch = InputLatch::new();
        let tx = latch.sender();
        tx.key_pressed(K);
        tx.key_released(K);
        tx.key_pressed(K);

        latch.drain_events();
        assert!(latch.is_pressed(K));
        assert_eq!(latch.pending(), 2);
        latch.advance();

        latch.release_all();
        assert_eq!(latch.pending(), 0);
        latch.drain_events();
        assert!(!latch.is_pressed(K));
        assert!(latch.is_falling_edge(K));
    }

    #[test]
    fn release_all_discards_queued_events() {
        let mut latch = InputLatch::new();
        let tx = latch.sender();
        tx.key_pressed(KeyCode::KeyJ);
        latch.release_all();

        assert_eq!(latch.drain_events(), 0);
        assert!(!latch.is_pressed(KeyCode::KeyJ));
        assert!(tx.key_pressed(KeyCode::KeyJ));
        assert_eq!(latch.drain_events(), 1);
    }

    #[test]
    fn sender_reports_a_dropped_latch() {
        let latch = InputLatch::new();
        let tx = latch.sender();
        drop(latch);
        assert!(!tx.key_pressed(K));
    }
}
