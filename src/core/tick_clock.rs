//=========================================================================
// Tick Clock
//=========================================================================
//
// Synthesizes periodic Tick events for a window without any host timer.
//
// Each poll asks the clock whether the interval has elapsed since the
// previously produced tick. If so, exactly one tick is claimed, no matter
// how many intervals were missed; `elapsed` reports the real gap so the
// consumer can catch up.
//
// Time comes from a `TimeSource` in whole milliseconds. The previous tick
// lives in an `AtomicU64` and is advanced with compare-exchange, so a
// claim can never be taken twice for the same instant.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::trace;

//=== Internal Dependencies ===============================================

use super::event::TickEvent;

//=== TimeSource ==========================================================

/// Monotonic millisecond counter.
pub trait TimeSource {
    fn now_ms(&self) -> u64;
}

/// Wall-independent clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually driven clock for deterministic tests and replay hosts.
///
/// Clones share the same counter, so one handle can be given to the
/// window system while another advances time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: Rc::new(Cell::new(start_ms)) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

//=== TickClock ===========================================================

#[derive(Debug, Default)]
pub struct TickClock {
    /// Interval in milliseconds; zero disables ticking.
    interval: u32,
    previous: AtomicU64,
}

impl TickClock {
    /// Creates a disabled clock.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.interval > 0
    }

    /// Sets the interval and restarts the period at `now`.
    pub fn set_interval(&mut self, interval_ms: u32, now: u64) {
        self.interval = interval_ms;
        self.previous.store(now, Ordering::Release);
        trace!(target: "wm::tick", "Tick interval set to {} ms at {}", interval_ms, now);
    }

    /// Returns the tick that `claim` would produce at `now`, if any.
    pub fn due(&self, now: u64) -> Option<TickEvent> {
        if !self.is_enabled() {
            return None;
        }

        let previous = self.previous.load(Ordering::Acquire);
        let elapsed = now.checked_sub(previous)?;
        (elapsed >= u64::from(self.interval)).then_some(TickEvent { tick: now, elapsed })
    }

    /// Milliseconds until the next tick is due, `Some(0)` if overdue.
    pub fn until_due(&self, now: u64) -> Option<u64> {
        if !self.is_enabled() {
            return None;
        }

        let previous = self.previous.load(Ordering::Acquire);
        let elapsed = now.saturating_sub(previous);
        Some(u64::from(self.interval).saturating_sub(elapsed))
    }

    /// Claims the due tick at `now`, advancing the previous tick to `now`.
    ///
    /// Returns `None` if nothing is due or another claim for this period
    /// already succeeded.
    pub fn claim(&self, now: u64) -> Option<TickEvent> {
        let event = self.due(now)?;
        let previous = now - event.elapsed;

        self.previous
            .compare_exchange(previous, now, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| event)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_with_interval(interval: u32, start: u64) -> TickClock {
        let mut clock = TickClock::new();
        clock.set_interval(interval, start);
        clock
    }

    //=====================================================================
    // Enablement Tests
    //=====================================================================

    #[test]
    fn disabled_clock_never_ticks() {
        let clock = TickClock::new();
        assert!(!clock.is_enabled());
        assert!(clock.due(u64::MAX).is_none());
        assert!(clock.claim(1_000_000).is_none());
    }

    #[test]
    fn zero_interval_disables() {
        let clock = clock_with_interval(0, 0);
        assert!(clock.claim(500).is_none());
    }

    //=====================================================================
    // Claim Tests
    //=====================================================================

    #[test]
    fn ticks_once_interval_elapsed() {
        let clock = clock_with_interval(50, 1_000);

        assert!(clock.claim(1_049).is_none());

        let tick = clock.claim(1_050).expect("tick due at interval");
        assert_eq!(tick, TickEvent { tick: 1_050, elapsed: 50 });
    }

    #[test]
    fn claim_advances_previous() {
        let clock = clock_with_interval(50, 0);

        assert!(clock.claim(60).is_some());
        assert!(clock.claim(60).is_none(), "Same instant cannot be claimed twice");
        assert!(clock.claim(109).is_none());

        let next = clock.claim(110).expect("second period");
        assert_eq!(next.elapsed, 50);
    }

    #[test]
    fn missed_intervals_collapse_into_one_tick() {
        let clock = clock_with_interval(50, 0);

        let tick = clock.claim(175).expect("tick due");
        assert_eq!(tick.elapsed, 175);
        assert!(clock.claim(175).is_none());
    }

    #[test]
    fn elapsed_is_always_positive() {
        let clock = clock_with_interval(1, 10);
        for now in 11..40 {
            if let Some(tick) = clock.claim(now) {
                assert!(tick.elapsed > 0);
            }
        }
    }

    #[test]
    fn due_does_not_claim() {
        let clock = clock_with_interval(20, 0);

        assert_eq!(clock.due(25), clock.due(25));
        assert!(clock.claim(25).is_some());
        assert!(clock.due(25).is_none());
    }

    #[test]
    fn time_before_previous_is_ignored() {
        let clock = clock_with_interval(10, 100);
        assert!(clock.claim(50).is_none());
    }

    #[test]
    fn until_due_counts_down() {
        let clock = clock_with_interval(50, 100);

        assert_eq!(clock.until_due(120), Some(30));
        assert_eq!(clock.until_due(200), Some(0));
        assert_eq!(TickClock::new().until_due(200), None);
    }

    #[test]
    fn set_interval_restarts_period() {
        let mut clock = clock_with_interval(100, 0);
        clock.set_interval(100, 90);

        assert!(clock.claim(150).is_none());
        assert!(clock.claim(190).is_some());
    }

    //=====================================================================
    // Time Source Tests
    //=====================================================================

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(5);
        let shared = clock.clone();

        clock.advance(10);
        assert_eq!(shared.now_ms(), 15);

        shared.set(100);
        assert_eq!(clock.now_ms(), 100);
    }

    #[test]
    fn monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::new();
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(second >= first);
    }
}
