//=========================================================================
// Capture Counter
//=========================================================================
//
// Per-window bookkeeping of held mouse buttons.
//
// While at least one button is held the window owns pointer capture, so
// the matching release is delivered even if the cursor has left the
// window. The counter decides when capture must be acquired (0 → 1) and
// released (1 → 0); the message pump performs the host call.
//
// Invariants:
//   0 <= count <= MAX_BUTTONS
//   count == buttons.count_ones()
//
// Both are enforced here and nowhere else: `press`/`release` are the only
// mutators, and a release with nothing held is an internal fault.
//
//=========================================================================

/// Number of buttons representable in the held-button bitmask.
pub const MAX_BUTTONS: u32 = u32::BITS;

//=== CaptureTransition ===================================================

/// Host action required after a press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTransition {
    /// First button went down: acquire pointer capture.
    Acquire,

    /// Last button went up: release pointer capture.
    Release,

    /// Capture state unchanged.
    Unchanged,
}

//=== CaptureCounter ======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureCounter {
    count: u32,
    buttons: u32,
}

impl CaptureCounter {
    pub fn new() -> Self {
        Self::default()
    }

    //--- Mutation ---------------------------------------------------------

    /// Records a press of `button`.
    ///
    /// # Panics
    ///
    /// Panics if `button >= MAX_BUTTONS` or the button is already held.
    /// Callers filter both cases before reaching the counter.
    pub fn press(&mut self, button: u32) -> CaptureTransition {
        assert!(button < MAX_BUTTONS, "capture counter: button index {} out of range", button);
        assert!(!self.is_held(button), "capture counter: button {} pressed twice", button);

        self.count += 1;
        self.buttons |= 1 << button;

        if self.count == 1 {
            CaptureTransition::Acquire
        } else {
            CaptureTransition::Unchanged
        }
    }

    /// Records a release of `button`.
    ///
    /// # Panics
    ///
    /// Panics on underflow (nothing held) or if `button` is not held.
    pub fn release(&mut self, button: u32) -> CaptureTransition {
        assert!(self.count > 0, "capture counter underflow (button {})", button);
        assert!(self.is_held(button), "capture counter: button {} released while not held", button);

        self.count -= 1;
        self.buttons &= !(1 << button);

        if self.count == 0 {
            CaptureTransition::Release
        } else {
            CaptureTransition::Unchanged
        }
    }

    //--- Queries ----------------------------------------------------------

    /// Number of buttons currently held.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Held-button bitmask (bit `n` = button `n`).
    pub fn buttons(&self) -> u32 {
        self.buttons
    }

    pub fn is_held(&self, button: u32) -> bool {
        button < MAX_BUTTONS && self.buttons & (1 << button) != 0
    }

    /// Returns `true` while the window should own pointer capture.
    pub fn is_captured(&self) -> bool {
        self.count > 0
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
