//=========================================================================
// Window Event Model
//
// Defines the unified representation of one occurrence delivered to a
// window, independent of the host windowing system that produced it.
//
// Responsibilities:
// - Represent close, mouse, key and tick occurrences as one sum type
// - Carry only the payload that belongs to the active kind
// - Provide cheap kind inspection for queue bookkeeping and dispatch
//
// Event Flow:
// ```text
// Host message (Win32 MSG / winit WindowEvent / headless injection)
//         ↓
//    HostMessage (platform bridge)
//         ↓
//    Event (this module) ──► EventQueue ──► Window::dispatch
// ```
//
//=========================================================================

//=== EventKind ===========================================================

/// Discriminant of an [`Event`].
///
/// Used where only the category matters (handler slot lookup, queue
/// scans, logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Close,
    MouseMotion,
    MouseButtonDown,
    MouseButtonUp,
    MouseWheel,
    Key,
    Tick,
}

//=== Payloads ============================================================

/// Pointer state attached to every mouse event.
///
/// `buttons` is a bitmask where bit `n` is set while button `n` is held.
/// `button` names the button a down/up event pertains to and is zero for
/// motion. `wheel` is the signed rotation of a wheel event (one notch is
/// 120 units, the Win32 convention) and zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MouseEvent {
    /// X position relative to the window's client area.
    pub x: i32,

    /// Y position relative to the window's client area.
    pub y: i32,

    /// Held-button bitmask after the transition this event reports.
    pub buttons: u32,

    /// Signed wheel delta.
    pub wheel: i32,

    /// Zero-based index of the button this event pertains to.
    pub button: u32,
}

impl MouseEvent {
    /// Returns `true` if `button` is held according to this event's mask.
    pub fn is_held(&self, button: u32) -> bool {
        button < u32::BITS && self.buttons & (1 << button) != 0
    }
}

/// Keyboard transition. `code` is the host's key code, passed through
/// unmodified (virtual key on Win32, scancode on winit hosts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub pressed: bool,
    pub code: u32,
}

/// Synthetic timer occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickEvent {
    /// Absolute tick counter (milliseconds of the time source).
    pub tick: u64,

    /// Milliseconds since the previous tick was produced.
    pub elapsed: u64,
}

//=== Event ===============================================================

/// One discrete occurrence delivered to a window.
///
/// Each variant carries exactly the payload of its kind, so a reader can
/// never observe fields that belong to a different kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The host (or the caller) asked the window to close.
    Close,

    /// Pointer moved inside the window.
    MouseMotion(MouseEvent),

    /// A mouse button was pressed. `buttons` already includes it.
    MouseButtonDown(MouseEvent),

    /// A mouse button was released. `buttons` no longer includes it.
    MouseButtonUp(MouseEvent),

    /// The wheel rotated.
    MouseWheel(MouseEvent),

    /// A key changed state.
    Key(KeyEvent),

    /// The window's tick interval elapsed.
    Tick(TickEvent),
}

impl Event {
    /// Returns the discriminant of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Close => EventKind::Close,
            Self::MouseMotion(_) => EventKind::MouseMotion,
            Self::MouseButtonDown(_) => EventKind::MouseButtonDown,
            Self::MouseButtonUp(_) => EventKind::MouseButtonUp,
            Self::MouseWheel(_) => EventKind::MouseWheel,
            Self::Key(_) => EventKind::Key,
            Self::Tick(_) => EventKind::Tick,
        }
    }

    /// Mouse payload, if this is one of the mouse kinds.
    pub fn mouse(&self) -> Option<&MouseEvent> {
        match self {
            Self::MouseMotion(m)
            | Self::MouseButtonDown(m)
            | Self::MouseButtonUp(m)
            | Self::MouseWheel(m) => Some(m),
            _ => None,
        }
    }

    /// Key payload, if this is a key event.
    pub fn key(&self) -> Option<&KeyEvent> {
        match self {
            Self::Key(k) => Some(k),
            _ => None,
        }
    }

    /// Tick payload, if this is a tick event.
    pub fn tick(&self) -> Option<&TickEvent> {
        match self {
            Self::Tick(t) => Some(t),
            _ => None,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
