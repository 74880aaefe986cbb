//=========================================================================
// Platform Bridge Interface
//=========================================================================
//
// Contract between host windowing backends and the window core.
//
// A backend implements `Host`: it owns native windows, and on request
// drains native messages already translated into `HostMessage` values,
// each tagged with the handle of the window it belongs to. Everything
// above this trait (queues, capture, ticks, handlers) is host-agnostic.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

//=== Host ================================================================

/// Capability set every windowing backend provides.
///
/// All methods are called from the thread that owns the `WindowSystem`.
/// Operations on a handle the host no longer knows return
/// `HostError::UnknownHandle`.
pub trait Host {
    /// Backend-specific native window identity.
    type Handle: Copy + Eq + Hash + fmt::Debug;

    /// Brings the backend up. Called once when the window system is built.
    fn initialize(&mut self) -> Result<(), HostError>;

    /// Tears the backend down after the last window is gone.
    fn shut_down(&mut self);

    fn create_window(
        &mut self,
        width: u32,
        height: u32,
        flags: WindowFlags,
    ) -> Result<Self::Handle, HostError>;

    fn destroy_window(&mut self, handle: Self::Handle);

    /// Moves and/or resizes; `None` fields keep their current value.
    fn move_window(&mut self, handle: Self::Handle, placement: Placement) -> Result<(), HostError>;

    fn set_caption(&mut self, handle: Self::Handle, caption: &str) -> Result<(), HostError>;

    fn caption(&self, handle: Self::Handle) -> Result<String, HostError>;

    /// Drains pending native messages into `out`.
    ///
    /// `target` names the window the caller is interested in; hosts whose
    /// message source is shared (one queue per thread) may return messages
    /// for other windows too. Messages outside the translation table are
    /// discarded by the host.
    ///
    /// `Wait` and `WaitFor` return after the first native message. The
    /// headless host then delivers exactly one message. Native hosts may
    /// deliver zero (the message was outside the table) or several (the OS
    /// dispatched sent messages synchronously during the wait).
    ///
    /// A host with no message source at all fails a `Wait` with nothing
    /// pending with `HostError::WouldBlock`; `WaitFor` simply times out.
    fn poll_messages(
        &mut self,
        target: Option<Self::Handle>,
        mode: PollMode,
        out: &mut Vec<Routed<Self::Handle>>,
    ) -> Result<(), HostError>;

    fn is_visible(&self, handle: Self::Handle) -> Result<bool, HostError>;

    fn set_visible(&mut self, handle: Self::Handle, visible: bool) -> Result<(), HostError>;

    /// Directs all pointer input to `handle` until released.
    fn capture_pointer(&mut self, handle: Self::Handle) -> Result<(), HostError>;

    fn release_pointer(&mut self, handle: Self::Handle) -> Result<(), HostError>;

    /// Opaque numeric identity used for display.
    fn raw_handle(&self, handle: Self::Handle) -> u64;
}

//=== PollMode ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Take what is already queued and return.
    Immediate,

    /// Block until at least one host message arrives.
    Wait,

    /// Block at most the given duration.
    WaitFor(Duration),
}

//=== HostMessage =========================================================

/// Native message after translation, before it becomes an `Event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMessage {
    /// Pointer position in client coordinates.
    PointerMoved { x: i32, y: i32 },

    /// Zero-based button index (0 left, 1 right, 2 middle, ...).
    Button { index: u32, pressed: bool },

    /// Signed rotation, 120 units per notch. Position is the last known
    /// pointer position.
    Wheel { delta: i32 },

    Key { code: u32, pressed: bool },

    /// The window lost pointer capture (focus change, another window took
    /// capture). Every held button is released without a native up.
    CaptureLost,

    CloseRequested,
}

/// A message tagged with the window it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routed<H> {
    pub handle: H,
    pub message: HostMessage,
}

//=== Window Options ======================================================

/// Creation options passed through to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowFlags {
    /// Create without showing.
    pub hidden: bool,

    /// Allow the user to resize the frame.
    pub resizable: bool,
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self { hidden: false, resizable: false }
    }
}

/// Partial window geometry for `Host::move_window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Placement {
    pub fn size(width: u32, height: u32) -> Self {
        Self { width: Some(width), height: Some(height), ..Self::default() }
    }

    pub fn position(x: i32, y: i32) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }
}

//=== HostError ===========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Backend could not be brought up (no display, event loop refused).
    Initialization(String),

    /// Native window creation failed.
    Creation(String),

    /// The handle does not name a live window of this host.
    UnknownHandle,

    /// An OS call failed.
    Os { function: &'static str, code: u32 },

    /// Host rejected an argument (e.g. caption with an interior NUL).
    InvalidArgument(String),

    /// A blocking poll could not make progress.
    WouldBlock,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialization(e) => write!(f, "Host initialization failed: {}", e),
            Self::Creation(e) => write!(f, "Window creation failed: {}", e),
            Self::UnknownHandle => f.write_str("Unknown window handle"),
            Self::Os { function, code } => write!(f, "{} failed (0x{:08X})", function, code),
            Self::InvalidArgument(e) => write!(f, "Invalid argument: {}", e),
            Self::WouldBlock => f.write_str("Blocking poll has no message source"),
        }
    }
}

impl std::error::Error for HostError {}

//=========================================================================
// Unit Tests
//=========================================================================
