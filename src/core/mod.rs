//=========================================================================
// Window Core
//
// Host-agnostic half of the crate: events and their queue, the capture
// counter, tick pacing, handler dispatch, the window object, and the
// bridge contract host backends implement.
//
// Layout:
// ```text
//  platform_bridge ── Host trait, HostMessage, message pump
//        ↓
//  window ─────────── queue + capture + tick clock + handlers
//        ↓
//  error ──────────── posted errors and WmError
// ```
//
//=========================================================================

//=== Submodules ==========================================================

pub mod capture;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod handlers;
pub mod platform_bridge;
pub mod tick_clock;
pub mod window;

//=== Re-exports ==========================================================

pub use capture::{CaptureCounter, CaptureTransition};
pub use error::{ErrorCode, ErrorQueue, PostedError, WmError};
pub use event::{Event, EventKind, KeyEvent, MouseEvent, TickEvent};
pub use event_queue::{DrainOrder, EventQueue};
pub use platform_bridge::{Host, HostError, HostMessage, Placement, PollMode, Routed, WindowFlags};
pub use tick_clock::{ManualClock, MonotonicClock, TickClock, TimeSource};
pub use window::{Lifecycle, RenderContext, Window, WindowBuilder};
