//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_wm::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Entry point
pub use crate::system::{WindowSystem, WindowSystemBuilder};

// Windows
pub use crate::core::window::{Lifecycle, RenderContext, Window, WindowBuilder};
pub use crate::core::platform_bridge::WindowFlags;
pub use crate::core::event_queue::DrainOrder;

// Events
pub use crate::core::event::{Event, EventKind, KeyEvent, MouseEvent, TickEvent};

// Errors
pub use crate::core::error::{ErrorCode, ErrorQueue, PostedError, WmError};
