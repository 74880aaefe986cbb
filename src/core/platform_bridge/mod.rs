//=========================================================================
// Platform Bridge
//=========================================================================
//
// Bridges host windowing backends (Win32, winit, headless) with the
// window core.
//
// This module defines the contract between backends and core logic, so a
// backend can be swapped without changing core code.
//
// Components:
// - `interface`: the `Host` trait, translated messages and errors
// - `message_pump`: core-side routing of host messages into window queues
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod interface;
pub(crate) mod message_pump;

//=== Public API ==========================================================

pub use interface::{Host, HostError, HostMessage, Placement, PollMode, Routed, WindowFlags};
