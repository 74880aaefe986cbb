//=========================================================================
// Errors
//=========================================================================
//
// Two kinds of failure leave this subsystem:
//
// - `WmError`: returned directly from public operations that can fail
//   (window creation, event retrieval, blocking waits).
// - Posted errors: host-call failures inside operations that have no
//   error return (set_caption, set_visible, ...). These are pushed onto
//   an `ErrorQueue` as `(ErrorCode, message)` and the operation becomes a
//   no-op. The queue is a crossbeam channel, so any thread may post and
//   the owner drains.
//
// Internal inconsistencies (capture or acquisition underflow) are never
// reported here; they panic.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::OnceLock;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::warn;

//=== Internal Dependencies ===============================================

use super::platform_bridge::HostError;

//=== ErrorCode ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    General,
    Internal,
    InvalidArgument,
    PlatformCreation,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::General => "general",
            Self::Internal => "internal",
            Self::InvalidArgument => "invalid argument",
            Self::PlatformCreation => "platform creation",
        };
        f.write_str(name)
    }
}

/// One entry of the error queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for PostedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

//=== ErrorQueue ==========================================================

/// Multi-producer error channel drained by the owner thread.
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone)]
pub struct ErrorQueue {
    sender: Sender<PostedError>,
    receiver: Receiver<PostedError>,
}

impl ErrorQueue {
    /// Creates an independent queue.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Handle to the process-wide queue.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<ErrorQueue> = OnceLock::new();
        GLOBAL.get_or_init(ErrorQueue::new).clone()
    }

    pub fn post(&self, code: ErrorCode, message: impl Into<String>) {
        let error = PostedError { code, message: message.into() };
        warn!(target: "wm", "Posted error {}", error);

        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.sender.send(error);
    }

    /// Removes the oldest posted error.
    pub fn take(&self) -> Option<PostedError> {
        self.receiver.try_recv().ok()
    }

    /// Removes every posted error, oldest first.
    pub fn drain(&self) -> Vec<PostedError> {
        self.receiver.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new()
    }
}

//=== WmError =============================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmError {
    /// The host could not create a native window.
    PlatformCreation(HostError),

    /// `get_event` was called with nothing pending.
    EventQueueEmpty,

    /// The host failed while servicing a blocking operation.
    Host(HostError),
}

impl fmt::Display for WmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlatformCreation(e) => write!(f, "Failed to create native window: {}", e),
            Self::EventQueueEmpty => f.write_str("Event queue empty"),
            Self::Host(e) => write!(f, "Host failure: {}", e),
        }
    }
}

impl std::error::Error for WmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PlatformCreation(e) | Self::Host(e) => Some(e),
            Self::EventQueueEmpty => None,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
