//=========================================================================
// Headless Host
//=========================================================================
//
// In-process host with no native display.
//
// Windows are plain records; messages are injected through a shared
// `HeadlessDisplay` handle and delivered on the next poll, exactly as a
// native host would deliver them. Used for tests, servers and replay.
//
// Blocking semantics: `Wait` and `WaitFor` deliver exactly one pending
// message. With nothing pending there is no source that could ever wake
// the caller: `Wait` fails with `HostError::WouldBlock` instead of hanging,
// and `WaitFor` sleeps out its timeout and returns empty.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::thread;

use log::{debug, info, trace};

//=== Internal Dependencies ===============================================

use crate::core::platform_bridge::{
    Host, HostError, HostMessage, Placement, PollMode, Routed, WindowFlags,
};

//=== HeadlessHandle ======================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessHandle(u64);

impl HeadlessHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

//=== Display State =======================================================

/// Geometry and presentation of one headless window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessWindow {
    pub caption: String,
    pub visible: bool,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub flags: WindowFlags,
}

#[derive(Debug, Default)]
struct DisplayState {
    next_id: u64,
    windows: HashMap<HeadlessHandle, HeadlessWindow>,
    pending: VecDeque<Routed<HeadlessHandle>>,
    captured: Option<HeadlessHandle>,
    fail_next_create: Option<String>,
    initialized: bool,
    init_count: u32,
    shutdown_count: u32,
}

//=== HeadlessDisplay =====================================================

/// Shared view of a headless host's display.
///
/// Remains usable after the host has been moved into a window system.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDisplay {
    state: Rc<RefCell<DisplayState>>,
}

impl HeadlessDisplay {
    //--- Injection --------------------------------------------------------

    /// Queues a message as if the host had produced it for `handle`.
    ///
    /// `CaptureLost` also drops the host-side capture, as a native host
    /// would have before reporting it.
    pub fn inject(&self, handle: HeadlessHandle, message: HostMessage) {
        let mut state = self.state.borrow_mut();
        if message == HostMessage::CaptureLost && state.captured == Some(handle) {
            state.captured = None;
        }
        state.pending.push_back(Routed { handle, message });
    }

    /// Makes the next `create_window` fail with `reason`.
    pub fn fail_next_create(&self, reason: impl Into<String>) {
        self.state.borrow_mut().fail_next_create = Some(reason.into());
    }

    //--- Inspection -------------------------------------------------------

    pub fn window(&self, handle: HeadlessHandle) -> Option<HeadlessWindow> {
        self.state.borrow().windows.get(&handle).cloned()
    }

    pub fn live_windows(&self) -> usize {
        self.state.borrow().windows.len()
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn is_captured(&self, handle: HeadlessHandle) -> bool {
        self.state.borrow().captured == Some(handle)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.borrow().initialized
    }

    /// Number of `(initialize, shut_down)` calls seen so far.
    pub fn lifecycle_counts(&self) -> (u32, u32) {
        let state = self.state.borrow();
        (state.init_count, state.shutdown_count)
    }
}

//=== HeadlessHost ========================================================

#[derive(Debug, Default)]
pub struct HeadlessHost {
    display: HeadlessDisplay,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for injecting messages and inspecting windows.
    pub fn display(&self) -> HeadlessDisplay {
        self.display.clone()
    }

    fn with_window<T>(
        &self,
        handle: HeadlessHandle,
        f: impl FnOnce(&mut HeadlessWindow) -> T,
    ) -> Result<T, HostError> {
        let mut state = self.display.state.borrow_mut();
        state.windows.get_mut(&handle).map(f).ok_or(HostError::UnknownHandle)
    }
}

impl Host for HeadlessHost {
    type Handle = HeadlessHandle;

    fn initialize(&mut self) -> Result<(), HostError> {
        let mut state = self.display.state.borrow_mut();
        state.initialized = true;
        state.init_count += 1;
        info!(target: "wm::host", "Headless host initialized");
        Ok(())
    }

    fn shut_down(&mut self) {
        let mut state = self.display.state.borrow_mut();
        state.initialized = false;
        state.shutdown_count += 1;
        state.pending.clear();
        info!(target: "wm::host", "Headless host shut down");
    }

    fn create_window(
        &mut self,
        width: u32,
        height: u32,
        flags: WindowFlags,
    ) -> Result<HeadlessHandle, HostError> {
        let mut state = self.display.state.borrow_mut();

        if let Some(reason) = state.fail_next_create.take() {
            return Err(HostError::Creation(reason));
        }
        if !state.initialized {
            return Err(HostError::Creation("host not initialized".into()));
        }

        state.next_id += 1;
        let handle = HeadlessHandle(state.next_id);
        state.windows.insert(
            handle,
            HeadlessWindow {
                caption: String::new(),
                visible: !flags.hidden,
                x: 0,
                y: 0,
                width,
                height,
                flags,
            },
        );

        debug!(target: "wm::host", "Created headless window {:?} ({}x{})", handle, width, height);
        Ok(handle)
    }

    fn destroy_window(&mut self, handle: HeadlessHandle) {
        let mut state = self.display.state.borrow_mut();
        state.windows.remove(&handle);
        state.pending.retain(|routed| routed.handle != handle);
        if state.captured == Some(handle) {
            state.captured = None;
        }
    }

    fn move_window(&mut self, handle: HeadlessHandle, placement: Placement) -> Result<(), HostError> {
        self.with_window(handle, |window| {
            window.x = placement.x.unwrap_or(window.x);
            window.y = placement.y.unwrap_or(window.y);
            window.width = placement.width.unwrap_or(window.width);
            window.height = placement.height.unwrap_or(window.height);
        })
    }

    fn set_caption(&mut self, handle: HeadlessHandle, caption: &str) -> Result<(), HostError> {
        self.with_window(handle, |window| window.caption = caption.to_owned())
    }

    fn caption(&self, handle: HeadlessHandle) -> Result<String, HostError> {
        self.with_window(handle, |window| window.caption.clone())
    }

    fn poll_messages(
        &mut self,
        _target: Option<HeadlessHandle>,
        mode: PollMode,
        out: &mut Vec<Routed<HeadlessHandle>>,
    ) -> Result<(), HostError> {
        let mut state = self.display.state.borrow_mut();

        match mode {
            PollMode::Immediate => out.extend(state.pending.drain(..)),
            PollMode::Wait => {
                let routed = state.pending.pop_front().ok_or(HostError::WouldBlock)?;
                out.push(routed);
            }
            PollMode::WaitFor(timeout) => match state.pending.pop_front() {
                Some(routed) => out.push(routed),
                None => {
                    drop(state);
                    thread::sleep(timeout);
                }
            },
        }

        trace!(target: "wm::host", "Headless poll ({:?}) delivered {} messages", mode, out.len());
        Ok(())
    }

    fn is_visible(&self, handle: HeadlessHandle) -> Result<bool, HostError> {
        self.with_window(handle, |window| window.visible)
    }

    fn set_visible(&mut self, handle: HeadlessHandle, visible: bool) -> Result<(), HostError> {
        self.with_window(handle, |window| window.visible = visible)
    }

    fn capture_pointer(&mut self, handle: HeadlessHandle) -> Result<(), HostError> {
        self.with_window(handle, |_| ())?;
        self.display.state.borrow_mut().captured = Some(handle);
        Ok(())
    }

    fn release_pointer(&mut self, handle: HeadlessHandle) -> Result<(), HostError> {
        let mut state = self.display.state.borrow_mut();
        if state.captured == Some(handle) {
            state.captured = None;
        }
        Ok(())
    }

    fn raw_handle(&self, handle: HeadlessHandle) -> u64 {
        handle.0
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
