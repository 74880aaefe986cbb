//=========================================================================
// Winit Host
//
// Host backend on top of winit's pump-events API (X11 and Wayland on
// Linux and the BSDs, AppKit on macOS, Win32 as a fallback on Windows).
//
// Architecture:
// ```text
//  Window::poll / WindowSystem::poll
//        ↓
//  WinitHost::poll_messages
//        ↓ pump_app_events(timeout)
//  Collector (ApplicationHandler)
//        ├─ InputProcessor: WindowEvent → HostMessage
//        └─ outbox: Vec<Routed<WindowId>>
//        ↓ drained after the pump returns
//  message pump (core)
// ```
//
// Notes:
// - The event loop is created in `initialize` and can only be created
//   once per process; a second window system on this host fails to
//   initialize.
// - Pointer capture is implicit on every winit backend while a button is
//   held, so capture/release are no-ops here.
// - winit does not report every caption change back, so the last
//   caption set is cached per window.
//
//=========================================================================

//=== Submodules ==========================================================

mod input_processor;

//=== External Crates =====================================================

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window as NativeWindow, WindowId},
};

//=== Internal Imports ====================================================

use crate::core::platform_bridge::{
    Host, HostError, Placement, PollMode, Routed, WindowFlags,
};
use input_processor::InputProcessor;

//=== Collector ===========================================================

/// Receives winit callbacks during a pump and buffers translated messages.
#[derive(Default)]
struct Collector {
    outbox: Vec<Routed<WindowId>>,
    input: InputProcessor,
}

impl ApplicationHandler for Collector {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Some(message) = self.input.process_window_event(&event) {
            trace!(target: "wm::host", "{:?}: {:?}", window_id, message);
            self.outbox.push(Routed { handle: window_id, message });
        }
    }
}

//=== WinitHost ===========================================================

struct WinitWindow {
    native: NativeWindow,
    caption: String,
    visible: bool,
}

#[derive(Default)]
pub struct WinitHost {
    event_loop: Option<EventLoop<()>>,
    windows: HashMap<WindowId, WinitWindow>,
    collector: Collector,
}

impl WinitHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn window(&self, handle: WindowId) -> Result<&WinitWindow, HostError> {
        self.windows.get(&handle).ok_or(HostError::UnknownHandle)
    }

    fn window_mut(&mut self, handle: WindowId) -> Result<&mut WinitWindow, HostError> {
        self.windows.get_mut(&handle).ok_or(HostError::UnknownHandle)
    }
}

impl Host for WinitHost {
    type Handle = WindowId;

    fn initialize(&mut self) -> Result<(), HostError> {
        if self.event_loop.is_some() {
            return Ok(());
        }

        let event_loop = EventLoop::new().map_err(|e| HostError::Initialization(e.to_string()))?;
        self.event_loop = Some(event_loop);

        info!(target: "wm::host", "winit host initialized");
        Ok(())
    }

    fn shut_down(&mut self) {
        self.windows.clear();
        self.collector.outbox.clear();
        self.event_loop = None;
        info!(target: "wm::host", "winit host shut down");
    }

    fn create_window(
        &mut self,
        width: u32,
        height: u32,
        flags: WindowFlags,
    ) -> Result<WindowId, HostError> {
        let event_loop = self
            .event_loop
            .as_ref()
            .ok_or_else(|| HostError::Creation("host not initialized".into()))?;

        // winit rejects zero-area surfaces on some backends.
        let attributes = NativeWindow::default_attributes()
            .with_title("")
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
            .with_visible(!flags.hidden)
            .with_resizable(flags.resizable);

        #[allow(deprecated)]
        let native = event_loop
            .create_window(attributes)
            .map_err(|e| HostError::Creation(e.to_string()))?;

        let id = native.id();
        self.windows.insert(
            id,
            WinitWindow { native, caption: String::new(), visible: !flags.hidden },
        );

        debug!(target: "wm::host", "Created winit window {:?}", id);
        Ok(id)
    }

    fn destroy_window(&mut self, handle: WindowId) {
        if self.windows.remove(&handle).is_some() {
            debug!(target: "wm::host", "Destroyed winit window {:?}", handle);
        }
    }

    fn move_window(&mut self, handle: WindowId, placement: Placement) -> Result<(), HostError> {
        let window = self.window(handle)?;

        if let (Some(x), Some(y)) = (placement.x, placement.y) {
            window.native.set_outer_position(PhysicalPosition::new(x, y));
        }

        if placement.width.is_some() || placement.height.is_some() {
            let current = window.native.inner_size();
            let size = PhysicalSize::new(
                placement.width.unwrap_or(current.width).max(1),
                placement.height.unwrap_or(current.height).max(1),
            );
            let _ = window.native.request_inner_size(size);
        }

        Ok(())
    }

    fn set_caption(&mut self, handle: WindowId, caption: &str) -> Result<(), HostError> {
        let window = self.window_mut(handle)?;
        window.native.set_title(caption);
        window.caption = caption.to_owned();
        Ok(())
    }

    fn caption(&self, handle: WindowId) -> Result<String, HostError> {
        Ok(self.window(handle)?.caption.clone())
    }

    fn poll_messages(
        &mut self,
        _target: Option<WindowId>,
        mode: PollMode,
        out: &mut Vec<Routed<WindowId>>,
    ) -> Result<(), HostError> {
        let event_loop = self
            .event_loop
            .as_mut()
            .ok_or_else(|| HostError::Initialization("host not initialized".into()))?;

        let timeout = match mode {
            PollMode::Immediate => Some(Duration::ZERO),
            PollMode::Wait => None,
            PollMode::WaitFor(duration) => Some(duration),
        };

        if let PumpStatus::Exit(code) = event_loop.pump_app_events(timeout, &mut self.collector) {
            warn!(target: "wm::host", "winit event loop exited with code {}", code);
        }

        out.append(&mut self.collector.outbox);
        Ok(())
    }

    fn is_visible(&self, handle: WindowId) -> Result<bool, HostError> {
        let window = self.window(handle)?;
        Ok(window.native.is_visible().unwrap_or(window.visible))
    }

    fn set_visible(&mut self, handle: WindowId, visible: bool) -> Result<(), HostError> {
        let window = self.window_mut(handle)?;
        window.native.set_visible(visible);
        window.visible = visible;
        Ok(())
    }

    fn capture_pointer(&mut self, handle: WindowId) -> Result<(), HostError> {
        self.window(handle)?;
        trace!(target: "wm::host", "{:?}: pointer capture is implicit", handle);
        Ok(())
    }

    fn release_pointer(&mut self, handle: WindowId) -> Result<(), HostError> {
        self.window(handle)?;
        Ok(())
    }

    fn raw_handle(&self, handle: WindowId) -> u64 {
        u64::from(handle)
    }
}

//=========================================================================
// Tests
//=========================================================================
