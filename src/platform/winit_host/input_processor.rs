//=========================================================================
// Input Processor
//=========================================================================
//
// Converts winit window events into host messages.
//
// Architecture:
//   WindowEvent → InputProcessor → HostMessage → message pump
//
// Only the fixed mapping table below is translated; every other winit
// event returns `None` and is discarded. Keys are passed through as the
// platform scancode, with no key mapping of our own. Losing focus is
// reported as capture loss, since winit's implicit grab ends with it.
//
//=========================================================================

//=== External Dependencies ===============================================

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{NativeKeyCode, PhysicalKey},
    platform::scancode::PhysicalKeyExtScancode,
};

//=== Internal Dependencies ===============================================

use crate::core::platform_bridge::HostMessage;

/// Wheel units per line, matching the Win32 `WHEEL_DELTA`.
const WHEEL_UNITS_PER_LINE: f64 = 120.0;

//=== InputProcessor ======================================================

#[derive(Debug, Default)]
pub(crate) struct InputProcessor;

impl InputProcessor {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new() -> Self {
        Self
    }

    //--- Event Processing -------------------------------------------------

    /// Translates one window event, or `None` if it is outside the table.
    pub(crate) fn process_window_event(&self, event: &WindowEvent) -> Option<HostMessage> {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(HostMessage::CloseRequested),
            WindowEvent::Focused(false) => Some(HostMessage::CaptureLost),
            WindowEvent::CursorMoved { position, .. } => Some(self.process_mouse_move(*position)),
            WindowEvent::MouseInput { state, button, .. } => Some(self.process_mouse_button(*button, *state)),
            WindowEvent::MouseWheel { delta, .. } => self.process_wheel(*delta),
            WindowEvent::KeyboardInput { event, .. } => self.process_key_event(event),
            _ => None,
        }
    }

    /// Converts a winit KeyEvent.
    pub(crate) fn process_key_event(&self, key_event: &KeyEvent) -> Option<HostMessage> {
        self.process_key(key_event.physical_key, key_event.state)
    }

    /// Keys the platform could not identify at all are dropped; some
    /// backends would otherwise report them under a placeholder scancode.
    pub(crate) fn process_key(&self, key: PhysicalKey, state: ElementState) -> Option<HostMessage> {
        if key == PhysicalKey::Unidentified(NativeKeyCode::Unidentified) {
            return None;
        }
        let code = key.to_scancode()?;
        Some(HostMessage::Key { code, pressed: state.is_pressed() })
    }

    pub(crate) fn process_mouse_button(&self, button: WinitMouseButton, state: ElementState) -> HostMessage {
        HostMessage::Button {
            index: button_index(button),
            pressed: state.is_pressed(),
        }
    }

    /// Client-area position, rounded down to whole pixels.
    pub(crate) fn process_mouse_move(&self, position: PhysicalPosition<f64>) -> HostMessage {
        HostMessage::PointerMoved {
            x: position.x.floor() as i32,
            y: position.y.floor() as i32,
        }
    }

    /// Vertical wheel rotation; horizontal-only scrolling is dropped.
    pub(crate) fn process_wheel(&self, delta: MouseScrollDelta) -> Option<HostMessage> {
        let units = match delta {
            MouseScrollDelta::LineDelta(_, y) => f64::from(y) * WHEEL_UNITS_PER_LINE,
            MouseScrollDelta::PixelDelta(position) => position.y,
        };

        let delta = units.round() as i32;
        (delta != 0).then_some(HostMessage::Wheel { delta })
    }
}

//=========================================================================
// Winit Conversions
//=========================================================================

/// Zero-based button index: left 0, right 1, middle 2, back 3, forward 4.
///
/// `Other(n)` keeps winit's numbering, which already starts past the
/// named buttons on every backend.
pub(crate) fn button_index(button: WinitMouseButton) -> u32 {
    match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Right => 1,
        WinitMouseButton::Middle => 2,
        WinitMouseButton::Back => 3,
        WinitMouseButton::Forward => 4,
        WinitMouseButton::Other(n) => u32::from(n),
    }
}

//=========================================================================
// Tests
//=========================================================================
