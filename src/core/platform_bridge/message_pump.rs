//=========================================================================
// Message Pump
//=========================================================================
//
// Core-side half of the message pump: routes translated host messages to
// the window they belong to and turns them into queued `Event`s.
//
// Architecture:
// ```text
// Host::poll_messages ──► [Routed] ──► registry lookup ──► translate()
//                                                             │
//                         capture transitions ◄───────────────┤
//                         (host.capture_pointer / release)    ▼
//                                                      WindowState.queue
// ```
//
// Button transitions update the capture counter before the Event is
// built, so its bitmask reflects the state after the transition. Stray
// transitions (press of a held button, release of a button that is not
// held) are dropped here and never reach the counter.
//
// Capture loss releases every held button at once, in index order, with a
// synthesized button-up event per button. The host has already dropped
// capture, so it is not asked to release it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Weak;

use log::{debug, trace, warn};

//=== Internal Dependencies ===============================================

use super::interface::{Host, HostError, HostMessage, PollMode, Routed};
use crate::core::capture::{CaptureTransition, MAX_BUTTONS};
use crate::core::event::{Event, KeyEvent, MouseEvent};
use crate::core::window::WindowState;

/// Live windows by native handle. Entries whose window is gone are skipped.
pub(crate) type Registry<K> = HashMap<K, Weak<RefCell<WindowState>>>;

//=== Pump ================================================================

/// Polls the host once and appends the resulting events to their windows.
///
/// Returns the number of events produced. `scratch` is reused between
/// calls to avoid reallocating the routed-message buffer.
pub(crate) fn pump<H: Host>(
    host: &mut H,
    registry: &Registry<H::Handle>,
    target: Option<H::Handle>,
    mode: PollMode,
    scratch: &mut Vec<Routed<H::Handle>>,
) -> Result<usize, HostError> {
    scratch.clear();
    host.poll_messages(target, mode, scratch)?;

    let mut produced = 0;
    for routed in scratch.drain(..) {
        let Some(state) = registry.get(&routed.handle).and_then(Weak::upgrade) else {
            trace!(target: "wm::pump", "Dropped {:?} for unknown window {:?}", routed.message, routed.handle);
            continue;
        };

        let mut state = state.borrow_mut();
        if routed.message == HostMessage::CaptureLost {
            produced += lose_capture(routed.handle, &mut state);
            continue;
        }

        if let Some(event) = translate(host, routed.handle, &mut state, routed.message) {
            trace!(target: "wm::pump", "{:?} -> {:?}", routed.handle, event);
            state.queue.append(event);
            produced += 1;
        }
    }

    Ok(produced)
}

//=== Translation =========================================================

/// Applies `message` to the window state and builds the matching event.
pub(crate) fn translate<H: Host>(
    host: &mut H,
    handle: H::Handle,
    state: &mut WindowState,
    message: HostMessage,
) -> Option<Event> {
    match message {
        HostMessage::PointerMoved { x, y } => {
            state.pointer = (x, y);
            Some(Event::MouseMotion(state.mouse_snapshot(0, 0)))
        }

        HostMessage::Button { index, pressed } => translate_button(host, handle, state, index, pressed),

        HostMessage::Wheel { delta } => Some(Event::MouseWheel(state.mouse_snapshot(0, delta))),

        HostMessage::Key { code, pressed } => {
            if pressed {
                state.keys.insert(code);
            } else {
                state.keys.remove(&code);
            }
            Some(Event::Key(KeyEvent { pressed, code }))
        }

        HostMessage::CaptureLost => {
            lose_capture(handle, state);
            None
        }

        HostMessage::CloseRequested => Some(Event::Close),
    }
}

/// Releases every held button, queueing one button-up event each.
///
/// Returns the number of events queued.
fn lose_capture<K: fmt::Debug>(handle: K, state: &mut WindowState) -> usize {
    let held = state.capture.buttons();
    if held == 0 {
        return 0;
    }

    debug!(target: "wm::pump", "Pointer capture lost by {:?} (buttons 0b{:b})", handle, held);

    let mut produced = 0;
    for index in (0..MAX_BUTTONS).filter(|index| held & (1 << index) != 0) {
        state.capture.release(index);
        let up = state.mouse_snapshot(index, 0);
        state.queue.append(Event::MouseButtonUp(up));
        produced += 1;
    }
    produced
}

fn translate_button<H: Host>(
    host: &mut H,
    handle: H::Handle,
    state: &mut WindowState,
    index: u32,
    pressed: bool,
) -> Option<Event> {
    if index >= MAX_BUTTONS {
        trace!(target: "wm::pump", "Discarded button {} beyond bitmask", index);
        return None;
    }

    if state.capture.is_held(index) == pressed {
        debug!(
            target: "wm::pump",
            "Ignored stray {} of button {} on {:?}",
            if pressed { "press" } else { "release" },
            index,
            handle
        );
        return None;
    }

    let transition = if pressed {
        state.capture.press(index)
    } else {
        state.capture.release(index)
    };

    match transition {
        CaptureTransition::Acquire => {
            debug!(target: "wm::pump", "Pointer capture acquired by {:?}", handle);
            if let Err(e) = host.capture_pointer(handle) {
                warn!(target: "wm::host", "Failed to capture pointer: {}", e);
            }
        }
        CaptureTransition::Release => {
            debug!(target: "wm::pump", "Pointer capture released by {:?}", handle);
            if let Err(e) = host.release_pointer(handle) {
                warn!(target: "wm::host", "Failed to release pointer: {}", e);
            }
        }
        CaptureTransition::Unchanged => {}
    }

    let mouse: MouseEvent = state.mouse_snapshot(index, 0);
    Some(if pressed {
        Event::MouseButtonDown(mouse)
    } else {
        Event::MouseButtonUp(mouse)
    })
}

//=========================================================================
// Unit Tests
//=========================================================================
