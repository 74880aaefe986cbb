//=========================================================================
// Handler Slots
//=========================================================================
//
// Per-window callbacks, one optional slot per event kind. Key events are
// split into down/up slots. Dispatch to an empty slot discards the event.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

//=== Internal Dependencies ===============================================

use super::event::{Event, MouseEvent, TickEvent};

//=== Handler Types =======================================================

/// Returns `true` to veto the close.
pub type CloseHandler = Box<dyn FnMut() -> bool>;
pub type MouseHandler = Box<dyn FnMut(&MouseEvent)>;
/// Receives the host key code.
pub type KeyHandler = Box<dyn FnMut(u32)>;
pub type TickHandler = Box<dyn FnMut(&TickEvent)>;

//=== Dispatched ==========================================================

/// Outcome of routing one event through the slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatched {
    Delivered,
    Unbound,
    CloseAccepted,
    CloseVetoed,
}

//=== HandlerSlots ========================================================

#[derive(Default)]
pub(crate) struct HandlerSlots {
    pub(crate) close: Option<CloseHandler>,
    pub(crate) mouse_move: Option<MouseHandler>,
    pub(crate) mouse_down: Option<MouseHandler>,
    pub(crate) mouse_up: Option<MouseHandler>,
    pub(crate) mouse_wheel: Option<MouseHandler>,
    pub(crate) key_down: Option<KeyHandler>,
    pub(crate) key_up: Option<KeyHandler>,
    pub(crate) tick: Option<TickHandler>,
}

impl HandlerSlots {
    /// Invokes the slot bound to `event`'s kind.
    ///
    /// A close with no handler bound is accepted.
    pub(crate) fn invoke(&mut self, event: &Event) -> Dispatched {
        match event {
            Event::Close => match self.close.as_mut() {
                Some(handler) => {
                    if handler() {
                        Dispatched::CloseVetoed
                    } else {
                        Dispatched::CloseAccepted
                    }
                }
                None => Dispatched::CloseAccepted,
            },
            Event::MouseMotion(m) => Self::call(&mut self.mouse_move, m),
            Event::MouseButtonDown(m) => Self::call(&mut self.mouse_down, m),
            Event::MouseButtonUp(m) => Self::call(&mut self.mouse_up, m),
            Event::MouseWheel(m) => Self::call(&mut self.mouse_wheel, m),
            Event::Key(key) => {
                let slot = if key.pressed { &mut self.key_down } else { &mut self.key_up };
                Self::call(slot, key.code)
            }
            Event::Tick(tick) => Self::call(&mut self.tick, tick),
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    fn call<T: ?Sized, A: Copy>(slot: &mut Option<Box<T>>, arg: A) -> Dispatched
    where
        T: FnMut(A),
    {
        match slot.as_mut() {
            Some(handler) => {
                handler(arg);
                Dispatched::Delivered
            }
            None => Dispatched::Unbound,
        }
    }
}

impl fmt::Debug for HandlerSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSlots")
            .field("close", &self.close.is_some())
            .field("mouse_move", &self.mouse_move.is_some())
            .field("mouse_down", &self.mouse_down.is_some())
            .field("mouse_up", &self.mouse_up.is_some())
            .field("mouse_wheel", &self.mouse_wheel.is_some())
            .field("key_down", &self.key_down.is_some())
            .field("key_up", &self.key_up.is_some())
            .field("tick", &self.tick.is_some())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
