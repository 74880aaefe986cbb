//=========================================================================
// Event Queue
//=========================================================================
//
// Ordered buffer of pending events owned by one window.
//
// Architecture:
//   message pump → append() → [ oldest … newest ] → take_next() → dispatch
//
// Drain order: events are appended at the tail. By default they are also
// taken from the tail (newest first), which is the delivery order callers
// of this subsystem have always observed. `DrainOrder::OldestFirst` takes
// from the head instead.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;

//=== Internal Dependencies ===============================================

use super::event::{Event, EventKind};

//=== DrainOrder ==========================================================

/// End of the queue that `take_next`/`peek_next` read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainOrder {
    /// Most recently appended event first (LIFO).
    #[default]
    NewestFirst,

    /// Oldest event first (FIFO).
    OldestFirst,
}

//=== EventQueue ==========================================================

/// Pending events of a single window.
#[derive(Debug, Clone)]
pub struct EventQueue {
    events: VecDeque<Event>,
    order: DrainOrder,
}

impl EventQueue {
    //--- Construction -----------------------------------------------------

    pub fn new(order: DrainOrder) -> Self {
        const BASE_CAPACITY: usize = 32;

        Self {
            events: VecDeque::with_capacity(BASE_CAPACITY),
            order,
        }
    }

    //--- Mutation ---------------------------------------------------------

    /// Adds an event at the tail.
    pub fn append(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Removes and returns the next event according to the drain order.
    pub fn take_next(&mut self) -> Option<Event> {
        match self.order {
            DrainOrder::NewestFirst => self.events.pop_back(),
            DrainOrder::OldestFirst => self.events.pop_front(),
        }
    }

    /// Returns the event `take_next` would return, without removing it.
    pub fn peek_next(&self) -> Option<&Event> {
        match self.order {
            DrainOrder::NewestFirst => self.events.back(),
            DrainOrder::OldestFirst => self.events.front(),
        }
    }

    /// Drops every pending event, keeping the allocation.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    //--- Queries ----------------------------------------------------------

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns `true` if an event of `kind` is pending.
    pub fn contains_kind(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.kind() == kind)
    }

    pub fn order(&self) -> DrainOrder {
        self.order
    }

    pub fn set_order(&mut self, order: DrainOrder) {
        self.order = order;
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DrainOrder::default())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
