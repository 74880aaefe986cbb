//=========================================================================
// Window
//=========================================================================
//
// One top-level native window: owns its handle, event queue, capture
// counter, tick clock and handler slots.
//
// Lifecycle:
// ```text
//   WindowBuilder::build()
//         │
//         ├─ host ok ───► Open ──(Close accepted)──► Closing ──drop──► (gone)
//         │
//         └─ host failed + tolerate ──► Created (no handle, degraded)
// ```
//
// Drop order: render context, then native handle, then the window
// system acquisition.
//
// Shared state: the pump writes into `WindowState` through a weak
// registry entry, so a poll on any window (or on the system) routes host
// messages to the right queue. Handlers live on the `Window` itself and
// are never called while `WindowState` is borrowed.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{debug, error, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::capture::CaptureCounter;
use super::error::{ErrorCode, WmError};
use super::event::{Event, EventKind, MouseEvent, TickEvent};
use super::event_queue::{DrainOrder, EventQueue};
use super::handlers::{Dispatched, HandlerSlots};
use super::platform_bridge::{Host, HostError, Placement, PollMode, WindowFlags};
use super::tick_clock::TickClock;
use crate::platform::DefaultHost;
use crate::system::WindowSystem;

//=== WindowState =========================================================

/// Pump-facing half of a window.
#[derive(Debug)]
pub(crate) struct WindowState {
    pub(crate) queue: EventQueue,
    pub(crate) capture: CaptureCounter,
    pub(crate) pointer: (i32, i32),
    pub(crate) keys: HashSet<u32>,
}

impl WindowState {
    pub(crate) fn new(order: DrainOrder) -> Self {
        Self {
            queue: EventQueue::new(order),
            capture: CaptureCounter::new(),
            pointer: (0, 0),
            keys: HashSet::new(),
        }
    }

    /// Current pointer state as an event payload.
    pub(crate) fn mouse_snapshot(&self, button: u32, wheel: i32) -> MouseEvent {
        MouseEvent {
            x: self.pointer.0,
            y: self.pointer.1,
            buttons: self.capture.buttons(),
            wheel,
            button,
        }
    }
}

//=== Lifecycle ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed without a native handle.
    Created,

    /// Native window live and accepting events.
    Open,

    /// Close accepted; the window is hidden and no longer dispatches.
    Closing,
}

//=== RenderContext =======================================================

/// Rendering resources bound to a window's native handle.
///
/// Released before the handle is destroyed.
pub trait RenderContext {
    fn release(&mut self);
}

//=== WindowBuilder =======================================================

/// Builder for a [`Window`], obtained from [`WindowSystem::window`].
///
/// # Default Values
///
/// - **Size**: 0 x 0
/// - **Caption**: host default
/// - **Tick rate**: 0 (disabled)
/// - **Drain order**: newest first
/// - **Creation failure**: returned as `Err`
pub struct WindowBuilder<H: Host = DefaultHost> {
    system: WindowSystem<H>,
    width: u32,
    height: u32,
    caption: Option<String>,
    flags: WindowFlags,
    tick_rate: u32,
    drain_order: DrainOrder,
    tolerate_failure: bool,
}

impl<H: Host> WindowBuilder<H> {
    pub(crate) fn new(system: WindowSystem<H>) -> Self {
        Self {
            system,
            width: 0,
            height: 0,
            caption: None,
            flags: WindowFlags::default(),
            tick_rate: 0,
            drain_order: DrainOrder::default(),
            tolerate_failure: false,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// # Panics
    ///
    /// Panics if `caption` contains a NUL character.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        assert!(!caption.contains('\0'), "Caption must not contain NUL, got {:?}", caption);
        self.caption = Some(caption);
        self
    }

    pub fn with_flags(mut self, flags: WindowFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Tick interval in milliseconds. Zero disables ticking.
    pub fn with_tick_rate(mut self, interval_ms: u32) -> Self {
        self.tick_rate = interval_ms;
        self
    }

    pub fn with_drain_order(mut self, order: DrainOrder) -> Self {
        self.drain_order = order;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.flags.hidden = !visible;
        self
    }

    /// Return a degraded window instead of an error when the host cannot
    /// create the native window.
    pub fn tolerate_creation_failure(mut self, tolerate: bool) -> Self {
        self.tolerate_failure = tolerate;
        self
    }

    /// Creates the native window.
    ///
    /// A host failure is posted to the error queue as
    /// `ErrorCode::PlatformCreation` in every case.
    pub fn build(self) -> Result<Window<H>, WmError> {
        let Self {
            system,
            width,
            height,
            caption,
            flags,
            tick_rate,
            drain_order,
            tolerate_failure,
        } = self;

        system.acquire();

        let state = Rc::new(RefCell::new(WindowState::new(drain_order)));
        let handle = match system.with_host(|host| host.create_window(width, height, flags)) {
            Ok(handle) => {
                system.register(handle, Rc::downgrade(&state));
                Some(handle)
            }
            Err(e) => {
                error!(target: "wm", "Failed to create {}x{} window: {}", width, height, e);
                system.error_queue().post(ErrorCode::PlatformCreation, e.to_string());

                if !tolerate_failure {
                    system.release();
                    return Err(WmError::PlatformCreation(e));
                }
                None
            }
        };

        let mut tick = TickClock::new();
        tick.set_interval(tick_rate, system.now_ms());

        let window = Window {
            render_context: None,
            handlers: HandlerSlots::default(),
            state,
            tick,
            handle,
            width,
            height,
            lifecycle: if handle.is_some() { Lifecycle::Open } else { Lifecycle::Created },
            system,
        };

        if let Some(caption) = caption {
            window.set_caption(&caption);
        }

        info!(target: "wm", "Created {} ({}x{})", window, width, height);
        Ok(window)
    }
}

//=== Window ==============================================================

/// A top-level native window and its event stream.
///
/// Not `Send`: a window lives on the thread that owns its window system.
pub struct Window<H: Host = DefaultHost> {
    render_context: Option<Box<dyn RenderContext>>,
    handlers: HandlerSlots,
    state: Rc<RefCell<WindowState>>,
    tick: TickClock,
    handle: Option<H::Handle>,
    width: u32,
    height: u32,
    lifecycle: Lifecycle,
    system: WindowSystem<H>,
}

impl<H: Host> Window<H> {
    //=== Identity ========================================================

    pub fn handle(&self) -> Option<H::Handle> {
        self.handle
    }

    /// Numeric identity of the native handle.
    pub fn raw_handle(&self) -> Option<u64> {
        self.handle
            .map(|handle| self.system.with_host(|host| host.raw_handle(handle)))
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn closed(&self) -> bool {
        self.lifecycle == Lifecycle::Closing
    }

    pub fn system(&self) -> &WindowSystem<H> {
        &self.system
    }

    //=== Host Properties =================================================

    pub fn caption(&self) -> String {
        self.host_op("caption", |host, handle| host.caption(handle))
            .unwrap_or_default()
    }

    pub fn set_caption(&self, caption: &str) {
        if caption.contains('\0') {
            self.system.error_queue().post(
                ErrorCode::InvalidArgument,
                format!("set_caption: caption contains NUL: {:?}", caption),
            );
            return;
        }
        self.host_op("set_caption", |host, handle| host.set_caption(handle, caption));
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resizes the window and pumps once so the host applies the change.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.host_op("set_size", |host, handle| host.move_window(handle, Placement::size(width, height)));
        self.pump_host(PollMode::Immediate);
    }

    pub fn set_position(&self, x: i32, y: i32) {
        self.host_op("set_position", |host, handle| host.move_window(handle, Placement::position(x, y)));
    }

    pub fn visible(&self) -> bool {
        self.host_op("visible", |host, handle| host.is_visible(handle))
            .unwrap_or(false)
    }

    pub fn set_visible(&self, visible: bool) {
        self.host_op("set_visible", |host, handle| host.set_visible(handle, visible));
    }

    //=== Input State =====================================================

    /// Last known pointer position and held-button bitmask.
    pub fn mouse_state(&self) -> (i32, i32, u32) {
        let state = self.state.borrow();
        (state.pointer.0, state.pointer.1, state.capture.buttons())
    }

    /// Returns `true` while the key with host code `code` is held.
    pub fn key_state(&self, code: u32) -> bool {
        self.state.borrow().keys.contains(&code)
    }

    //=== Tick ============================================================

    /// Tick interval in milliseconds; zero when disabled.
    pub fn tick_rate(&self) -> u32 {
        self.tick.interval()
    }

    /// Sets the tick interval and restarts the period from now.
    pub fn set_tick_rate(&mut self, interval_ms: u32) {
        let now = self.system.now_ms();
        self.tick.set_interval(interval_ms, now);
    }

    //=== Event Queue =====================================================

    pub fn drain_order(&self) -> DrainOrder {
        self.state.borrow().queue.order()
    }

    pub fn set_drain_order(&self, order: DrainOrder) {
        self.state.borrow_mut().queue.set_order(order);
    }

    /// Pending events, counting a tick that is due but not yet queued.
    pub fn event_count(&self) -> usize {
        let state = self.state.borrow();
        let virtual_tick = !state.queue.contains_kind(EventKind::Tick) && self.due_tick().is_some();
        state.queue.len() + usize::from(virtual_tick)
    }

    /// The event `get_event` would return, without removing it.
    pub fn peek_event(&self) -> Option<Event> {
        let queued = self.state.borrow().queue.peek_next().copied();
        queued.or_else(|| self.due_tick().map(Event::Tick))
    }

    /// Removes and returns the next pending event.
    ///
    /// With the queue empty, a due tick is claimed and returned.
    pub fn get_event(&self) -> Result<Event, WmError> {
        let queued = self.state.borrow_mut().queue.take_next();
        if let Some(event) = queued {
            return Ok(event);
        }

        self.claim_tick().map(Event::Tick).ok_or(WmError::EventQueueEmpty)
    }

    /// Blocks on the host until an event is available and returns it.
    ///
    /// When ticking, the wait is bounded by the time until the next tick.
    /// Returns `EventQueueEmpty` when nothing can ever arrive: the window is
    /// degraded, the host has no message source, or a timed wait ran out
    /// while the time source stood still.
    pub fn wait_event(&self) -> Result<Event, WmError> {
        loop {
            match self.get_event() {
                Err(WmError::EventQueueEmpty) => {}
                result => return result,
            }

            if self.handle.is_none() {
                return Err(WmError::EventQueueEmpty);
            }

            let before = self.system.now_ms();
            let mode = match self.tick.until_due(before) {
                Some(ms) if self.is_visible_quiet() => PollMode::WaitFor(Duration::from_millis(ms)),
                _ => PollMode::Wait,
            };

            let started = Instant::now();
            match self.system.pump(self.handle, mode) {
                Ok(0) => {
                    if let PollMode::WaitFor(timeout) = mode {
                        let waited = started.elapsed() >= timeout;
                        let advanced = self.system.now_ms().saturating_sub(before);
                        if waited && u128::from(advanced) < timeout.as_millis() {
                            trace!(target: "wm::tick", "{} waited {:?} but the clock stood still", self, timeout);
                            return self.get_event();
                        }
                    }
                }
                Ok(_) => {}
                Err(HostError::WouldBlock) => return Err(WmError::EventQueueEmpty),
                Err(e) => return Err(WmError::Host(e)),
            }
        }
    }

    /// Appends `event` to this window's queue as if the host produced it.
    pub fn send_event(&self, event: Event) {
        self.state.borrow_mut().queue.append(event);
    }

    //=== Polling & Dispatch ==============================================

    /// Pumps host messages and dispatches every pending event.
    ///
    /// With `wait`, blocks until at least one host message arrives.
    /// Returns `false` once the window is closed.
    pub fn poll(&mut self, wait: bool) -> bool {
        if self.closed() {
            return false;
        }

        let mode = if wait { PollMode::Wait } else { PollMode::Immediate };
        self.pump_host(mode);
        self.dispatch_pending();

        !self.closed()
    }

    /// Dispatches queued events (plus a due tick) without touching the host.
    pub(crate) fn dispatch_pending(&mut self) {
        if let Some(tick) = self.claim_tick() {
            trace!(target: "wm::tick", "{} tick {} (+{} ms)", self, tick.tick, tick.elapsed);
            self.state.borrow_mut().queue.append(Event::Tick(tick));
        }

        while !self.closed() {
            let next = self.state.borrow_mut().queue.take_next();
            let Some(event) = next else {
                break;
            };
            self.dispatch(event);
        }
    }

    /// Routes one event to its handler slot. Close applies the veto rule.
    pub fn dispatch(&mut self, event: Event) {
        if self.closed() {
            trace!(target: "wm", "{} is closed, dropped {:?}", self, event);
            return;
        }

        match self.handlers.invoke(&event) {
            Dispatched::CloseAccepted => self.finish_close(),
            Dispatched::CloseVetoed => debug!(target: "wm", "Close of {} vetoed by handler", self),
            Dispatched::Delivered | Dispatched::Unbound => {}
        }
    }

    /// Requests a close, subject to the close handler's veto.
    ///
    /// Returns `true` if the window is now closed.
    pub fn close(&mut self) -> bool {
        self.dispatch(Event::Close);
        self.closed()
    }

    fn finish_close(&mut self) {
        self.lifecycle = Lifecycle::Closing;
        if self.handle.is_some() {
            self.set_visible(false);
        }
        info!(target: "wm", "{} closed", self);
    }

    //=== Handler Binding =================================================

    /// Return `true` from `handler` to keep the window open.
    pub fn on_close(&mut self, handler: impl FnMut() -> bool + 'static) {
        self.handlers.close = Some(Box::new(handler));
    }

    pub fn on_mouse_move(&mut self, handler: impl FnMut(&MouseEvent) + 'static) {
        self.handlers.mouse_move = Some(Box::new(handler));
    }

    pub fn on_mouse_down(&mut self, handler: impl FnMut(&MouseEvent) + 'static) {
        self.handlers.mouse_down = Some(Box::new(handler));
    }

    pub fn on_mouse_up(&mut self, handler: impl FnMut(&MouseEvent) + 'static) {
        self.handlers.mouse_up = Some(Box::new(handler));
    }

    pub fn on_mouse_wheel(&mut self, handler: impl FnMut(&MouseEvent) + 'static) {
        self.handlers.mouse_wheel = Some(Box::new(handler));
    }

    pub fn on_key_down(&mut self, handler: impl FnMut(u32) + 'static) {
        self.handlers.key_down = Some(Box::new(handler));
    }

    pub fn on_key_up(&mut self, handler: impl FnMut(u32) + 'static) {
        self.handlers.key_up = Some(Box::new(handler));
    }

    pub fn on_tick(&mut self, handler: impl FnMut(&TickEvent) + 'static) {
        self.handlers.tick = Some(Box::new(handler));
    }

    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    //=== Render Context ==================================================

    /// Associates a rendering context, returning the previous one unreleased.
    pub fn attach_render_context(
        &mut self,
        context: Box<dyn RenderContext>,
    ) -> Option<Box<dyn RenderContext>> {
        self.render_context.replace(context)
    }

    pub fn render_context(&self) -> Option<&dyn RenderContext> {
        self.render_context.as_deref()
    }

    pub fn render_context_mut(&mut self) -> Option<&mut (dyn RenderContext + 'static)> {
        self.render_context.as_deref_mut()
    }

    pub fn detach_render_context(&mut self) -> Option<Box<dyn RenderContext>> {
        self.render_context.take()
    }

    //=== Internals =======================================================

    /// Runs a host operation on this window's handle.
    ///
    /// Failures are posted to the error queue and yield `None`.
    fn host_op<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut H, H::Handle) -> Result<T, HostError>,
    ) -> Option<T> {
        let Some(handle) = self.handle else {
            self.system.error_queue().post(
                ErrorCode::InvalidArgument,
                format!("{}: window has no native handle", operation),
            );
            return None;
        };

        match self.system.with_host(|host| f(host, handle)) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(target: "wm::host", "{} on {:?} failed: {}", operation, handle, e);
                let code = match e {
                    HostError::InvalidArgument(_) | HostError::UnknownHandle => ErrorCode::InvalidArgument,
                    _ => ErrorCode::General,
                };
                self.system.error_queue().post(code, format!("{}: {}", operation, e));
                None
            }
        }
    }

    fn pump_host(&self, mode: PollMode) {
        if self.handle.is_none() {
            return;
        }
        match self.system.pump(self.handle, mode) {
            Ok(_) => {}
            Err(HostError::WouldBlock) => {
                trace!(target: "wm::pump", "Nothing to wait for on {}", self);
            }
            Err(e) => {
                warn!(target: "wm::pump", "Message pump for {} failed: {}", self, e);
                self.system.error_queue().post(ErrorCode::General, format!("poll: {}", e));
            }
        }
    }

    /// Visibility without posting errors; degraded windows are invisible.
    fn is_visible_quiet(&self) -> bool {
        self.handle.is_some_and(|handle| {
            self.system
                .with_host(|host| host.is_visible(handle))
                .unwrap_or(false)
        })
    }

    fn due_tick(&self) -> Option<TickEvent> {
        let due = self.tick.due(self.system.now_ms())?;
        self.is_visible_quiet().then_some(due)
    }

    fn claim_tick(&self) -> Option<TickEvent> {
        let now = self.system.now_ms();
        self.tick.due(now)?;
        if !self.is_visible_quiet() {
            return None;
        }
        self.tick.claim(now)
    }
}

//=== Trait Implementations ===============================================

impl<H: Host> fmt::Display for Window<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_handle() {
            Some(raw) => write!(f, "<Window:0x{:x}>", raw),
            None => f.write_str("<Window:none>"),
        }
    }
}

impl<H: Host> fmt::Debug for Window<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("handle", &self.handle)
            .field("size", &(self.width, self.height))
            .field("lifecycle", &self.lifecycle)
            .field("tick_rate", &self.tick.interval())
            .field("handlers", &self.handlers)
            .field("render_context", &self.render_context.is_some())
            .finish()
    }
}

impl<H: Host> Drop for Window<H> {
    fn drop(&mut self) {
        if let Some(mut context) = self.render_context.take() {
            context.release();
        }

        if let Some(handle) = self.handle.take() {
            self.system.destroy_window(handle);
            debug!(target: "wm", "Destroyed native window {:?}", handle);
        }

        self.system.release();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorQueue;
    use crate::core::event::KeyEvent;
    use crate::core::platform_bridge::HostMessage;
    use crate::core::tick_clock::{ManualClock, MonotonicClock};
    use crate::platform::headless::{HeadlessDisplay, HeadlessHost};
    use crate::system::WindowSystemBuilder;
    use std::cell::Cell;

    //=====================================================================
    // Helpers
    //=====================================================================

    struct Fixture {
        system: WindowSystem<HeadlessHost>,
        display: HeadlessDisplay,
        clock: ManualClock,
        errors: ErrorQueue,
    }

    fn fixture() -> Fixture {
        let host = HeadlessHost::new();
        let display = host.display();
        let clock = ManualClock::new(1_000);
        let errors = ErrorQueue::new();

        let system = WindowSystemBuilder::with_host(host)
            .with_time_source(clock.clone())
            .with_error_queue(errors.clone())
            .build()
            .expect("headless system builds");

        Fixture { system, display, clock, errors }
    }

    fn open(fx: &Fixture) -> Window<HeadlessHost> {
        fx.system.create_window(0, 0).expect("headless window")
    }

    fn handle_of(window: &Window<HeadlessHost>) -> crate::platform::headless::HeadlessHandle {
        window.handle().expect("window has a handle")
    }

    fn mouse(x: i32, y: i32, buttons: u32, button: u32) -> MouseEvent {
        MouseEvent { x, y, buttons, wheel: 0, button }
    }

    //=====================================================================
    // Construction Tests
    //=====================================================================

    #[test]
    fn default_window_is_zero_sized_and_visible() {
        let fx = fixture();
        let window = open(&fx);

        assert_eq!(window.size(), (0, 0));
        assert!(window.visible());
        assert_eq!(window.lifecycle(), Lifecycle::Open);
        assert!(!window.closed());
    }

    #[test]
    fn set_size_updates_host_geometry() {
        let fx = fixture();
        let mut window = open(&fx);

        window.set_size(48, 32);

        assert_eq!((window.width(), window.height()), (48, 32));
        let native = fx.display.window(handle_of(&window)).unwrap();
        assert_eq!((native.width, native.height), (48, 32));
    }

    #[test]
    fn caption_round_trips() {
        let fx = fixture();
        let window = fx.system.window().with_caption("Scratch").build().unwrap();

        assert_eq!(window.caption(), "Scratch");
        window.set_caption("Renamed");
        assert_eq!(window.caption(), "Renamed");
    }

    #[test]
    fn caption_with_nul_is_rejected() {
        let fx = fixture();
        let window = open(&fx);

        window.set_caption("bad\0caption");

        assert_eq!(window.caption(), "");
        let posted = fx.errors.take().expect("error posted");
        assert_eq!(posted.code, ErrorCode::InvalidArgument);
    }

    #[test]
    #[should_panic(expected = "Caption must not contain NUL")]
    fn builder_rejects_nul_caption() {
        let fx = fixture();
        let _ = fx.system.window().with_caption("a\0b");
    }

    #[test]
    fn hidden_builder_flag_hides_window() {
        let fx = fixture();
        let window = fx.system.window().visible(false).build().unwrap();
        assert!(!window.visible());
    }

    #[test]
    fn display_shows_raw_handle() {
        let fx = fixture();
        let window = open(&fx);
        let raw = handle_of(&window).id();

        assert_eq!(window.to_string(), format!("<Window:0x{:x}>", raw));
    }

    //=====================================================================
    // Event Queue Tests
    //=====================================================================

    #[test]
    fn empty_queue_reports_error() {
        let fx = fixture();
        let window = open(&fx);

        assert_eq!(window.event_count(), 0);
        assert!(window.peek_event().is_none());
        assert!(matches!(window.get_event(), Err(WmError::EventQueueEmpty)));
    }

    #[test]
    fn sent_close_round_trips() {
        let fx = fixture();
        let window = open(&fx);

        window.send_event(Event::Close);

        assert_eq!(window.event_count(), 1);
        assert_eq!(window.get_event().unwrap().kind(), EventKind::Close);
        assert_eq!(window.event_count(), 0);
    }

    #[test]
    fn sent_mouse_event_round_trips_every_field() {
        let fx = fixture();
        let window = open(&fx);
        let sent = Event::MouseButtonDown(MouseEvent { x: 32, y: 64, buttons: 2, wheel: 0, button: 1 });

        window.send_event(sent);

        assert_eq!(window.get_event().unwrap(), sent);
    }

    #[test]
    fn peek_matches_get_and_keeps_count() {
        let fx = fixture();
        let window = open(&fx);
        window.send_event(Event::Key(KeyEvent { pressed: true, code: 1 }));
        window.send_event(Event::Key(KeyEvent { pressed: true, code: 2 }));

        let peeked = window.peek_event();
        assert_eq!(window.event_count(), 2);
        assert_eq!(peeked, window.get_event().ok());
    }

    #[test]
    fn default_drain_is_newest_first() {
        let fx = fixture();
        let window = open(&fx);
        window.send_event(Event::Key(KeyEvent { pressed: true, code: 1 }));
        window.send_event(Event::Close);

        assert_eq!(window.get_event().unwrap(), Event::Close);
    }

    #[test]
    fn oldest_first_builder_option() {
        let fx = fixture();
        let window = fx
            .system
            .window()
            .with_drain_order(DrainOrder::OldestFirst)
            .build()
            .unwrap();
        window.send_event(Event::Key(KeyEvent { pressed: true, code: 1 }));
        window.send_event(Event::Close);

        assert_eq!(window.drain_order(), DrainOrder::OldestFirst);
        assert_eq!(window.get_event().unwrap().kind(), EventKind::Key);
    }

    //=====================================================================
    // Close & Veto Tests
    //=====================================================================

    #[test]
    fn poll_after_sent_close_closes() {
        let fx = fixture();
        let mut window = open(&fx);
        window.send_event(Event::Close);

        assert!(!window.poll(false));
        assert!(window.closed());
        assert!(!window.visible());
    }

    #[test]
    fn host_close_request_closes() {
        let fx = fixture();
        let mut window = open(&fx);
        fx.display.inject(handle_of(&window), HostMessage::CloseRequested);

        assert!(!window.poll(false));
        assert_eq!(window.lifecycle(), Lifecycle::Closing);
    }

    #[test]
    fn close_handler_veto_keeps_window_open() {
        let fx = fixture();
        let mut window = open(&fx);
        let asked = Rc::new(Cell::new(0));

        let counter = Rc::clone(&asked);
        window.on_close(move || {
            counter.set(counter.get() + 1);
            true
        });
        window.send_event(Event::Close);

        assert!(window.poll(false));
        assert!(!window.closed());
        assert!(window.visible());
        assert_eq!(asked.get(), 1);

        window.on_close(|| false);
        assert!(window.close());
        assert!(!window.visible());
    }

    #[test]
    fn poll_on_closed_window_is_noop() {
        let fx = fixture();
        let mut window = open(&fx);
        window.close();

        let seen = Rc::new(Cell::new(false));
        let flag = Rc::clone(&seen);
        window.on_key_down(move |_| flag.set(true));
        fx.display.inject(handle_of(&window), HostMessage::Key { code: 5, pressed: true });

        assert!(!window.poll(false));
        assert!(!seen.get());
        assert_eq!(fx.display.pending(), 1, "Closed window does not pump");
    }

    //=====================================================================
    // Mouse & Capture Tests
    //=====================================================================

    #[test]
    fn press_motion_release_sequence() {
        let fx = fixture();
        let mut window = open(&fx);
        let handle = handle_of(&window);
        let log = Rc::new(RefCell::new(Vec::new()));

        let down = Rc::clone(&log);
        window.on_mouse_down(move |m| down.borrow_mut().push(Event::MouseButtonDown(*m)));
        let moved = Rc::clone(&log);
        window.on_mouse_move(move |m| moved.borrow_mut().push(Event::MouseMotion(*m)));
        let up = Rc::clone(&log);
        window.on_mouse_up(move |m| up.borrow_mut().push(Event::MouseButtonUp(*m)));

        window.set_drain_order(DrainOrder::OldestFirst);
        fx.display.inject(handle, HostMessage::PointerMoved { x: 10, y: 20 });
        fx.display.inject(handle, HostMessage::Button { index: 0, pressed: true });
        assert!(window.poll(false));
        assert!(fx.display.is_captured(handle));

        fx.display.inject(handle, HostMessage::PointerMoved { x: 15, y: 25 });
        fx.display.inject(handle, HostMessage::Button { index: 0, pressed: false });
        assert!(window.poll(false));
        assert!(!fx.display.is_captured(handle));

        assert_eq!(
            *log.borrow(),
            vec![
                Event::MouseMotion(mouse(10, 20, 0, 0)),
                Event::MouseButtonDown(mouse(10, 20, 1, 0)),
                Event::MouseMotion(mouse(15, 25, 1, 0)),
                Event::MouseButtonUp(mouse(15, 25, 0, 0)),
            ]
        );
        assert_eq!(window.mouse_state(), (15, 25, 0));
    }

    #[test]
    fn overlapping_buttons_capture_once() {
        let fx = fixture();
        let mut window = open(&fx);
        let handle = handle_of(&window);

        fx.display.inject(handle, HostMessage::Button { index: 0, pressed: true });
        fx.display.inject(handle, HostMessage::Button { index: 1, pressed: true });
        window.poll(false);
        assert_eq!(window.mouse_state().2, 0b11);

        fx.display.inject(handle, HostMessage::Button { index: 0, pressed: false });
        window.poll(false);
        assert!(fx.display.is_captured(handle), "Right button still held");

        fx.display.inject(handle, HostMessage::Button { index: 1, pressed: false });
        window.poll(false);
        assert!(!fx.display.is_captured(handle));
        assert_eq!(window.mouse_state().2, 0);
    }

    #[test]
    fn press_after_capture_loss_reaches_handler() {
        let fx = fixture();
        let mut window = open(&fx);
        let handle = handle_of(&window);
        let log = Rc::new(RefCell::new(Vec::new()));

        let down = Rc::clone(&log);
        window.on_mouse_down(move |m| down.borrow_mut().push(("down", m.button, m.buttons)));
        let up = Rc::clone(&log);
        window.on_mouse_up(move |m| up.borrow_mut().push(("up", m.button, m.buttons)));
        window.set_drain_order(DrainOrder::OldestFirst);

        fx.display.inject(handle, HostMessage::Button { index: 0, pressed: true });
        fx.display.inject(handle, HostMessage::CaptureLost);
        fx.display.inject(handle, HostMessage::Button { index: 0, pressed: true });
        window.poll(false);

        assert_eq!(*log.borrow(), vec![("down", 0, 1), ("up", 0, 0), ("down", 0, 1)]);
        assert!(fx.display.is_captured(handle));
    }

    #[test]
    fn wheel_reaches_handler_with_signed_delta() {
        let fx = fixture();
        let mut window = open(&fx);
        let delta = Rc::new(Cell::new(0));

        let sink = Rc::clone(&delta);
        window.on_mouse_wheel(move |m| sink.set(m.wheel));
        fx.display.inject(handle_of(&window), HostMessage::Wheel { delta: -240 });
        window.poll(false);

        assert_eq!(delta.get(), -240);
    }

    #[test]
    fn key_state_follows_host_keys() {
        let fx = fixture();
        let mut window = open(&fx);
        let handle = handle_of(&window);

        fx.display.inject(handle, HostMessage::Key { code: 0x41, pressed: true });
        window.poll(false);
        assert!(window.key_state(0x41));

        fx.display.inject(handle, HostMessage::Key { code: 0x41, pressed: false });
        window.poll(false);
        assert!(!window.key_state(0x41));
    }

    #[test]
    fn messages_route_to_their_own_window() {
        let fx = fixture();
        let mut first = open(&fx);
        let second = open(&fx);
        fx.display.inject(handle_of(&second), HostMessage::CloseRequested);

        assert!(first.poll(false), "First window unaffected");
        assert_eq!(second.event_count(), 1);
        assert_eq!(second.peek_event(), Some(Event::Close));
    }

    #[test]
    fn blocking_poll_delivers_one_message() {
        let fx = fixture();
        let mut window = open(&fx);
        let handle = handle_of(&window);
        let keys = Rc::new(Cell::new(0));

        let count = Rc::clone(&keys);
        window.on_key_down(move |_| count.set(count.get() + 1));
        fx.display.inject(handle, HostMessage::Key { code: 1, pressed: true });
        fx.display.inject(handle, HostMessage::Key { code: 2, pressed: true });

        assert!(window.poll(true));
        assert_eq!(keys.get(), 1);
    }

    //=====================================================================
    // Tick Tests
    //=====================================================================

    #[test]
    fn tick_fires_once_per_elapsed_interval() {
        let fx = fixture();
        let mut window = fx.system.window().with_tick_rate(50).build().unwrap();
        let ticks = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&ticks);
        window.on_tick(move |t| sink.borrow_mut().push(*t));

        fx.clock.advance(49);
        window.poll(false);
        assert!(ticks.borrow().is_empty());

        fx.clock.advance(1);
        window.poll(false);
        window.poll(false);
        assert_eq!(*ticks.borrow(), vec![TickEvent { tick: 1_050, elapsed: 50 }]);

        fx.clock.advance(500);
        window.poll(false);
        assert_eq!(ticks.borrow().len(), 2, "At most one tick per poll");
        assert_eq!(ticks.borrow()[1].elapsed, 500);
    }

    #[test]
    fn hidden_window_does_not_tick() {
        let fx = fixture();
        let mut window = fx.system.window().with_tick_rate(10).visible(false).build().unwrap();
        let fired = Rc::new(Cell::new(false));

        let flag = Rc::clone(&fired);
        window.on_tick(move |_| flag.set(true));
        fx.clock.advance(100);

        assert_eq!(window.event_count(), 0);
        window.poll(false);
        assert!(!fired.get());
    }

    #[test]
    fn due_tick_is_counted_and_returned_by_get_event() {
        let fx = fixture();
        let mut window = open(&fx);
        window.set_tick_rate(20);
        fx.clock.advance(25);

        assert_eq!(window.event_count(), 1);
        assert_eq!(window.peek_event(), Some(Event::Tick(TickEvent { tick: 1_025, elapsed: 25 })));
        assert_eq!(window.event_count(), 1, "Peek does not claim");

        let event = window.get_event().unwrap();
        assert_eq!(event.kind(), EventKind::Tick);
        assert_eq!(window.event_count(), 0);
        assert!(matches!(window.get_event(), Err(WmError::EventQueueEmpty)));
    }

    #[test]
    fn set_tick_rate_restarts_period() {
        let fx = fixture();
        let mut window = fx.system.window().with_tick_rate(50).build().unwrap();

        fx.clock.advance(40);
        window.set_tick_rate(50);
        fx.clock.advance(40);

        assert_eq!(window.tick_rate(), 50);
        assert_eq!(window.event_count(), 0);
    }

    //=====================================================================
    // Wait Tests
    //=====================================================================

    #[test]
    fn wait_event_returns_pending_host_message() {
        let fx = fixture();
        let window = open(&fx);
        fx.display.inject(handle_of(&window), HostMessage::Key { code: 30, pressed: true });

        assert_eq!(window.wait_event(), Ok(Event::Key(KeyEvent { pressed: true, code: 30 })));
        assert!(window.key_state(30));
    }

    #[test]
    fn wait_event_sleeps_until_tick() {
        let host = HeadlessHost::new();
        let system = WindowSystemBuilder::with_host(host)
            .with_time_source(MonotonicClock::new())
            .with_error_queue(ErrorQueue::new())
            .build()
            .unwrap();
        let window = system.window().with_tick_rate(5).build().unwrap();

        let event = window.wait_event().expect("tick arrives");

        let tick = event.tick().copied().expect("tick event");
        assert!(tick.elapsed >= 5, "Tick came early: {:?}", tick);
    }

    #[test]
    fn wait_event_gives_up_when_clock_stands_still() {
        let fx = fixture();
        let window = fx.system.window().with_tick_rate(20).build().unwrap();

        assert!(matches!(window.wait_event(), Err(WmError::EventQueueEmpty)));

        fx.clock.advance(20);
        assert_eq!(window.wait_event().map(|e| e.kind()), Ok(EventKind::Tick));
    }

    #[test]
    fn wait_event_without_source_is_empty() {
        let fx = fixture();
        let window = open(&fx);

        assert!(matches!(window.wait_event(), Err(WmError::EventQueueEmpty)));
        assert!(fx.errors.is_empty());
    }

    #[test]
    fn wait_event_on_degraded_window_is_empty() {
        let fx = fixture();
        fx.display.fail_next_create("no display");
        let window = fx.system.window().tolerate_creation_failure(true).build().unwrap();

        assert!(matches!(window.wait_event(), Err(WmError::EventQueueEmpty)));
    }

    #[test]
    fn idle_blocking_poll_posts_nothing() {
        let fx = fixture();
        let mut window = open(&fx);

        assert!(window.poll(true));
        assert!(window.poll(true));
        assert!(fx.errors.is_empty(), "Posted: {:?}", fx.errors.drain());
    }

    //=====================================================================
    // Degraded Window Tests
    //=====================================================================

    #[test]
    fn creation_failure_is_returned_and_posted() {
        let fx = fixture();
        fx.display.fail_next_create("no display");

        let result = fx.system.create_window(10, 10);

        assert!(matches!(result, Err(WmError::PlatformCreation(_))));
        assert_eq!(fx.errors.take().map(|e| e.code), Some(ErrorCode::PlatformCreation));
        assert_eq!(fx.system.live_windows(), 0);
    }

    #[test]
    fn tolerated_failure_yields_degraded_window() {
        let fx = fixture();
        fx.display.fail_next_create("no display");

        let mut window = fx
            .system
            .window()
            .tolerate_creation_failure(true)
            .build()
            .expect("degraded window");
        fx.errors.drain();

        assert!(window.handle().is_none());
        assert_eq!(window.lifecycle(), Lifecycle::Created);
        assert_eq!(window.to_string(), "<Window:none>");

        window.set_caption("ignored");
        assert!(!window.visible());
        let posted = fx.errors.drain();
        assert_eq!(posted.len(), 2);
        assert!(posted.iter().all(|e| e.code == ErrorCode::InvalidArgument));

        window.send_event(Event::Close);
        assert!(!window.poll(false));
        assert_eq!(fx.system.live_windows(), 1);
    }

    //=====================================================================
    // Render Context & Drop Tests
    //=====================================================================

    struct RecordingContext {
        log: Rc<RefCell<Vec<&'static str>>>,
        display: HeadlessDisplay,
    }

    impl RenderContext for RecordingContext {
        fn release(&mut self) {
            let phase = if self.display.live_windows() == 1 { "context-before-handle" } else { "context-after-handle" };
            self.log.borrow_mut().push(phase);
        }
    }

    #[test]
    fn drop_releases_context_before_handle() {
        let fx = fixture();
        let mut window = open(&fx);
        let log = Rc::new(RefCell::new(Vec::new()));

        window.attach_render_context(Box::new(RecordingContext { log: Rc::clone(&log), display: fx.display.clone() }));
        assert!(window.render_context().is_some());

        drop(window);

        assert_eq!(*log.borrow(), vec!["context-before-handle"]);
        assert_eq!(fx.display.live_windows(), 0);
        assert_eq!(fx.system.live_windows(), 0);
    }

    #[test]
    fn detached_context_is_not_released() {
        let fx = fixture();
        let mut window = open(&fx);
        let log = Rc::new(RefCell::new(Vec::new()));

        window.attach_render_context(Box::new(RecordingContext { log: Rc::clone(&log), display: fx.display.clone() }));
        let detached = window.detach_render_context();
        drop(window);

        assert!(detached.is_some());
        assert!(log.borrow().is_empty());
    }
}
