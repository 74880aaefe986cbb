//=========================================================================
// Window System
//
// Entry point of the crate: brings the host backend up, hands out
// windows, and owns everything windows share.
//
// Architecture:
// ```text
//   WindowSystemBuilder ──build()──> WindowSystem ──window()──> WindowBuilder
//         │                            │                          │
//         ├─ with_host()               ├─ host (RefCell)          └─ build() ──> Window
//         ├─ with_polling_timeout()    ├─ registry: handle → weak WindowState
//         ├─ with_error_queue()        ├─ acquisitions (live windows)
//         └─ with_time_source()        └─ error queue, time source
// ```
//
// Acquisition: the host is initialized when the system is built and shut
// down when the last clone of the system, including those held by
// windows, is dropped. Every window acquires the system for its whole
// life, so the host can never go away under a live window.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::{error, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::{ErrorCode, ErrorQueue, WmError};
use crate::core::platform_bridge::message_pump::{self, Registry};
use crate::core::platform_bridge::{Host, HostError, PollMode, Routed};
use crate::core::tick_clock::{MonotonicClock, TimeSource};
use crate::core::window::{Window, WindowBuilder, WindowState};
use crate::platform::DefaultHost;

/// Default wait of a blocking [`WindowSystem::poll`].
pub const DEFAULT_POLLING_TIMEOUT: Duration = Duration::from_millis(2);

//=== WindowSystemBuilder =================================================

/// Builder for a [`WindowSystem`].
///
/// # Default Values
///
/// - **Host**: [`DefaultHost`] for the build target
/// - **Polling timeout**: 2 ms
/// - **Error queue**: the process-wide [`ErrorQueue::global`]
/// - **Time source**: [`MonotonicClock`]
///
/// # Examples
///
/// ```no_run
/// use aetheric_wm::WindowSystemBuilder;
///
/// let system = WindowSystemBuilder::new().build().expect("host available");
/// let mut window = system.window().with_size(640, 480).with_caption("Demo").build().unwrap();
///
/// while window.poll(true) {}
/// ```
pub struct WindowSystemBuilder<H: Host = DefaultHost> {
    host: H,
    polling_timeout: Duration,
    errors: Option<ErrorQueue>,
    time: Option<Rc<dyn TimeSource>>,
}

impl WindowSystemBuilder<DefaultHost> {
    /// Creates a builder for the platform's default host.
    pub fn new() -> Self {
        Self::with_host(DefaultHost::default())
    }
}

impl Default for WindowSystemBuilder<DefaultHost> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> WindowSystemBuilder<H> {
    /// Creates a builder around an explicit host backend.
    pub fn with_host(host: H) -> Self {
        Self {
            host,
            polling_timeout: DEFAULT_POLLING_TIMEOUT,
            errors: None,
            time: None,
        }
    }

    /// Upper bound of the wait in a blocking [`WindowSystem::poll`].
    ///
    /// Default: 2 ms
    pub fn with_polling_timeout(mut self, timeout: Duration) -> Self {
        self.polling_timeout = timeout;
        self
    }

    /// Routes posted errors to `errors` instead of the global queue.
    pub fn with_error_queue(mut self, errors: ErrorQueue) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Millisecond clock used for ticks.
    pub fn with_time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Some(Rc::new(time));
        self
    }

    /// Initializes the host and builds the system.
    pub fn build(mut self) -> Result<WindowSystem<H>, WmError> {
        let errors = self.errors.unwrap_or_else(ErrorQueue::global);

        if let Err(e) = self.host.initialize() {
            error!(target: "wm", "Host initialization failed: {}", e);
            errors.post(ErrorCode::PlatformCreation, e.to_string());
            return Err(WmError::Host(e));
        }

        info!(target: "wm", "Window system up (polling timeout: {:?})", self.polling_timeout);

        Ok(WindowSystem {
            inner: Rc::new(SystemInner {
                host: RefCell::new(self.host),
                registry: RefCell::new(Registry::new()),
                scratch: RefCell::new(Vec::new()),
                acquisitions: Cell::new(0),
                polling_timeout: Cell::new(self.polling_timeout),
                errors,
                time: self.time.unwrap_or_else(|| Rc::new(MonotonicClock::new())),
            }),
        })
    }
}

//=== SystemInner =========================================================

struct SystemInner<H: Host> {
    host: RefCell<H>,
    registry: RefCell<Registry<H::Handle>>,
    scratch: RefCell<Vec<Routed<H::Handle>>>,
    acquisitions: Cell<usize>,
    polling_timeout: Cell<Duration>,
    errors: ErrorQueue,
    time: Rc<dyn TimeSource>,
}

impl<H: Host> Drop for SystemInner<H> {
    fn drop(&mut self) {
        self.host.get_mut().shut_down();
        info!(target: "wm", "Window system shut down");
    }
}

//=== WindowSystem ========================================================

/// Shared handle to an initialized host backend.
///
/// Cheap to clone; all clones refer to the same system.
pub struct WindowSystem<H: Host = DefaultHost> {
    inner: Rc<SystemInner<H>>,
}

impl<H: Host> Clone for WindowSystem<H> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<H: Host> WindowSystem<H> {
    //=== Windows =========================================================

    /// Starts building a window.
    pub fn window(&self) -> WindowBuilder<H> {
        WindowBuilder::new(self.clone())
    }

    /// Creates a window of the given size with default options.
    pub fn create_window(&self, width: u32, height: u32) -> Result<Window<H>, WmError> {
        self.window().with_size(width, height).build()
    }

    /// Number of windows currently holding the system, degraded ones included.
    pub fn live_windows(&self) -> usize {
        self.inner.acquisitions.get()
    }

    //=== Polling =========================================================

    /// Pumps the host once, then polls every window in `windows`.
    ///
    /// With `wait`, the pump blocks up to the polling timeout. Returns
    /// `true` if any of the windows is still open.
    pub fn poll<'a, I>(&self, wait: bool, windows: I) -> bool
    where
        I: IntoIterator<Item = &'a mut Window<H>>,
        H: 'a,
    {
        let mode = if wait {
            PollMode::WaitFor(self.polling_timeout())
        } else {
            PollMode::Immediate
        };

        match self.pump(None, mode) {
            Ok(_) | Err(HostError::WouldBlock) => {}
            Err(e) => {
                warn!(target: "wm::pump", "Message pump failed: {}", e);
                self.inner.errors.post(ErrorCode::General, format!("poll: {}", e));
            }
        }

        let mut any_open = false;
        for window in windows {
            any_open |= window.poll(false);
        }
        any_open
    }

    pub fn polling_timeout(&self) -> Duration {
        self.inner.polling_timeout.get()
    }

    pub fn set_polling_timeout(&self, timeout: Duration) {
        self.inner.polling_timeout.set(timeout);
    }

    //=== Errors ==========================================================

    pub fn error_queue(&self) -> &ErrorQueue {
        &self.inner.errors
    }

    //=== Crate Internals =================================================

    pub(crate) fn now_ms(&self) -> u64 {
        self.inner.time.now_ms()
    }

    pub(crate) fn with_host<T>(&self, f: impl FnOnce(&mut H) -> T) -> T {
        f(&mut self.inner.host.borrow_mut())
    }

    pub(crate) fn pump(&self, target: Option<H::Handle>, mode: PollMode) -> Result<usize, HostError> {
        let mut host = self.inner.host.borrow_mut();
        let registry = self.inner.registry.borrow();
        let mut scratch = self.inner.scratch.borrow_mut();

        message_pump::pump(&mut *host, &registry, target, mode, &mut scratch)
    }

    pub(crate) fn register(&self, handle: H::Handle, state: Weak<RefCell<WindowState>>) {
        self.inner.registry.borrow_mut().insert(handle, state);
    }

    /// Unregisters and destroys a native window.
    pub(crate) fn destroy_window(&self, handle: H::Handle) {
        self.inner.registry.borrow_mut().remove(&handle);
        self.with_host(|host| host.destroy_window(handle));
    }

    pub(crate) fn acquire(&self) {
        self.inner.acquisitions.set(self.inner.acquisitions.get() + 1);
    }

    /// # Panics
    ///
    /// Panics if no acquisition is outstanding.
    pub(crate) fn release(&self) {
        let count = self.inner.acquisitions.get();
        assert!(count > 0, "window system acquisition underflow");
        self.inner.acquisitions.set(count - 1);
    }
}

impl<H: Host> std::fmt::Debug for WindowSystem<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowSystem")
            .field("live_windows", &self.live_windows())
            .field("polling_timeout", &self.polling_timeout())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform_bridge::HostMessage;
    use crate::platform::headless::{HeadlessDisplay, HeadlessHost};

    fn headless() -> (WindowSystem<HeadlessHost>, HeadlessDisplay) {
        let host = HeadlessHost::new();
        let display = host.display();
        let system = WindowSystemBuilder::with_host(host)
            .with_error_queue(ErrorQueue::new())
            .build()
            .unwrap();
        (system, display)
    }

    //=====================================================================
    // Acquisition Tests
    //=====================================================================

    #[test]
    fn host_lives_as_long_as_any_window() {
        let (system, display) = headless();
        let window = system.create_window(10, 10).unwrap();
        assert_eq!(system.live_windows(), 1);

        drop(system);
        assert_eq!(display.lifecycle_counts(), (1, 0), "Window keeps the host up");

        drop(window);
        assert_eq!(display.lifecycle_counts(), (1, 1));
        assert!(!display.is_initialized());
    }

    #[test]
    fn live_windows_tracks_each_window() {
        let (system, _display) = headless();
        let first = system.create_window(1, 1).unwrap();
        let second = system.create_window(1, 1).unwrap();
        assert_eq!(system.live_windows(), 2);

        drop(first);
        assert_eq!(system.live_windows(), 1);
        drop(second);
        assert_eq!(system.live_windows(), 0);
    }

    #[test]
    #[should_panic(expected = "acquisition underflow")]
    fn release_without_acquire_is_fatal() {
        let (system, _display) = headless();
        system.release();
    }

    //=====================================================================
    // Configuration Tests
    //=====================================================================

    #[test]
    fn polling_timeout_defaults_and_updates() {
        let (system, _display) = headless();
        assert_eq!(system.polling_timeout(), DEFAULT_POLLING_TIMEOUT);

        system.set_polling_timeout(Duration::from_millis(16));
        assert_eq!(system.polling_timeout(), Duration::from_millis(16));
    }

    #[test]
    fn builder_polling_timeout_is_applied() {
        let system = WindowSystemBuilder::with_host(HeadlessHost::new())
            .with_polling_timeout(Duration::ZERO)
            .with_error_queue(ErrorQueue::new())
            .build()
            .unwrap();
        assert_eq!(system.polling_timeout(), Duration::ZERO);
    }

    //=====================================================================
    // Poll Tests
    //=====================================================================

    #[test]
    fn poll_reports_whether_any_window_is_open() {
        let (system, display) = headless();
        let mut first = system.create_window(1, 1).unwrap();
        let mut second = system.create_window(1, 1).unwrap();

        display.inject(first.handle().unwrap(), HostMessage::CloseRequested);
        assert!(system.poll(true, [&mut first, &mut second]));
        assert!(first.closed());
        assert!(!second.closed());

        display.inject(second.handle().unwrap(), HostMessage::CloseRequested);
        assert!(!system.poll(false, [&mut first, &mut second]));
    }

    #[test]
    fn poll_with_no_windows_is_false() {
        let (system, _display) = headless();
        assert!(!system.poll(false, std::iter::empty()));
    }

    #[test]
    fn messages_for_destroyed_windows_are_dropped() {
        let (system, display) = headless();
        let window = system.create_window(1, 1).unwrap();
        let handle = window.handle().unwrap();
        drop(window);

        display.inject(handle, HostMessage::CloseRequested);
        assert_eq!(system.pump(None, PollMode::Immediate), Ok(0));
    }
}
