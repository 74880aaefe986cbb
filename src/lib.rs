//=========================================================================
// Aetheric WM: Library Root
//
// Cross-platform window and event subsystem: native windows, a per-window
// event queue fed by the host's message pump, pointer capture while
// buttons are held, synthetic tick events, and callback dispatch.
//
// Typical usage:
// ```no_run
// use aetheric_wm::prelude::*;
//
// let system = WindowSystemBuilder::new().build().expect("host available");
// let mut window = system
//     .window()
//     .with_size(640, 480)
//     .with_caption("demo")
//     .with_tick_rate(16)
//     .build()
//     .expect("window created");
//
// window.on_key_down(|code| println!("key {code}"));
// while !window.closed() {
//     window.poll(true);
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the host-agnostic window machinery; `platform` holds the
// host backends, including the headless one used by tests.
//
pub mod core;
pub mod platform;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------

mod system;

//--- Public Exports ------------------------------------------------------

pub use crate::core::error::{ErrorCode, ErrorQueue, WmError};
pub use crate::core::event::{Event, EventKind, KeyEvent, MouseEvent, TickEvent};
pub use crate::core::window::{Lifecycle, Window, WindowBuilder};
pub use platform::DefaultHost;
pub use system::{WindowSystem, WindowSystemBuilder, DEFAULT_POLLING_TIMEOUT};
