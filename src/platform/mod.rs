//=========================================================================
// Platform Subsystem
//
// Host backends implementing `core::platform_bridge::Host`.
//
// Backends:
// ```text
//  ┌────────────────────┬──────────────────────────────────────────────┐
//  │ Win32Host          │ Windows: native window class + wndproc       │
//  │ WinitHost          │ macOS, Linux, BSDs (and Windows on request)  │
//  │ HeadlessHost       │ Everywhere: in-memory windows, injected input│
//  └────────────────────┴──────────────────────────────────────────────┘
// ```
//
// `DefaultHost` is the backend `WindowSystemBuilder::new()` uses on the
// build target. Targets without a desktop backend fall back to the
// headless host so the crate still links.
//
//=========================================================================

//=== Submodules ==========================================================

pub mod headless;

#[cfg(windows)]
pub mod win32;

#[cfg(any(
    windows,
    target_os = "macos",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
))]
pub mod winit_host;

//=== DefaultHost =========================================================

#[cfg(windows)]
pub type DefaultHost = win32::Win32Host;

#[cfg(all(
    not(windows),
    any(
        target_os = "macos",
        target_os = "linux",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
    )
))]
pub type DefaultHost = winit_host::WinitHost;

#[cfg(not(any(
    windows,
    target_os = "macos",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
)))]
pub type DefaultHost = headless::HeadlessHost;
