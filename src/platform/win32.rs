//=========================================================================
// Win32 Host
//=========================================================================
//
// Native Windows backend. All `unsafe` Win32 calls of the crate live in
// this file.
//
// Message flow:
// ```text
// PeekMessageW / GetMessageW (thread queue, all windows)
//        ↓ DispatchMessageW
// wnd_proc ── translate_message() ──► OUTBOX (thread-local)
//        ↓ drained after the Win32 pump returns
// message pump (core)
// ```
//
// The window procedure never touches window-system state; it only
// appends to the thread-local outbox, so re-entrant sends (ShowWindow,
// SetWindowPos, DestroyWindow) are safe at any time.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::HashSet;
use std::ffi::c_void;
use std::time::Duration;

use log::{debug, info, trace, warn};
use windows::core::{w, HSTRING, PCWSTR};
use windows::Win32::Foundation::{GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{GetStockObject, HBRUSH, LTGRAY_BRUSH};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{ReleaseCapture, SetCapture};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
    GetMessageW, GetSystemMetrics, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    IsWindowVisible, KillTimer, LoadCursorW, PeekMessageW, RegisterClassExW, SetTimer,
    SetWindowPos, SetWindowTextW, ShowWindow, TranslateMessage, UnregisterClassW,
    CW_USEDEFAULT, HMENU, IDC_ARROW, MSG, PM_REMOVE, SET_WINDOW_POS_FLAGS, SM_CXFIXEDFRAME,
    SM_CXSIZEFRAME, SM_CYCAPTION, SM_CYFIXEDFRAME, SM_CYSIZEFRAME, SWP_NOACTIVATE, SWP_NOMOVE,
    SWP_NOSIZE, SWP_NOZORDER, SW_HIDE, SW_SHOW, WINDOW_EX_STYLE, WINDOW_STYLE,
    WM_CAPTURECHANGED, WM_CLOSE, WM_KEYDOWN, WM_KEYUP, WM_LBUTTONDOWN, WM_LBUTTONUP,
    WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP,
    WM_XBUTTONDOWN, WM_XBUTTONUP, WNDCLASSEXW, WS_CAPTION, WS_MAXIMIZEBOX, WS_MINIMIZEBOX,
    WS_SYSMENU, WS_THICKFRAME,
};

//=== Internal Dependencies ===============================================

use crate::core::platform_bridge::{
    Host, HostError, HostMessage, Placement, PollMode, Routed, WindowFlags,
};

const CLASS_NAME: PCWSTR = w!("AethericWmWindow");

thread_local! {
    static OUTBOX: RefCell<Vec<Routed<Win32Handle>>> = const { RefCell::new(Vec::new()) };
}

//=== Win32Handle =========================================================

/// `HWND` as a hashable, comparable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Win32Handle(isize);

impl Win32Handle {
    fn hwnd(self) -> HWND {
        HWND(self.0 as *mut c_void)
    }
}

impl From<HWND> for Win32Handle {
    fn from(hwnd: HWND) -> Self {
        Self(hwnd.0 as isize)
    }
}

//=== Message Translation =================================================

fn low_word_signed(value: isize) -> i32 {
    i32::from((value & 0xFFFF) as u16 as i16)
}

fn high_word_signed(value: isize) -> i32 {
    i32::from(((value >> 16) & 0xFFFF) as u16 as i16)
}

fn high_word(value: usize) -> u32 {
    ((value >> 16) & 0xFFFF) as u32
}

/// Fixed mapping from window messages to host messages.
fn translate_message(message: u32, wparam: WPARAM, lparam: LPARAM) -> Option<HostMessage> {
    let button = |index, pressed| Some(HostMessage::Button { index, pressed });

    match message {
        WM_CLOSE => Some(HostMessage::CloseRequested),
        WM_CAPTURECHANGED => Some(HostMessage::CaptureLost),

        WM_KEYDOWN | WM_SYSKEYDOWN => Some(HostMessage::Key { code: wparam.0 as u32, pressed: true }),
        WM_KEYUP | WM_SYSKEYUP => Some(HostMessage::Key { code: wparam.0 as u32, pressed: false }),

        WM_MOUSEMOVE => Some(HostMessage::PointerMoved {
            x: low_word_signed(lparam.0),
            y: high_word_signed(lparam.0),
        }),

        WM_LBUTTONDOWN => button(0, true),
        WM_LBUTTONUP => button(0, false),
        WM_RBUTTONDOWN => button(1, true),
        WM_RBUTTONUP => button(1, false),
        WM_MBUTTONDOWN => button(2, true),
        WM_MBUTTONUP => button(2, false),

        // XBUTTON1 → 3, XBUTTON2 → 4
        WM_XBUTTONDOWN => button(high_word(wparam.0) + 2, true),
        WM_XBUTTONUP => button(high_word(wparam.0) + 2, false),

        WM_MOUSEWHEEL => Some(HostMessage::Wheel {
            delta: high_word_signed(wparam.0 as isize),
        }),

        _ => None,
    }
}

//=== Window Procedure ====================================================

// SAFETY: registered as lpfnWndProc; Windows calls it with valid
// arguments on the thread that created the window.
unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if let Some(translated) = translate_message(message, wparam, lparam) {
        let routed = Routed { handle: Win32Handle::from(hwnd), message: translated };
        OUTBOX.with(|outbox| outbox.borrow_mut().push(routed));
    }

    // Close is a request; the window is destroyed when its owner drops it.
    if message == WM_CLOSE {
        return LRESULT(0);
    }

    // SAFETY: forwarding the arguments Windows gave us.
    unsafe { DefWindowProcW(hwnd, message, wparam, lparam) }
}

//=== Errors ==============================================================

fn last_error(function: &'static str) -> HostError {
    // SAFETY: GetLastError reads thread-local state set by the last Win32 call.
    let code = unsafe { GetLastError() };
    HostError::Os { function, code: code.0 }
}

fn os_error(function: &'static str) -> impl FnOnce(windows::core::Error) -> HostError {
    move |e| HostError::Os { function, code: e.code().0 as u32 }
}

//=== Win32Host ===========================================================

#[derive(Debug, Default)]
pub struct Win32Host {
    instance: Option<HINSTANCE>,
    windows: HashSet<Win32Handle>,
}

impl Win32Host {
    pub fn new() -> Self {
        Self::default()
    }

    fn known(&self, handle: Win32Handle) -> Result<HWND, HostError> {
        if self.windows.contains(&handle) {
            Ok(handle.hwnd())
        } else {
            Err(HostError::UnknownHandle)
        }
    }

    fn register_class(instance: HINSTANCE) -> Result<(), HostError> {
        // SAFETY: IDC_ARROW is a predefined system cursor.
        let cursor = unsafe { LoadCursorW(HINSTANCE::default(), IDC_ARROW) }
            .map_err(os_error("LoadCursorW"))?;

        // SAFETY: LTGRAY_BRUSH is a stock object and never freed.
        let background = HBRUSH(unsafe { GetStockObject(LTGRAY_BRUSH) }.0);

        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(wnd_proc),
            hInstance: instance,
            hCursor: cursor,
            hbrBackground: background,
            lpszClassName: CLASS_NAME,
            ..Default::default()
        };

        // SAFETY: class is fully initialised and CLASS_NAME is 'static.
        if unsafe { RegisterClassExW(&class) } == 0 {
            return Err(last_error("RegisterClassExW"));
        }
        Ok(())
    }

    /// Dispatches every queued message to the window procedure.
    fn dispatch_available(&self) {
        let mut msg = MSG::default();

        // SAFETY: msg is a valid MSG; a null HWND selects all windows of
        // this thread plus thread messages.
        while unsafe { PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE) }.as_bool() {
            // SAFETY: msg was filled by PeekMessageW.
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    /// Blocks until one message arrives (or `timeout` passes) and
    /// dispatches it. Messages queued behind it wait for the next poll.
    fn dispatch_blocking(&self, timeout: Option<Duration>) -> Result<(), HostError> {
        // A thread timer bounds GetMessageW; WM_TIMER without a window is
        // dispatched to nobody.
        let timer = timeout.map(|duration| {
            let ms = duration.as_millis().clamp(1, u128::from(u32::MAX)) as u32;
            // SAFETY: null HWND creates a thread timer; no callback.
            unsafe { SetTimer(HWND::default(), 0, ms, None) }
        });

        let mut msg = MSG::default();
        // SAFETY: msg is a valid MSG pointer.
        let result = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };

        if let Some(id) = timer.filter(|id| *id != 0) {
            // SAFETY: id was returned by SetTimer on this thread.
            let _ = unsafe { KillTimer(HWND::default(), id) };
        }

        match result.0 {
            -1 => Err(last_error("GetMessageW")),
            0 => {
                warn!(target: "wm::host", "WM_QUIT received by window message pump");
                Ok(())
            }
            _ => {
                // SAFETY: msg was filled by GetMessageW.
                unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                }
                Ok(())
            }
        }
    }

    /// Outer size for a client area of `width` x `height`.
    fn outer_size(width: u32, height: u32, resizable: bool) -> (i32, i32) {
        let (frame_x, frame_y) = if resizable {
            (SM_CXSIZEFRAME, SM_CYSIZEFRAME)
        } else {
            (SM_CXFIXEDFRAME, SM_CYFIXEDFRAME)
        };

        // SAFETY: GetSystemMetrics has no preconditions.
        let (border_x, border_y, caption) = unsafe {
            (GetSystemMetrics(frame_x), GetSystemMetrics(frame_y), GetSystemMetrics(SM_CYCAPTION))
        };

        (width as i32 + border_x * 2, height as i32 + border_y * 2 + caption)
    }
}

impl Host for Win32Host {
    type Handle = Win32Handle;

    fn initialize(&mut self) -> Result<(), HostError> {
        if self.instance.is_some() {
            return Ok(());
        }

        // SAFETY: a null module name returns the executable's own module.
        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }.map_err(os_error("GetModuleHandleW"))?;
        let instance = HINSTANCE(module.0);

        Self::register_class(instance).map_err(|e| HostError::Initialization(e.to_string()))?;
        self.instance = Some(instance);

        info!(target: "wm::host", "Win32 host initialized");
        Ok(())
    }

    fn shut_down(&mut self) {
        for handle in self.windows.drain() {
            // SAFETY: handle was created by this host and not yet destroyed.
            let _ = unsafe { DestroyWindow(handle.hwnd()) };
        }

        if let Some(instance) = self.instance.take() {
            // SAFETY: no window of this class exists anymore.
            if let Err(e) = unsafe { UnregisterClassW(CLASS_NAME, instance) } {
                warn!(target: "wm::host", "UnregisterClassW failed: {}", e);
            }
        }

        OUTBOX.with(|outbox| outbox.borrow_mut().clear());
        info!(target: "wm::host", "Win32 host shut down");
    }

    fn create_window(
        &mut self,
        width: u32,
        height: u32,
        flags: WindowFlags,
    ) -> Result<Win32Handle, HostError> {
        let instance = self
            .instance
            .ok_or_else(|| HostError::Creation("host not initialized".into()))?;

        let mut style: WINDOW_STYLE = WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;
        if flags.resizable {
            style |= WS_THICKFRAME | WS_MAXIMIZEBOX;
        }
        let (outer_width, outer_height) = Self::outer_size(width, height, flags.resizable);

        // SAFETY: CLASS_NAME is registered for `instance`; a null parent
        // creates a top-level window.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                CLASS_NAME,
                w!(""),
                style,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                outer_width,
                outer_height,
                HWND::default(),
                HMENU::default(),
                instance,
                None,
            )
        }
        .map_err(|e| HostError::Creation(e.to_string()))?;

        if !flags.hidden {
            // SAFETY: hwnd was just created.
            let _ = unsafe { ShowWindow(hwnd, SW_SHOW) };
        }

        let handle = Win32Handle::from(hwnd);
        self.windows.insert(handle);
        debug!(target: "wm::host", "Created Win32 window {:?}", handle);
        Ok(handle)
    }

    fn destroy_window(&mut self, handle: Win32Handle) {
        if !self.windows.remove(&handle) {
            return;
        }

        // SAFETY: handle was created by this host and is removed from the
        // live set before destruction.
        if let Err(e) = unsafe { DestroyWindow(handle.hwnd()) } {
            warn!(target: "wm::host", "DestroyWindow failed: {}", e);
        }
        OUTBOX.with(|outbox| outbox.borrow_mut().retain(|routed| routed.handle != handle));
    }

    fn move_window(&mut self, handle: Win32Handle, placement: Placement) -> Result<(), HostError> {
        let hwnd = self.known(handle)?;

        let mut outer = RECT::default();
        let mut client = RECT::default();
        // SAFETY: hwnd is live; both rects are valid out-pointers.
        unsafe {
            GetWindowRect(hwnd, &mut outer).map_err(os_error("GetWindowRect"))?;
            GetClientRect(hwnd, &mut client).map_err(os_error("GetClientRect"))?;
        }

        let frame_width = (outer.right - outer.left) - (client.right - client.left);
        let frame_height = (outer.bottom - outer.top) - (client.bottom - client.top);

        let mut flags: SET_WINDOW_POS_FLAGS = SWP_NOZORDER | SWP_NOACTIVATE;
        let (x, y) = match (placement.x, placement.y) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                flags |= SWP_NOMOVE;
                (outer.left, outer.top)
            }
        };

        let (width, height) = if placement.width.is_some() || placement.height.is_some() {
            let width = placement.width.map_or(client.right - client.left, |w| w as i32);
            let height = placement.height.map_or(client.bottom - client.top, |h| h as i32);
            (width + frame_width, height + frame_height)
        } else {
            flags |= SWP_NOSIZE;
            (0, 0)
        };

        // SAFETY: hwnd is live; a null insert-after is ignored with SWP_NOZORDER.
        unsafe { SetWindowPos(hwnd, HWND::default(), x, y, width, height, flags) }
            .map_err(os_error("SetWindowPos"))
    }

    fn set_caption(&mut self, handle: Win32Handle, caption: &str) -> Result<(), HostError> {
        let hwnd = self.known(handle)?;
        // SAFETY: hwnd is live; HSTRING is NUL-terminated.
        unsafe { SetWindowTextW(hwnd, &HSTRING::from(caption)) }.map_err(os_error("SetWindowTextW"))
    }

    fn caption(&self, handle: Win32Handle) -> Result<String, HostError> {
        let hwnd = self.known(handle)?;

        // SAFETY: hwnd is live.
        let length = unsafe { GetWindowTextLengthW(hwnd) };
        if length <= 0 {
            return Ok(String::new());
        }

        let mut buffer = vec![0u16; length as usize + 1];
        // SAFETY: buffer holds length + 1 UTF-16 units.
        let copied = unsafe { GetWindowTextW(hwnd, &mut buffer) };
        Ok(String::from_utf16_lossy(&buffer[..copied.max(0) as usize]))
    }

    fn poll_messages(
        &mut self,
        _target: Option<Win32Handle>,
        mode: PollMode,
        out: &mut Vec<Routed<Win32Handle>>,
    ) -> Result<(), HostError> {
        match mode {
            PollMode::Immediate => self.dispatch_available(),
            PollMode::WaitFor(timeout) if timeout.is_zero() => self.dispatch_available(),
            PollMode::WaitFor(timeout) => self.dispatch_blocking(Some(timeout))?,
            PollMode::Wait => self.dispatch_blocking(None)?,
        }

        OUTBOX.with(|outbox| out.append(&mut outbox.borrow_mut()));
        trace!(target: "wm::host", "Win32 poll ({:?}) collected {} messages", mode, out.len());
        Ok(())
    }

    fn is_visible(&self, handle: Win32Handle) -> Result<bool, HostError> {
        let hwnd = self.known(handle)?;
        // SAFETY: hwnd is live.
        Ok(unsafe { IsWindowVisible(hwnd) }.as_bool())
    }

    fn set_visible(&mut self, handle: Win32Handle, visible: bool) -> Result<(), HostError> {
        let hwnd = self.known(handle)?;
        // SAFETY: hwnd is live. The return value is the previous state.
        let _ = unsafe { ShowWindow(hwnd, if visible { SW_SHOW } else { SW_HIDE }) };
        Ok(())
    }

    fn capture_pointer(&mut self, handle: Win32Handle) -> Result<(), HostError> {
        let hwnd = self.known(handle)?;
        // SAFETY: hwnd is live and owned by this thread.
        unsafe { SetCapture(hwnd) };
        Ok(())
    }

    fn release_pointer(&mut self, handle: Win32Handle) -> Result<(), HostError> {
        self.known(handle)?;
        // SAFETY: ReleaseCapture has no preconditions.
        unsafe { ReleaseCapture() }.map_err(os_error("ReleaseCapture"))
    }

    fn raw_handle(&self, handle: Win32Handle) -> u64 {
        handle.0 as u64
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lparam(x: i16, y: i16) -> LPARAM {
        LPARAM(((y as u16 as isize) << 16) | (x as u16 as isize))
    }

    #[test]
    fn close_maps_to_close_request() {
        assert_eq!(
            translate_message(WM_CLOSE, WPARAM(0), LPARAM(0)),
            Some(HostMessage::CloseRequested)
        );
    }

    #[test]
    fn capture_change_maps_to_capture_loss() {
        assert_eq!(
            translate_message(WM_CAPTURECHANGED, WPARAM(0), LPARAM(0)),
            Some(HostMessage::CaptureLost)
        );
    }

    #[test]
    fn mouse_move_decodes_signed_coordinates() {
        assert_eq!(
            translate_message(WM_MOUSEMOVE, WPARAM(0), lparam(-3, 480)),
            Some(HostMessage::PointerMoved { x: -3, y: 480 })
        );
    }

    #[test]
    fn buttons_map_to_zero_based_indices() {
        assert_eq!(
            translate_message(WM_LBUTTONDOWN, WPARAM(0), LPARAM(0)),
            Some(HostMessage::Button { index: 0, pressed: true })
        );
        assert_eq!(
            translate_message(WM_RBUTTONUP, WPARAM(0), LPARAM(0)),
            Some(HostMessage::Button { index: 1, pressed: false })
        );
        assert_eq!(
            translate_message(WM_XBUTTONDOWN, WPARAM(2 << 16), LPARAM(0)),
            Some(HostMessage::Button { index: 4, pressed: true })
        );
    }

    #[test]
    fn wheel_delta_is_signed_high_word() {
        let down = WPARAM(((-120i16 as u16 as usize) << 16) | 0x0008);
        assert_eq!(
            translate_message(WM_MOUSEWHEEL, down, LPARAM(0)),
            Some(HostMessage::Wheel { delta: -120 })
        );
    }

    #[test]
    fn keys_pass_virtual_key_through() {
        assert_eq!(
            translate_message(WM_KEYDOWN, WPARAM(0x41), LPARAM(0)),
            Some(HostMessage::Key { code: 0x41, pressed: true })
        );
        assert_eq!(
            translate_message(WM_KEYUP, WPARAM(0x41), LPARAM(0)),
            Some(HostMessage::Key { code: 0x41, pressed: false })
        );
    }

    #[test]
    fn unlisted_messages_are_discarded() {
        use windows::Win32::UI::WindowsAndMessaging::WM_PAINT;
        assert!(translate_message(WM_PAINT, WPARAM(0), LPARAM(0)).is_none());
    }

    #[test]
    fn handle_round_trips_through_hwnd() {
        let handle = Win32Handle(0x1234);
        assert_eq!(Win32Handle::from(handle.hwnd()), handle);
    }
}
