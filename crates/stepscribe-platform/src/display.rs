//! Display probes: DPI awareness and the native double-click interval.
//!
//! On Windows the process opts into Per-Monitor V2 awareness so hook
//! coordinates and captured pixels share one physical coordinate space.
//! Other platforms already report matching coordinates.

use std::time::Duration;

/// Used when the platform does not report a double-click interval.
pub const DEFAULT_DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(400);

#[cfg(windows)]
mod windows {
    use std::sync::Once;
    use std::time::Duration;
    use tracing::{info, warn};
    use windows_sys::Win32::UI::HiDpi::{
        SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    };
    use windows_sys::Win32::UI::Input::KeyboardAndMouse::GetDoubleClickTime;

    static INIT: Once = Once::new();

    /// Must run before any capture or hook is created.
    pub fn set_dpi_aware() {
        INIT.call_once(|| {
            // SAFETY: plain Win32 call with a predefined context value.
            let result = unsafe {
                SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2)
            };
            if result != 0 {
                info!("Set Per-Monitor V2 DPI awareness");
            } else {
                warn!("Failed to set Per-Monitor V2 DPI awareness, coordinates may be scaled");
            }
        });
    }

    pub fn double_click_interval() -> Duration {
        // SAFETY: no arguments, no preconditions.
        let ms = unsafe { GetDoubleClickTime() };
        if ms == 0 {
            super::DEFAULT_DOUBLE_CLICK_INTERVAL
        } else {
            Duration::from_millis(ms as u64)
        }
    }
}

#[cfg(windows)]
pub use windows::{double_click_interval, set_dpi_aware};

#[cfg(not(windows))]
mod fallback {
    use std::time::Duration;

    /// No-op: coordinates are already physical.
    pub fn set_dpi_aware() {}

    pub fn double_click_interval() -> Duration {
        super::DEFAULT_DOUBLE_CLICK_INTERVAL
    }
}

#[cfg(not(windows))]
pub use fallback::{double_click_interval, set_dpi_aware};
