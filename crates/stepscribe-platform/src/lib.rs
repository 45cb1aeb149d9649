//! stepscribe-platform: platform-specific I/O boundary for stepscribe.
//!
//! This crate provides:
//! - Global input hook for recording via `rdev`
//! - Screen capture via `xcap`
//! - DPI awareness and double-click interval probes
//! - OCR backends (Tesseract CLI, HTTP service)
//!
//! ## Module Structure
//!
//! - `error` - Common error types
//! - `display` - DPI awareness and native display settings
//! - `keys` - rdev key classification
//! - `input_hook` - Input monitor feeding a recording session
//! - `capture` - Screen capture service
//! - `ocr` - Text recognizers and cascade assembly

mod capture;
mod display;
mod error;
mod input_hook;
mod keys;
pub mod ocr;

pub use capture::XcapCapture;
pub use display::{double_click_interval, set_dpi_aware, DEFAULT_DOUBLE_CLICK_INTERVAL};
pub use error::{PlatformError, PlatformResult};
pub use input_hook::RdevInputMonitor;
pub use keys::{classify as classify_key, KeyClass};
