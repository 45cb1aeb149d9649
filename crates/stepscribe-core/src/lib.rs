//! stepscribe-core: capture-to-step synthesis pipeline.
//!
//! Design goal: keep this crate UI-agnostic and platform-agnostic.
//! OS input hooks, screen capture and OCR backends live in `stepscribe-platform`
//! and plug in through the traits in [`services`] and [`recognition`].

mod config;
mod error;
mod filter;
mod geometry;
mod gesture;
mod journal;
mod keystroke;
mod manager;
mod queue;
pub mod recognition;
pub mod services;
mod session;
mod storage;
mod synthesis;

#[cfg(test)]
mod testing;

pub use config::{
    default_config_path, default_data_dir, load_config, load_or_default, parse_config,
    save_config, GestureConfig, KeyboardConfig, OcrServiceConfig, QueueConfig,
    RecognitionConfig, ScribeConfig, StorageConfig, SynthesisConfig, TesseractConfig,
};
pub use error::{
    CaptureError, CaptureResult, ConfigError, ConfigResult, MonitorError, RecognitionError,
    RecognitionResult, SynthesisError,
};
pub use filter::{hotkey_matches, AdmissionFilter, FilterDecision, FilterReason};
pub use geometry::{CoordinateSample, CoordinateSystem, MonitorGeometry, ScreenInfo};
pub use gesture::PointerGestureClassifier;
pub use journal::{JournalEntry, JournalLevel, JournalSummary, SessionJournal};
pub use keystroke::KeystrokeAggregator;
pub use manager::{
    InputMonitor, InputSink, NotificationKind, SessionManager, SessionNotification,
    SessionStatus,
};
pub use queue::{QueueState, QueuedEvent, RawEventRecord, RecordingEventQueue};
pub use services::{CaptureService, CaptureTarget, Screenshot, StepStore};
pub use session::{RecordingSession, SessionState, SessionTransition};
pub use storage::{FileStorage, StorageError, StorageResult, TutorialMetadata, TutorialStatus};
pub use synthesis::{SynthesisReport, StepSynthesizer};

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Unknown,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
            MouseButton::Unknown => "unknown",
        }
    }

    /// Capitalized name used in step descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            MouseButton::Left => "Left",
            MouseButton::Right => "Right",
            MouseButton::Middle => "Middle",
            MouseButton::Unknown => "Unknown",
        }
    }
}

/// How a key press should be treated downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// A single printable character. Never becomes a step on its own.
    Character,
    /// Enter, Tab, arrows, function keys and the like.
    Special,
    /// A completed run of typed characters.
    TextInput,
}

/// A classified input event, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawInputEvent {
    PointerClick {
        x: i32,
        y: i32,
        button: MouseButton,
        is_double_click: bool,
        click_count: u8,
    },
    KeyPress {
        key: String,
        is_special: bool,
        kind: KeyKind,
    },
    ManualCapture {
        x: i32,
        y: i32,
    },
}

impl RawInputEvent {
    pub fn click(x: i32, y: i32, button: MouseButton) -> Self {
        RawInputEvent::PointerClick {
            x,
            y,
            button,
            is_double_click: false,
            click_count: 1,
        }
    }

    pub fn special_key(key: impl Into<String>) -> Self {
        RawInputEvent::KeyPress {
            key: key.into(),
            is_special: true,
            kind: KeyKind::Special,
        }
    }

    pub fn character(ch: char) -> Self {
        RawInputEvent::KeyPress {
            key: ch.to_string(),
            is_special: false,
            kind: KeyKind::Character,
        }
    }

    pub fn text_input(text: impl Into<String>) -> Self {
        RawInputEvent::KeyPress {
            key: text.into(),
            is_special: false,
            kind: KeyKind::TextInput,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RawInputEvent::PointerClick { .. } => "pointer_click",
            RawInputEvent::KeyPress { .. } => "key_press",
            RawInputEvent::ManualCapture { .. } => "manual_capture",
        }
    }

    /// Global position for pointer-anchored events.
    pub fn position(&self) -> Option<(i32, i32)> {
        match self {
            RawInputEvent::PointerClick { x, y, .. } | RawInputEvent::ManualCapture { x, y } => {
                Some((*x, *y))
            }
            RawInputEvent::KeyPress { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Click,
    ManualCapture,
    Key,
    Type,
}

/// One synthesized tutorial step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorialStep {
    pub step_id: String,
    pub step_number: u32,
    /// Unix epoch milliseconds of the source event.
    pub timestamp_ms: u64,
    pub description: String,
    pub screenshot_ref: Option<String>,
    pub recognized_text: Option<String>,
    pub recognition_confidence: f32,
    /// Global pointer coordinates.
    pub coordinates: Option<(i32, i32)>,
    pub coordinates_percent: Option<(f64, f64)>,
    pub screen_dimensions: Option<(u32, u32)>,
    pub step_type: StepType,
    pub event: RawInputEvent,
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(RawInputEvent::click(5, 6, MouseButton::Right)).unwrap();
        assert_eq!(json["type"], "pointer_click");
        assert_eq!(json["button"], "right");
        assert_eq!(json["click_count"], 1);
    }

    #[test]
    fn test_event_position() {
        assert_eq!(RawInputEvent::ManualCapture { x: 1, y: 2 }.position(), Some((1, 2)));
        assert_eq!(RawInputEvent::special_key("Return").position(), None);
    }
}
