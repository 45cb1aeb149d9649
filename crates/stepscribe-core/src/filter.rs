//! Event admission policy.

use crate::{RawInputEvent, SessionState};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Why an event was admitted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    SessionNotRecording,
    ManualCaptureAlwaysAllowed,
    HotkeyFiltered,
    KeystrokeFiltered,
    Allowed,
}

impl FilterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterReason::SessionNotRecording => "session_not_recording",
            FilterReason::ManualCaptureAlwaysAllowed => "manual_capture_always_allowed",
            FilterReason::HotkeyFiltered => "hotkey_filtered",
            FilterReason::KeystrokeFiltered => "keystroke_filtered",
            FilterReason::Allowed => "allowed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    pub admit: bool,
    pub reason: FilterReason,
}

impl FilterDecision {
    fn admit(reason: FilterReason) -> Self {
        Self { admit: true, reason }
    }

    fn reject(reason: FilterReason) -> Self {
        Self {
            admit: false,
            reason,
        }
    }
}

/// Decides whether a classified event gets buffered. Holds no event history.
#[derive(Debug)]
pub struct AdmissionFilter {
    filter_keystrokes: AtomicBool,
    hotkey: RwLock<Option<String>>,
}

impl AdmissionFilter {
    pub fn new(filter_keystrokes: bool, hotkey: Option<String>) -> Self {
        Self {
            filter_keystrokes: AtomicBool::new(filter_keystrokes),
            hotkey: RwLock::new(hotkey),
        }
    }

    pub fn decide(&self, event: &RawInputEvent, session: SessionState) -> FilterDecision {
        if session != SessionState::Recording {
            return FilterDecision::reject(FilterReason::SessionNotRecording);
        }

        match event {
            RawInputEvent::ManualCapture { .. } => {
                FilterDecision::admit(FilterReason::ManualCaptureAlwaysAllowed)
            }
            RawInputEvent::KeyPress { key, .. } => {
                if self.is_hotkey(key) {
                    FilterDecision::reject(FilterReason::HotkeyFiltered)
                } else if self.filters_keystrokes() {
                    FilterDecision::reject(FilterReason::KeystrokeFiltered)
                } else {
                    FilterDecision::admit(FilterReason::Allowed)
                }
            }
            RawInputEvent::PointerClick { .. } => FilterDecision::admit(FilterReason::Allowed),
        }
    }

    pub fn filters_keystrokes(&self) -> bool {
        self.filter_keystrokes.load(Ordering::SeqCst)
    }

    pub fn set_filter_keystrokes(&self, enabled: bool) {
        self.filter_keystrokes.store(enabled, Ordering::SeqCst);
        info!(enabled, "Keystroke filtering changed");
    }

    /// Flip keystroke suppression, returning the new value.
    pub fn toggle_keystrokes(&self) -> bool {
        let enabled = !self.filter_keystrokes.fetch_xor(true, Ordering::SeqCst);
        info!(enabled, "Keystroke filtering toggled");
        enabled
    }

    pub fn hotkey(&self) -> Option<String> {
        self.hotkey.read().clone()
    }

    pub fn set_hotkey(&self, hotkey: Option<String>) {
        *self.hotkey.write() = hotkey;
    }

    pub fn is_hotkey(&self, key: &str) -> bool {
        self.hotkey
            .read()
            .as_deref()
            .is_some_and(|hotkey| hotkey_matches(hotkey, key))
    }
}

/// Matches a key name against the non-modifier part of a hotkey binding,
/// so "ctrl+shift+F9" matches a pressed "F9".
pub fn hotkey_matches(hotkey: &str, key: &str) -> bool {
    let main = hotkey.rsplit('+').next().unwrap_or(hotkey).trim();
    !main.is_empty() && main.eq_ignore_ascii_case(key.trim())
}

impl Default for AdmissionFilter {
    fn default() -> Self {
        Self::new(false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> AdmissionFilter {
        AdmissionFilter::new(false, Some("F9".into()))
    }

    #[test]
    fn test_rejects_outside_recording() {
        let f = filter();
        for state in [SessionState::Stopped, SessionState::Paused] {
            let manual = f.decide(&RawInputEvent::ManualCapture { x: 1, y: 1 }, state);
            assert!(!manual.admit);
            assert_eq!(manual.reason, FilterReason::SessionNotRecording);
        }
    }

    #[test]
    fn test_manual_capture_always_allowed() {
        let f = filter();
        f.set_filter_keystrokes(true);
        let d = f.decide(&RawInputEvent::ManualCapture { x: 1, y: 1 }, SessionState::Recording);
        assert!(d.admit);
        assert_eq!(d.reason, FilterReason::ManualCaptureAlwaysAllowed);
    }

    #[test]
    fn test_hotkey_is_filtered() {
        let f = filter();
        let d = f.decide(&RawInputEvent::special_key("f9"), SessionState::Recording);
        assert_eq!(d, FilterDecision::reject(FilterReason::HotkeyFiltered));

        f.set_hotkey(Some("ctrl+shift+S".into()));
        assert!(f.is_hotkey("s"));
        assert!(!f.is_hotkey("F9"));
    }

    #[test]
    fn test_hotkey_matches_main_key_only() {
        assert!(hotkey_matches("ctrl+F9", "F9"));
        assert!(hotkey_matches("Ctrl + Shift + f9", "F9"));
        assert!(hotkey_matches("F9", "f9"));
        assert!(!hotkey_matches("ctrl+F9", "ctrl+F9"));
        assert!(!hotkey_matches("ctrl+", "ctrl"));
        assert!(!hotkey_matches("", ""));
    }

    #[test]
    fn test_keystroke_toggle() {
        let f = filter();
        let key = RawInputEvent::special_key("Return");
        assert!(f.decide(&key, SessionState::Recording).admit);

        assert!(f.toggle_keystrokes());
        let d = f.decide(&key, SessionState::Recording);
        assert_eq!(d.reason, FilterReason::KeystrokeFiltered);

        // Clicks are unaffected by keystroke suppression.
        let click = RawInputEvent::click(1, 1, crate::MouseButton::Left);
        assert_eq!(f.decide(&click, SessionState::Recording).reason, FilterReason::Allowed);

        assert!(!f.toggle_keystrokes());
        assert!(f.decide(&key, SessionState::Recording).admit);
    }

    #[test]
    fn test_reason_names() {
        assert_eq!(FilterReason::HotkeyFiltered.as_str(), "hotkey_filtered");
        assert_eq!(
            serde_json::to_value(FilterReason::SessionNotRecording).unwrap(),
            "session_not_recording"
        );
    }
}
