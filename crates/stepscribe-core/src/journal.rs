//! Per-session audit journal persisted next to the tutorial.

use crate::{FilterReason, RawInputEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp_ms: u64,
    pub kind: String,
    pub subtype: String,
    pub message: String,
    pub level: JournalLevel,
}

/// Counters reported at the end of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalSummary {
    pub pointer_clicks: u32,
    pub manual_captures: u32,
    pub keyboard_events: u32,
    pub filtered_events: u32,
    pub errors: u32,
    pub filtered_by_reason: BTreeMap<String, u32>,
    pub duration_ms: u64,
}

/// Audit trail of one recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionJournal {
    tutorial_id: String,
    started_at_ms: u64,
    entries: Vec<JournalEntry>,
    summary: JournalSummary,
}

impl SessionJournal {
    pub fn new(tutorial_id: impl Into<String>) -> Self {
        Self {
            tutorial_id: tutorial_id.into(),
            started_at_ms: crate::now_ms(),
            entries: Vec::new(),
            summary: JournalSummary::default(),
        }
    }

    pub fn tutorial_id(&self) -> &str {
        &self.tutorial_id
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn log(
        &mut self,
        kind: &str,
        subtype: &str,
        message: impl Into<String>,
        level: JournalLevel,
    ) {
        self.entries.push(JournalEntry {
            timestamp_ms: crate::now_ms(),
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            message: message.into(),
            level,
        });
        if level == JournalLevel::Error {
            self.summary.errors += 1;
        }
    }

    pub fn log_state(&mut self, state: &str) {
        self.log("session", state, format!("Session {state}"), JournalLevel::Info);
    }

    pub fn log_admitted(&mut self, event: &RawInputEvent) {
        let message = match event {
            RawInputEvent::PointerClick {
                x,
                y,
                button,
                click_count,
                ..
            } => {
                self.summary.pointer_clicks += 1;
                format!("{} click x{} at ({}, {})", button.as_str(), click_count, x, y)
            }
            RawInputEvent::ManualCapture { x, y } => {
                self.summary.manual_captures += 1;
                format!("manual capture at ({}, {})", x, y)
            }
            RawInputEvent::KeyPress { key, kind, .. } => {
                self.summary.keyboard_events += 1;
                format!("{kind:?} key {key:?}")
            }
        };
        self.log("input", event.kind_name(), message, JournalLevel::Info);
    }

    pub fn log_filtered(&mut self, event: &RawInputEvent, reason: FilterReason) {
        self.summary.filtered_events += 1;
        *self
            .summary
            .filtered_by_reason
            .entry(reason.as_str().to_string())
            .or_insert(0) += 1;
        self.log(
            "filter",
            reason.as_str(),
            format!("{} filtered", event.kind_name()),
            JournalLevel::Info,
        );
    }

    pub fn log_error(&mut self, component: &str, message: impl Into<String>) {
        self.log("error", component, message, JournalLevel::Error);
    }

    pub fn log_warning(&mut self, component: &str, message: impl Into<String>) {
        self.log("warning", component, message, JournalLevel::Warning);
    }

    pub fn set_duration_ms(&mut self, duration_ms: u64) {
        self.summary.duration_ms = duration_ms;
    }

    pub fn summary(&self) -> &JournalSummary {
        &self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MouseButton;

    #[test]
    fn test_counters() {
        let mut journal = SessionJournal::new("t");
        journal.log_state("started");
        journal.log_admitted(&RawInputEvent::click(1, 2, MouseButton::Left));
        journal.log_admitted(&RawInputEvent::ManualCapture { x: 0, y: 0 });
        journal.log_admitted(&RawInputEvent::special_key("Tab"));
        journal.log_filtered(&RawInputEvent::special_key("F9"), FilterReason::HotkeyFiltered);
        journal.log_filtered(&RawInputEvent::special_key("a"), FilterReason::KeystrokeFiltered);
        journal.log_filtered(&RawInputEvent::special_key("b"), FilterReason::KeystrokeFiltered);
        journal.log_error("synthesis", "boom");

        let summary = journal.summary();
        assert_eq!(summary.pointer_clicks, 1);
        assert_eq!(summary.manual_captures, 1);
        assert_eq!(summary.keyboard_events, 1);
        assert_eq!(summary.filtered_events, 3);
        assert_eq!(summary.filtered_by_reason.get("keystroke_filtered"), Some(&2));
        assert_eq!(summary.errors, 1);
        assert_eq!(journal.entries().len(), 8);
    }
}
