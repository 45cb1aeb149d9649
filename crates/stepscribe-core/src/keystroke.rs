//! Aggregation of printable keystrokes into text-input events.

use crate::{KeyKind, RawInputEvent};
use std::time::{Duration, Instant};
use tracing::debug;

/// Collects consecutive printable characters into one `TextInput` press.
///
/// A session closes on a special key, on a character arriving after the idle
/// timeout, or on an explicit [`flush`](Self::flush).
#[derive(Debug)]
pub struct KeystrokeAggregator {
    timeout: Duration,
    buffer: String,
    last_char_at: Option<Instant>,
}

impl KeystrokeAggregator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            buffer: String::new(),
            last_char_at: None,
        }
    }

    /// Text typed so far in the open session.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Feed one key press. Returns the events to record, in order.
    pub fn on_key(&mut self, key: &str, is_special: bool, now: Instant) -> Vec<RawInputEvent> {
        let mut events = Vec::with_capacity(2);

        let printable = match single_char(key) {
            Some(ch) if !is_special && !ch.is_control() => Some(ch),
            _ => None,
        };

        match printable {
            Some(ch) => {
                let timed_out = self
                    .last_char_at
                    .is_some_and(|last| now.saturating_duration_since(last) > self.timeout);
                if timed_out {
                    events.extend(self.finish());
                }
                self.buffer.push(ch);
                self.last_char_at = Some(now);
                events.push(RawInputEvent::character(ch));
            }
            None => {
                events.extend(self.finish());
                events.push(RawInputEvent::KeyPress {
                    key: key.to_string(),
                    is_special: true,
                    kind: KeyKind::Special,
                });
            }
        }

        events
    }

    /// Close the open session, if any.
    pub fn flush(&mut self) -> Option<RawInputEvent> {
        self.finish()
    }

    fn finish(&mut self) -> Option<RawInputEvent> {
        self.last_char_at = None;
        let text = std::mem::take(&mut self.buffer);
        if text.trim().is_empty() {
            return None;
        }
        debug!(len = text.chars().count(), "Text input session finalized");
        Some(RawInputEvent::text_input(text))
    }
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}
