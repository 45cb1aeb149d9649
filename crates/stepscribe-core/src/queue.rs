//! Recording event queue: buffers admitted events between start and stop.

use crate::{CoordinateSample, RawInputEvent, Screenshot};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    #[default]
    Idle,
    Recording,
    Stopped,
    Processing,
}

/// An admitted event plus the context captured alongside it.
#[derive(Debug, Clone)]
pub struct QueuedEvent {
    /// Unix epoch milliseconds.
    pub timestamp_ms: u64,
    pub event: RawInputEvent,
    pub screenshot: Option<Arc<Screenshot>>,
    pub coordinates: Option<CoordinateSample>,
}

impl QueuedEvent {
    pub fn new(event: RawInputEvent, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            event,
            screenshot: None,
            coordinates: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot: Option<Arc<Screenshot>>) -> Self {
        self.screenshot = screenshot;
        self
    }

    pub fn with_coordinates(mut self, coordinates: Option<CoordinateSample>) -> Self {
        self.coordinates = coordinates;
        self
    }

    /// Serializable form for the raw event audit.
    pub fn to_record(&self) -> RawEventRecord {
        RawEventRecord {
            timestamp_ms: self.timestamp_ms,
            event: self.event.clone(),
            has_screenshot: self.screenshot.is_some(),
            coordinates: self.coordinates,
        }
    }
}

/// Audit record of one buffered event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEventRecord {
    pub timestamp_ms: u64,
    pub event: RawInputEvent,
    pub has_screenshot: bool,
    pub coordinates: Option<CoordinateSample>,
}

/// Multi-producer buffer filled from listener threads and drained once by
/// whichever thread stops the recording.
///
/// Enqueue holds the state lock while sending, and `stop` takes the same lock,
/// so every event accepted during Recording is in the channel before the
/// queue can reach Stopped.
pub struct RecordingEventQueue {
    state: Mutex<QueueState>,
    tx: Sender<QueuedEvent>,
    rx: Receiver<QueuedEvent>,
}

impl RecordingEventQueue {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            state: Mutex::new(QueueState::Idle),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> QueueState {
        *self.state.lock()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Begin buffering. Leftovers from an undrained recording are discarded.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            QueueState::Idle | QueueState::Stopped => {
                let discarded = self.rx.try_iter().count();
                if discarded > 0 {
                    warn!(discarded, "Discarded undrained events on queue start");
                }
                *state = QueueState::Recording;
                info!("Event queue recording");
                true
            }
            other => {
                debug!(?other, "Ignoring queue start");
                false
            }
        }
    }

    /// Stop accepting events.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if *state != QueueState::Recording {
            debug!(state = ?*state, "Ignoring queue stop");
            return false;
        }
        *state = QueueState::Stopped;
        info!(buffered = self.rx.len(), "Event queue stopped");
        true
    }

    /// Take every buffered event, in insertion order. Only valid from Stopped;
    /// any other state returns an empty batch.
    pub fn drain(&self) -> Vec<QueuedEvent> {
        let mut state = self.state.lock();
        if *state != QueueState::Stopped {
            debug!(state = ?*state, "Ignoring queue drain");
            return Vec::new();
        }
        *state = QueueState::Processing;
        let events: Vec<QueuedEvent> = self.rx.try_iter().collect();
        info!(count = events.len(), "Event queue drained");
        events
    }

    /// Clear the buffer and return to Idle.
    pub fn complete(&self) {
        let mut state = self.state.lock();
        let leftover = self.rx.try_iter().count();
        if leftover > 0 {
            warn!(leftover, "Cleared leftover events on queue completion");
        }
        *state = QueueState::Idle;
        debug!("Event queue idle");
    }

    /// Buffer an event. No-op unless Recording; returns whether it was kept.
    pub fn enqueue(&self, event: QueuedEvent) -> bool {
        let state = self.state.lock();
        if *state != QueueState::Recording {
            return false;
        }
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!(kind = dropped.event.kind_name(), "Event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn add_click(
        &self,
        event: RawInputEvent,
        screenshot: Option<Arc<Screenshot>>,
        coordinates: Option<CoordinateSample>,
    ) -> bool {
        self.enqueue(
            QueuedEvent::new(event, crate::now_ms())
                .with_screenshot(screenshot)
                .with_coordinates(coordinates),
        )
    }

    pub fn add_key(&self, event: RawInputEvent) -> bool {
        self.enqueue(QueuedEvent::new(event, crate::now_ms()))
    }

    pub fn add_manual_capture(
        &self,
        event: RawInputEvent,
        screenshot: Option<Arc<Screenshot>>,
        coordinates: Option<CoordinateSample>,
    ) -> bool {
        self.add_click(event, screenshot, coordinates)
    }
}

impl Default for RecordingEventQueue {
    fn default() -> Self {
        Self::new(4096)
    }
}
