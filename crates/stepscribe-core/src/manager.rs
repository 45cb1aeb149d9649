//! Session manager: owns the active recording and routes input into the queue.
//!
//! Listener threads call the [`InputSink`] methods directly; the control
//! thread drives the session through `start_recording`/`stop_recording`.
//! Stopping drains the queue and runs synthesis on the calling thread.

use crate::recognition::RecognitionCascade;
use crate::{
    AdmissionFilter, CaptureService, CaptureTarget, CoordinateSystem, FilterReason, KeyKind,
    KeystrokeAggregator, MonitorError, RawInputEvent, RecordingEventQueue, RecordingSession,
    ScribeConfig, SessionJournal, SessionState, SessionTransition, StepStore, StepSynthesizer,
    SynthesisReport, TutorialStatus,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const NOTIFICATION_BUFFER: usize = 64;

/// OS-level input listener feeding an [`InputSink`].
pub trait InputMonitor: Send + Sync {
    fn start(&self) -> Result<(), MonitorError>;

    /// Stop forwarding events.
    fn stop(&self);

    /// Last known pointer position, if tracked.
    fn pointer_position(&self) -> Option<(i32, i32)> {
        None
    }
}

/// Receiver of classified input, called from listener threads.
pub trait InputSink: Send + Sync {
    fn on_pointer_click(&self, event: RawInputEvent);

    fn on_key(&self, key: &str, is_special: bool);

    fn on_manual_capture(&self, x: i32, y: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RecordingStarted,
    RecordingPaused,
    RecordingResumed,
    RecordingStopped,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::RecordingStarted => "recording_started",
            NotificationKind::RecordingPaused => "recording_paused",
            NotificationKind::RecordingResumed => "recording_resumed",
            NotificationKind::RecordingStopped => "recording_stopped",
        }
    }
}

/// Snapshot of the active session for UI layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// `None` when no session exists.
    pub state: Option<SessionState>,
    pub tutorial_id: Option<String>,
    pub title: Option<String>,
    /// Active recording time, pauses excluded.
    pub duration_ms: u64,
    pub live_step_count: u32,
    pub is_recording: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionNotification {
    pub kind: NotificationKind,
    pub status: SessionStatus,
}

pub struct SessionManager {
    coords: Arc<CoordinateSystem>,
    filter: AdmissionFilter,
    queue: RecordingEventQueue,
    capture: Arc<dyn CaptureService>,
    store: Arc<dyn StepStore>,
    synthesizer: StepSynthesizer,
    monitor: Mutex<Option<Arc<dyn InputMonitor>>>,
    session: Mutex<Option<RecordingSession>>,
    journal: Mutex<Option<SessionJournal>>,
    aggregator: Mutex<KeystrokeAggregator>,
    subscribers: Mutex<Vec<Sender<SessionNotification>>>,
    last_report: Mutex<Option<SynthesisReport>>,
}

impl SessionManager {
    pub fn new(
        config: &ScribeConfig,
        coords: Arc<CoordinateSystem>,
        capture: Arc<dyn CaptureService>,
        store: Arc<dyn StepStore>,
        cascade: Arc<RecognitionCascade>,
    ) -> Self {
        let synthesizer = StepSynthesizer::new(
            cascade,
            capture.clone(),
            store.clone(),
            config.synthesis.clone(),
        );
        Self {
            coords,
            filter: AdmissionFilter::new(
                config.keyboard.filter_keystrokes,
                config.keyboard.manual_capture_hotkey.clone(),
            ),
            queue: RecordingEventQueue::new(config.queue.capacity),
            capture,
            store,
            synthesizer,
            monitor: Mutex::new(None),
            session: Mutex::new(None),
            journal: Mutex::new(None),
            aggregator: Mutex::new(KeystrokeAggregator::new(
                config.keyboard.text_session_timeout(),
            )),
            subscribers: Mutex::new(Vec::new()),
            last_report: Mutex::new(None),
        }
    }

    pub fn set_input_monitor(&self, monitor: Arc<dyn InputMonitor>) {
        *self.monitor.lock() = Some(monitor);
    }

    pub fn coordinates(&self) -> &Arc<CoordinateSystem> {
        &self.coords
    }

    pub fn filter(&self) -> &AdmissionFilter {
        &self.filter
    }

    /// Replace the current session. An active one is stopped first.
    pub fn create_session(
        &self,
        tutorial_id: impl Into<String>,
        title: impl Into<String>,
        monitor_id: Option<u32>,
    ) -> SessionStatus {
        let active = self
            .session
            .lock()
            .as_ref()
            .is_some_and(|s| s.state() != SessionState::Stopped);
        if active {
            info!("Stopping active session before creating a new one");
            self.stop_recording();
        }

        let session = RecordingSession::new(tutorial_id, title, monitor_id);
        info!(tutorial_id = session.tutorial_id(), ?monitor_id, "Session created");
        *self.session.lock() = Some(session);
        *self.journal.lock() = None;
        self.status()
    }

    /// Begin recording. Succeeds without input monitoring, in which case only
    /// manual captures are recorded.
    pub fn start_recording(&self) -> bool {
        let tutorial_id = {
            let mut guard = self.session.lock();
            let Some(session) = guard.as_mut() else {
                debug!("No session to start");
                return false;
            };
            if session.state() != SessionState::Stopped || session.is_finished() {
                debug!(state = ?session.state(), "Ignoring start");
                return false;
            }
            if session.start().is_none() {
                return false;
            }
            self.queue.start();
            self.aggregator.lock().flush();
            session.tutorial_id().to_string()
        };

        let mut journal = SessionJournal::new(&tutorial_id);
        journal.log_state("started");

        let monitor = self.monitor.lock().clone();
        match monitor {
            Some(monitor) => {
                if let Err(e) = monitor.start() {
                    warn!(error = %e, "Input monitoring unavailable, manual capture only");
                    journal.log_warning("input_monitor", e.to_string());
                }
            }
            None => warn!("No input monitor attached, manual capture only"),
        }
        *self.journal.lock() = Some(journal);

        self.persist_status(&tutorial_id, TutorialStatus::Recording);
        self.notify(NotificationKind::RecordingStarted);
        true
    }

    pub fn pause_recording(&self) -> bool {
        self.transition(
            RecordingSession::pause,
            "paused",
            TutorialStatus::Paused,
            NotificationKind::RecordingPaused,
        )
    }

    pub fn resume_recording(&self) -> bool {
        self.transition(
            RecordingSession::resume,
            "resumed",
            TutorialStatus::Recording,
            NotificationKind::RecordingResumed,
        )
    }

    fn transition(
        &self,
        apply: fn(&mut RecordingSession) -> Option<SessionTransition>,
        label: &str,
        status: TutorialStatus,
        kind: NotificationKind,
    ) -> bool {
        let tutorial_id = {
            let mut guard = self.session.lock();
            let Some(session) = guard.as_mut() else {
                return false;
            };
            if apply(session).is_none() {
                return false;
            }
            session.tutorial_id().to_string()
        };

        if let Some(journal) = self.journal.lock().as_mut() {
            journal.log_state(label);
        }
        self.persist_status(&tutorial_id, status);
        self.notify(kind);
        true
    }

    /// Stop recording, synthesize steps and discard the session.
    /// Returns the tutorial id, or `None` if nothing was recording.
    pub fn stop_recording(&self) -> Option<String> {
        let (tutorial_id, selected_monitor) = {
            let guard = self.session.lock();
            let session = guard.as_ref()?;
            if session.state() == SessionState::Stopped {
                debug!("Ignoring stop: session not active");
                return None;
            }
            (session.tutorial_id().to_string(), session.selected_monitor())
        };

        // Text typed right before stopping still belongs to the recording.
        let pending = self.aggregator.lock().flush();
        if let Some(event) = pending {
            self.admit_buffered_text(event);
        }

        self.queue.stop();
        if let Some(monitor) = self.monitor.lock().clone() {
            monitor.stop();
        }
        let duration = {
            let mut guard = self.session.lock();
            let session = guard.as_mut()?;
            session.stop();
            session.elapsed_active()
        };

        let events = self.queue.drain();
        let mut journal = self
            .journal
            .lock()
            .take()
            .unwrap_or_else(|| SessionJournal::new(&tutorial_id));
        let report = self
            .synthesizer
            .process(&tutorial_id, selected_monitor, events, &mut journal);
        self.queue.complete();

        journal.set_duration_ms(duration.as_millis() as u64);
        journal.log_state("stopped");
        self.persist_status(&tutorial_id, TutorialStatus::Completed);
        if let Err(e) = self.store.save_journal(&tutorial_id, &journal) {
            warn!(error = %e, "Failed to save session journal");
        }

        *self.last_report.lock() = Some(report);
        info!(
            tutorial_id = %tutorial_id,
            duration_ms = duration.as_millis() as u64,
            steps = report.steps_created,
            "Recording stopped"
        );
        self.notify(NotificationKind::RecordingStopped);
        *self.session.lock() = None;
        Some(tutorial_id)
    }

    pub fn status(&self) -> SessionStatus {
        let guard = self.session.lock();
        match guard.as_ref() {
            Some(session) => SessionStatus {
                state: Some(session.state()),
                tutorial_id: Some(session.tutorial_id().to_string()),
                title: Some(session.title().to_string()),
                duration_ms: session.elapsed_active().as_millis() as u64,
                live_step_count: session.live_step_count(),
                is_recording: session.is_recording(),
            },
            None => SessionStatus::default(),
        }
    }

    /// Report of the most recent synthesis pass.
    pub fn last_report(&self) -> Option<SynthesisReport> {
        *self.last_report.lock()
    }

    pub fn subscribe(&self) -> Receiver<SessionNotification> {
        let (tx, rx) = bounded(NOTIFICATION_BUFFER);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Flip keystroke suppression; returns the new setting.
    pub fn toggle_keystrokes(&self) -> bool {
        let (enabled, pending) = {
            let mut aggregator = self.aggregator.lock();
            let pending = aggregator.flush();
            (self.filter.toggle_keystrokes(), pending)
        };
        // Text typed before the switch is judged under the old setting.
        if let Some(event) = pending {
            if enabled {
                self.record_key(event);
            } else {
                self.reject(&event, FilterReason::KeystrokeFiltered);
            }
        }
        enabled
    }

    /// Whether a point lies on the session's selected monitor. Always true
    /// without a selection.
    pub fn is_event_on_selected_monitor(&self, x: i32, y: i32) -> bool {
        let selected = self.session.lock().as_ref().and_then(|s| s.selected_monitor());
        match selected {
            Some(id) => CoordinateSystem::is_on_monitor(&self.coords.resolve(x, y), id),
            None => true,
        }
    }

    /// Manual capture at the tracked pointer, or the primary monitor's center.
    pub fn capture_at_pointer(&self) -> bool {
        let position = self.monitor.lock().as_ref().and_then(|m| m.pointer_position());
        let (x, y) = position.unwrap_or_else(|| {
            let primary = self.coords.primary();
            (
                primary.left + (primary.width / 2) as i32,
                primary.top + (primary.height / 2) as i32,
            )
        });
        self.record_pointer(RawInputEvent::ManualCapture { x, y })
    }

    fn session_state(&self) -> SessionState {
        self.session
            .lock()
            .as_ref()
            .map(RecordingSession::state)
            .unwrap_or_default()
    }

    fn reject(&self, event: &RawInputEvent, reason: FilterReason) {
        debug!(kind = event.kind_name(), reason = reason.as_str(), "Event filtered");
        if let Some(journal) = self.journal.lock().as_mut() {
            journal.log_filtered(event, reason);
        }
    }

    fn admitted(&self, event: &RawInputEvent, counts_as_step: bool) {
        if counts_as_step {
            if let Some(session) = self.session.lock().as_mut() {
                session.increment_step_counter();
            }
        }
        if let Some(journal) = self.journal.lock().as_mut() {
            journal.log_admitted(event);
        }
    }

    fn record_pointer(&self, event: RawInputEvent) -> bool {
        let decision = self.filter.decide(&event, self.session_state());
        if !decision.admit {
            self.reject(&event, decision.reason);
            return false;
        }
        let Some((x, y)) = event.position() else {
            return false;
        };

        let sample = self.coords.resolve(x, y);
        self.coords.set_last_capture_monitor(sample.monitor);
        let screenshot = match self.capture.capture_full_screen(CaptureTarget::Point { x, y }) {
            Ok(shot) => Some(Arc::new(shot)),
            Err(e) => {
                warn!(error = %e, x, y, "Screenshot capture failed");
                if let Some(journal) = self.journal.lock().as_mut() {
                    journal.log_warning("capture", e.to_string());
                }
                None
            }
        };

        let kept = match event {
            RawInputEvent::ManualCapture { .. } => {
                self.queue
                    .add_manual_capture(event.clone(), screenshot, Some(sample))
            }
            _ => self.queue.add_click(event.clone(), screenshot, Some(sample)),
        };
        if kept {
            debug!(kind = event.kind_name(), x, y, "Event recorded");
            self.admitted(&event, true);
        }
        kept
    }

    /// Buffered text was typed while recording, so only the keystroke and
    /// hotkey rules apply to it.
    fn admit_buffered_text(&self, event: RawInputEvent) {
        let decision = self.filter.decide(&event, SessionState::Recording);
        if decision.admit {
            self.record_key(event);
        } else {
            self.reject(&event, decision.reason);
        }
    }

    fn record_key(&self, event: RawInputEvent) -> bool {
        if !self.queue.add_key(event.clone()) {
            return false;
        }
        let counts = matches!(
            event,
            RawInputEvent::KeyPress {
                kind: KeyKind::Special | KeyKind::TextInput,
                ..
            }
        );
        self.admitted(&event, counts);
        true
    }

    fn persist_status(&self, tutorial_id: &str, status: TutorialStatus) {
        if let Err(e) = self.store.update_status(tutorial_id, status) {
            warn!(error = %e, ?status, "Failed to update tutorial status");
        }
    }

    fn notify(&self, kind: NotificationKind) {
        let notification = SessionNotification {
            kind,
            status: self.status(),
        };
        info!(kind = kind.as_str(), "Session notification");
        self.subscribers
            .lock()
            .retain(|tx| match tx.try_send(notification.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber lagging, notification dropped");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

impl InputSink for SessionManager {
    fn on_pointer_click(&self, event: RawInputEvent) {
        self.record_pointer(event);
    }

    fn on_key(&self, key: &str, is_special: bool) {
        let state = self.session_state();
        if state != SessionState::Recording {
            let event = RawInputEvent::KeyPress {
                key: key.to_string(),
                is_special,
                kind: if is_special {
                    KeyKind::Special
                } else {
                    KeyKind::Character
                },
            };
            self.reject(&event, FilterReason::SessionNotRecording);
            return;
        }

        // Suppressed characters never reach the text buffer.
        if !is_special && self.filter.filters_keystrokes() {
            let event = RawInputEvent::KeyPress {
                key: key.to_string(),
                is_special,
                kind: KeyKind::Character,
            };
            self.reject(&event, FilterReason::KeystrokeFiltered);
            return;
        }

        let events = self.aggregator.lock().on_key(key, is_special, Instant::now());
        for event in events {
            let decision = self.filter.decide(&event, state);
            if decision.admit {
                self.record_key(event);
            } else {
                self.reject(&event, decision.reason);
            }
        }
    }

    fn on_manual_capture(&self, x: i32, y: i32) {
        self.record_pointer(RawInputEvent::ManualCapture { x, y });
    }
}
