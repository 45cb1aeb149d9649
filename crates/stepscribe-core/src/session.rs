//! Recording session: state machine, pause accounting and live step counter.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Stopped,
    Recording,
    Paused,
}

/// A state change that actually happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTransition {
    pub old: SessionState,
    pub new: SessionState,
}

/// One recording of one tutorial.
#[derive(Debug)]
pub struct RecordingSession {
    tutorial_id: String,
    title: String,
    selected_monitor: Option<u32>,
    state: SessionState,
    start_time: Option<Instant>,
    stop_time: Option<Instant>,
    pause_start: Option<Instant>,
    total_paused: Duration,
    live_step_count: u32,
    started: bool,
}

impl RecordingSession {
    pub fn new(
        tutorial_id: impl Into<String>,
        title: impl Into<String>,
        selected_monitor: Option<u32>,
    ) -> Self {
        Self {
            tutorial_id: tutorial_id.into(),
            title: title.into(),
            selected_monitor,
            state: SessionState::Stopped,
            start_time: None,
            stop_time: None,
            pause_start: None,
            total_paused: Duration::ZERO,
            live_step_count: 0,
            started: false,
        }
    }

    pub fn tutorial_id(&self) -> &str {
        &self.tutorial_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn selected_monitor(&self) -> Option<u32> {
        self.selected_monitor
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Whether `stop` has finalized this session.
    pub fn is_finished(&self) -> bool {
        self.started && self.state == SessionState::Stopped
    }

    /// Optimistic count of captured events, for live feedback only.
    pub fn live_step_count(&self) -> u32 {
        self.live_step_count
    }

    pub fn increment_step_counter(&mut self) -> u32 {
        self.live_step_count = self.live_step_count.saturating_add(1);
        self.live_step_count
    }

    pub fn start(&mut self) -> Option<SessionTransition> {
        self.start_at(Instant::now())
    }

    /// Start a fresh recording. A finished session cannot be restarted.
    pub fn start_at(&mut self, now: Instant) -> Option<SessionTransition> {
        if self.state != SessionState::Stopped || self.started {
            return None;
        }

        self.start_time = Some(now);
        self.stop_time = None;
        self.pause_start = None;
        self.total_paused = Duration::ZERO;
        self.live_step_count = 0;
        self.started = true;

        info!(tutorial_id = %self.tutorial_id, "Session started");
        Some(self.transition(SessionState::Recording))
    }

    pub fn pause(&mut self) -> Option<SessionTransition> {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&mut self, now: Instant) -> Option<SessionTransition> {
        if self.state != SessionState::Recording {
            return None;
        }
        self.pause_start = Some(now);
        info!(tutorial_id = %self.tutorial_id, "Session paused");
        Some(self.transition(SessionState::Paused))
    }

    pub fn resume(&mut self) -> Option<SessionTransition> {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&mut self, now: Instant) -> Option<SessionTransition> {
        if self.state != SessionState::Paused {
            return None;
        }
        if let Some(pause_start) = self.pause_start.take() {
            self.total_paused += now.saturating_duration_since(pause_start);
        }
        info!(tutorial_id = %self.tutorial_id, "Session resumed");
        Some(self.transition(SessionState::Recording))
    }

    pub fn stop(&mut self) -> Option<SessionTransition> {
        self.stop_at(Instant::now())
    }

    /// Finalize. An open pause window is closed and excluded.
    pub fn stop_at(&mut self, now: Instant) -> Option<SessionTransition> {
        if self.state == SessionState::Stopped {
            return None;
        }
        if let Some(pause_start) = self.pause_start.take() {
            self.total_paused += now.saturating_duration_since(pause_start);
        }
        self.stop_time = Some(now);
        info!(
            tutorial_id = %self.tutorial_id,
            active_ms = self.elapsed_active_at(now).as_millis() as u64,
            "Session stopped"
        );
        Some(self.transition(SessionState::Stopped))
    }

    pub fn elapsed_active(&self) -> Duration {
        self.elapsed_active_at(Instant::now())
    }

    /// Active recording time excluding pauses. Frozen once stopped.
    pub fn elapsed_active_at(&self, now: Instant) -> Duration {
        let Some(start) = self.start_time else {
            return Duration::ZERO;
        };
        let end = self.stop_time.unwrap_or(now);
        let open_pause = match (self.state, self.pause_start) {
            (SessionState::Paused, Some(pause_start)) => end.saturating_duration_since(pause_start),
            _ => Duration::ZERO,
        };
        end.saturating_duration_since(start)
            .saturating_sub(self.total_paused)
            .saturating_sub(open_pause)
    }

    pub fn total_paused(&self) -> Duration {
        self.total_paused
    }

    fn transition(&mut self, new: SessionState) -> SessionTransition {
        let old = self.state;
        self.state = new;
        SessionTransition { old, new }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn session() -> RecordingSession {
        RecordingSession::new("tut-1", "Demo", None)
    }

    #[test]
    fn test_duration_excludes_pause() {
        let mut s = session();
        s.start();
        sleep(Duration::from_millis(120));
        s.pause();
        sleep(Duration::from_millis(200));
        s.resume();
        sleep(Duration::from_millis(80));
        s.stop();

        let active = s.elapsed_active().as_millis() as i64;
        assert!((active - 200).abs() < 60, "active {active}ms");
        assert!(s.total_paused() >= Duration::from_millis(200));
    }

    #[test]
    fn test_duration_arithmetic_with_explicit_instants() {
        let t0 = Instant::now();
        let mut s = session();
        s.start_at(t0);
        s.pause_at(t0 + Duration::from_secs(10));
        assert_eq!(s.elapsed_active_at(t0 + Duration::from_secs(15)), Duration::from_secs(10));
        s.resume_at(t0 + Duration::from_secs(20));
        assert_eq!(s.elapsed_active_at(t0 + Duration::from_secs(25)), Duration::from_secs(15));
        // Stop while paused: the open window is excluded too.
        s.pause_at(t0 + Duration::from_secs(30));
        s.stop_at(t0 + Duration::from_secs(40));
        assert_eq!(s.elapsed_active_at(t0 + Duration::from_secs(99)), Duration::from_secs(20));
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut s = session();
        assert!(s.pause().is_none());
        assert!(s.resume().is_none());
        assert!(s.stop().is_none());

        assert_eq!(
            s.start(),
            Some(SessionTransition {
                old: SessionState::Stopped,
                new: SessionState::Recording
            })
        );
        assert!(s.start().is_none());
        assert!(s.resume().is_none());
        assert!(s.pause().is_some());
        assert!(s.pause().is_none());
        assert!(s.stop().is_some());
        assert!(s.is_finished());
        assert!(s.start().is_none());
    }

    #[test]
    fn test_not_started_duration_is_zero() {
        assert_eq!(session().elapsed_active(), Duration::ZERO);
    }

    #[test]
    fn test_live_counter_independent_of_state() {
        let mut s = session();
        s.start();
        assert_eq!(s.increment_step_counter(), 1);
        assert_eq!(s.increment_step_counter(), 2);
        s.stop();
        assert_eq!(s.live_step_count(), 2);
    }
}
