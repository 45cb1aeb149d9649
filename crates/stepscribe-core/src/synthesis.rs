//! Step synthesis: turns a drained event batch into persisted tutorial steps.

use crate::recognition::{RecognitionCascade, RecognitionOutcome, RecognitionSource};
use crate::{
    CaptureService, CaptureTarget, CoordinateSample, CoordinateSystem, KeyKind, MouseButton,
    QueuedEvent, RawEventRecord, RawInputEvent, ScreenInfo, Screenshot, SessionJournal,
    StepStore, StepType, SynthesisConfig, SynthesisError, TutorialStep,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of one synthesis pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    pub steps_created: u32,
    /// Events that legitimately produce no step, or lack a screenshot.
    pub skipped: u32,
    pub errors: u32,
}

/// Mutable state of one pass over a batch.
struct Pass {
    next_number: u32,
    last_key_ms: Option<u64>,
    last_screenshot: Option<Arc<Screenshot>>,
}

pub struct StepSynthesizer {
    cascade: Arc<RecognitionCascade>,
    capture: Arc<dyn CaptureService>,
    store: Arc<dyn StepStore>,
    config: SynthesisConfig,
}

impl StepSynthesizer {
    pub fn new(
        cascade: Arc<RecognitionCascade>,
        capture: Arc<dyn CaptureService>,
        store: Arc<dyn StepStore>,
        config: SynthesisConfig,
    ) -> Self {
        Self {
            cascade,
            capture,
            store,
            config,
        }
    }

    pub fn cascade(&self) -> &Arc<RecognitionCascade> {
        &self.cascade
    }

    /// Process a batch in order. Step numbers start at 1 and only advance when
    /// a step is saved. Per-event failures are logged and never abort the batch.
    pub fn process(
        &self,
        tutorial_id: &str,
        selected_monitor: Option<u32>,
        events: Vec<QueuedEvent>,
        journal: &mut SessionJournal,
    ) -> SynthesisReport {
        info!(tutorial_id, count = events.len(), "Synthesizing steps");
        let mut report = SynthesisReport::default();
        let mut pass = Pass {
            next_number: 1,
            last_key_ms: None,
            last_screenshot: None,
        };

        for queued in &events {
            match self.process_event(tutorial_id, selected_monitor, queued, &mut pass) {
                Ok(Some(step)) => {
                    debug!(
                        number = step.step_number,
                        description = %step.description,
                        "Step created"
                    );
                    report.steps_created += 1;
                }
                Ok(None) => report.skipped += 1,
                Err(SynthesisError::MissingScreenshot(kind)) => {
                    warn!(kind, "Skipping event without screenshot");
                    journal
                        .log_warning("synthesis", format!("{kind} event skipped: no screenshot"));
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(kind = queued.event.kind_name(), error = %e, "Failed to synthesize step");
                    journal.log_error("synthesis", e.to_string());
                    report.errors += 1;
                }
            }
        }

        let records: Vec<RawEventRecord> = events.iter().map(QueuedEvent::to_record).collect();
        if let Err(e) = self.store.save_raw_events(tutorial_id, &records) {
            warn!(error = %e, "Failed to save raw events");
            journal.log_error("storage", format!("raw events not saved: {e}"));
        }

        info!(
            tutorial_id,
            created = report.steps_created,
            skipped = report.skipped,
            errors = report.errors,
            "Synthesis complete"
        );
        report
    }

    fn process_event(
        &self,
        tutorial_id: &str,
        selected_monitor: Option<u32>,
        queued: &QueuedEvent,
        pass: &mut Pass,
    ) -> Result<Option<TutorialStep>, SynthesisError> {
        match &queued.event {
            RawInputEvent::PointerClick { .. } | RawInputEvent::ManualCapture { .. } => {
                self.pointer_step(tutorial_id, queued, pass).map(Some)
            }
            RawInputEvent::KeyPress { key, kind, .. } => {
                self.key_step(tutorial_id, selected_monitor, queued, key, *kind, pass)
            }
        }
    }

    fn pointer_step(
        &self,
        tutorial_id: &str,
        queued: &QueuedEvent,
        pass: &mut Pass,
    ) -> Result<TutorialStep, SynthesisError> {
        let event = &queued.event;
        let screenshot = queued
            .screenshot
            .clone()
            .ok_or(SynthesisError::MissingScreenshot(event.kind_name()))?;
        let (global_x, global_y) = event.position().unwrap_or((0, 0));

        let dimensions = screenshot.dimensions();
        let screen = self.capture.screen_info();
        let (px, py) = resolve_pixel(
            (global_x, global_y),
            queued.coordinates.as_ref(),
            dimensions,
            &screen,
            (
                self.config.fallback_screen_width,
                self.config.fallback_screen_height,
            ),
        );
        let outcome = self.cascade.recognize_at(&screenshot.image, px, py);
        debug!(px, py, text = %outcome.text, source = ?outcome.source, "Recognized click target");

        let (description, step_type) = match event {
            RawInputEvent::PointerClick {
                button, click_count, ..
            } => (
                describe_click(*button, *click_count, &outcome, global_x, global_y),
                StepType::Click,
            ),
            _ => (
                describe_capture(&outcome, global_x, global_y),
                StepType::ManualCapture,
            ),
        };

        let percent = match &queued.coordinates {
            Some(sample) => (sample.percent_x, sample.percent_y),
            None => (
                px as f64 / dimensions.0.max(1) as f64,
                py as f64 / dimensions.1.max(1) as f64,
            ),
        };

        let number = pass.next_number;
        let screenshot_ref = self.store.save_screenshot(tutorial_id, &screenshot, number)?;
        let step = TutorialStep {
            step_id: format!("step_{number}"),
            step_number: number,
            timestamp_ms: queued.timestamp_ms,
            description,
            screenshot_ref: Some(screenshot_ref),
            recognized_text: outcome.is_valid().then(|| outcome.text.clone()),
            recognition_confidence: if outcome.is_valid() {
                outcome.confidence
            } else {
                0.0
            },
            coordinates: Some((global_x, global_y)),
            coordinates_percent: Some(percent),
            screen_dimensions: Some(dimensions),
            step_type,
            event: event.clone(),
        };
        self.store.save_step(tutorial_id, &step)?;

        pass.next_number += 1;
        pass.last_screenshot = Some(screenshot);
        Ok(step)
    }

    fn key_step(
        &self,
        tutorial_id: &str,
        selected_monitor: Option<u32>,
        queued: &QueuedEvent,
        key: &str,
        kind: KeyKind,
        pass: &mut Pass,
    ) -> Result<Option<TutorialStep>, SynthesisError> {
        // Aggregated text is emitted together with the key that closed it, so
        // it neither gets debounced nor advances the debounce clock.
        if kind != KeyKind::TextInput {
            let debounced = pass.last_key_ms.is_some_and(|last| {
                Duration::from_millis(queued.timestamp_ms.saturating_sub(last))
                    < self.config.key_debounce()
            });
            if debounced {
                debug!(key, "Debounced key event");
                return Ok(None);
            }
            pass.last_key_ms = Some(queued.timestamp_ms);
        }

        let (description, step_type) = match kind {
            KeyKind::Character => return Ok(None),
            KeyKind::Special => (format!("Press {key}"), StepType::Key),
            KeyKind::TextInput => (format!("Type \"{key}\""), StepType::Type),
        };

        let screenshot = match &pass.last_screenshot {
            Some(previous) => Some(previous.clone()),
            None => match self
                .capture
                .capture_full_screen(CaptureTarget::Monitor(selected_monitor))
            {
                Ok(fresh) => {
                    let fresh = Arc::new(fresh);
                    pass.last_screenshot = Some(fresh.clone());
                    Some(fresh)
                }
                Err(e) => {
                    warn!(error = %e, "No screenshot for key step");
                    None
                }
            },
        };

        let number = pass.next_number;
        let screenshot_ref = match &screenshot {
            Some(shot) => Some(self.store.save_screenshot(tutorial_id, shot, number)?),
            None => None,
        };
        let step = TutorialStep {
            step_id: format!("step_{number}"),
            step_number: number,
            timestamp_ms: queued.timestamp_ms,
            description,
            screenshot_ref,
            recognized_text: None,
            recognition_confidence: 0.0,
            coordinates: None,
            coordinates_percent: None,
            screen_dimensions: screenshot.as_ref().map(|s| s.dimensions()),
            step_type,
            event: queued.event.clone(),
        };
        self.store.save_step(tutorial_id, &step)?;

        pass.next_number += 1;
        Ok(Some(step))
    }
}

/// Screenshot pixel under a global click.
///
/// A sample taken on a monitor of the screenshot's size maps directly through
/// its monitor-relative coordinates; other samples are projected by percentage.
/// Without a sample the point is scaled from the screen bounds.
pub fn resolve_pixel(
    global: (i32, i32),
    sample: Option<&CoordinateSample>,
    dimensions: (u32, u32),
    screen: &ScreenInfo,
    fallback_screen: (u32, u32),
) -> (u32, u32) {
    let (width, height) = dimensions;
    let max_x = width.saturating_sub(1);
    let max_y = height.saturating_sub(1);

    match sample {
        Some(s) if s.monitor.width == width && s.monitor.height == height => (
            (s.monitor_relative_x.max(0) as u32).min(max_x),
            (s.monitor_relative_y.max(0) as u32).min(max_y),
        ),
        Some(s) => CoordinateSystem::project_to_pixels(s, width, height),
        None => {
            let usable = screen.monitor_count > 0 && screen.width > 0 && screen.height > 0;
            let (left, top, screen_w, screen_h) = if usable {
                (screen.left, screen.top, screen.width, screen.height)
            } else {
                (0, 0, fallback_screen.0.max(1), fallback_screen.1.max(1))
            };
            let scale = |value: i32, origin: i32, size: u32, target: u32, max: u32| -> u32 {
                let offset = (value as i64 - origin as i64).max(0) as f64;
                ((offset * target as f64 / size as f64).round() as u32).min(max)
            };
            (
                scale(global.0, left, screen_w, width, max_x),
                scale(global.1, top, screen_h, height, max_y),
            )
        }
    }
}

fn click_prefix(button: MouseButton, click_count: u8) -> String {
    let double = click_count >= 2;
    match button {
        MouseButton::Left if double => "Double-click".to_string(),
        MouseButton::Left => "Click".to_string(),
        other if double => format!("{} double-click", other.label()),
        other => format!("{} click", other.label()),
    }
}

fn describe_target(prefix: &str, outcome: &RecognitionOutcome) -> Option<String> {
    match &outcome.source {
        RecognitionSource::Backend { .. } if outcome.text.chars().count() <= 2 => {
            Some(format!("{prefix} \"{}\" element", outcome.text))
        }
        RecognitionSource::Backend { .. } => Some(format!("{prefix} \"{}\"", outcome.text)),
        RecognitionSource::Context => Some(format!("{prefix} {}", outcome.text)),
        RecognitionSource::None => None,
    }
}

pub fn describe_click(
    button: MouseButton,
    click_count: u8,
    outcome: &RecognitionOutcome,
    x: i32,
    y: i32,
) -> String {
    let prefix = click_prefix(button, click_count);
    describe_target(&format!("{prefix} on"), outcome)
        .unwrap_or_else(|| format!("{prefix} at position ({x}, {y})"))
}

pub fn describe_capture(outcome: &RecognitionOutcome, x: i32, y: i32) -> String {
    describe_target("Capture view of", outcome)
        .unwrap_or_else(|| format!("Capture view at position ({x}, {y})"))
}
