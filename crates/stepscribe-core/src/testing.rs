//! In-memory fakes of the collaborator traits.

use crate::recognition::{RecognizedText, TextRecognizer};
use crate::{
    CaptureError, CaptureResult, CaptureService, CaptureTarget, InputMonitor, MonitorError,
    MonitorGeometry, RawEventRecord, RecognitionError, RecognitionResult, ScreenInfo, Screenshot,
    SessionJournal, StepStore, StorageError, StorageResult, TutorialStatus, TutorialStep,
};
use image::{GrayImage, Rgb, RgbImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Returns the same text for every call.
pub struct FixedRecognizer {
    name: String,
    text: String,
    confidence: f32,
    calls: AtomicUsize,
}

impl FixedRecognizer {
    pub fn new(name: &str, text: &str, confidence: f32) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
            confidence,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for FixedRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, _image: &GrayImage) -> RecognitionResult<RecognizedText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RecognizedText::new(self.text.clone(), self.confidence))
    }
}

/// Replays results in call order; `None` is a backend failure. The last
/// entry repeats once the script runs out.
pub struct ScriptedRecognizer {
    name: String,
    script: Vec<Option<(&'static str, f32)>>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(name: &str, script: Vec<Option<(&'static str, f32)>>) -> Self {
        Self {
            name: name.to_string(),
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for ScriptedRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, _image: &GrayImage) -> RecognitionResult<RecognizedText> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .get(call)
            .or_else(|| self.script.last())
            .copied()
            .flatten();
        match step {
            Some((text, confidence)) => Ok(RecognizedText::new(text, confidence)),
            None => Err(RecognitionError::Backend("scripted failure".into())),
        }
    }
}

/// Hands out copies of one image as a single primary monitor.
pub struct FakeCapture {
    image: RgbImage,
    monitor: MonitorGeometry,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeCapture {
    pub fn new(image: RgbImage) -> Self {
        let monitor = MonitorGeometry::new(1, 0, 0, image.width(), image.height(), true);
        Self {
            image,
            monitor,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn white(width: u32, height: u32) -> Self {
        Self::new(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    pub fn monitor(&self) -> MonitorGeometry {
        self.monitor
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CaptureService for FakeCapture {
    fn capture_full_screen(&self, _target: CaptureTarget) -> CaptureResult<Screenshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CaptureError::Backend("capture disabled".into()));
        }
        Ok(Screenshot::new(self.image.clone(), Some(self.monitor)))
    }

    fn screen_info(&self) -> ScreenInfo {
        ScreenInfo {
            left: 0,
            top: 0,
            width: self.monitor.width,
            height: self.monitor.height,
            monitor_count: 1,
            monitors: vec![self.monitor],
        }
    }
}

/// Records everything written through [`StepStore`].
#[derive(Default)]
pub struct MemoryStore {
    pub steps: Mutex<Vec<TutorialStep>>,
    pub screenshots: Mutex<Vec<(String, u32)>>,
    pub statuses: Mutex<Vec<TutorialStatus>>,
    pub raw_events: Mutex<Vec<RawEventRecord>>,
    pub journals: Mutex<Vec<SessionJournal>>,
    /// Fail the next `save_step` call once.
    pub fail_next_step: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> Vec<TutorialStep> {
        self.steps.lock().clone()
    }

    pub fn statuses(&self) -> Vec<TutorialStatus> {
        self.statuses.lock().clone()
    }
}

impl StepStore for MemoryStore {
    fn save_screenshot(
        &self,
        tutorial_id: &str,
        _screenshot: &Screenshot,
        step_number: u32,
    ) -> StorageResult<String> {
        self.screenshots
            .lock()
            .push((tutorial_id.to_string(), step_number));
        Ok(format!("screenshots/step_{step_number:03}.jpg"))
    }

    fn save_step(&self, tutorial_id: &str, step: &TutorialStep) -> StorageResult<()> {
        if self.fail_next_step.swap(false, Ordering::SeqCst) {
            return Err(StorageError::NotFound(tutorial_id.to_string()));
        }
        self.steps.lock().push(step.clone());
        Ok(())
    }

    fn save_raw_events(&self, _tutorial_id: &str, events: &[RawEventRecord]) -> StorageResult<()> {
        self.raw_events.lock().extend_from_slice(events);
        Ok(())
    }

    fn update_status(&self, _tutorial_id: &str, status: TutorialStatus) -> StorageResult<()> {
        self.statuses.lock().push(status);
        Ok(())
    }

    fn save_journal(&self, _tutorial_id: &str, journal: &SessionJournal) -> StorageResult<()> {
        self.journals.lock().push(journal.clone());
        Ok(())
    }
}

/// Input monitor that only tracks whether it is running.
#[derive(Default)]
pub struct FakeMonitor {
    pub running: AtomicBool,
    pub unavailable: bool,
    pub position: Option<(i32, i32)>,
}

impl InputMonitor for FakeMonitor {
    fn start(&self) -> Result<(), MonitorError> {
        if self.unavailable {
            return Err(MonitorError::Unavailable("no permission".into()));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        self.position
    }
}
