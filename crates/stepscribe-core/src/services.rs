//! Collaborator interfaces the pipeline calls into.
//!
//! Screen capture and persistence are provided by other crates (or by test
//! fakes); the core only depends on these traits.

use crate::{
    CaptureResult, MonitorGeometry, RawEventRecord, ScreenInfo, SessionJournal, StorageResult,
    TutorialStatus, TutorialStep,
};
use image::RgbImage;

/// A captured frame of one monitor.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub image: RgbImage,
    /// Monitor the frame was taken from, when known.
    pub monitor: Option<MonitorGeometry>,
    pub captured_at_ms: u64,
}

impl Screenshot {
    pub fn new(image: RgbImage, monitor: Option<MonitorGeometry>) -> Self {
        Self {
            image,
            monitor,
            captured_at_ms: crate::now_ms(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// What to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    /// A specific monitor, or the primary one when `None`.
    Monitor(Option<u32>),
    /// Whichever monitor contains this global point.
    Point { x: i32, y: i32 },
}

/// Screen capture. Implementations must not share OS capture handles
/// between calls; each capture acquires and releases its own.
pub trait CaptureService: Send + Sync {
    fn capture_full_screen(&self, target: CaptureTarget) -> CaptureResult<Screenshot>;

    fn screen_info(&self) -> ScreenInfo;
}

/// Tutorial persistence.
pub trait StepStore: Send + Sync {
    /// Returns a reference (path or key) to the stored image.
    fn save_screenshot(
        &self,
        tutorial_id: &str,
        screenshot: &Screenshot,
        step_number: u32,
    ) -> StorageResult<String>;

    fn save_step(&self, tutorial_id: &str, step: &TutorialStep) -> StorageResult<()>;

    fn save_raw_events(&self, tutorial_id: &str, events: &[RawEventRecord]) -> StorageResult<()>;

    fn update_status(&self, tutorial_id: &str, status: TutorialStatus) -> StorageResult<()>;

    fn save_journal(&self, tutorial_id: &str, journal: &SessionJournal) -> StorageResult<()>;
}
