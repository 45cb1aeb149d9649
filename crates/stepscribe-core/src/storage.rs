//! File-backed tutorial storage.
//!
//! Layout under the data directory:
//!
//! ```text
//! tutorials/<id>/metadata.json
//! tutorials/<id>/steps.json
//! tutorials/<id>/events.json
//! tutorials/<id>/journal.json
//! tutorials/<id>/screenshots/step_001.jpg
//! ```

use crate::{RawEventRecord, Screenshot, SessionJournal, StepStore, TutorialStep};
use image::codecs::jpeg::JpegEncoder;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Tutorial not found: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorialStatus {
    Recording,
    Paused,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorialMetadata {
    pub tutorial_id: String,
    pub title: String,
    pub status: TutorialStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub step_count: u32,
}

/// Stores each tutorial as a directory of JSON files plus JPEG screenshots.
pub struct FileStorage {
    root: PathBuf,
    screenshot_quality: u8,
    // Serializes read-modify-write of steps.json and metadata.json.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// `data_dir` is the application data root; tutorials live in `tutorials/`.
    pub fn new(data_dir: impl AsRef<Path>, screenshot_quality: u8) -> Self {
        Self {
            root: data_dir.as_ref().join("tutorials"),
            screenshot_quality: screenshot_quality.clamp(1, 100),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tutorial_dir(&self, tutorial_id: &str) -> PathBuf {
        self.root.join(sanitize_filename(tutorial_id))
    }

    fn existing_dir(&self, tutorial_id: &str) -> StorageResult<PathBuf> {
        let dir = self.tutorial_dir(tutorial_id);
        if !dir.is_dir() {
            return Err(StorageError::NotFound(tutorial_id.to_string()));
        }
        Ok(dir)
    }

    /// Create a new tutorial directory with a fresh ULID.
    pub fn create_tutorial(&self, title: &str) -> StorageResult<TutorialMetadata> {
        let tutorial_id = ulid::Ulid::new().to_string();
        let dir = self.tutorial_dir(&tutorial_id);
        fs::create_dir_all(dir.join("screenshots"))?;

        let now = OffsetDateTime::now_utc();
        let title = if title.trim().is_empty() {
            format!("Tutorial {}", &tutorial_id[..8])
        } else {
            title.trim().to_string()
        };
        let metadata = TutorialMetadata {
            tutorial_id,
            title,
            status: TutorialStatus::Recording,
            created_at: now,
            updated_at: now,
            step_count: 0,
        };
        write_json(&dir.join("metadata.json"), &metadata)?;
        write_json(&dir.join("steps.json"), &Vec::<TutorialStep>::new())?;

        info!(?dir, tutorial_id = %metadata.tutorial_id, "Created tutorial");
        Ok(metadata)
    }

    pub fn load_metadata(&self, tutorial_id: &str) -> StorageResult<TutorialMetadata> {
        let dir = self.existing_dir(tutorial_id)?;
        read_json(&dir.join("metadata.json"))
    }

    pub fn load_steps(&self, tutorial_id: &str) -> StorageResult<Vec<TutorialStep>> {
        let dir = self.existing_dir(tutorial_id)?;
        let path = dir.join("steps.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    pub fn load_raw_events(&self, tutorial_id: &str) -> StorageResult<Vec<RawEventRecord>> {
        let dir = self.existing_dir(tutorial_id)?;
        read_json(&dir.join("events.json"))
    }

    /// All tutorials, newest first. Directories without readable metadata are skipped.
    pub fn list_tutorials(&self) -> StorageResult<Vec<TutorialMetadata>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut tutorials = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            match read_json::<TutorialMetadata>(&path.join("metadata.json")) {
                Ok(metadata) => tutorials.push(metadata),
                Err(e) => debug!(?path, "Skipping tutorial directory: {}", e),
            }
        }

        tutorials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tutorials)
    }

    pub fn delete_tutorial(&self, tutorial_id: &str) -> StorageResult<()> {
        let dir = self.existing_dir(tutorial_id)?;
        fs::remove_dir_all(&dir)?;
        info!(?dir, "Deleted tutorial");
        Ok(())
    }

    fn update_metadata(
        &self,
        tutorial_id: &str,
        apply: impl FnOnce(&mut TutorialMetadata),
    ) -> StorageResult<()> {
        let dir = self.existing_dir(tutorial_id)?;
        let path = dir.join("metadata.json");
        let mut metadata: TutorialMetadata = read_json(&path)?;
        apply(&mut metadata);
        metadata.updated_at = OffsetDateTime::now_utc();
        write_json(&path, &metadata)
    }
}

impl StepStore for FileStorage {
    fn save_screenshot(
        &self,
        tutorial_id: &str,
        screenshot: &Screenshot,
        step_number: u32,
    ) -> StorageResult<String> {
        let dir = self.existing_dir(tutorial_id)?.join("screenshots");
        fs::create_dir_all(&dir)?;

        let relative = format!("screenshots/step_{:03}.jpg", step_number);
        let path = dir.join(format!("step_{:03}.jpg", step_number));
        let file = fs::File::create(&path)?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.screenshot_quality)
            .encode_image(&screenshot.image)?;

        debug!(?path, "Saved screenshot");
        Ok(relative)
    }

    fn save_step(&self, tutorial_id: &str, step: &TutorialStep) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        let dir = self.existing_dir(tutorial_id)?;
        let path = dir.join("steps.json");

        let mut steps: Vec<TutorialStep> = if path.exists() {
            read_json(&path)?
        } else {
            Vec::new()
        };
        match steps.iter_mut().find(|s| s.step_number == step.step_number) {
            Some(existing) => *existing = step.clone(),
            None => steps.push(step.clone()),
        }
        steps.sort_by_key(|s| s.step_number);
        write_json(&path, &steps)?;

        let count = steps.len() as u32;
        self.update_metadata(tutorial_id, |m| m.step_count = count)?;

        debug!(tutorial_id, step = step.step_number, "Saved step");
        Ok(())
    }

    fn save_raw_events(&self, tutorial_id: &str, events: &[RawEventRecord]) -> StorageResult<()> {
        let dir = self.existing_dir(tutorial_id)?;
        write_json(&dir.join("events.json"), &events)?;
        debug!(tutorial_id, count = events.len(), "Saved raw events");
        Ok(())
    }

    fn update_status(&self, tutorial_id: &str, status: TutorialStatus) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        self.update_metadata(tutorial_id, |m| m.status = status)?;
        info!(tutorial_id, ?status, "Updated tutorial status");
        Ok(())
    }

    fn save_journal(&self, tutorial_id: &str, journal: &SessionJournal) -> StorageResult<()> {
        let dir = self.existing_dir(tutorial_id)?;
        write_json(&dir.join("journal.json"), journal)?;
        debug!(tutorial_id, entries = journal.entries().len(), "Saved session journal");
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StorageResult<T> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Make an id safe to use as a directory name.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MouseButton, RawInputEvent, StepType};
    use image::RgbImage;
    use tempfile::TempDir;

    fn step(n: u32) -> TutorialStep {
        TutorialStep {
            step_id: format!("step_{n}"),
            step_number: n,
            timestamp_ms: 1000 + n as u64,
            description: format!("Click at position ({n}, {n})"),
            screenshot_ref: None,
            recognized_text: None,
            recognition_confidence: 0.0,
            coordinates: Some((n as i32, n as i32)),
            coordinates_percent: None,
            screen_dimensions: None,
            step_type: StepType::Click,
            event: RawInputEvent::click(n as i32, n as i32, MouseButton::Left),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("01HXYZ"), "01HXYZ");
        assert_eq!(sanitize_filename("a/b"), "a_b");
        assert_eq!(sanitize_filename("a:b*c?d"), "a_b_c_d");
    }

    #[test]
    fn test_create_and_list() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 85);
        let first = storage.create_tutorial("First").unwrap();
        let second = storage.create_tutorial("  ").unwrap();
        assert!(second.title.starts_with("Tutorial "));
        assert_eq!(first.status, TutorialStatus::Recording);

        let listed = storage.list_tutorials().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|m| m.tutorial_id == first.tutorial_id));
    }

    #[test]
    fn test_steps_are_ordered_and_replaced() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 85);
        let id = storage.create_tutorial("Steps").unwrap().tutorial_id;

        storage.save_step(&id, &step(2)).unwrap();
        storage.save_step(&id, &step(1)).unwrap();
        let mut replaced = step(2);
        replaced.description = "Press Return".into();
        storage.save_step(&id, &replaced).unwrap();

        let steps = storage.load_steps(&id).unwrap();
        assert_eq!(steps.iter().map(|s| s.step_number).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(steps[1].description, "Press Return");
        assert_eq!(storage.load_metadata(&id).unwrap().step_count, 2);
    }

    #[test]
    fn test_screenshot_status_and_events() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 85);
        let id = storage.create_tutorial("Shots").unwrap().tutorial_id;

        let shot = Screenshot::new(RgbImage::from_pixel(64, 32, image::Rgb([200, 10, 10])), None);
        let reference = storage.save_screenshot(&id, &shot, 7).unwrap();
        assert_eq!(reference, "screenshots/step_007.jpg");
        assert!(storage.tutorial_dir(&id).join(&reference).exists());

        storage.update_status(&id, TutorialStatus::Completed).unwrap();
        assert_eq!(storage.load_metadata(&id).unwrap().status, TutorialStatus::Completed);

        let records =
            vec![crate::QueuedEvent::new(RawInputEvent::special_key("Tab"), 5).to_record()];
        storage.save_raw_events(&id, &records).unwrap();
        assert_eq!(storage.load_raw_events(&id).unwrap(), records);
    }

    #[test]
    fn test_missing_tutorial() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 85);
        assert!(matches!(
            storage.update_status("nope", TutorialStatus::Paused),
            Err(StorageError::NotFound(_))
        ));
        assert!(storage.list_tutorials().unwrap().is_empty());
    }

    #[test]
    fn test_delete_tutorial() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path(), 85);
        let id = storage.create_tutorial("Gone").unwrap().tutorial_id;
        storage.delete_tutorial(&id).unwrap();
        assert!(storage.load_metadata(&id).is_err());
    }
}
