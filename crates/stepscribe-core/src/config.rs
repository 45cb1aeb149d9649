//! Runtime configuration, loaded from a single YAML document.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    pub gesture: GestureConfig,
    pub keyboard: KeyboardConfig,
    pub queue: QueueConfig,
    pub synthesis: SynthesisConfig,
    pub recognition: RecognitionConfig,
    pub storage: StorageConfig,
}

/// Pointer gesture thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Movement beyond this radius while pressed turns a click into a drag.
    pub drag_threshold_px: u32,
    /// Maximum distance between the two clicks of a double-click.
    pub double_click_distance_px: u32,
    /// Overrides the platform double-click interval when set.
    pub double_click_interval_ms: Option<u64>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 5,
            double_click_distance_px: 10,
            double_click_interval_ms: None,
        }
    }
}

impl GestureConfig {
    pub fn double_click_interval(&self) -> Option<Duration> {
        self.double_click_interval_ms.map(Duration::from_millis)
    }
}

/// Keyboard capture behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Idle time after which a typed-text session is closed.
    pub text_session_timeout_ms: u64,
    /// Initial state of keystroke suppression.
    pub filter_keystrokes: bool,
    /// Key that triggers a manual capture; never recorded itself.
    pub manual_capture_hotkey: Option<String>,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            text_session_timeout_ms: 2000,
            filter_keystrokes: false,
            manual_capture_hotkey: Some("F9".into()),
        }
    }
}

impl KeyboardConfig {
    pub fn text_session_timeout(&self) -> Duration {
        Duration::from_millis(self.text_session_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of events buffered during one recording.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 4096 }
    }
}

/// Step synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Key events closer together than this are treated as OS repeats.
    pub key_debounce_ms: u64,
    /// Screen size assumed when a click carries no coordinate sample.
    pub fallback_screen_width: u32,
    pub fallback_screen_height: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            key_debounce_ms: 50,
            fallback_screen_width: 1920,
            fallback_screen_height: 1080,
        }
    }
}

impl SynthesisConfig {
    pub fn key_debounce(&self) -> Duration {
        Duration::from_millis(self.key_debounce_ms)
    }
}

/// Recognition cascade tuning and backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub search_radius_px: u32,
    pub nearest_region_max_distance_px: u32,
    pub fast_accept_confidence: f32,
    pub secondary_accept_confidence: f32,
    pub min_confidence: f32,
    /// Zero disables the recognition cache.
    pub cache_capacity: usize,
    pub context_region_px: u32,
    pub tesseract: TesseractConfig,
    pub service: OcrServiceConfig,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            search_radius_px: 150,
            nearest_region_max_distance_px: 50,
            fast_accept_confidence: 0.8,
            secondary_accept_confidence: 0.9,
            min_confidence: 0.3,
            cache_capacity: 256,
            context_region_px: 60,
            tesseract: TesseractConfig::default(),
            service: OcrServiceConfig::default(),
        }
    }
}

/// Local Tesseract binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    pub enabled: bool,
    pub binary: PathBuf,
    pub language: String,
    pub timeout_ms: u64,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: PathBuf::from("tesseract"),
            language: "eng".into(),
            timeout_ms: 5000,
        }
    }
}

impl TesseractConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// HTTP OCR service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrServiceConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_sec: u64,
    pub health_interval_sec: u64,
    pub health_timeout_sec: u64,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8000".into(),
            timeout_sec: 10,
            health_interval_sec: 5,
            health_timeout_sec: 3,
        }
    }
}

impl OcrServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_sec)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_sec)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root for tutorials and logs; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    /// JPEG quality for saved screenshots (1-100).
    pub screenshot_quality: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            screenshot_quality: 85,
        }
    }
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

/// Platform data directory for stepscribe.
pub fn default_data_dir() -> PathBuf {
    let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("stepscribe")
}

/// Location of the user config file.
pub fn default_config_path() -> PathBuf {
    let base = dirs_next::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("stepscribe").join("config.yaml")
}

/// Load configuration from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ScribeConfig> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_config(&content)
}

/// Parse configuration from a YAML string. An empty document yields defaults.
pub fn parse_config(content: &str) -> ConfigResult<ScribeConfig> {
    if content.trim().is_empty() {
        return Ok(ScribeConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Save configuration as YAML, creating parent directories.
pub fn save_config(path: impl AsRef<Path>, config: &ScribeConfig) -> ConfigResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    info!(?path, "Saved config");
    Ok(())
}

/// Load the explicit path if given, else the user config file.
///
/// A missing file yields defaults. So does an unreadable or malformed file,
/// after a warning.
pub fn load_or_default(path: Option<&Path>) -> ScribeConfig {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    if !path.exists() {
        debug!(?path, "No config file found, using defaults");
        return ScribeConfig::default();
    }

    match load_config(&path) {
        Ok(config) => {
            info!(?path, "Loaded config");
            config
        }
        Err(ConfigError::Yaml(e)) => {
            warn!(?path, "Failed to parse config: {}, using defaults", e);
            ScribeConfig::default()
        }
        Err(e) => {
            warn!(?path, "Failed to read config: {}, using defaults", e);
            ScribeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScribeConfig::default();
        assert_eq!(config.gesture.drag_threshold_px, 5);
        assert_eq!(config.gesture.double_click_distance_px, 10);
        assert_eq!(config.synthesis.key_debounce(), Duration::from_millis(50));
        assert_eq!(config.keyboard.text_session_timeout(), Duration::from_secs(2));
        assert_eq!(config.recognition.search_radius_px, 150);
        assert_eq!(config.storage.screenshot_quality, 85);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "gesture:\n  double_click_interval_ms: 250\n\
                    recognition:\n  service:\n    enabled: true\n";
        let config = parse_config(yaml).unwrap();
        assert_eq!(
            config.gesture.double_click_interval(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.gesture.drag_threshold_px, 5);
        assert!(config.recognition.service.enabled);
        assert_eq!(config.recognition.service.base_url, "http://localhost:8000");
        assert!(config.recognition.tesseract.enabled);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = parse_config("   \n").unwrap();
        assert_eq!(config.queue.capacity, 4096);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = ScribeConfig::default();
        config.keyboard.manual_capture_hotkey = Some("F10".into());
        save_config(&path, &config).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.keyboard.manual_capture_hotkey.as_deref(), Some("F10"));
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "gesture: [not, a, map").unwrap();
        assert!(load_config(&path).is_err());
        let config = load_or_default(Some(&path));
        assert_eq!(config.gesture.drag_threshold_px, 5);
    }
}
