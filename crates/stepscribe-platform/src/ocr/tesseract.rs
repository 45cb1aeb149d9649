//! Tesseract CLI backend.
//!
//! The crop is piped to `tesseract stdin stdout` as PNG and the TSV output is
//! parsed for words and their confidences.

use crossbeam_channel::{bounded, RecvTimeoutError};
use image::{GrayImage, ImageFormat};
use std::io::{Cursor, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use stepscribe_core::recognition::{RecognizedText, TextRecognizer};
use stepscribe_core::{RecognitionError, RecognitionResult, TesseractConfig};
use tracing::{debug, info, warn};

/// Single text line; UI labels rarely span more.
const PAGE_SEGMENTATION_MODE: &str = "7";
/// Default engine selection.
const ENGINE_MODE: &str = "3";

pub struct TesseractRecognizer {
    config: TesseractConfig,
    available: OnceLock<bool>,
}

impl TesseractRecognizer {
    pub fn new(config: TesseractConfig) -> Self {
        Self {
            config,
            available: OnceLock::new(),
        }
    }

    fn probe(&self) -> bool {
        let status = Command::new(&self.config.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match status {
            Ok(status) if status.success() => {
                info!(binary = %self.config.binary.display(), "Tesseract available");
                true
            }
            Ok(status) => {
                warn!(%status, "Tesseract probe exited unsuccessfully");
                false
            }
            Err(error) => {
                warn!(%error, binary = %self.config.binary.display(), "Tesseract not found");
                false
            }
        }
    }

    fn run(&self, png: Vec<u8>) -> RecognitionResult<String> {
        let mut child = Command::new(&self.config.binary)
            .args(["stdin", "stdout", "--psm", PAGE_SEGMENTATION_MODE, "--oem", ENGINE_MODE])
            .args(["-l", &self.config.language, "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        feed_stdin(&mut child, &png)?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecognitionError::Backend("tesseract stdout not captured".into()))?;

        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            let mut output = String::new();
            let result = stdout.read_to_string(&mut output).map(|_| output);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.config.timeout()) {
            Ok(Ok(output)) => {
                let status = child.wait()?;
                if !status.success() {
                    return Err(RecognitionError::Backend(format!(
                        "tesseract exited with {status}"
                    )));
                }
                Ok(output)
            }
            Ok(Err(error)) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(error.into())
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(RecognitionError::Backend(format!(
                    "tesseract timed out after {} ms",
                    self.config.timeout_ms
                )))
            }
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        self.config.enabled && *self.available.get_or_init(|| self.probe())
    }

    fn recognize(&self, image: &GrayImage) -> RecognitionResult<RecognizedText> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        let output = self.run(png)?;
        let result = parse_tsv(&output)?;
        debug!(text = %result.text, confidence = result.confidence, "Tesseract result");
        Ok(result)
    }
}

/// Joins word rows (level 5) and averages their positive confidences.
pub fn parse_tsv(output: &str) -> RecognitionResult<RecognizedText> {
    let mut lines = output.lines();
    let header = lines
        .next()
        .ok_or_else(|| RecognitionError::Protocol("empty tesseract output".into()))?;
    let columns: Vec<&str> = header.split('\t').collect();
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| RecognitionError::Protocol(format!("missing TSV column {name}")))
    };
    let level_col = column("level")?;
    let conf_col = column("conf")?;
    let text_col = column("text")?;

    let mut words = Vec::new();
    let mut confidence_sum = 0.0f32;
    let mut confidence_count = 0u32;
    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.get(level_col) != Some(&"5") {
            continue;
        }
        let Some(text) = fields.get(text_col).map(|t| t.trim()).filter(|t| !t.is_empty()) else {
            continue;
        };
        words.push(text);
        if let Some(conf) = fields.get(conf_col).and_then(|c| c.trim().parse::<f32>().ok()) {
            if conf > 0.0 {
                confidence_sum += conf;
                confidence_count += 1;
            }
        }
    }

    let confidence = if confidence_count == 0 {
        0.0
    } else {
        (confidence_sum / confidence_count as f32 / 100.0).clamp(0.0, 1.0)
    };
    Ok(RecognizedText::new(words.join(" "), confidence))
}

/// Writes the image and closes stdin. A child that fails to take the input
/// is killed and reaped before the error is returned.
fn feed_stdin(child: &mut Child, png: &[u8]) -> std::io::Result<()> {
    let Some(mut stdin) = child.stdin.take() else {
        return Ok(());
    };
    if let Err(error) = stdin.write_all(png) {
        let _ = child.kill();
        let _ = child.wait();
        return Err(error);
    }
    Ok(())
}
