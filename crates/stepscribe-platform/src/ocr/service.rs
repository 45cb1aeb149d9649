//! HTTP OCR service backend.

use crate::error::{PlatformError, PlatformResult};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use image::{GrayImage, ImageFormat};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use stepscribe_core::recognition::{RecognizedText, TextRecognizer};
use stepscribe_core::{OcrServiceConfig, RecognitionError, RecognitionResult};

/// Recognizer that posts PNG crops to an OCR service.
///
/// A background thread polls `/health`; requests are refused while the service
/// is unhealthy so the cascade moves on without waiting for a timeout.
pub struct ServiceRecognizer {
    config: OcrServiceConfig,
    client: Client,
    healthy: Arc<AtomicBool>,
    shutdown_tx: Sender<()>,
}

impl ServiceRecognizer {
    /// Create the client and start the health check loop.
    pub fn new(config: OcrServiceConfig) -> PlatformResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PlatformError::Ocr(e.to_string()))?;
        let health_client = Client::builder()
            .timeout(config.health_timeout())
            .build()
            .map_err(|e| PlatformError::Ocr(e.to_string()))?;

        let healthy = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let health_url = format!("{}/health", config.base_url.trim_end_matches('/'));
        let health_healthy = healthy.clone();
        let interval = config.health_interval();
        thread::Builder::new()
            .name("stepscribe-ocr-health".into())
            .spawn(move || {
                perform_health_check(&health_client, &health_url, &health_healthy);
                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            perform_health_check(&health_client, &health_url, &health_healthy);
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                            tracing::debug!("OCR health check loop shutting down");
                            return;
                        }
                    }
                }
            })
            .map_err(|e| PlatformError::Ocr(e.to_string()))?;

        Ok(Self {
            config,
            client,
            healthy,
            shutdown_tx,
        })
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

fn perform_health_check(client: &Client, url: &str, healthy: &AtomicBool) {
    match client.get(url).send() {
        Ok(resp) if resp.status().is_success() => {
            if !healthy.load(Ordering::Relaxed) {
                tracing::info!("OCR service is now healthy");
            }
            healthy.store(true, Ordering::Relaxed);
        }
        Ok(resp) => {
            if healthy.load(Ordering::Relaxed) {
                tracing::warn!("OCR service returned non-success status: {}", resp.status());
            }
            healthy.store(false, Ordering::Relaxed);
        }
        Err(e) => {
            if healthy.load(Ordering::Relaxed) {
                tracing::warn!("OCR health check failed: {}", e);
            }
            healthy.store(false, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    text: String,
    confidence: f32,
}

impl TextRecognizer for ServiceRecognizer {
    fn name(&self) -> &str {
        "service"
    }

    fn is_available(&self) -> bool {
        self.config.enabled && self.is_healthy()
    }

    fn recognize(&self, image: &GrayImage) -> RecognitionResult<RecognizedText> {
        if !self.is_healthy() {
            return Err(RecognitionError::Unavailable(
                "OCR service is currently unavailable".into(),
            ));
        }

        let mut png_bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;

        let url = format!("{}/v1/text", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .body(png_bytes)
            .send()
            .map_err(|e| RecognitionError::Backend(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(RecognizedText::new("", 0.0));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(RecognitionError::Backend(format!(
                "OCR request failed with status {status}: {body}"
            )));
        }

        let parsed: TextResponse = response
            .json()
            .map_err(|e| RecognitionError::Protocol(e.to_string()))?;
        Ok(RecognizedText::new(parsed.text, parsed.confidence))
    }
}

/// Stops the health check thread.
impl Drop for ServiceRecognizer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.try_send(());
        tracing::debug!("ServiceRecognizer dropped, health check loop signaled to stop");
    }
}
