//! OCR backends and cascade assembly.

mod service;
mod tesseract;

pub use service::ServiceRecognizer;
pub use tesseract::{parse_tsv, TesseractRecognizer};

use std::sync::Arc;
use stepscribe_core::recognition::{
    NoOpRecognizer, RecognitionCache, RecognitionCascade, TextRecognizer,
};
use stepscribe_core::RecognitionConfig;
use tracing::{info, warn};

/// Builds the recognition cascade from config: Tesseract first, the HTTP
/// service second when enabled, plus the result cache.
pub fn build_cascade(config: &RecognitionConfig) -> RecognitionCascade {
    let primary: Arc<dyn TextRecognizer> = if config.tesseract.enabled {
        Arc::new(TesseractRecognizer::new(config.tesseract.clone()))
    } else {
        info!("Tesseract disabled, using context descriptions only");
        Arc::new(NoOpRecognizer)
    };

    let mut cascade = RecognitionCascade::new(primary, config.clone());

    if config.service.enabled {
        match ServiceRecognizer::new(config.service.clone()) {
            Ok(service) => {
                info!(base_url = %config.service.base_url, "OCR service backend enabled");
                cascade = cascade.with_secondary(Arc::new(service));
            }
            Err(error) => warn!(%error, "OCR service backend could not be created"),
        }
    }

    if let Some(cache) = RecognitionCache::with_capacity(config.cache_capacity) {
        cascade = cascade.with_cache(Arc::new(cache));
    }
    cascade
}
