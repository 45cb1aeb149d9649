//! Text recognition around a click point.
//!
//! [`RecognitionCascade`] locates the clicked element, runs the backends
//! through [`Strategy`] variants in priority order, validates and cleans
//! the winner and falls back to a coarse visual description.

pub mod cache;
pub mod context;
pub mod normalize;
pub mod preprocess;
pub mod region;
pub mod validate;

pub use cache::RecognitionCache;
pub use normalize::{TableNormalizer, TextNormalizer};
pub use preprocess::Strategy;
pub use region::{ElementKind, ElementRegion, PixelRect};
pub use validate::Rejection;

use crate::{RecognitionConfig, RecognitionError, RecognitionResult};
use image::{imageops, GrayImage, RgbImage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Confidence reported for a context description.
pub const CONTEXT_CONFIDENCE: f32 = 0.3;

/// Added when cleaning changed the text and the cleaned text still validates.
const CLEANING_BONUS: f32 = 0.05;

/// Raw output of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    pub confidence: f32,
}

impl RecognizedText {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// A text recognition backend.
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    fn recognize(&self, image: &GrayImage) -> RecognitionResult<RecognizedText>;
}

/// Backend used when nothing is installed. Every call falls through to the
/// context description.
#[derive(Debug, Default)]
pub struct NoOpRecognizer;

impl TextRecognizer for NoOpRecognizer {
    fn name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn recognize(&self, _image: &GrayImage) -> RecognitionResult<RecognizedText> {
        Err(RecognitionError::Unavailable("no recognizer configured".into()))
    }
}

/// One strategy's result.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub confidence: f32,
    pub engine: String,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionSource {
    Backend { engine: String, strategy: Strategy },
    Context,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOutcome {
    pub text: String,
    pub confidence: f32,
    pub source: RecognitionSource,
    /// Element boundary the crop was taken from, if one was detected.
    pub region: Option<ElementRegion>,
    /// Why the best backend candidate was discarded.
    pub rejection: Option<Rejection>,
}

impl RecognitionOutcome {
    fn none(region: Option<ElementRegion>, rejection: Option<Rejection>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            source: RecognitionSource::None,
            region,
            rejection,
        }
    }

    /// True when there is text to put in a description.
    pub fn is_valid(&self) -> bool {
        !matches!(self.source, RecognitionSource::None)
    }

    pub fn is_backend_text(&self) -> bool {
        matches!(self.source, RecognitionSource::Backend { .. })
    }
}

pub struct RecognitionCascade {
    primary: Arc<dyn TextRecognizer>,
    secondary: Option<Arc<dyn TextRecognizer>>,
    normalizer: Arc<dyn TextNormalizer>,
    cache: Option<Arc<RecognitionCache>>,
    config: RecognitionConfig,
}

impl RecognitionCascade {
    pub fn new(primary: Arc<dyn TextRecognizer>, config: RecognitionConfig) -> Self {
        Self {
            primary,
            secondary: None,
            normalizer: Arc::new(TableNormalizer::new()),
            cache: None,
            config,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn TextRecognizer>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn TextNormalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_cache(mut self, cache: Arc<RecognitionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<RecognitionCache>> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Recognize the element under `(x, y)` in screenshot pixels.
    ///
    /// Backend failures never escape: they fall through to the next strategy
    /// and finally to the context description.
    pub fn recognize_at(&self, image: &RgbImage, x: u32, y: u32) -> RecognitionOutcome {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return RecognitionOutcome::none(None, None);
        }
        let x = x.min(width - 1);
        let y = y.min(height - 1);

        let gray = imageops::grayscale(image);
        let region = region::locate_element(&gray, x, y, &self.config);
        let rect = match &region {
            Some(found) => found.rect.padded(found.kind.padding(), width, height),
            None => region::adaptive_rect(&gray, x, y),
        };
        let crop = imageops::crop_imm(&gray, rect.x, rect.y, rect.width, rect.height).to_image();
        debug!(?rect, kind = ?region.map(|r| r.kind), "Recognition crop");

        let key = self.cache.as_ref().map(|_| RecognitionCache::key_for(&crop));
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            if let Some(hit) = cache.get(key) {
                debug!(text = %hit.text, "Recognition cache hit");
                return Self::backend_outcome(hit, region);
            }
        }

        let mut rejection = None;
        match self.run_strategies(&crop, &mut rejection) {
            Some(accepted) => {
                if let (Some(cache), Some(key)) = (&self.cache, key) {
                    cache.put(key, accepted.clone());
                }
                Self::backend_outcome(accepted, region)
            }
            None => match context::describe(image, x, y, self.config.context_region_px) {
                Some(label) => {
                    debug!(label, ?rejection, "Using context description");
                    RecognitionOutcome {
                        text: label.to_string(),
                        confidence: CONTEXT_CONFIDENCE,
                        source: RecognitionSource::Context,
                        region,
                        rejection,
                    }
                }
                None => RecognitionOutcome::none(region, rejection),
            },
        }
    }

    fn backend_outcome(candidate: Candidate, region: Option<ElementRegion>) -> RecognitionOutcome {
        RecognitionOutcome {
            text: candidate.text,
            confidence: candidate.confidence,
            source: RecognitionSource::Backend {
                engine: candidate.engine,
                strategy: candidate.strategy,
            },
            region,
            rejection: None,
        }
    }

    fn run_strategies(
        &self,
        crop: &GrayImage,
        rejection: &mut Option<Rejection>,
    ) -> Option<Candidate> {
        let secondary = self.secondary.as_ref().unwrap_or(&self.primary);

        let fast = self.attempt(self.primary.as_ref(), Strategy::Sharpened, crop);
        if let Some(candidate) = fast
            .as_ref()
            .filter(|c| c.confidence > self.config.fast_accept_confidence)
        {
            match self.finalize(candidate) {
                Ok(accepted) => return Some(accepted),
                Err(reason) => *rejection = Some(reason),
            }
        }

        let binary = self.attempt(secondary.as_ref(), Strategy::BinaryThreshold, crop);
        if let Some(candidate) = binary
            .as_ref()
            .filter(|c| c.confidence > self.config.secondary_accept_confidence)
        {
            match self.finalize(candidate) {
                Ok(accepted) => return Some(accepted),
                Err(reason) => *rejection = Some(reason),
            }
        }

        let morphology = self.attempt(self.primary.as_ref(), Strategy::ButtonMorphology, crop);
        let contrast = self.attempt(secondary.as_ref(), Strategy::HighContrast, crop);

        let best = [fast, binary, morphology, contrast]
            .into_iter()
            .flatten()
            .filter(|c| c.confidence >= self.config.min_confidence)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))?;

        match self.finalize(&best) {
            Ok(accepted) => Some(accepted),
            Err(reason) => {
                debug!(text = %best.text, ?reason, "Best candidate rejected");
                *rejection = Some(reason);
                None
            }
        }
    }

    fn attempt(
        &self,
        recognizer: &dyn TextRecognizer,
        strategy: Strategy,
        crop: &GrayImage,
    ) -> Option<Candidate> {
        if !recognizer.is_available() {
            return None;
        }
        let prepared = strategy.prepare(crop);
        match recognizer.recognize(&prepared) {
            Ok(result) => {
                debug!(
                    engine = recognizer.name(),
                    strategy = strategy.name(),
                    text = %result.text,
                    confidence = result.confidence,
                    "Recognition attempt"
                );
                if result.text.trim().is_empty() {
                    return None;
                }
                Some(Candidate {
                    text: result.text.trim().to_string(),
                    confidence: result.confidence.clamp(0.0, 1.0),
                    engine: recognizer.name().to_string(),
                    strategy,
                })
            }
            Err(e) => {
                warn!(
                    engine = recognizer.name(),
                    strategy = strategy.name(),
                    error = %e,
                    "Recognition backend failed"
                );
                None
            }
        }
    }

    /// Validate, clean, and re-validate if cleaning changed anything.
    fn finalize(&self, candidate: &Candidate) -> Result<Candidate, Rejection> {
        let min = self.config.min_confidence;
        validate::validate(&candidate.text, candidate.confidence, min)?;

        let cleaned = self.normalizer.normalize(&candidate.text);
        if cleaned == candidate.text {
            return Ok(candidate.clone());
        }
        validate::validate(&cleaned, candidate.confidence, min)?;
        Ok(Candidate {
            text: cleaned,
            confidence: (candidate.confidence + CLEANING_BONUS).min(1.0),
            ..candidate.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedRecognizer, ScriptedRecognizer};
    use image::Rgb;

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    fn cascade(primary: Arc<dyn TextRecognizer>) -> RecognitionCascade {
        RecognitionCascade::new(primary, RecognitionConfig::default())
    }

    #[test]
    fn test_fast_accept() {
        let primary = Arc::new(FixedRecognizer::new("fast", "Submit", 0.95));
        let outcome = cascade(primary.clone()).recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.text, "Submit");
        assert!(outcome.is_backend_text());
        assert_eq!(
            outcome.source,
            RecognitionSource::Backend {
                engine: "fast".into(),
                strategy: Strategy::Sharpened
            }
        );
        assert_eq!(primary.calls(), 1);
    }

    #[test]
    fn test_secondary_accept() {
        let primary = Arc::new(FixedRecognizer::new("fast", "Sbmt", 0.5));
        let secondary = Arc::new(FixedRecognizer::new("service", "Submit", 0.95));
        let outcome = cascade(primary.clone())
            .with_secondary(secondary.clone())
            .recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.text, "Submit");
        assert_eq!(
            outcome.source,
            RecognitionSource::Backend {
                engine: "service".into(),
                strategy: Strategy::BinaryThreshold
            }
        );
        assert_eq!((primary.calls(), secondary.calls()), (1, 1));
    }

    #[test]
    fn test_best_of_all_strategies() {
        let primary = Arc::new(ScriptedRecognizer::new(
            "fast",
            vec![
                Some(("Opn", 0.5)),
                Some(("Opem", 0.4)),
                Some(("Open file", 0.7)),
                Some(("Open", 0.6)),
            ],
        ));
        let outcome = cascade(primary.clone()).recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.text, "Open file");
        assert!((outcome.confidence - 0.7).abs() < 1e-6);
        assert_eq!(
            outcome.source,
            RecognitionSource::Backend {
                engine: "fast".into(),
                strategy: Strategy::ButtonMorphology
            }
        );
        assert_eq!(primary.calls(), 4);
    }

    #[test]
    fn test_backend_error_falls_through() {
        let primary = Arc::new(ScriptedRecognizer::new("fast", vec![None, Some(("Save", 0.95))]));
        let outcome = cascade(primary).recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.text, "Save");
        assert_eq!(
            outcome.source,
            RecognitionSource::Backend {
                engine: "fast".into(),
                strategy: Strategy::BinaryThreshold
            }
        );
    }

    #[test]
    fn test_low_confidence_uses_context() {
        let primary = Arc::new(FixedRecognizer::new("fast", "Submit", 0.1));
        let outcome = cascade(primary).recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.source, RecognitionSource::Context);
        assert_eq!(outcome.text, context::EMPTY_AREA);
        assert_eq!(outcome.confidence, CONTEXT_CONFIDENCE);
        assert!(outcome.is_valid());
        assert!(!outcome.is_backend_text());
    }

    #[test]
    fn test_gibberish_rejected() {
        let primary = Arc::new(FixedRecognizer::new("fast", "bcdfghjk", 0.95));
        let outcome = cascade(primary).recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.source, RecognitionSource::Context);
        assert_eq!(outcome.rejection, Some(Rejection::NoVowels));
    }

    #[test]
    fn test_cleaning_nudges_confidence() {
        let primary = Arc::new(FixedRecognizer::new("fast", "Export Export", 0.85));
        let outcome = cascade(primary).recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.text, "Export");
        assert!((outcome.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_cleaning_caps_at_one() {
        let primary = Arc::new(FixedRecognizer::new("fast", "Save.", 0.99));
        let outcome = cascade(primary).recognize_at(&white(400, 300), 200, 150);

        assert_eq!(outcome.text, "Save");
        assert!(outcome.confidence <= 1.0);
    }

    #[test]
    fn test_cache_short_circuits_backend() {
        let primary = Arc::new(FixedRecognizer::new("fast", "Submit", 0.95));
        let cache = Arc::new(RecognitionCache::with_capacity(8).unwrap());
        let cascade = cascade(primary.clone()).with_cache(cache.clone());
        let image = white(400, 300);

        assert_eq!(cascade.recognize_at(&image, 200, 150).text, "Submit");
        assert_eq!(cascade.recognize_at(&image, 200, 150).text, "Submit");
        assert_eq!(primary.calls(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_unavailable_backend_describes_context() {
        let image = RgbImage::from_fn(400, 300, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let outcome = cascade(Arc::new(NoOpRecognizer)).recognize_at(&image, 200, 150);

        assert_eq!(outcome.source, RecognitionSource::Context);
        assert_eq!(outcome.text, context::BUTTON_OR_ELEMENT);
    }

    #[test]
    fn test_empty_image() {
        let outcome = cascade(Arc::new(NoOpRecognizer)).recognize_at(&RgbImage::new(0, 0), 5, 5);
        assert!(!outcome.is_valid());
    }
}
