//! Recognition results keyed by a perceptual thumbnail of the crop.

use super::Candidate;
use image::imageops::{self, FilterType};
use image::GrayImage;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

const THUMBNAIL_SIZE: u32 = 32;

pub struct RecognitionCache {
    inner: Mutex<LruCache<u64, Candidate>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecognitionCache {
    /// `None` when `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Crops that look the same at 32x32 share a key.
    pub fn key_for(crop: &GrayImage) -> u64 {
        let thumb = imageops::resize(crop, THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle);
        let mut hasher = DefaultHasher::new();
        crop.dimensions().hash(&mut hasher);
        thumb.as_raw().hash(&mut hasher);
        hasher.finish()
    }

    pub fn get(&self, key: u64) -> Option<Candidate> {
        let found = self.inner.lock().get(&key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    pub fn put(&self, key: u64, candidate: Candidate) {
        self.inner.lock().put(key, candidate);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
