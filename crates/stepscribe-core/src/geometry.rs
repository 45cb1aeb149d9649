//! Monitor geometry registry: point-to-monitor lookup and percentage coordinates.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Used when no monitor has been registered yet.
const DEFAULT_MONITOR_WIDTH: u32 = 1920;
const DEFAULT_MONITOR_HEIGHT: u32 = 1080;

/// Rectangle of one physical display in global desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorGeometry {
    pub id: u32,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl MonitorGeometry {
    pub fn new(id: u32, left: i32, top: i32, width: u32, height: u32, is_primary: bool) -> Self {
        Self {
            id,
            left,
            top,
            width,
            height,
            is_primary,
        }
    }

    /// Whether the global point lies inside this monitor (right/bottom edges exclusive).
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let right = self.left as i64 + self.width as i64;
        let bottom = self.top as i64 + self.height as i64;
        (x as i64) >= self.left as i64
            && (x as i64) < right
            && (y as i64) >= self.top as i64
            && (y as i64) < bottom
    }

    fn fallback() -> Self {
        Self::new(0, 0, 0, DEFAULT_MONITOR_WIDTH, DEFAULT_MONITOR_HEIGHT, true)
    }
}

/// A point expressed in global, monitor-relative and percentage form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSample {
    pub global_x: i32,
    pub global_y: i32,
    pub monitor_relative_x: i32,
    pub monitor_relative_y: i32,
    pub percent_x: f64,
    pub percent_y: f64,
    pub monitor: MonitorGeometry,
}

/// Bounding box over every known monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub monitor_count: usize,
    pub monitors: Vec<MonitorGeometry>,
}

#[derive(Debug, Default)]
struct Registry {
    monitors: Vec<MonitorGeometry>,
    last_capture_monitor: Option<MonitorGeometry>,
}

/// Thread-safe holder of the current monitor set.
///
/// Listener threads resolve points while the control thread may refresh the
/// geometry, so the set lives behind a read/write lock and is always replaced
/// wholesale.
#[derive(Debug, Default)]
pub struct CoordinateSystem {
    inner: RwLock<Registry>,
}

impl CoordinateSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitors(monitors: Vec<MonitorGeometry>) -> Self {
        let system = Self::new();
        system.update_geometry(monitors);
        system
    }

    /// Replace the monitor set. Exactly one monitor ends up primary: the first
    /// one flagged as such, else the first in the list.
    pub fn update_geometry(&self, mut monitors: Vec<MonitorGeometry>) {
        let primary_index = monitors.iter().position(|m| m.is_primary).unwrap_or(0);
        for (index, monitor) in monitors.iter_mut().enumerate() {
            monitor.is_primary = index == primary_index;
        }

        info!(count = monitors.len(), "Monitor geometry updated");
        for monitor in &monitors {
            debug!(?monitor, "Registered monitor");
        }

        let mut inner = self.inner.write();
        inner.monitors = monitors;
        if let Some(last) = inner.last_capture_monitor {
            if !inner.monitors.iter().any(|m| m.id == last.id) {
                inner.last_capture_monitor = None;
            }
        }
    }

    pub fn monitors(&self) -> Vec<MonitorGeometry> {
        self.inner.read().monitors.clone()
    }

    pub fn is_multi_monitor(&self) -> bool {
        self.inner.read().monitors.len() > 1
    }

    /// The primary monitor, or a 1920x1080 placeholder when none is registered.
    pub fn primary(&self) -> MonitorGeometry {
        let inner = self.inner.read();
        Self::primary_of(&inner.monitors)
    }

    fn primary_of(monitors: &[MonitorGeometry]) -> MonitorGeometry {
        monitors
            .iter()
            .find(|m| m.is_primary)
            .or_else(|| monitors.first())
            .copied()
            .unwrap_or_else(MonitorGeometry::fallback)
    }

    pub fn monitor_by_id(&self, id: u32) -> Option<MonitorGeometry> {
        self.inner.read().monitors.iter().find(|m| m.id == id).copied()
    }

    /// First monitor containing the point, if any.
    pub fn monitor_at(&self, x: i32, y: i32) -> Option<MonitorGeometry> {
        self.inner
            .read()
            .monitors
            .iter()
            .find(|m| m.contains(x, y))
            .copied()
    }

    /// Resolve a global point. Points outside every monitor resolve against
    /// the primary and are clamped onto it.
    pub fn resolve(&self, global_x: i32, global_y: i32) -> CoordinateSample {
        let monitor = {
            let inner = self.inner.read();
            inner
                .monitors
                .iter()
                .find(|m| m.contains(global_x, global_y))
                .copied()
                .unwrap_or_else(|| Self::primary_of(&inner.monitors))
        };

        let max_x = monitor.width.saturating_sub(1) as i64;
        let max_y = monitor.height.saturating_sub(1) as i64;
        let rel_x = (global_x as i64 - monitor.left as i64).clamp(0, max_x);
        let rel_y = (global_y as i64 - monitor.top as i64).clamp(0, max_y);

        CoordinateSample {
            global_x,
            global_y,
            monitor_relative_x: rel_x as i32,
            monitor_relative_y: rel_y as i32,
            percent_x: ratio(rel_x, monitor.width),
            percent_y: ratio(rel_y, monitor.height),
            monitor,
        }
    }

    /// Map a sample onto an image of a different size.
    pub fn project_to_pixels(
        sample: &CoordinateSample,
        target_width: u32,
        target_height: u32,
    ) -> (u32, u32) {
        (
            project_axis(sample.percent_x, target_width),
            project_axis(sample.percent_y, target_height),
        )
    }

    /// Whether the sample was resolved against the given monitor.
    pub fn is_on_monitor(sample: &CoordinateSample, monitor_id: u32) -> bool {
        sample.monitor.id == monitor_id && sample.monitor.contains(sample.global_x, sample.global_y)
    }

    pub fn set_last_capture_monitor(&self, monitor: MonitorGeometry) {
        self.inner.write().last_capture_monitor = Some(monitor);
    }

    pub fn last_capture_monitor(&self) -> Option<MonitorGeometry> {
        self.inner.read().last_capture_monitor
    }

    /// Bounding box of all monitors. Falls back to the placeholder monitor.
    pub fn screen_info(&self) -> ScreenInfo {
        ScreenInfo::from_monitors(self.monitors())
    }
}

impl ScreenInfo {
    /// Bounding box of `monitors`; an empty set reports the placeholder size.
    pub fn from_monitors(monitors: Vec<MonitorGeometry>) -> Self {
        if monitors.is_empty() {
            let fallback = MonitorGeometry::fallback();
            return Self {
                left: 0,
                top: 0,
                width: fallback.width,
                height: fallback.height,
                monitor_count: 0,
                monitors,
            };
        }

        let left = monitors.iter().map(|m| m.left as i64).min().unwrap_or(0);
        let top = monitors.iter().map(|m| m.top as i64).min().unwrap_or(0);
        let right = monitors
            .iter()
            .map(|m| m.left as i64 + m.width as i64)
            .max()
            .unwrap_or(0);
        let bottom = monitors
            .iter()
            .map(|m| m.top as i64 + m.height as i64)
            .max()
            .unwrap_or(0);

        ScreenInfo {
            left: left as i32,
            top: top as i32,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
            monitor_count: monitors.len(),
            monitors,
        }
    }
}

fn ratio(value: i64, size: u32) -> f64 {
    if size == 0 {
        return 0.0;
    }
    (value as f64 / size as f64).clamp(0.0, 1.0)
}

fn project_axis(percent: f64, size: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    let pixel = (percent.clamp(0.0, 1.0) * size as f64) as u32;
    pixel.min(size - 1)
}
