//! Screen capture via xcap.
//!
//! Monitors are enumerated fresh for every call; xcap handles are never kept
//! between captures.

use image::DynamicImage;
use stepscribe_core::{
    CaptureError, CaptureResult, CaptureService, CaptureTarget, MonitorGeometry, ScreenInfo,
    Screenshot,
};
use tracing::{debug, warn};
use xcap::Monitor;

/// [`CaptureService`] backed by the OS compositor through xcap.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapCapture;

impl XcapCapture {
    pub fn new() -> Self {
        Self
    }

    /// Current monitor layout in physical pixels.
    pub fn monitors(&self) -> CaptureResult<Vec<MonitorGeometry>> {
        let monitors = Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
        Ok(monitors
            .iter()
            .enumerate()
            .filter_map(|(index, monitor)| geometry_of(index, monitor))
            .collect())
    }
}

fn geometry_of(index: usize, monitor: &Monitor) -> Option<MonitorGeometry> {
    let read = || -> xcap::XCapResult<MonitorGeometry> {
        Ok(MonitorGeometry::new(
            monitor.id().unwrap_or(index as u32),
            monitor.x()?,
            monitor.y()?,
            monitor.width()?,
            monitor.height()?,
            monitor.is_primary().unwrap_or(false),
        ))
    };
    match read() {
        Ok(geometry) => Some(geometry),
        Err(error) => {
            warn!(?error, index, "Skipping monitor with unreadable geometry");
            None
        }
    }
}

/// Picks the monitor for `target`, falling back to the primary one.
fn select(monitors: &[MonitorGeometry], target: CaptureTarget) -> Option<usize> {
    let primary = || {
        monitors
            .iter()
            .position(|m| m.is_primary)
            .or_else(|| (!monitors.is_empty()).then_some(0))
    };
    match target {
        CaptureTarget::Point { x, y } => monitors
            .iter()
            .position(|m| m.contains(x, y))
            .or_else(primary),
        CaptureTarget::Monitor(Some(id)) => monitors
            .iter()
            .position(|m| m.id == id)
            .or_else(primary),
        CaptureTarget::Monitor(None) => primary(),
    }
}

impl CaptureService for XcapCapture {
    fn capture_full_screen(&self, target: CaptureTarget) -> CaptureResult<Screenshot> {
        let handles = Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
        let mut geometries = Vec::with_capacity(handles.len());
        let mut indices = Vec::with_capacity(handles.len());
        for (index, handle) in handles.iter().enumerate() {
            if let Some(geometry) = geometry_of(index, handle) {
                geometries.push(geometry);
                indices.push(index);
            }
        }

        let chosen = select(&geometries, target).ok_or(CaptureError::NoMonitors)?;
        let geometry = geometries[chosen];
        let image = handles[indices[chosen]]
            .capture_image()
            .map_err(|e| CaptureError::Backend(e.to_string()))?;

        let image = DynamicImage::ImageRgba8(image).into_rgb8();
        debug!(
            monitor_id = geometry.id,
            width = image.width(),
            height = image.height(),
            "Captured monitor"
        );
        Ok(Screenshot::new(image, Some(geometry)))
    }

    fn screen_info(&self) -> ScreenInfo {
        match self.monitors() {
            Ok(monitors) => ScreenInfo::from_monitors(monitors),
            Err(error) => {
                warn!(?error, "Monitor enumeration failed");
                ScreenInfo::from_monitors(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Vec<MonitorGeometry> {
        vec![
            MonitorGeometry::new(7, -1280, 0, 1280, 1024, false),
            MonitorGeometry::new(3, 0, 0, 1920, 1080, true),
        ]
    }

    #[test]
    fn test_select_by_point() {
        let monitors = layout();
        assert_eq!(select(&monitors, CaptureTarget::Point { x: -10, y: 10 }), Some(0));
        assert_eq!(select(&monitors, CaptureTarget::Point { x: 100, y: 10 }), Some(1));
        // Off every monitor: primary.
        assert_eq!(select(&monitors, CaptureTarget::Point { x: 5000, y: 10 }), Some(1));
    }

    #[test]
    fn test_select_by_id_and_primary() {
        let monitors = layout();
        assert_eq!(select(&monitors, CaptureTarget::Monitor(Some(7))), Some(0));
        assert_eq!(select(&monitors, CaptureTarget::Monitor(Some(99))), Some(1));
        assert_eq!(select(&monitors, CaptureTarget::Monitor(None)), Some(1));
    }

    #[test]
    fn test_select_without_primary_flag() {
        let monitors = vec![MonitorGeometry::new(1, 0, 0, 800, 600, false)];
        assert_eq!(select(&monitors, CaptureTarget::Monitor(None)), Some(0));
        assert_eq!(select(&[], CaptureTarget::Monitor(None)), None);
    }
}
