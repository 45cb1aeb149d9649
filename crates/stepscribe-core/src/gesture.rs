//! Pointer gesture classification: click, double-click, drag suppression.

use crate::{GestureConfig, MouseButton, RawInputEvent};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Press {
    x: i32,
    y: i32,
    button: MouseButton,
    dragged: bool,
}

#[derive(Debug, Clone, Copy)]
struct LastClick {
    x: i32,
    y: i32,
    button: MouseButton,
    at: Instant,
}

/// Turns raw press/move/release signals into `PointerClick` events.
///
/// One classifier per pointer listener thread; it is not shared.
#[derive(Debug)]
pub struct PointerGestureClassifier {
    drag_threshold_sq: i64,
    double_click_distance_sq: i64,
    double_click_interval: Duration,
    press: Option<Press>,
    last_click: Option<LastClick>,
}

impl PointerGestureClassifier {
    /// `double_click_interval` is the platform's native interval; see
    /// `GestureConfig::double_click_interval` for the override.
    pub fn new(config: &GestureConfig, double_click_interval: Duration) -> Self {
        let drag = config.drag_threshold_px as i64;
        let distance = config.double_click_distance_px as i64;
        Self {
            drag_threshold_sq: drag * drag,
            double_click_distance_sq: distance * distance,
            double_click_interval: config
                .double_click_interval()
                .unwrap_or(double_click_interval),
            press: None,
            last_click: None,
        }
    }

    pub fn double_click_interval(&self) -> Duration {
        self.double_click_interval
    }

    pub fn on_press(&mut self, x: i32, y: i32, button: MouseButton) {
        self.press = Some(Press {
            x,
            y,
            button,
            dragged: false,
        });
    }

    pub fn on_move(&mut self, x: i32, y: i32) {
        if let Some(press) = self.press.as_mut() {
            if !press.dragged && squared_distance(press.x, press.y, x, y) > self.drag_threshold_sq {
                press.dragged = true;
                debug!(x, y, "Pointer drag detected");
            }
        }
    }

    /// Returns a click at the press position unless the gesture was a drag.
    pub fn on_release(
        &mut self,
        x: i32,
        y: i32,
        button: MouseButton,
        now: Instant,
    ) -> Option<RawInputEvent> {
        let press = self.press.take()?;

        // A release far from the press without intermediate move events still counts as a drag.
        if press.dragged || squared_distance(press.x, press.y, x, y) > self.drag_threshold_sq {
            return None;
        }
        if press.button != button {
            return None;
        }

        let is_double_click = self.last_click.is_some_and(|last| {
            last.button == button
                && now.saturating_duration_since(last.at) <= self.double_click_interval
                && squared_distance(last.x, last.y, press.x, press.y)
                    <= self.double_click_distance_sq
        });

        self.last_click = Some(LastClick {
            x: press.x,
            y: press.y,
            button,
            at: now,
        });

        Some(RawInputEvent::PointerClick {
            x: press.x,
            y: press.y,
            button,
            is_double_click,
            click_count: if is_double_click { 2 } else { 1 },
        })
    }
}

fn squared_distance(ax: i32, ay: i32, bx: i32, by: i32) -> i64 {
    let dx = ax as i64 - bx as i64;
    let dy = ay as i64 - by as i64;
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PointerGestureClassifier {
        PointerGestureClassifier::new(&GestureConfig::default(), Duration::from_millis(400))
    }

    fn click(
        c: &mut PointerGestureClassifier,
        x: i32,
        y: i32,
        at: Instant,
    ) -> Option<RawInputEvent> {
        c.on_press(x, y, MouseButton::Left);
        c.on_release(x, y, MouseButton::Left, at)
    }

    fn click_count(event: Option<RawInputEvent>) -> u8 {
        match event {
            Some(RawInputEvent::PointerClick { click_count, .. }) => click_count,
            other => panic!("expected click, got {other:?}"),
        }
    }

    #[test]
    fn test_double_click_within_interval() {
        let mut c = classifier();
        let t0 = Instant::now();
        assert_eq!(click_count(click(&mut c, 100, 100, t0)), 1);
        let second = click(&mut c, 104, 103, t0 + Duration::from_millis(200));
        assert!(matches!(
            second,
            Some(RawInputEvent::PointerClick {
                is_double_click: true,
                click_count: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_clicks_one_second_apart_are_independent() {
        let mut c = classifier();
        let t0 = Instant::now();
        assert_eq!(click_count(click(&mut c, 100, 100, t0)), 1);
        assert_eq!(click_count(click(&mut c, 100, 100, t0 + Duration::from_secs(1))), 1);
    }

    #[test]
    fn test_far_apart_clicks_are_not_double() {
        let mut c = classifier();
        let t0 = Instant::now();
        click(&mut c, 100, 100, t0);
        assert_eq!(click_count(click(&mut c, 120, 100, t0 + Duration::from_millis(100))), 1);
    }

    #[test]
    fn test_different_button_is_not_double() {
        let mut c = classifier();
        let t0 = Instant::now();
        click(&mut c, 100, 100, t0);
        c.on_press(100, 100, MouseButton::Right);
        let event = c.on_release(100, 100, MouseButton::Right, t0 + Duration::from_millis(100));
        assert_eq!(click_count(event), 1);
    }

    #[test]
    fn test_drag_emits_no_click() {
        let mut c = classifier();
        c.on_press(100, 100, MouseButton::Left);
        c.on_move(103, 103);
        c.on_move(140, 100);
        c.on_move(101, 100);
        assert!(c.on_release(101, 100, MouseButton::Left, Instant::now()).is_none());
    }

    #[test]
    fn test_small_jitter_still_clicks_at_press_position() {
        let mut c = classifier();
        c.on_press(200, 300, MouseButton::Left);
        c.on_move(202, 302);
        let event = c.on_release(203, 302, MouseButton::Left, Instant::now());
        assert!(matches!(
            event,
            Some(RawInputEvent::PointerClick { x: 200, y: 300, .. })
        ));
    }

    #[test]
    fn test_suppressed_drag_does_not_update_last_click() {
        let mut c = classifier();
        let t0 = Instant::now();
        click(&mut c, 100, 100, t0);

        c.on_press(100, 100, MouseButton::Left);
        c.on_move(200, 200);
        assert!(c
            .on_release(200, 200, MouseButton::Left, t0 + Duration::from_millis(100))
            .is_none());

        // Still paired with the first click, not with the drag.
        let third = click(&mut c, 100, 100, t0 + Duration::from_millis(300));
        assert_eq!(click_count(third), 2);
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let mut c = classifier();
        assert!(c.on_release(10, 10, MouseButton::Left, Instant::now()).is_none());
    }

    #[test]
    fn test_config_interval_overrides_platform() {
        let config = GestureConfig {
            double_click_interval_ms: Some(100),
            ..GestureConfig::default()
        };
        let mut c = PointerGestureClassifier::new(&config, Duration::from_millis(500));
        assert_eq!(c.double_click_interval(), Duration::from_millis(100));
        let t0 = Instant::now();
        click(&mut c, 10, 10, t0);
        assert_eq!(click_count(click(&mut c, 10, 10, t0 + Duration::from_millis(250))), 1);
    }
}
