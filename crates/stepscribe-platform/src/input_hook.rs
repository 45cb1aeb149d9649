//! Global input hook feeding a recording session.
//!
//! A single `rdev::listen` thread receives every OS event and fans out to a
//! pointer worker (gesture classification) and a keyboard worker (key
//! classification and the manual-capture hotkey). The listener cannot be
//! interrupted, so it is spawned once and `stop` only mutes forwarding.

use crate::error::{PlatformError, PlatformResult};
use crate::keys;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rdev::{listen, Event, EventType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};
use stepscribe_core::{
    hotkey_matches, GestureConfig, InputMonitor, InputSink, MonitorError, MouseButton,
    PointerGestureClassifier,
};
use tracing::{debug, error, info, warn};

/// How long `start` waits for the listener to report a setup failure.
const STARTUP_GRACE: Duration = Duration::from_millis(250);

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerSignal {
    Press { x: i32, y: i32, button: MouseButton },
    Move { x: i32, y: i32 },
    Release { x: i32, y: i32, button: MouseButton },
}

#[derive(Debug, Clone)]
struct KeySignal {
    key: rdev::Key,
    text: Option<String>,
}

struct Shared {
    sink: Weak<dyn InputSink>,
    active: AtomicBool,
    position: Mutex<Option<(i32, i32)>>,
}

/// rdev-backed [`InputMonitor`].
pub struct RdevInputMonitor {
    shared: Arc<Shared>,
    gesture: GestureConfig,
    double_click_interval: Duration,
    hotkey: Option<String>,
    listener_spawned: AtomicBool,
}

impl RdevInputMonitor {
    /// The sink is held weakly; the monitor goes quiet once it is dropped.
    pub fn new(
        sink: Weak<dyn InputSink>,
        gesture: GestureConfig,
        double_click_interval: Duration,
        hotkey: Option<String>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                sink,
                active: AtomicBool::new(false),
                position: Mutex::new(None),
            }),
            gesture,
            double_click_interval,
            hotkey,
            listener_spawned: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    fn spawn_listener(&self) -> PlatformResult<()> {
        let (pointer_tx, pointer_rx) = bounded::<PointerSignal>(CHANNEL_CAPACITY);
        let (key_tx, key_rx) = bounded::<KeySignal>(CHANNEL_CAPACITY);
        let (status_tx, status_rx) = bounded::<String>(1);

        let classifier = PointerGestureClassifier::new(&self.gesture, self.double_click_interval);
        let shared = self.shared.clone();
        thread::Builder::new()
            .name("stepscribe-pointer".into())
            .spawn(move || run_pointer_loop(pointer_rx, shared, classifier))
            .map_err(|e| PlatformError::HookUnavailable(e.to_string()))?;

        let shared = self.shared.clone();
        let hotkey = self.hotkey.clone();
        thread::Builder::new()
            .name("stepscribe-keyboard".into())
            .spawn(move || run_key_loop(key_rx, shared, hotkey))
            .map_err(|e| PlatformError::HookUnavailable(e.to_string()))?;

        let shared = self.shared.clone();
        thread::Builder::new()
            .name("stepscribe-hook".into())
            .spawn(move || {
                debug!("rdev::listen thread starting");
                let callback = event_router(shared, pointer_tx, key_tx);
                if let Err(error) = listen(callback) {
                    error!(?error, "Input hook listen error");
                    let _ = status_tx.send(format!("{error:?}"));
                }
                debug!("rdev::listen thread exiting");
            })
            .map_err(|e| PlatformError::HookUnavailable(e.to_string()))?;

        match status_rx.recv_timeout(STARTUP_GRACE) {
            Ok(message) => Err(PlatformError::HookUnavailable(message)),
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Err(RecvTimeoutError::Disconnected) => Err(PlatformError::HookUnavailable(
                "listener exited during startup".into(),
            )),
        }
    }
}

impl InputMonitor for RdevInputMonitor {
    fn start(&self) -> Result<(), MonitorError> {
        if !self.listener_spawned.swap(true, Ordering::SeqCst) {
            if let Err(e) = self.spawn_listener() {
                self.listener_spawned.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
            info!("Input hook listener started");
        }
        self.shared.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        if self.shared.active.swap(false, Ordering::SeqCst) {
            info!("Input hook muted");
        }
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        *self.shared.position.lock()
    }
}

fn map_button(button: rdev::Button) -> MouseButton {
    match button {
        rdev::Button::Left => MouseButton::Left,
        rdev::Button::Right => MouseButton::Right,
        rdev::Button::Middle => MouseButton::Middle,
        rdev::Button::Unknown(_) => MouseButton::Unknown,
    }
}

/// Builds the listen callback. Runs on the hook thread, so it only records
/// position and forwards; anything slow happens on the workers.
fn event_router(
    shared: Arc<Shared>,
    pointer_tx: Sender<PointerSignal>,
    key_tx: Sender<KeySignal>,
) -> impl FnMut(Event) + 'static {
    let mut pressed = false;
    move |event: Event| {
        let position = *shared.position.lock();
        let active = shared.active.load(Ordering::Relaxed);
        let signal = match event.event_type {
            EventType::MouseMove { x, y } => {
                let (x, y) = (x as i32, y as i32);
                *shared.position.lock() = Some((x, y));
                if !(active && pressed) {
                    return;
                }
                PointerSignal::Move { x, y }
            }
            EventType::ButtonPress(button) => {
                let Some((x, y)) = position else { return };
                pressed = true;
                if !active {
                    return;
                }
                PointerSignal::Press { x, y, button: map_button(button) }
            }
            EventType::ButtonRelease(button) => {
                let Some((x, y)) = position else { return };
                pressed = false;
                if !active {
                    return;
                }
                PointerSignal::Release { x, y, button: map_button(button) }
            }
            EventType::KeyPress(key) => {
                if active && key_tx.try_send(KeySignal { key, text: event.name }).is_err() {
                    warn!("Keyboard channel full, dropping key press");
                }
                return;
            }
            EventType::KeyRelease(_) | EventType::Wheel { .. } => return,
        };
        if pointer_tx.try_send(signal).is_err() {
            warn!("Pointer channel full, dropping event");
        }
    }
}

fn run_pointer_loop(
    rx: Receiver<PointerSignal>,
    shared: Arc<Shared>,
    mut classifier: PointerGestureClassifier,
) {
    for signal in rx.iter() {
        match signal {
            PointerSignal::Press { x, y, button } => classifier.on_press(x, y, button),
            PointerSignal::Move { x, y } => classifier.on_move(x, y),
            PointerSignal::Release { x, y, button } => {
                let Some(click) = classifier.on_release(x, y, button, Instant::now()) else {
                    continue;
                };
                let Some(sink) = shared.sink.upgrade() else {
                    debug!("Input sink dropped, pointer worker exiting");
                    break;
                };
                sink.on_pointer_click(click);
            }
        }
    }
}

fn run_key_loop(rx: Receiver<KeySignal>, shared: Arc<Shared>, hotkey: Option<String>) {
    for signal in rx.iter() {
        let classified = keys::classify(signal.key, signal.text.as_deref());
        let Some((key, is_special)) = classified.into_sink_args() else {
            continue;
        };
        let Some(sink) = shared.sink.upgrade() else {
            debug!("Input sink dropped, keyboard worker exiting");
            break;
        };
        sink.on_key(&key, is_special);

        let is_hotkey = is_special
            && hotkey
                .as_deref()
                .is_some_and(|hotkey| hotkey_matches(hotkey, &key));
        if is_hotkey {
            match *shared.position.lock() {
                Some((x, y)) => sink.on_manual_capture(x, y),
                None => {
                    warn!("Manual capture hotkey pressed before any pointer position was seen")
                }
            }
        }
    }
}
