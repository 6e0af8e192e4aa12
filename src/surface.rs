use crate::convert::{PixelBuffer, RowOrder};
use std::collections::HashSet;

/// Keys the harness reacts to. Surfaces map their native key codes onto these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Digit(u8),
    NearEnd,
    Left,
    Right,
    Shift,
    Freeze,
    Exit,
}

pub trait KeyQuery {
    /// Went down since the previous poll.
    fn just_pressed(&self, key: Key) -> bool;
    /// Currently held down.
    fn pressed(&self, key: Key) -> bool;
}

/// A place frames are presented to: a terminal window, an image canvas, or a
/// test double.
pub trait Surface: KeyQuery {
    fn name(&self) -> &'static str;

    /// Drain pending input. Called once at the top of every frame.
    fn poll(&mut self) -> anyhow::Result<()>;

    fn close_requested(&self) -> bool;

    fn request_close(&mut self);

    /// Memory row order `present` expects.
    fn row_order(&self) -> RowOrder;

    fn set_title(&mut self, title: &str);

    fn present(&mut self, frame: &PixelBuffer) -> anyhow::Result<()>;
}

/// Press/hold bookkeeping for event-driven input sources.
///
/// Sources that deliver release events keep keys held until released.
/// Sources that only deliver presses and auto-repeats treat a key as held for
/// the frame in which it was seen.
#[derive(Debug, Default)]
pub struct KeyState {
    held: HashSet<Key>,
    just: HashSet<Key>,
    reports_release: bool,
}

impl KeyState {
    pub fn new(reports_release: bool) -> Self {
        Self {
            reports_release,
            ..Self::default()
        }
    }

    /// Start a new frame: forget edge events, and without release reporting
    /// forget holds that were not refreshed.
    pub fn begin_frame(&mut self) {
        self.just.clear();
        if !self.reports_release {
            self.held.clear();
        }
    }

    pub fn press(&mut self, key: Key) {
        if !self.reports_release || !self.held.contains(&key) {
            self.just.insert(key);
        }
        self.held.insert(key);
    }

    /// Auto-repeat: keeps the key held without a new edge.
    pub fn repeat(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    /// Level-triggered state, e.g. a modifier reported alongside another key.
    pub fn set_held(&mut self, key: Key, held: bool) {
        if held {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }
}

impl KeyQuery for KeyState {
    fn just_pressed(&self, key: Key) -> bool {
        self.just.contains(&key)
    }

    fn pressed(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}
