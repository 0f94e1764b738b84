//! Button sampling and edge detection
//!
//! Button signals can toggle faster than the control rate, so fusion keeps
//! a fixed-capacity ring of every sample seen since the previous cycle and
//! detects edges between the last-known values. The recent-sample window is
//! also what disambiguates user intent from computer-issued intent: on some
//! model years the cancel code doubles as a pause/resume toggle, so a stock
//! engagement is only allowed through when the driver actually touched a
//! button recently.

use crate::types::{ButtonEvent, ButtonType};

/// How many raw samples each ring retains.
pub const PREV_BUTTON_SAMPLES: usize = 8;

/// Raw cruise-button codes as they appear on the wire.
pub mod codes {
    pub const NONE: i64 = 0;
    pub const RES_ACCEL: i64 = 1;
    pub const SET_DECEL: i64 = 2;
    pub const GAP_DIST: i64 = 3;
    pub const CANCEL: i64 = 4;
}

/// Codes that express engagement intent. Cancel is included because it can
/// act as an ACC pause/resume button; the main button can also enable on
/// some cars.
pub const ENABLE_BUTTONS: [i64; 3] = [codes::RES_ACCEL, codes::SET_DECEL, codes::CANCEL];

/// Cruise-cluster code -> button identity.
pub const CRUISE_BUTTON_MAPPING: &[(i64, ButtonType)] = &[
    (codes::RES_ACCEL, ButtonType::AccelCruise),
    (codes::SET_DECEL, ButtonType::DecelCruise),
    (codes::GAP_DIST, ButtonType::GapAdjustCruise),
    (codes::CANCEL, ButtonType::Cancel),
];

/// Main-cruise toggle is a plain 0/1 signal.
pub const MAIN_BUTTON_MAPPING: &[(i64, ButtonType)] = &[(1, ButtonType::MainCruise)];

/// Lane-assist button is a plain 0/1 signal.
pub const LANE_ASSIST_MAPPING: &[(i64, ButtonType)] = &[(1, ButtonType::LaneAssist)];

/// Fixed-capacity, oldest-overwrite ring of raw button codes,
/// pre-filled with the unpressed code.
#[derive(Debug, Clone)]
pub struct ButtonRing {
    buf: [i64; PREV_BUTTON_SAMPLES],
    head: usize,
}

impl ButtonRing {
    pub fn new() -> Self {
        Self {
            buf: [codes::NONE; PREV_BUTTON_SAMPLES],
            head: 0,
        }
    }

    pub fn push(&mut self, code: i64) {
        self.buf[self.head] = code;
        self.head = (self.head + 1) % PREV_BUTTON_SAMPLES;
    }

    pub fn extend<I: IntoIterator<Item = i64>>(&mut self, codes: I) {
        for code in codes {
            self.push(code);
        }
    }

    /// Most recent sample.
    pub fn last(&self) -> i64 {
        self.buf[(self.head + PREV_BUTTON_SAMPLES - 1) % PREV_BUTTON_SAMPLES]
    }

    /// Samples oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..PREV_BUTTON_SAMPLES).map(move |i| self.buf[(self.head + i) % PREV_BUTTON_SAMPLES])
    }

    pub fn any<F: Fn(i64) -> bool>(&self, pred: F) -> bool {
        self.iter().any(pred)
    }
}

impl Default for ButtonRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge detection between the previous and current last-known codes.
///
/// On a change, the previous code (if pressed) yields a released event and
/// the current code (if pressed) a pressed event, so a direct switch from
/// one button to another produces both. Codes without a mapping become
/// `ButtonType::Unknown` rather than being dropped.
pub fn create_button_events(
    cur: i64,
    prev: i64,
    mapping: &[(i64, ButtonType)],
) -> Vec<ButtonEvent> {
    let mut events = Vec::new();
    if cur == prev {
        return events;
    }
    for (pressed, code) in [(false, prev), (true, cur)] {
        if code != codes::NONE {
            let button = mapping
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, t)| *t)
                .unwrap_or(ButtonType::Unknown);
            events.push(ButtonEvent { button, pressed });
        }
    }
    events
}
