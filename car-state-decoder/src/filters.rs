//! Stateful estimators owned by a fusion instance
//!
//! All of these are fixed-capacity and constant-parameter: nothing here is
//! tuned online, nothing allocates after construction, and every update is
//! O(1). The control loop calls them exactly once per cycle.

/// Control-loop period in seconds (100 Hz).
pub const DT_CTRL: f64 = 0.01;

/// Fixed-gain 1-D Kalman filter over (position, velocity) — here used as
/// (speed, acceleration). Gains are precomputed constants; the update is
/// `x' = (A - K·C)·x + K·z`.
#[derive(Debug, Clone)]
pub struct Kf1d {
    x0: f64,
    x1: f64,
    // A - K*C, row major
    a_k: [f64; 4],
    k: [f64; 2],
}

impl Kf1d {
    pub fn new(dt: f64, k0: f64, k1: f64) -> Self {
        Self {
            x0: 0.0,
            x1: 0.0,
            a_k: [1.0 - k0, dt, -k1, 1.0],
            k: [k0, k1],
        }
    }

    pub fn update(&mut self, meas: f64) -> (f64, f64) {
        let x0 = self.a_k[0] * self.x0 + self.a_k[1] * self.x1 + self.k[0] * meas;
        let x1 = self.a_k[2] * self.x0 + self.a_k[3] * self.x1 + self.k[1] * meas;
        self.x0 = x0;
        self.x1 = x1;
        (x0, x1)
    }

    pub fn set_state(&mut self, x0: f64, x1: f64) {
        self.x0 = x0;
        self.x1 = x1;
    }

    pub fn state(&self) -> (f64, f64) {
        (self.x0, self.x1)
    }
}

/// Speed filter with the stock gain set, plus a jump reset so a car that
/// starts moving mid-initialization does not produce a phantom acceleration
/// spike.
#[derive(Debug, Clone)]
pub struct SpeedFilter {
    kf: Kf1d,
}

impl SpeedFilter {
    const K0: f64 = 0.12287673;
    const K1: f64 = 0.29666309;
    const RESET_JUMP: f64 = 2.0; // m/s

    pub fn new() -> Self {
        Self {
            kf: Kf1d::new(DT_CTRL, Self::K0, Self::K1),
        }
    }

    /// Returns (filtered speed, filtered acceleration).
    pub fn update(&mut self, v_raw: f64) -> (f64, f64) {
        if (v_raw - self.kf.state().0).abs() > Self::RESET_JUMP {
            self.kf.set_state(v_raw, 0.0);
        }
        self.kf.update(v_raw)
    }
}

impl Default for SpeedFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Stretches a momentary lamp signal: each on-frame reloads the hold
/// counter, each off-frame decays it by one. Output stays on while the
/// counter is nonzero.
#[derive(Debug, Clone)]
pub struct LampTimer {
    hold_frames: u32,
    count: u32,
}

impl LampTimer {
    pub fn new(hold_frames: u32) -> Self {
        Self { hold_frames, count: 0 }
    }

    pub fn update(&mut self, lamp_on: bool) -> bool {
        if lamp_on {
            self.count = self.hold_frames;
        } else {
            self.count = self.count.saturating_sub(1);
        }
        self.count > 0
    }
}

/// Debounce for noisy driver-torque override detection: the counter moves
/// ±1 per cycle, clipped to [0, 2·min_count], and the output asserts only
/// above min_count.
#[derive(Debug, Clone)]
pub struct PressedCounter {
    min_count: i32,
    count: i32,
}

impl PressedCounter {
    pub fn new(min_count: i32) -> Self {
        Self { min_count, count: 0 }
    }

    pub fn update(&mut self, pressed: bool) -> bool {
        self.count += if pressed { 1 } else { -1 };
        self.count = self.count.clamp(0, self.min_count * 2);
        self.count > self.min_count
    }
}

/// Counts consecutive cycles a condition held; any break resets to zero.
/// Callers compare the returned count against their own threshold, so one
/// type serves both the steering-fault debounce (assert at the threshold)
/// and the cruise-unavailable latch (assert above it).
#[derive(Debug, Clone, Default)]
pub struct ConsecutiveCounter {
    count: u32,
}

impl ConsecutiveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, active: bool) -> u32 {
        if active {
            self.count += 1;
        } else {
            self.count = 0;
        }
        self.count
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Latch with asymmetric set/clear thresholds. Sets when the value drops
/// below `set_below`, clears when it rises above `clear_above`, and holds
/// its previous output anywhere in between.
#[derive(Debug, Clone)]
pub struct HysteresisAlert {
    set_below: f64,
    clear_above: f64,
    active: bool,
}

impl HysteresisAlert {
    pub fn new(set_below: f64, clear_above: f64) -> Self {
        Self {
            set_below,
            clear_above,
            active: false,
        }
    }

    pub fn update(&mut self, value: f64) -> bool {
        if value < self.set_below {
            self.active = true;
        }
        if value > self.clear_above {
            self.active = false;
        }
        self.active
    }
}
