//! Core types for the car state decoder
//!
//! This module defines the per-cycle output record ([`VehicleState`]) and the
//! error type shared across the crate. A `VehicleState` is created fresh each
//! control cycle and never mutated after it is returned; everything that must
//! survive across cycles lives in [`CarStateFusion`](crate::fusion::CarStateFusion).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, CarStateError>;

/// Copy of every decoded signal in a message's most recent frame
/// (`signal name -> value`). Retained for the outbound command encoder,
/// which needs counters and pass-through fields from the last frame seen.
pub type MessageSnapshot = HashMap<String, f64>;

/// Logical bus role a signal is read from. The physical bus index behind
/// each role is decided at fingerprint time and owned by the frame codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bus {
    /// Powertrain bus (primary)
    Powertrain,
    /// Camera bus (ADAS / relayed messages)
    Camera,
}

/// Errors that can occur while producing a vehicle state
#[derive(Debug, thiserror::Error)]
pub enum CarStateError {
    #[error("message {message} never seen on {bus:?} bus")]
    MissingMessage { bus: Bus, message: String },

    #[error("signal {signal} not present in {message}")]
    MissingSignal { message: String, signal: String },
}

/// Per-wheel speeds in m/s
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSpeeds {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

impl WheelSpeeds {
    /// Arithmetic mean of the four wheels, the raw longitudinal speed estimate
    pub fn mean(&self) -> f64 {
        (self.fl + self.fr + self.rl + self.rr) / 4.0
    }
}

/// Adaptive cruise subsystem state as displayed to the driver
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CruiseState {
    /// Cruise can be engaged
    pub available: bool,
    /// Cruise is actively controlling
    pub enabled: bool,
    /// Cruise is holding the car at a stop
    pub standstill: bool,
    /// Non-adaptive (dumb) cruise mode is active
    pub non_adaptive: bool,
    /// Set speed in m/s
    pub speed: f64,
    /// Following-distance setting (1..4 bars)
    pub lead_distance_bars: f64,
}

/// Tire pressures, unit-corrected (only populated when the variant reports them)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TpmsState {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

/// Gear selector position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GearShifter {
    #[default]
    Unknown,
    Park,
    Reverse,
    Neutral,
    Drive,
    Low,
}

impl GearShifter {
    /// Map a signal-database value description ("P", "DRIVE", ...) to a gear.
    /// Unrecognized labels resolve to `Unknown` rather than failing the cycle.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_uppercase()).as_deref() {
            Some("P") | Some("PARK") => GearShifter::Park,
            Some("R") | Some("REVERSE") => GearShifter::Reverse,
            Some("N") | Some("NEUTRAL") => GearShifter::Neutral,
            Some("D") | Some("DRIVE") => GearShifter::Drive,
            Some("L") | Some("LOW") => GearShifter::Low,
            _ => GearShifter::Unknown,
        }
    }
}

impl fmt::Display for GearShifter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GearShifter::Unknown => "unknown",
            GearShifter::Park => "park",
            GearShifter::Reverse => "reverse",
            GearShifter::Neutral => "neutral",
            GearShifter::Drive => "drive",
            GearShifter::Low => "low",
        };
        write!(f, "{}", s)
    }
}

/// Identity of a driver-facing button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonType {
    /// Resume / accelerate rocker
    AccelCruise,
    /// Set / decelerate rocker
    DecelCruise,
    /// Following-gap adjust
    GapAdjustCruise,
    /// Cancel (overloaded as pause/resume on some model years)
    Cancel,
    /// Main cruise on/off
    MainCruise,
    /// Lane-assist button
    LaneAssist,
    /// A code with no mapping for this variant
    Unknown,
}

/// A single press/release transition detected this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: ButtonType,
    pub pressed: bool,
}

/// Normalized, validated vehicle state, produced once per control cycle.
///
/// All speeds are m/s, accelerations m/s², angles degrees, angle rates
/// degrees/s, regardless of which wire dialect produced them. Auxiliary
/// fields are `Option` so that "variant does not report this" stays
/// distinguishable from a zero reading.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    // kinematics
    pub wheel_speeds: WheelSpeeds,
    /// Unfiltered mean of the four wheel speeds
    pub v_ego_raw: f64,
    /// Filtered longitudinal speed
    pub v_ego: f64,
    /// Filtered longitudinal acceleration
    pub a_ego: f64,
    /// Filtered dash-cluster speed
    pub v_ego_cluster: f64,
    /// Down-sampled cluster speed exactly as the dash shows it
    pub cluster_display_speed: f64,
    /// v_ego / v_ego_cluster, 1.0 whenever either is too slow to divide safely
    pub v_cluster_ratio: f64,
    pub standstill: bool,

    // steering
    pub steering_angle_deg: f64,
    pub steering_rate_deg: f64,
    pub yaw_rate: f64,
    /// Driver torque at the column
    pub steering_torque: f64,
    /// EPS output torque
    pub steering_torque_eps: f64,
    /// Driver is overriding (debounced)
    pub steering_pressed: bool,
    /// Debounced transient EPS fault
    pub steer_fault_temporary: bool,
    /// Permanent EPS fault
    pub steer_fault_permanent: bool,
    pub low_speed_alert: bool,

    // cruise
    pub cruise: CruiseState,
    pub acc_faulted: bool,
    /// Latched cruise-unavailable condition (leaky counter, §fault logic)
    pub cruise_unavailable: bool,
    /// Stock engagement must not pass through (no recent button interaction)
    pub block_pcm_enable: bool,
    pub stock_fcw: bool,
    pub stock_aeb: bool,

    // body
    pub door_open: bool,
    pub seatbelt_unlatched: bool,
    pub left_blinker: bool,
    pub right_blinker: bool,
    pub left_blindspot: bool,
    pub right_blindspot: bool,
    pub brake: f64,
    pub brake_pressed: bool,
    pub brake_hold_active: bool,
    pub brake_lights: bool,
    pub parking_brake: bool,
    pub esp_disabled: bool,
    pub esp_active: bool,
    pub gas: f64,
    pub gas_pressed: bool,
    pub gear: GearShifter,

    // button events detected this cycle, in detection order
    pub button_events: Vec<ButtonEvent>,

    // auxiliary state, populated only when the capability flags say the
    // variant reports it
    pub tpms: Option<TpmsState>,
    pub auto_hold: Option<f64>,
    pub nav_speed_limit: Option<f64>,
    pub lead_distance: Option<f64>,
    /// Echo of the acceleration the cruise controller requested
    pub accel_req: Option<f64>,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            wheel_speeds: WheelSpeeds::default(),
            v_ego_raw: 0.0,
            v_ego: 0.0,
            a_ego: 0.0,
            v_ego_cluster: 0.0,
            cluster_display_speed: 0.0,
            v_cluster_ratio: 1.0,
            standstill: false,
            steering_angle_deg: 0.0,
            steering_rate_deg: 0.0,
            yaw_rate: 0.0,
            steering_torque: 0.0,
            steering_torque_eps: 0.0,
            steering_pressed: false,
            steer_fault_temporary: false,
            steer_fault_permanent: false,
            low_speed_alert: false,
            cruise: CruiseState::default(),
            acc_faulted: false,
            cruise_unavailable: false,
            block_pcm_enable: false,
            stock_fcw: false,
            stock_aeb: false,
            door_open: false,
            seatbelt_unlatched: false,
            left_blinker: false,
            right_blinker: false,
            left_blindspot: false,
            right_blindspot: false,
            brake: 0.0,
            brake_pressed: false,
            brake_hold_active: false,
            brake_lights: false,
            parking_brake: false,
            esp_disabled: false,
            esp_active: false,
            gas: 0.0,
            gas_pressed: false,
            gear: GearShifter::Unknown,
            button_events: Vec::new(),
            tpms: None,
            auto_hold: None,
            nav_speed_limit: None,
            lead_distance: None,
            accel_req: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_speed_mean() {
        let ws = WheelSpeeds { fl: 1.0, fr: 2.0, rl: 3.0, rr: 4.0 };
        assert_eq!(ws.mean(), 2.5);
    }

    #[test]
    fn test_gear_from_label() {
        assert_eq!(GearShifter::from_label(Some("P")), GearShifter::Park);
        assert_eq!(GearShifter::from_label(Some("drive")), GearShifter::Drive);
        assert_eq!(GearShifter::from_label(Some(" REVERSE ")), GearShifter::Reverse);
        assert_eq!(GearShifter::from_label(Some("S")), GearShifter::Unknown);
        assert_eq!(GearShifter::from_label(None), GearShifter::Unknown);
    }

    #[test]
    fn test_default_ratio_is_one() {
        let state = VehicleState::default();
        assert_eq!(state.v_cluster_ratio, 1.0);
        assert!(state.tpms.is_none());
    }
}
