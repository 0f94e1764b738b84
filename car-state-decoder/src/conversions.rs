//! Unit conversion constants
//!
//! Every numeric field of [`VehicleState`](crate::types::VehicleState) is in
//! SI units (m/s, m/s², degrees, degrees/s). The bus speaks km/h, mph and raw
//! sensor ticks; these constants absorb the difference.

pub const MPH_TO_KPH: f64 = 1.609344;
pub const KPH_TO_MPH: f64 = 1.0 / MPH_TO_KPH;
pub const MS_TO_KPH: f64 = 3.6;
pub const KPH_TO_MS: f64 = 1.0 / MS_TO_KPH;
pub const MS_TO_MPH: f64 = MS_TO_KPH * KPH_TO_MPH;
pub const MPH_TO_MS: f64 = MPH_TO_KPH * KPH_TO_MS;

/// Wheel speed signals tick in 0.03125 km/h steps; 12 ticks is the cutoff
/// below which a wheel counts as stopped.
pub const STANDSTILL_THRESHOLD: f64 = 12.0 * 0.03125 * KPH_TO_MS;

/// Tire pressure messages carry a unit code; positive codes scale the raw
/// pressure by `code * 0.725`, code 0 means the value is already scaled.
pub const TPMS_UNIT_FACTOR: f64 = 0.725;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trips() {
        assert_relative_eq!(KPH_TO_MS * MS_TO_KPH, 1.0);
        assert_relative_eq!(MPH_TO_MS, 0.44704);
    }

    #[test]
    fn test_standstill_threshold_value() {
        assert_relative_eq!(STANDSTILL_THRESHOLD, 0.375 * KPH_TO_MS);
    }
}
