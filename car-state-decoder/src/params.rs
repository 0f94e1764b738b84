//! Static platform configuration
//!
//! [`CarParams`] is the immutable capability record produced by flag
//! derivation: one instance per drive, shared read-only with every fusion
//! cycle and with the command encoder. [`VariantProfile`] and
//! [`DeriveOptions`] are its inputs — the first is static per-candidate
//! data from the variant tables, the second carries operator choices.

use crate::flags::{FeatureFlags, PlatformFlags, SafetyConfig};
use serde::{Deserialize, Serialize};

/// Which physical bus carries the adaptive-cruise subsystem on classic
/// dialect cars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SccBus {
    Primary,
    Camera,
}

/// Physical bus indices for the CAN-FD harness. LKA-steering cars split the
/// harness differently, swapping which side of it the E-CAN sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanFdBuses {
    pub ecan: u8,
    pub acan: u8,
    pub cam: u8,
}

impl CanFdBuses {
    pub fn new(lka_steering: bool, offset: u8) -> Self {
        let (acan, ecan) = if lka_steering { (0, 1) } else { (1, 0) };
        Self {
            ecan: ecan + offset,
            acan: acan + offset,
            cam: 2 + offset,
        }
    }
}

/// Static per-candidate data consumed by flag derivation. Variant identity
/// is data supplied from outside the crate; nothing in here is inferred
/// from bus traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantProfile {
    /// Display name, diagnostics only
    pub name: String,
    /// Flags known statically for the candidate: dialect, drivetrain,
    /// gear source, legacy safety, camera-routed cruise, limit variants
    pub base_flags: PlatformFlags,
    /// Candidate is in the known-unsupported set for longitudinal control
    pub unsupported_longitudinal: bool,
    /// CAN-FD candidate keeps its stock radar-based cruise
    pub canfd_radar_scc: bool,
    /// Cluster speed signal is already imperial when the dash is imperial
    pub cluster_speed_imperial_native: bool,
    /// Blinker lamps are reported on the alternate signals
    pub alt_blinker_lamps: bool,
    /// Below this speed the EPS refuses steering commands (m/s, 0 = none)
    pub min_steer_speed: f64,
    /// Per-variant wheel speed scale correction
    pub wheel_speed_factor: f64,
}

impl Default for VariantProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_flags: PlatformFlags::empty(),
            unsupported_longitudinal: false,
            canfd_radar_scc: false,
            cluster_speed_imperial_native: false,
            alt_blinker_lamps: false,
            min_steer_speed: 0.0,
            wheel_speed_factor: 1.0,
        }
    }
}

/// Operator inputs to flag derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeriveOptions {
    /// Opt in to longitudinal control where the platform supports it
    pub experimental_long: bool,
    /// Force the cruise subsystem onto the camera bus
    pub scc_on_camera_bus: bool,
    /// Force LKA-steering topology regardless of relay markers
    pub force_lka_steering: bool,
    /// Let the injected cruise-state collaborator manage engagement
    pub cruise_state_control: bool,
}

/// Driver-torque threshold above which the driver counts as overriding.
pub const STEER_THRESHOLD: f64 = 150.0;

/// Immutable capability record for one vehicle variant, derived once per
/// drive. Everything downstream branches on it read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarParams {
    pub variant: String,
    pub flags: PlatformFlags,
    pub ex_flags: FeatureFlags,
    pub scc_bus: SccBus,
    pub enable_bsm: bool,
    /// The platform can do longitudinal control at all
    pub longitudinal_available: bool,
    /// Longitudinal control is actually on (availability ∧ opt-in)
    pub longitudinal_enabled: bool,
    /// Engagement state is owned by the stock cruise computer
    pub pcm_cruise: bool,
    pub radar_unavailable: bool,
    pub min_steer_speed: f64,
    pub steer_threshold: f64,
    pub steer_actuator_delay: f64,
    pub steer_limit_timer: f64,
    pub wheel_speed_factor: f64,
    pub cluster_speed_imperial_native: bool,
    pub alt_blinker_lamps: bool,
    /// Physical bus layout, CAN-FD dialect only
    pub canfd_buses: Option<CanFdBuses>,
    /// Ordered safety-firmware configuration
    pub safety_configs: Vec<SafetyConfig>,
}

impl CarParams {
    pub fn is_canfd(&self) -> bool {
        self.flags.contains(PlatformFlags::CANFD)
    }

    pub fn has_flag(&self, flag: PlatformFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn has_feature(&self, feature: FeatureFlags) -> bool {
        self.ex_flags.contains(feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canfd_bus_layout_swaps_for_lka_steering() {
        let direct = CanFdBuses::new(false, 0);
        assert_eq!((direct.ecan, direct.acan, direct.cam), (0, 1, 2));

        let relayed = CanFdBuses::new(true, 0);
        assert_eq!((relayed.ecan, relayed.acan, relayed.cam), (1, 0, 2));
    }

    #[test]
    fn test_canfd_bus_layout_with_harness_offset() {
        let buses = CanFdBuses::new(true, 4);
        assert_eq!((buses.ecan, buses.acan, buses.cam), (5, 4, 6));
    }

    #[test]
    fn test_variant_profile_defaults() {
        let profile = VariantProfile::default();
        assert_eq!(profile.wheel_speed_factor, 1.0);
        assert_eq!(profile.min_steer_speed, 0.0);
        assert!(profile.base_flags.is_empty());
    }
}
