//! Capability bitsets and safety-firmware configuration types
//!
//! Platform flags describe the wire dialect and message-layout variant of a
//! car; feature flags describe which optional subsystems it reports; safety
//! param flags are the bitmask handed to the safety firmware. All three are
//! derived once per drive and never mutated afterwards.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Platform variant flags derived from the fingerprint plus the static
    /// variant profile.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PlatformFlags: u32 {
        /// CAN-FD wire dialect (classic CAN otherwise)
        const CANFD = 1 << 0;
        const HYBRID = 1 << 1;
        const EV = 1 << 2;
        const FUEL_CELL = 1 << 3;
        /// Classic dialect reads gear from the cluster message
        const CLUSTER_GEARS = 1 << 4;
        /// Classic dialect reads gear from the transmission ECU
        const TCU_GEARS = 1 << 5;
        /// Messages lack counters/checksums; needs the legacy safety model
        const LEGACY = 1 << 6;
        /// Classic dialect with the cruise subsystem behind the camera bus
        const CAMERA_SCC = 1 << 7;
        /// AEB/FCW signals live in FCA11 instead of SCC12
        const USE_FCA = 1 << 8;
        /// Car accepts the LFA lateral message
        const SEND_LFA = 1 << 9;
        /// Dedicated lane-assist button message present
        const HAS_LDA_BUTTON = 1 << 10;
        const ALT_LIMITS = 1 << 11;
        const ALT_LIMITS_2 = 1 << 12;
        /// Lateral command is relayed through an auxiliary ECU
        const CANFD_LKA_STEERING = 1 << 13;
        const CANFD_LKA_STEERING_ALT = 1 << 14;
        /// CAN-FD with the cruise subsystem behind the camera bus
        const CANFD_CAMERA_SCC = 1 << 15;
        /// Alternate cruise-button message layout
        const CANFD_ALT_BUTTONS = 1 << 16;
        /// Alternate gear-source messages, first fallback
        const CANFD_ALT_GEARS = 1 << 17;
        /// Alternate gear-source messages, second fallback
        const CANFD_ALT_GEARS_2 = 1 << 18;
    }
}

bitflags! {
    /// Optional subsystems the variant reports.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FeatureFlags: u32 {
        const TPMS = 1 << 0;
        const AUTOHOLD = 1 << 1;
        const NAVI = 1 << 2;
        /// Extended cruise-info message SCC13 present
        const SCC13 = 1 << 3;
        /// Extended cruise-info message SCC14 present
        const SCC14 = 1 << 4;
    }
}

bitflags! {
    /// Parameter bits of one safety-firmware configuration entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SafetyParamFlags: u16 {
        const EV_GAS = 1 << 0;
        const HYBRID_GAS = 1 << 1;
        const LONG = 1 << 2;
        const CAMERA_SCC = 1 << 3;
        const CANFD_LKA_STEERING = 1 << 4;
        const CANFD_ALT_BUTTONS = 1 << 5;
        const ALT_LIMITS = 1 << 6;
        const CANFD_LKA_STEERING_ALT = 1 << 7;
        const FCEV_GAS = 1 << 8;
        const ALT_LIMITS_2 = 1 << 9;
    }
}

/// Safety model the firmware should run for one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyModel {
    /// Block all actuation on this bus
    NoOutput,
    /// Classic dialect with counters and checksums
    Standard,
    /// Classic dialect without counters/checksums
    Legacy,
    /// CAN-FD dialect
    CanFd,
}

/// One entry of the ordered safety configuration sequence. The firmware
/// applies entries in order and the last entry governs the primary output
/// bus, so ordering is a correctness requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub model: SafetyModel,
    pub param: SafetyParamFlags,
}

impl SafetyConfig {
    pub fn new(model: SafetyModel) -> Self {
        Self {
            model,
            param: SafetyParamFlags::empty(),
        }
    }
}
