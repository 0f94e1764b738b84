//! Capability fingerprinting and flag derivation
//!
//! Before steady-state decoding begins, the enclosing system listens on
//! every bus and records which message identifiers appeared where. This
//! module turns that [`Fingerprint`] (plus the detected ECUs, the static
//! variant profile and the operator options) into the immutable
//! [`CarParams`] record the rest of the crate branches on.
//!
//! The derivation is a pure, total function: identical inputs always yield
//! bit-identical flags and identically ordered safety configs, and an
//! identifier pattern that matches no known variant leaves the
//! corresponding flag unset — an unrecognized car degrades to minimum
//! capability, it never fails.

use crate::flags::{FeatureFlags, PlatformFlags, SafetyConfig, SafetyModel, SafetyParamFlags};
use crate::params::{CanFdBuses, CarParams, DeriveOptions, SccBus, VariantProfile, STEER_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Relay markers on the camera bus that indicate the lateral command is
/// forwarded through an auxiliary ECU.
const LKA_RELAY_MARKERS: [u32; 2] = [0x50, 0x110];
const LKA_RELAY_ALT_MARKER: u32 = 0x110;

/// First radar track message address; its presence on bus 1 means the
/// radar is reachable.
const RADAR_START_ADDR: u32 = 0x500;

// CAN-FD probes, all on the E-CAN
const CANFD_HYBRID_MARKER: u32 = 0x105;
const CANFD_BUTTONS_MARKER: u32 = 0x1cf;
const CANFD_GEAR_PRIMARY: u32 = 0x130;
const CANFD_GEAR_SECONDARY: u32 = 0x40;
const CANFD_BSM_MARKER: u32 = 0x1e5;
const CANFD_AUTOHOLD_MARKER: u32 = 0x60;
const CANFD_TPMS_MARKER: u32 = 0x3a0;

// classic probes
const CLASSIC_BSM_MARKER: u32 = 0x58b;
const CLASSIC_LFA_MARKER: u32 = 0x485;
const CLASSIC_FCA_MARKER: u32 = 0x38d;
const CLASSIC_LDA_BUTTON_MARKER: u32 = 0x391;
const CLASSIC_AUTOHOLD_MARKER: u32 = 0x47f;
const CLASSIC_TPMS_MARKER: u32 = 0x593;
const CLASSIC_NAVI_MARKER: u32 = 0x544;
const CLASSIC_SCC13_ADDR: u32 = 0x50a;
const CLASSIC_SCC14_ADDR: u32 = 0x389;

/// The set of message identifiers observed per physical bus during the
/// fingerprinting window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    buses: BTreeMap<u8, BTreeSet<u32>>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(bus, address)` observations.
    pub fn from_observations<I: IntoIterator<Item = (u8, u32)>>(observations: I) -> Self {
        let mut fp = Self::new();
        for (bus, addr) in observations {
            fp.insert(bus, addr);
        }
        fp
    }

    pub fn insert(&mut self, bus: u8, addr: u32) {
        self.buses.entry(bus).or_default().insert(addr);
    }

    pub fn contains(&self, bus: u8, addr: u32) -> bool {
        self.buses.get(&bus).is_some_and(|ids| ids.contains(&addr))
    }

    /// Harness offset: secondary harnesses renumber the buses upwards by 4.
    pub fn bus_offset(&self) -> u8 {
        if self.buses.keys().any(|bus| *bus >= 4) {
            4
        } else {
            0
        }
    }

    /// Wire-dialect shape heuristic: CAN-FD platforms carry the probe
    /// identifiers the sub-variant detection keys on and never the classic
    /// cluster message.
    pub fn has_canfd_shape(&self) -> bool {
        const CLASSIC_CLUSTER: u32 = 0x4f1;
        const SHAPE_MARKERS: [u32; 3] =
            [CANFD_BUTTONS_MARKER, CANFD_GEAR_PRIMARY, CANFD_HYBRID_MARKER];
        let offset = self.bus_offset();
        !self.contains(0, CLASSIC_CLUSTER)
            && [offset, offset + 1]
                .iter()
                .any(|bus| SHAPE_MARKERS.iter().any(|addr| self.contains(*bus, *addr)))
    }
}

/// ECU identities reported during firmware version query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcuKind {
    /// Auxiliary ADAS ECU that relays the lateral command
    Adas,
    Eps,
    Engine,
    Transmission,
    FwdRadar,
    FwdCamera,
}

/// LKA-steering topology: relay markers seen on the camera bus, or an
/// explicit operator override.
fn detect_lka_steering(fingerprint: &Fingerprint, cam_bus: u8, force: bool) -> bool {
    force
        || LKA_RELAY_MARKERS
            .iter()
            .any(|addr| fingerprint.contains(cam_bus, *addr))
}

/// CAN-FD sub-variant flags from identifier presence/absence on the E-CAN.
fn derive_canfd_layout(
    fingerprint: &Fingerprint,
    buses: CanFdBuses,
    lka_steering: bool,
    radar_scc_variant: bool,
) -> (PlatformFlags, FeatureFlags, bool) {
    let mut flags = PlatformFlags::empty();
    let mut ex_flags = FeatureFlags::empty();

    if fingerprint.contains(buses.ecan, CANFD_HYBRID_MARKER) {
        flags |= PlatformFlags::HYBRID;
    }

    if lka_steering {
        flags |= PlatformFlags::CANFD_LKA_STEERING;
        if fingerprint.contains(buses.cam, LKA_RELAY_ALT_MARKER) {
            flags |= PlatformFlags::CANFD_LKA_STEERING_ALT;
        }
    } else if !radar_scc_variant {
        flags |= PlatformFlags::CANFD_CAMERA_SCC;
    }

    if !fingerprint.contains(buses.ecan, CANFD_BUTTONS_MARKER) {
        flags |= PlatformFlags::CANFD_ALT_BUTTONS;
    }

    // gear source falls back through an absence cascade
    if !fingerprint.contains(buses.ecan, CANFD_GEAR_PRIMARY) {
        if !fingerprint.contains(buses.ecan, CANFD_GEAR_SECONDARY) {
            log::debug!("gear source: primary and secondary absent, using tertiary layout");
            flags |= PlatformFlags::CANFD_ALT_GEARS_2;
        } else {
            log::debug!("gear source: primary absent, using secondary layout");
            flags |= PlatformFlags::CANFD_ALT_GEARS;
        }
    }

    if fingerprint.contains(buses.ecan, CANFD_AUTOHOLD_MARKER) {
        ex_flags |= FeatureFlags::AUTOHOLD;
    }
    if fingerprint.contains(buses.ecan, CANFD_TPMS_MARKER) {
        ex_flags |= FeatureFlags::TPMS;
    }

    let enable_bsm = fingerprint.contains(buses.ecan, CANFD_BSM_MARKER);
    (flags, ex_flags, enable_bsm)
}

/// Classic sub-variant flags from identifier presence on buses 0 and 2.
fn derive_classic_layout(fingerprint: &Fingerprint) -> (PlatformFlags, FeatureFlags, bool) {
    let mut flags = PlatformFlags::empty();
    let mut ex_flags = FeatureFlags::empty();

    if fingerprint.contains(2, CLASSIC_LFA_MARKER) {
        flags |= PlatformFlags::SEND_LFA;
    }
    if fingerprint.contains(0, CLASSIC_FCA_MARKER) || fingerprint.contains(2, CLASSIC_FCA_MARKER) {
        flags |= PlatformFlags::USE_FCA;
    }
    if fingerprint.contains(0, CLASSIC_LDA_BUTTON_MARKER) {
        flags |= PlatformFlags::HAS_LDA_BUTTON;
    }
    if fingerprint.contains(0, CLASSIC_AUTOHOLD_MARKER) {
        ex_flags |= FeatureFlags::AUTOHOLD;
    }
    if fingerprint.contains(0, CLASSIC_TPMS_MARKER) {
        ex_flags |= FeatureFlags::TPMS;
    }
    if fingerprint.contains(0, CLASSIC_NAVI_MARKER) {
        ex_flags |= FeatureFlags::NAVI;
    }

    let enable_bsm = fingerprint.contains(0, CLASSIC_BSM_MARKER);
    (flags, ex_flags, enable_bsm)
}

/// Derive the immutable capability record for one drive.
///
/// Runs exactly once, before steady-state decoding; every fusion cycle and
/// the command encoder read the result without mutating it.
pub fn derive_car_params(
    fingerprint: &Fingerprint,
    detected_ecus: &[EcuKind],
    profile: &VariantProfile,
    options: &DeriveOptions,
) -> CarParams {
    let mut flags = profile.base_flags;
    let mut ex_flags = FeatureFlags::empty();
    // the variant profile pins the dialect; without it, the message-set
    // shape decides
    let canfd = flags.contains(PlatformFlags::CANFD) || fingerprint.has_canfd_shape();
    if canfd {
        flags |= PlatformFlags::CANFD;
    }

    let offset = fingerprint.bus_offset();
    let cam_probe_bus = 2 + offset;
    let lka_steering = detect_lka_steering(fingerprint, cam_probe_bus, options.force_lka_steering);
    let canfd_buses = if canfd {
        Some(CanFdBuses::new(lka_steering, offset))
    } else {
        None
    };

    let enable_bsm;
    if let Some(buses) = canfd_buses {
        let (layout_flags, layout_ex, bsm) =
            derive_canfd_layout(fingerprint, buses, lka_steering, profile.canfd_radar_scc);
        flags |= layout_flags;
        ex_flags |= layout_ex;
        enable_bsm = bsm;
    } else {
        let (layout_flags, layout_ex, bsm) = derive_classic_layout(fingerprint);
        flags |= layout_flags;
        ex_flags |= layout_ex;
        enable_bsm = bsm;
    }

    // which physical bus carries the cruise subsystem
    let scc_bus = if flags.contains(PlatformFlags::CAMERA_SCC) || options.scc_on_camera_bus {
        SccBus::Camera
    } else {
        SccBus::Primary
    };

    // extended cruise-info messages only exist behind camera-routed cruise
    if !canfd && scc_bus == SccBus::Camera {
        if fingerprint.contains(0, CLASSIC_SCC13_ADDR) || fingerprint.contains(2, CLASSIC_SCC13_ADDR)
        {
            ex_flags |= FeatureFlags::SCC13;
        }
        if fingerprint.contains(0, CLASSIC_SCC14_ADDR) || fingerprint.contains(2, CLASSIC_SCC14_ADDR)
        {
            ex_flags |= FeatureFlags::SCC14;
        }
    }

    let mut radar_unavailable = !fingerprint.contains(1, RADAR_START_ADDR);

    // longitudinal availability, then the actuation-path override: a relay
    // topology without the relaying ECU has no way to send accel commands
    let mut longitudinal_available = if canfd {
        !(profile.unsupported_longitudinal || profile.canfd_radar_scc)
    } else {
        !profile.unsupported_longitudinal
    };
    if lka_steering && !detected_ecus.contains(&EcuKind::Adas) {
        log::info!("LKA-steering topology without an ADAS ECU, longitudinal unavailable");
        longitudinal_available = false;
    }
    let mut longitudinal_enabled = options.experimental_long && longitudinal_available;

    // safety configuration, ordered: the firmware applies entries in
    // sequence and the last entry governs the primary output bus
    let mut safety_configs: Vec<SafetyConfig> = Vec::new();
    if canfd {
        safety_configs.push(SafetyConfig::new(SafetyModel::CanFd));
        if canfd_buses.map(|b| b.ecan).unwrap_or(0) >= 4 {
            safety_configs.insert(0, SafetyConfig::new(SafetyModel::NoOutput));
        }
        if let Some(last) = safety_configs.last_mut() {
            if flags.contains(PlatformFlags::CANFD_LKA_STEERING) {
                last.param |= SafetyParamFlags::CANFD_LKA_STEERING;
                if flags.contains(PlatformFlags::CANFD_LKA_STEERING_ALT) {
                    last.param |= SafetyParamFlags::CANFD_LKA_STEERING_ALT;
                }
            }
            if flags.contains(PlatformFlags::CANFD_ALT_BUTTONS) {
                last.param |= SafetyParamFlags::CANFD_ALT_BUTTONS;
            }
            if flags.contains(PlatformFlags::CANFD_CAMERA_SCC) {
                last.param |= SafetyParamFlags::CAMERA_SCC;
            }
        }

        if scc_bus == SccBus::Camera {
            longitudinal_enabled = true;
            radar_unavailable = false;
        }
    } else {
        let base = if flags.contains(PlatformFlags::LEGACY) {
            SafetyModel::Legacy
        } else {
            SafetyModel::Standard
        };
        safety_configs.push(SafetyConfig::new(base));
        if flags.contains(PlatformFlags::CAMERA_SCC) {
            safety_configs[0].param |= SafetyParamFlags::CAMERA_SCC;
        }

        if scc_bus == SccBus::Camera {
            // the cruise computer sits behind the camera; we own engagement
            longitudinal_enabled = true;
            radar_unavailable = false;
            safety_configs = vec![SafetyConfig::new(SafetyModel::Legacy)];
        }
    }

    let pcm_cruise =
        !(longitudinal_enabled && scc_bus == SccBus::Primary && !options.cruise_state_control);

    if let Some(last) = safety_configs.last_mut() {
        if flags.contains(PlatformFlags::ALT_LIMITS) {
            last.param |= SafetyParamFlags::ALT_LIMITS;
        }
        if flags.contains(PlatformFlags::ALT_LIMITS_2) {
            last.param |= SafetyParamFlags::ALT_LIMITS_2;
        }
        if longitudinal_enabled {
            last.param |= SafetyParamFlags::LONG;
        }
        if flags.contains(PlatformFlags::HYBRID) {
            last.param |= SafetyParamFlags::HYBRID_GAS;
        } else if flags.contains(PlatformFlags::EV) {
            last.param |= SafetyParamFlags::EV_GAS;
        } else if flags.contains(PlatformFlags::FUEL_CELL) {
            last.param |= SafetyParamFlags::FCEV_GAS;
        }
    }

    log::info!(
        "derived params for {}: flags={:?} ex={:?} scc_bus={:?} long={}/{} bsm={}",
        profile.name,
        flags,
        ex_flags,
        scc_bus,
        longitudinal_available,
        longitudinal_enabled,
        enable_bsm,
    );

    CarParams {
        variant: profile.name.clone(),
        flags,
        ex_flags,
        scc_bus,
        enable_bsm,
        longitudinal_available,
        longitudinal_enabled,
        pcm_cruise,
        radar_unavailable,
        min_steer_speed: profile.min_steer_speed,
        steer_threshold: STEER_THRESHOLD,
        steer_actuator_delay: 0.2,
        steer_limit_timer: 2.0,
        wheel_speed_factor: profile.wheel_speed_factor,
        cluster_speed_imperial_native: profile.cluster_speed_imperial_native,
        alt_blinker_lamps: profile.alt_blinker_lamps,
        canfd_buses,
        safety_configs,
    }
}
