//! Message subscription lists
//!
//! The contract with the external frame codec: which messages to decode on
//! which logical bus, and the arrival rate to health-check them against
//! (0 = present but not rate-checked). The lists are a pure function of the
//! capability record — never of runtime bus content — so the codec can be
//! configured before the first cycle runs.

use super::routing::{CanFdRoutes, ClassicRoutes, GasRoute};
use crate::flags::{FeatureFlags, PlatformFlags};
use crate::params::{CarParams, SccBus};
use serde::Serialize;

/// One subscribed message and its expected arrival rate in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageSubscription {
    pub name: &'static str,
    pub frequency_hz: u32,
}

fn sub(name: &'static str, frequency_hz: u32) -> MessageSubscription {
    MessageSubscription { name, frequency_hz }
}

/// Subscriptions per logical bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusSubscriptions {
    pub powertrain: Vec<MessageSubscription>,
    pub camera: Vec<MessageSubscription>,
}

/// Build the codec contract for a derived capability record.
pub fn subscriptions(params: &CarParams) -> BusSubscriptions {
    if params.is_canfd() {
        canfd_subscriptions(params)
    } else {
        classic_subscriptions(params)
    }
}

fn classic_subscriptions(params: &CarParams) -> BusSubscriptions {
    let routes = ClassicRoutes::from_params(params);
    let mut pt = vec![
        sub("MDPS12", 50),
        sub("TCS11", 100),
        sub("TCS13", 50),
        sub("TCS15", 10),
        sub("CLU11", 50),
        sub("CLU15", 5),
        sub("ESP12", 100),
        sub("CGW1", 10),
        sub("CGW2", 5),
        sub("CGW4", 5),
        sub("WHL_SPD11", 50),
        sub("SAS11", 100),
        sub("TPMS11", 0),
    ];

    if !params.longitudinal_enabled {
        pt.push(sub("SCC11", 50));
        pt.push(sub("SCC12", 50));
        if params.has_flag(PlatformFlags::USE_FCA) {
            pt.push(sub("FCA11", 50));
        }
    }

    if params.enable_bsm {
        pt.push(sub("LCA11", 50));
    }

    match routes.gas {
        GasRoute::Scaled { message, .. } => {
            let rate = if message == "FCEV_ACCELERATOR" { 100 } else { 50 };
            pt.push(sub(message, rate));
        }
        GasRoute::Ice => {
            pt.push(sub("EMS12", 100));
            pt.push(sub("EMS16", 100));
        }
    }

    match routes.gear.0 {
        "ELECT_GEAR" => pt.push(sub("ELECT_GEAR", 20)),
        "EMS20" => pt.push(sub("EMS20", 100)),
        // cluster gears ride along in CLU15, already subscribed
        "CLU15" => {}
        "TCU12" => pt.push(sub("TCU12", 100)),
        _ => pt.push(sub("LVR12", 100)),
    }

    if params.has_flag(PlatformFlags::HAS_LDA_BUTTON) {
        pt.push(sub("BCM_PO_11", 50));
    }
    if params.has_feature(FeatureFlags::AUTOHOLD) {
        pt.push(sub("ESP11", 50));
    }
    if params.has_feature(FeatureFlags::NAVI) {
        pt.push(sub("Navi_HU", 5));
    }

    let mut camera = vec![sub("LKAS11", 100)];
    if params.longitudinal_enabled && params.scc_bus == SccBus::Camera {
        camera.push(sub("SCC11", 50));
        camera.push(sub("SCC12", 50));
        if params.has_feature(FeatureFlags::SCC13) {
            camera.push(sub("SCC13", 50));
        }
        if params.has_feature(FeatureFlags::SCC14) {
            camera.push(sub("SCC14", 50));
        }
        if params.has_flag(PlatformFlags::USE_FCA) {
            camera.push(sub("FCA11", 50));
        }
    }

    BusSubscriptions {
        powertrain: pt,
        camera,
    }
}

fn canfd_subscriptions(params: &CarParams) -> BusSubscriptions {
    let routes = CanFdRoutes::from_params(params);
    let mut pt = vec![
        sub("WHEEL_SPEEDS", 100),
        sub("STEERING_SENSORS", 100),
        sub("MDPS", 100),
        sub("TCS", 50),
        sub("CRUISE_BUTTONS_ALT", 50),
        sub("BLINKERS", 4),
        sub("DOORS_SEATBELTS", 4),
        sub("BRAKE", 0),
        sub("TPMS", 0),
        sub("ESP_STATUS", 0),
    ];

    if params.has_flag(PlatformFlags::EV) {
        pt.push(sub("ACCELERATOR", 100));
        pt.push(sub("MANUAL_SPEED_LIMIT_ASSIST", 10));
    } else {
        pt.push(sub(routes.gear_msg, 100));
        pt.push(sub(routes.accel_msg, 100));
    }

    if !params.has_flag(PlatformFlags::CANFD_ALT_BUTTONS) {
        pt.push(sub("CRUISE_BUTTONS", 50));
    }

    if params.enable_bsm {
        pt.push(sub("BLINDSPOTS_REAR_CORNERS", 20));
    }

    if !params.has_flag(PlatformFlags::CANFD_CAMERA_SCC) && !params.longitudinal_enabled {
        pt.push(sub("SCC_CONTROL", 50));
    }

    let mut camera = Vec::new();
    if params.has_flag(PlatformFlags::CANFD_LKA_STEERING) {
        camera.push(sub(routes.lfa_block_msg, 20));
    } else if params.has_flag(PlatformFlags::CANFD_CAMERA_SCC) {
        camera.push(sub("SCC_CONTROL", 50));
    }

    BusSubscriptions {
        powertrain: pt,
        camera,
    }
}
