//! Dialect routing tables
//!
//! The two wire dialects (and several sub-variants within each) expose the
//! same physical quantity under different message/signal names and
//! scalings. The concrete source for every logical quantity is resolved
//! once at fusion construction, so the per-cycle hot path never branches on
//! flags or dispatches on strings.

use crate::flags::PlatformFlags;
use crate::params::CarParams;
use crate::types::Bus;

/// Accelerator pedal source on the classic dialect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GasRoute {
    /// Pedal position as a fraction of a maximum raw code
    Scaled {
        message: &'static str,
        signal: &'static str,
        divisor: f64,
    },
    /// Combustion cars read percent position and a separate activity bit
    Ice,
}

/// Precomputed signal sources for the classic dialect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ClassicRoutes {
    /// Gear raw value (message, signal); also the value-table source
    pub gear: (&'static str, &'static str),
    pub gas: GasRoute,
    /// AEB source message and its command-active signal
    pub aeb: (&'static str, &'static str),
}

impl ClassicRoutes {
    pub fn from_params(params: &CarParams) -> Self {
        let flags = params.flags;

        let gear = if flags.intersects(PlatformFlags::HYBRID | PlatformFlags::EV) {
            ("ELECT_GEAR", "Elect_Gear_Shifter")
        } else if flags.contains(PlatformFlags::FUEL_CELL) {
            ("EMS20", "HYDROGEN_GEAR_SHIFTER")
        } else if flags.contains(PlatformFlags::CLUSTER_GEARS) {
            ("CLU15", "CF_Clu_Gear")
        } else if flags.contains(PlatformFlags::TCU_GEARS) {
            ("TCU12", "CUR_GR")
        } else {
            ("LVR12", "CF_Lvr_Gear")
        };

        let gas = if flags.contains(PlatformFlags::FUEL_CELL) {
            GasRoute::Scaled {
                message: "FCEV_ACCELERATOR",
                signal: "ACCELERATOR_PEDAL",
                divisor: 254.0,
            }
        } else if flags.contains(PlatformFlags::HYBRID) {
            GasRoute::Scaled {
                message: "E_EMS11",
                signal: "CR_Vcu_AccPedDep_Pos",
                divisor: 254.0,
            }
        } else if flags.contains(PlatformFlags::EV) {
            GasRoute::Scaled {
                message: "E_EMS11",
                signal: "Accel_Pedal_Pos",
                divisor: 254.0,
            }
        } else {
            GasRoute::Ice
        };

        let aeb = if flags.contains(PlatformFlags::USE_FCA) {
            ("FCA11", "FCA_CmdAct")
        } else {
            ("SCC12", "AEB_CmdAct")
        };

        Self { gear, gas, aeb }
    }
}

/// Precomputed signal sources for the CAN-FD dialect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CanFdRoutes {
    pub gear_msg: &'static str,
    pub accel_msg: &'static str,
    /// Raw-code divisor for electric drivetrains; `None` means only the
    /// pressed bit exists
    pub gas_divisor: Option<f64>,
    pub buttons_msg: &'static str,
    pub blinker_left: &'static str,
    pub blinker_right: &'static str,
    /// Relay-block message retained for the encoder on LKA-steering cars
    pub lfa_block_msg: &'static str,
    /// Logical bus the cruise-info message arrives on
    pub cruise_info_bus: Bus,
}

impl CanFdRoutes {
    pub fn from_params(params: &CarParams) -> Self {
        let flags = params.flags;

        let gear_msg = if flags.contains(PlatformFlags::EV) {
            "ACCELERATOR"
        } else if flags.contains(PlatformFlags::CANFD_ALT_GEARS) {
            "GEAR_ALT"
        } else if flags.contains(PlatformFlags::CANFD_ALT_GEARS_2) {
            "GEAR_ALT_2"
        } else {
            "GEAR_SHIFTER"
        };

        let accel_msg = if flags.contains(PlatformFlags::EV) {
            "ACCELERATOR"
        } else if flags.contains(PlatformFlags::HYBRID) {
            "ACCELERATOR_ALT"
        } else {
            "ACCELERATOR_BRAKE_ALT"
        };

        let gas_divisor = if flags.contains(PlatformFlags::EV) {
            Some(255.0)
        } else if flags.contains(PlatformFlags::HYBRID) {
            Some(1023.0)
        } else {
            None
        };

        let buttons_msg = if flags.contains(PlatformFlags::CANFD_ALT_BUTTONS) {
            "CRUISE_BUTTONS_ALT"
        } else {
            "CRUISE_BUTTONS"
        };

        let (blinker_left, blinker_right) = if params.alt_blinker_lamps {
            ("LEFT_LAMP_ALT", "RIGHT_LAMP_ALT")
        } else {
            ("LEFT_LAMP", "RIGHT_LAMP")
        };

        let lfa_block_msg = if flags.contains(PlatformFlags::CANFD_LKA_STEERING_ALT) {
            "CAM_0x362"
        } else {
            "CAM_0x2a4"
        };

        let cruise_info_bus = if flags.contains(PlatformFlags::CANFD_CAMERA_SCC) {
            Bus::Camera
        } else {
            Bus::Powertrain
        };

        Self {
            gear_msg,
            accel_msg,
            gas_divisor,
            buttons_msg,
            blinker_left,
            blinker_right,
            lfa_block_msg,
            cruise_info_bus,
        }
    }
}

/// Routing for whichever dialect this instance decodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Routes {
    Classic(ClassicRoutes),
    CanFd(CanFdRoutes),
}

impl Routes {
    pub fn from_params(params: &CarParams) -> Self {
        if params.is_canfd() {
            Routes::CanFd(CanFdRoutes::from_params(params))
        } else {
            Routes::Classic(ClassicRoutes::from_params(params))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{derive_car_params, Fingerprint};
    use crate::params::{DeriveOptions, VariantProfile};

    fn params_with(base_flags: PlatformFlags) -> CarParams {
        let profile = VariantProfile {
            base_flags,
            ..VariantProfile::default()
        };
        derive_car_params(
            &Fingerprint::new(),
            &[],
            &profile,
            &DeriveOptions::default(),
        )
    }

    #[test]
    fn test_classic_gear_route_cascade() {
        assert_eq!(
            ClassicRoutes::from_params(&params_with(PlatformFlags::empty())).gear,
            ("LVR12", "CF_Lvr_Gear")
        );
        assert_eq!(
            ClassicRoutes::from_params(&params_with(PlatformFlags::EV)).gear,
            ("ELECT_GEAR", "Elect_Gear_Shifter")
        );
        assert_eq!(
            ClassicRoutes::from_params(&params_with(PlatformFlags::FUEL_CELL)).gear,
            ("EMS20", "HYDROGEN_GEAR_SHIFTER")
        );
        assert_eq!(
            ClassicRoutes::from_params(&params_with(PlatformFlags::CLUSTER_GEARS)).gear,
            ("CLU15", "CF_Clu_Gear")
        );
        assert_eq!(
            ClassicRoutes::from_params(&params_with(PlatformFlags::TCU_GEARS)).gear,
            ("TCU12", "CUR_GR")
        );
    }

    #[test]
    fn test_classic_gas_route_per_drivetrain() {
        let ice = ClassicRoutes::from_params(&params_with(PlatformFlags::empty()));
        assert_eq!(ice.gas, GasRoute::Ice);

        let hybrid = ClassicRoutes::from_params(&params_with(PlatformFlags::HYBRID));
        assert_eq!(
            hybrid.gas,
            GasRoute::Scaled {
                message: "E_EMS11",
                signal: "CR_Vcu_AccPedDep_Pos",
                divisor: 254.0
            }
        );
    }

    #[test]
    fn test_canfd_routes_for_ev() {
        // EV without the primary gear message resolves gear to the
        // accelerator message regardless of the gear-layout flags
        let params = params_with(PlatformFlags::CANFD | PlatformFlags::EV);
        let routes = CanFdRoutes::from_params(&params);
        assert_eq!(routes.gear_msg, "ACCELERATOR");
        assert_eq!(routes.accel_msg, "ACCELERATOR");
        assert_eq!(routes.gas_divisor, Some(255.0));
    }

    #[test]
    fn test_canfd_alt_buttons_message() {
        // empty fingerprint: the buttons marker is absent, so the alternate
        // layout is selected
        let params = params_with(PlatformFlags::CANFD);
        let routes = CanFdRoutes::from_params(&params);
        assert_eq!(routes.buttons_msg, "CRUISE_BUTTONS_ALT");
    }
}
