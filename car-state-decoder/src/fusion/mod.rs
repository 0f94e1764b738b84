//! Vehicle state fusion
//!
//! One [`CarStateFusion`] instance lives for one drive. Each control cycle
//! it reads the latest signal snapshot from the external codec, advances
//! its filters and counters, and emits one immutable
//! [`VehicleState`](crate::types::VehicleState). The capability record it
//! was constructed with is never mutated; everything that survives across
//! cycles is owned exclusively by this struct.

mod canfd;
mod classic;
pub mod messages;
mod routing;

use crate::buttons::{
    create_button_events, ButtonRing, CRUISE_BUTTON_MAPPING, ENABLE_BUTTONS, LANE_ASSIST_MAPPING,
    MAIN_BUTTON_MAPPING,
};
use crate::conversions::{KPH_TO_MS, TPMS_UNIT_FACTOR};
use crate::cruise::CruiseStateOverride;
use crate::filters::{ConsecutiveCounter, HysteresisAlert, LampTimer, PressedCounter, SpeedFilter};
use crate::params::CarParams;
use crate::source::SignalSource;
use crate::types::{
    Bus, ButtonEvent, GearShifter, MessageSnapshot, Result, TpmsState, VehicleState, WheelSpeeds,
};
use routing::Routes;

/// The dash cluster updates slower than its source signal on some
/// variants; sample once every this many cycles to match what the driver
/// sees.
pub const CLUSTER_SAMPLE_RATE: u32 = 20;

/// Frames a momentary blinker lamp keeps the blinker output asserted.
const BLINKER_HOLD_FRAMES: u32 = 50;

/// Debounce depth for the driver-torque override signal.
const STEERING_PRESSED_MIN_COUNT: i32 = 5;

/// Consecutive moving-with-fault cycles before the EPS fault is believed.
pub const STEER_FAULT_FRAMES: u32 = 50;

/// Consecutive unavailable cycles before cruise is reported unavailable.
pub const CRUISE_UNAVAIL_FRAMES: u32 = 100;

/// Platforms that cut steering above this speed get the low-speed alert
/// latch; below it no alert is generated at all.
const LOW_SPEED_ALERT_MIN: f64 = 10.0;

/// Per-drive fusion state machine.
pub struct CarStateFusion {
    params: CarParams,
    routes: Routes,

    v_ego_filter: SpeedFilter,
    v_cluster_filter: SpeedFilter,
    cluster_speed: f64,
    cluster_speed_counter: u32,

    cruise_buttons: ButtonRing,
    main_buttons: ButtonRing,
    lane_assist_button: ButtonRing,

    steering_pressed: PressedCounter,
    left_lamp: LampTimer,
    right_lamp: LampTimer,
    steer_fault_counter: ConsecutiveCounter,
    cruise_unavail_counter: ConsecutiveCounter,
    low_speed_alert: Option<HysteresisAlert>,

    lfa_enabled: bool,
    is_metric: bool,
    buttons_counter: i64,
    steer_state: f64,

    // raw frame copies retained for the command encoder
    lkas11: Option<MessageSnapshot>,
    clu11: Option<MessageSnapshot>,
    mdps12: Option<MessageSnapshot>,
    scc11: Option<MessageSnapshot>,
    scc12: Option<MessageSnapshot>,
    scc13: Option<MessageSnapshot>,
    scc14: Option<MessageSnapshot>,
    cruise_info: Option<MessageSnapshot>,
    canfd_buttons: Option<MessageSnapshot>,
    lfa_block_msg: Option<MessageSnapshot>,
}

impl CarStateFusion {
    /// Build a fusion instance for one drive. All buffers and counters are
    /// allocated here; the per-cycle path allocates nothing but the output
    /// record.
    pub fn new(params: CarParams) -> Self {
        let routes = Routes::from_params(&params);
        let low_speed_alert = (params.min_steer_speed > LOW_SPEED_ALERT_MIN).then(|| {
            HysteresisAlert::new(params.min_steer_speed + 2.0, params.min_steer_speed + 4.0)
        });
        Self {
            params,
            routes,
            v_ego_filter: SpeedFilter::new(),
            v_cluster_filter: SpeedFilter::new(),
            cluster_speed: 0.0,
            // start at the rollover so the very first cycle samples
            cluster_speed_counter: CLUSTER_SAMPLE_RATE,
            cruise_buttons: ButtonRing::new(),
            main_buttons: ButtonRing::new(),
            lane_assist_button: ButtonRing::new(),
            steering_pressed: PressedCounter::new(STEERING_PRESSED_MIN_COUNT),
            left_lamp: LampTimer::new(BLINKER_HOLD_FRAMES),
            right_lamp: LampTimer::new(BLINKER_HOLD_FRAMES),
            steer_fault_counter: ConsecutiveCounter::new(),
            cruise_unavail_counter: ConsecutiveCounter::new(),
            low_speed_alert,
            lfa_enabled: false,
            is_metric: false,
            buttons_counter: 0,
            steer_state: 0.0,
            lkas11: None,
            clu11: None,
            mdps12: None,
            scc11: None,
            scc12: None,
            scc13: None,
            scc14: None,
            cruise_info: None,
            canfd_buttons: None,
            lfa_block_msg: None,
        }
    }

    /// Run one fusion cycle. A missing subscribed message fails the whole
    /// cycle; the caller decides whether to retry next tick.
    pub fn update(
        &mut self,
        source: &dyn SignalSource,
        cruise_override: Option<&mut dyn CruiseStateOverride>,
    ) -> Result<VehicleState> {
        match self.routes {
            Routes::Classic(routes) => self.update_classic(routes, source, cruise_override),
            Routes::CanFd(routes) => self.update_canfd(routes, source, cruise_override),
        }
    }

    pub fn params(&self) -> &CarParams {
        &self.params
    }

    /// True when the driver touched an engagement-capable button within the
    /// last 8 samples. On some model years the cancel code doubles as a
    /// pause/resume toggle, so this window is what separates a user
    /// engagement from a computer-issued one.
    pub fn recent_button_interaction(&self) -> bool {
        self.cruise_buttons.any(|code| ENABLE_BUTTONS.contains(&code))
            || self.main_buttons.any(|code| code != 0)
    }

    fn wheel_speeds(&self, fl: f64, fr: f64, rl: f64, rr: f64) -> WheelSpeeds {
        let factor = KPH_TO_MS * self.params.wheel_speed_factor;
        WheelSpeeds {
            fl: fl * factor,
            fr: fr * factor,
            rl: rl * factor,
            rr: rr * factor,
        }
    }

    fn parse_gear(
        &self,
        source: &dyn SignalSource,
        bus: Bus,
        message: &str,
        signal: &str,
        raw: f64,
    ) -> GearShifter {
        let label = source.value_label(bus, message, signal, raw as i64);
        let gear = GearShifter::from_label(label.as_deref());
        if gear == GearShifter::Unknown {
            log::debug!("unmapped gear code {} in {}.{}", raw, message, signal);
        }
        gear
    }

    fn collect_button_events(
        &self,
        prev_cruise: i64,
        prev_main: i64,
        prev_lane_assist: i64,
    ) -> Vec<ButtonEvent> {
        let mut events =
            create_button_events(self.cruise_buttons.last(), prev_cruise, CRUISE_BUTTON_MAPPING);
        events.extend(create_button_events(
            self.main_buttons.last(),
            prev_main,
            MAIN_BUTTON_MAPPING,
        ));
        events.extend(create_button_events(
            self.lane_assist_button.last(),
            prev_lane_assist,
            LANE_ASSIST_MAPPING,
        ));
        events
    }

    fn update_low_speed_alert(&mut self, v_ego: f64) -> bool {
        match self.low_speed_alert.as_mut() {
            Some(alert) => alert.update(v_ego),
            None => false,
        }
    }

    fn read_tpms(&self, source: &dyn SignalSource, bus: Bus, message: &str) -> Result<TpmsState> {
        let unit_code = source.get(bus, message, "UNIT")?;
        // non-positive unit codes mean the pressures are already scaled
        let unit = if unit_code as i64 > 0 {
            unit_code * TPMS_UNIT_FACTOR
        } else {
            1.0
        };
        Ok(TpmsState {
            fl: unit * source.get(bus, message, "PRESSURE_FL")?,
            fr: unit * source.get(bus, message, "PRESSURE_FR")?,
            rl: unit * source.get(bus, message, "PRESSURE_RL")?,
            rr: unit * source.get(bus, message, "PRESSURE_RR")?,
        })
    }

    // ---- read-only state for the command encoder ----

    /// Most recent lateral-command frame seen from the camera (classic).
    pub fn lkas11(&self) -> Option<&MessageSnapshot> {
        self.lkas11.as_ref()
    }

    /// Most recent cluster frame, alive-counter included (classic).
    pub fn clu11(&self) -> Option<&MessageSnapshot> {
        self.clu11.as_ref()
    }

    pub fn mdps12(&self) -> Option<&MessageSnapshot> {
        self.mdps12.as_ref()
    }

    pub fn scc11(&self) -> Option<&MessageSnapshot> {
        self.scc11.as_ref()
    }

    pub fn scc12(&self) -> Option<&MessageSnapshot> {
        self.scc12.as_ref()
    }

    pub fn scc13(&self) -> Option<&MessageSnapshot> {
        self.scc13.as_ref()
    }

    pub fn scc14(&self) -> Option<&MessageSnapshot> {
        self.scc14.as_ref()
    }

    /// Most recent cruise-info frame (CAN-FD).
    pub fn cruise_info(&self) -> Option<&MessageSnapshot> {
        self.cruise_info.as_ref()
    }

    /// Most recent cruise-button frame, counter included (CAN-FD).
    pub fn canfd_buttons(&self) -> Option<&MessageSnapshot> {
        self.canfd_buttons.as_ref()
    }

    /// Most recent relay-block frame (CAN-FD LKA-steering).
    pub fn lfa_block_msg(&self) -> Option<&MessageSnapshot> {
        self.lfa_block_msg.as_ref()
    }

    /// Counter of the CAN-FD button message, for outbound frames.
    pub fn buttons_counter(&self) -> i64 {
        self.buttons_counter
    }

    /// EPS torque-override state bit (0 not active, 1 active).
    pub fn steer_state(&self) -> f64 {
        self.steer_state
    }

    /// Whether the dash is in metric mode, as read this cycle.
    pub fn is_metric(&self) -> bool {
        self.is_metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{derive_car_params, Fingerprint};
    use crate::params::{DeriveOptions, VariantProfile};

    #[test]
    fn test_low_speed_alert_only_for_high_cutoff_platforms() {
        let profile = VariantProfile {
            min_steer_speed: 5.0,
            ..VariantProfile::default()
        };
        let params = derive_car_params(
            &Fingerprint::new(),
            &[],
            &profile,
            &DeriveOptions::default(),
        );
        let mut fusion = CarStateFusion::new(params);
        assert!(!fusion.update_low_speed_alert(0.0));

        let profile = VariantProfile {
            min_steer_speed: 12.0,
            ..VariantProfile::default()
        };
        let params = derive_car_params(
            &Fingerprint::new(),
            &[],
            &profile,
            &DeriveOptions::default(),
        );
        let mut fusion = CarStateFusion::new(params);
        assert!(fusion.update_low_speed_alert(13.9));
        assert!(fusion.update_low_speed_alert(14.5)); // hysteresis band
        assert!(!fusion.update_low_speed_alert(16.1));
    }

    #[test]
    fn test_recent_button_interaction_window() {
        let profile = VariantProfile::default();
        let params = derive_car_params(
            &Fingerprint::new(),
            &[],
            &profile,
            &DeriveOptions::default(),
        );
        let mut fusion = CarStateFusion::new(params);
        assert!(!fusion.recent_button_interaction());

        fusion.cruise_buttons.push(crate::buttons::codes::CANCEL);
        assert!(fusion.recent_button_interaction());

        for _ in 0..8 {
            fusion.cruise_buttons.push(crate::buttons::codes::NONE);
        }
        assert!(!fusion.recent_button_interaction());

        fusion.main_buttons.push(1);
        assert!(fusion.recent_button_interaction());
    }
}
