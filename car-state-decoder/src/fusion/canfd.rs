//! Per-cycle decode for the CAN-FD dialect

use super::routing::CanFdRoutes;
use super::{CarStateFusion, STEER_FAULT_FRAMES};
use crate::conversions::{KPH_TO_MS, MPH_TO_MS, STANDSTILL_THRESHOLD};
use crate::cruise::{ButtonContext, CruiseStateOverride};
use crate::flags::{FeatureFlags, PlatformFlags};
use crate::source::SignalSource;
use crate::types::{Bus, Result, VehicleState};

impl CarStateFusion {
    pub(super) fn update_canfd(
        &mut self,
        routes: CanFdRoutes,
        source: &dyn SignalSource,
        cruise_override: Option<&mut dyn CruiseStateOverride>,
    ) -> Result<VehicleState> {
        let pt = Bus::Powertrain;

        let mut ret = VehicleState::default();

        // the distance-unit signal lives in the alternate button message on
        // every variant, even those using the primary button layout
        self.is_metric = source.get(pt, "CRUISE_BUTTONS_ALT", "DISTANCE_UNIT")? != 1.0;
        let speed_factor = if self.is_metric { KPH_TO_MS } else { MPH_TO_MS };

        match routes.gas_divisor {
            Some(divisor) => {
                ret.gas = source.get(pt, routes.accel_msg, "ACCELERATOR_PEDAL")? / divisor;
                ret.gas_pressed = ret.gas > 1e-5;
            }
            None => {
                ret.gas_pressed =
                    source.get(pt, routes.accel_msg, "ACCELERATOR_PEDAL_PRESSED")? != 0.0;
            }
        }

        ret.brake_pressed = source.get(pt, "TCS", "DriverBraking")? == 1.0;

        ret.door_open = source.get(pt, "DOORS_SEATBELTS", "DRIVER_DOOR")? == 1.0;
        ret.seatbelt_unlatched = source.get(pt, "DOORS_SEATBELTS", "DRIVER_SEATBELT")? == 0.0;

        let gear_raw = source.get(pt, routes.gear_msg, "GEAR")?;
        ret.gear = self.parse_gear(source, pt, routes.gear_msg, "GEAR", gear_raw);

        ret.wheel_speeds = self.wheel_speeds(
            source.get(pt, "WHEEL_SPEEDS", "WHL_SpdFLVal")?,
            source.get(pt, "WHEEL_SPEEDS", "WHL_SpdFRVal")?,
            source.get(pt, "WHEEL_SPEEDS", "WHL_SpdRLVal")?,
            source.get(pt, "WHEEL_SPEEDS", "WHL_SpdRRVal")?,
        );
        ret.v_ego_raw = ret.wheel_speeds.mean();
        let (v_ego, a_ego) = self.v_ego_filter.update(ret.v_ego_raw);
        ret.v_ego = v_ego;
        ret.a_ego = a_ego;
        ret.standstill = ret.wheel_speeds.fl <= STANDSTILL_THRESHOLD
            && ret.wheel_speeds.fr <= STANDSTILL_THRESHOLD
            && ret.wheel_speeds.rl <= STANDSTILL_THRESHOLD
            && ret.wheel_speeds.rr <= STANDSTILL_THRESHOLD;

        ret.steering_rate_deg = source.get(pt, "STEERING_SENSORS", "STEERING_RATE")?;
        ret.steering_angle_deg = source.get(pt, "STEERING_SENSORS", "STEERING_ANGLE")?;
        ret.steering_torque = source.get(pt, "MDPS", "STEERING_COL_TORQUE")?;
        ret.steering_torque_eps = source.get(pt, "MDPS", "STEERING_OUT_TORQUE")?;
        ret.steering_pressed = self
            .steering_pressed
            .update(ret.steering_torque.abs() > self.params.steer_threshold);

        let left_lamp = source.get(pt, "BLINKERS", routes.blinker_left)? != 0.0;
        let right_lamp = source.get(pt, "BLINKERS", routes.blinker_right)? != 0.0;
        ret.left_blinker = self.left_lamp.update(left_lamp);
        ret.right_blinker = self.right_lamp.update(right_lamp);

        if self.params.enable_bsm {
            ret.left_blindspot =
                source.get(pt, "BLINDSPOTS_REAR_CORNERS", "FL_INDICATOR")? != 0.0;
            ret.right_blindspot =
                source.get(pt, "BLINDSPOTS_REAR_CORNERS", "FR_INDICATOR")? != 0.0;
        }

        // cruise state
        if self.params.longitudinal_enabled {
            // informational only, engagement is tracked from the buttons
            ret.cruise.enabled = source.get(pt, "TCS", "ACC_REQ")? == 1.0;
            ret.cruise.standstill = false;
        } else {
            let info_bus = routes.cruise_info_bus;
            let acc_mode = source.get(info_bus, "SCC_CONTROL", "ACCMode")?;
            ret.cruise.enabled = acc_mode == 1.0 || acc_mode == 2.0;
            ret.cruise.standstill =
                source.get(info_bus, "SCC_CONTROL", "CRUISE_STANDSTILL")? == 1.0;
            ret.cruise.speed = source.get(info_bus, "SCC_CONTROL", "VSetDis")? * speed_factor;
            self.cruise_info = Some(source.snapshot(info_bus, "SCC_CONTROL")?);
        }

        // EV platforms replace non-adaptive cruise with a manual speed
        // limiter that brakes but ignores positive acceleration commands
        if self.params.has_flag(PlatformFlags::EV) {
            ret.cruise.non_adaptive =
                source.get(pt, "MANUAL_SPEED_LIMIT_ASSIST", "MSLA_ENABLED")? == 1.0;
        }

        let prev_cruise = self.cruise_buttons.last();
        let prev_main = self.main_buttons.last();
        let prev_lane_assist = self.lane_assist_button.last();
        self.cruise_buttons.extend(
            source
                .get_all(pt, routes.buttons_msg, "CRUISE_BUTTONS")?
                .into_iter()
                .map(|v| v as i64),
        );
        self.main_buttons.extend(
            source
                .get_all(pt, routes.buttons_msg, "ADAPTIVE_CRUISE_MAIN_BTN")?
                .into_iter()
                .map(|v| v as i64),
        );
        self.lane_assist_button
            .push(source.get(pt, routes.buttons_msg, "LDA_BTN")? as i64);
        self.buttons_counter = source.get(pt, routes.buttons_msg, "COUNTER")? as i64;
        // 0 ACC control enabled, 1-3 disabled
        ret.acc_faulted = source.get(pt, "TCS", "ACCEnable")? != 0.0;

        if self.params.has_flag(PlatformFlags::CANFD_LKA_STEERING) {
            self.lfa_block_msg = Some(source.snapshot(Bus::Camera, routes.lfa_block_msg)?);
        }

        ret.button_events = self.collect_button_events(prev_cruise, prev_main, prev_lane_assist);
        ret.block_pcm_enable = !self.recent_button_interaction();

        // these platforms have no dedicated cruise-availability signal; the
        // lane-assist button toggles a local latch instead
        if prev_lane_assist != 1 && self.lane_assist_button.last() == 1 {
            self.lfa_enabled = !self.lfa_enabled;
        }
        ret.cruise.available = self.lfa_enabled;

        ret.low_speed_alert = self.update_low_speed_alert(ret.v_ego);

        let steer_fault_raw = source.get(pt, "MDPS", "LKA_FAULT")? != 0.0;
        ret.steer_fault_temporary = self
            .steer_fault_counter
            .update(!ret.standstill && steer_fault_raw)
            >= STEER_FAULT_FRAMES;

        let auto_hold = source.get(pt, "ESP_STATUS", "AUTO_HOLD")?;
        ret.brake_lights = ret.brake_pressed
            || source.get(pt, "TCS", "BRAKE_LIGHT")? != 0.0
            || source.get(pt, "BRAKE", "BRAKE_LIGHT")? != 0.0
            || auto_hold != 0.0;

        if self.params.has_feature(FeatureFlags::TPMS) {
            ret.tpms = Some(self.read_tpms(source, pt, "TPMS")?);
        }

        ret.auto_hold = Some(if ret.cruise.enabled { 0.0 } else { auto_hold });
        ret.brake_hold_active =
            ret.auto_hold == Some(1.0) || (ret.cruise.enabled && ret.cruise.standstill);

        self.canfd_buttons = Some(source.snapshot(pt, routes.buttons_msg)?);

        if self.params.longitudinal_enabled {
            if let Some(manager) = cruise_override {
                let context = ButtonContext {
                    cruise_buttons: &self.cruise_buttons,
                    main_buttons: &self.main_buttons,
                };
                manager.amend(&mut ret, &context, None);
            }
        }

        Ok(ret)
    }
}
