//! Per-cycle decode for the classic CAN dialect

use super::routing::{ClassicRoutes, GasRoute};
use super::{CarStateFusion, CLUSTER_SAMPLE_RATE, CRUISE_UNAVAIL_FRAMES, STEER_FAULT_FRAMES};
use crate::conversions::{KPH_TO_MPH, KPH_TO_MS, MPH_TO_MS, STANDSTILL_THRESHOLD};
use crate::cruise::{ButtonContext, CruiseStateOverride};
use crate::flags::{FeatureFlags, PlatformFlags};
use crate::params::SccBus;
use crate::source::SignalSource;
use crate::types::{Bus, Result, VehicleState};

impl CarStateFusion {
    pub(super) fn update_classic(
        &mut self,
        routes: ClassicRoutes,
        source: &dyn SignalSource,
        cruise_override: Option<&mut dyn CruiseStateOverride>,
    ) -> Result<VehicleState> {
        let pt = Bus::Powertrain;
        let cruise_bus = match self.params.scc_bus {
            SccBus::Camera => Bus::Camera,
            SccBus::Primary => Bus::Powertrain,
        };

        let mut ret = VehicleState::default();

        self.is_metric = source.get(pt, "CLU11", "CF_Clu_SPEED_UNIT")? == 0.0;
        let speed_conv = if self.is_metric { KPH_TO_MS } else { MPH_TO_MS };

        ret.door_open = source.get(pt, "CGW1", "CF_Gway_DrvDrSw")? != 0.0
            || source.get(pt, "CGW1", "CF_Gway_AstDrSw")? != 0.0
            || source.get(pt, "CGW2", "CF_Gway_RLDrSw")? != 0.0
            || source.get(pt, "CGW2", "CF_Gway_RRDrSw")? != 0.0;

        ret.seatbelt_unlatched = source.get(pt, "CGW1", "CF_Gway_DrvSeatBeltSw")? == 0.0;

        ret.wheel_speeds = self.wheel_speeds(
            source.get(pt, "WHL_SPD11", "WHL_SPD_FL")?,
            source.get(pt, "WHL_SPD11", "WHL_SPD_FR")?,
            source.get(pt, "WHL_SPD11", "WHL_SPD_RL")?,
            source.get(pt, "WHL_SPD11", "WHL_SPD_RR")?,
        );

        // the cluster carries a separate fractional speed; only fractions
        // below one half are real (dash quirk, kept as observed on the car)
        let mut clu_speed = source.get(pt, "CLU11", "CF_Clu_Vanz")?;
        let decimal = source.get(pt, "CLU11", "CF_Clu_VanzDecimal")?;
        if 0.0 < decimal && decimal < 0.5 {
            clu_speed += decimal;
        }
        let (v_ego_cluster, _) = self.v_cluster_filter.update(clu_speed * speed_conv);
        ret.v_ego_cluster = v_ego_cluster;

        ret.v_ego_raw = ret.wheel_speeds.mean();
        let (v_ego, a_ego) = self.v_ego_filter.update(ret.v_ego_raw);
        ret.v_ego = v_ego;
        ret.a_ego = a_ego;
        ret.standstill = ret.wheel_speeds.fl <= STANDSTILL_THRESHOLD
            && ret.wheel_speeds.rr <= STANDSTILL_THRESHOLD;

        ret.v_cluster_ratio = if ret.v_ego_cluster > 3.0 && ret.v_ego > 3.0 {
            ret.v_ego / ret.v_ego_cluster
        } else {
            1.0
        };

        // the raw cluster signal can oscillate faster than the dash
        // repaints; sample at the dash rate and hold in between
        self.cluster_speed_counter += 1;
        if self.cluster_speed_counter > CLUSTER_SAMPLE_RATE {
            self.cluster_speed = source.get(pt, "CLU15", "CF_Clu_VehicleSpeed")?;
            self.cluster_speed_counter = 0;

            // mimic how the dash converts to imperial; one platform reports
            // the signal imperial-native and is exempt
            if !self.is_metric && !self.params.cluster_speed_imperial_native {
                self.cluster_speed = (self.cluster_speed * KPH_TO_MPH + KPH_TO_MPH).floor();
            }
        }
        ret.cluster_display_speed = self.cluster_speed;

        ret.steering_angle_deg = source.get(pt, "SAS11", "SAS_Angle")?;
        ret.steering_rate_deg = source.get(pt, "SAS11", "SAS_Speed")?;
        ret.yaw_rate = source.get(pt, "ESP12", "YAW_RATE")?;
        let left_lamp = source.get(pt, "CGW1", "CF_Gway_TurnSigLh")? != 0.0;
        let right_lamp = source.get(pt, "CGW1", "CF_Gway_TurnSigRh")? != 0.0;
        ret.left_blinker = self.left_lamp.update(left_lamp);
        ret.right_blinker = self.right_lamp.update(right_lamp);
        ret.steering_torque = source.get(pt, "MDPS12", "CR_Mdps_StrColTq")?;
        ret.steering_torque_eps = source.get(pt, "MDPS12", "CR_Mdps_OutTq")?;
        ret.steering_pressed = self
            .steering_pressed
            .update(ret.steering_torque.abs() > self.params.steer_threshold);

        // cruise state: with our own longitudinal control on the primary
        // bus these fields are informational, engagement is tracked from
        // the buttons
        if self.params.longitudinal_enabled && self.params.scc_bus == SccBus::Primary {
            ret.cruise.available = source.get(pt, "TCS13", "ACCEnable")? == 0.0;
            ret.cruise.enabled = source.get(pt, "TCS13", "ACC_REQ")? == 1.0;
            ret.cruise.standstill = false;
            ret.cruise.non_adaptive = false;
        } else {
            ret.cruise.available = source.get(cruise_bus, "SCC11", "MainMode_ACC")? == 1.0;
            ret.cruise.enabled = source.get(cruise_bus, "SCC12", "ACCMode")? != 0.0;
            let info_display = source.get(cruise_bus, "SCC11", "SCCInfoDisplay")?;
            ret.cruise.standstill = info_display == 4.0;
            // value 2 shows plain "Cruise Control" on the dash
            ret.cruise.non_adaptive = info_display == 2.0;
            ret.cruise.speed = source.get(cruise_bus, "SCC11", "VSetDis")? * speed_conv;
            ret.cruise.lead_distance_bars = source.get(cruise_bus, "SCC11", "TauGapSet")?;
        }

        // TODO: find a brake pressure signal; TCS13 only exposes the pedal switch
        ret.brake = 0.0;
        // 2 includes regen braking by the driver on HEV/EV
        ret.brake_pressed = source.get(pt, "TCS13", "DriverOverride")? == 2.0;
        // 0 OFF, 1 ERROR, 2 ACTIVE, 3 READY
        ret.brake_hold_active = source.get(pt, "TCS15", "AVH_LAMP")? == 2.0;
        ret.parking_brake = source.get(pt, "TCS13", "PBRAKE_ACT")? == 1.0;
        ret.esp_disabled = source.get(pt, "TCS11", "TCS_PAS")? == 1.0;
        ret.esp_active = source.get(pt, "TCS11", "ABS_ACT")? == 1.0;
        // 0 ACC control enabled, 1-3 disabled
        ret.acc_faulted = source.get(pt, "TCS13", "ACCEnable")? != 0.0;

        match routes.gas {
            GasRoute::Scaled {
                message,
                signal,
                divisor,
            } => {
                ret.gas = source.get(pt, message, signal)? / divisor;
                ret.gas_pressed = ret.gas > 0.0;
            }
            GasRoute::Ice => {
                ret.gas = source.get(pt, "EMS12", "PV_AV_CAN")? / 100.0;
                ret.gas_pressed = source.get(pt, "EMS16", "CF_Ems_AclAct")? != 0.0;
            }
        }

        let gear_raw = source.get(pt, routes.gear.0, routes.gear.1)?;
        ret.gear = self.parse_gear(source, pt, routes.gear.0, routes.gear.1, gear_raw);

        // stock FCW/AEB passthrough; sometimes only the cruise radar raises
        // the forward-collision warning
        if !self.params.longitudinal_enabled || self.params.scc_bus == SccBus::Camera {
            let (aeb_msg, aeb_cmd_signal) = routes.aeb;
            let aeb_warning = source.get(cruise_bus, aeb_msg, "CF_VSM_Warn")? != 0.0;
            let scc_warning = source.get(cruise_bus, "SCC12", "TakeOverReq")? == 1.0;
            let aeb_braking = source.get(cruise_bus, aeb_msg, "CF_VSM_DecCmdAct")? != 0.0
                || source.get(cruise_bus, aeb_msg, aeb_cmd_signal)? != 0.0;
            ret.stock_fcw = (aeb_warning || scc_warning) && !aeb_braking;
            ret.stock_aeb = aeb_warning && aeb_braking;
        }

        if self.params.enable_bsm {
            ret.left_blindspot = source.get(pt, "LCA11", "CF_Lca_IndLeft")? != 0.0;
            ret.right_blindspot = source.get(pt, "LCA11", "CF_Lca_IndRight")? != 0.0;
        }

        // retain the raw control frames for the command encoder
        self.lkas11 = Some(source.snapshot(Bus::Camera, "LKAS11")?);
        self.clu11 = Some(source.snapshot(pt, "CLU11")?);
        // 0 NOT ACTIVE, 1 ACTIVE
        self.steer_state = source.get(pt, "MDPS12", "CF_Mdps_ToiActive")?;

        let prev_cruise = self.cruise_buttons.last();
        let prev_main = self.main_buttons.last();
        let prev_lane_assist = self.lane_assist_button.last();
        self.cruise_buttons.extend(
            source
                .get_all(pt, "CLU11", "CF_Clu_CruiseSwState")?
                .into_iter()
                .map(|v| v as i64),
        );
        self.main_buttons.extend(
            source
                .get_all(pt, "CLU11", "CF_Clu_CruiseSwMain")?
                .into_iter()
                .map(|v| v as i64),
        );
        if self.params.has_flag(PlatformFlags::HAS_LDA_BUTTON) {
            self.lane_assist_button
                .push(source.get(pt, "BCM_PO_11", "LDA_BTN")? as i64);
        }

        ret.button_events = self.collect_button_events(prev_cruise, prev_main, prev_lane_assist);
        ret.block_pcm_enable = !self.recent_button_interaction();

        ret.low_speed_alert = self.update_low_speed_alert(ret.v_ego);

        let cruise_unavail = source.get(pt, "TCS13", "CF_VSM_Avail")? != 1.0
            && source.get(pt, "TCS13", "ACCEnable")? != 0.0;
        ret.cruise_unavailable =
            self.cruise_unavail_counter.update(cruise_unavail) > CRUISE_UNAVAIL_FRAMES;

        self.mdps12 = Some(source.snapshot(pt, "MDPS12")?);
        self.scc11 = if source.has_message(cruise_bus, "SCC11") {
            Some(source.snapshot(cruise_bus, "SCC11")?)
        } else {
            None
        };
        self.scc12 = if source.has_message(cruise_bus, "SCC12") {
            Some(source.snapshot(cruise_bus, "SCC12")?)
        } else {
            None
        };
        self.scc13 = if self.params.has_feature(FeatureFlags::SCC13) {
            Some(source.snapshot(cruise_bus, "SCC13")?)
        } else {
            None
        };
        self.scc14 = if self.params.has_feature(FeatureFlags::SCC14) {
            Some(source.snapshot(cruise_bus, "SCC14")?)
        } else {
            None
        };

        // single-cycle EPS glitches are not faults; believe the bit only
        // after it held for a whole debounce window while moving
        let steer_fault_raw = source.get(pt, "MDPS12", "CF_Mdps_ToiUnavail")? != 0.0;
        ret.steer_fault_temporary = self
            .steer_fault_counter
            .update(!ret.standstill && steer_fault_raw)
            >= STEER_FAULT_FRAMES;

        ret.brake_lights = source.get(pt, "TCS13", "BrakeLight")? != 0.0 || ret.brake_pressed;

        ret.lead_distance = self
            .scc11
            .as_ref()
            .and_then(|msg| msg.get("ACC_ObjDist").copied());
        ret.accel_req = self
            .scc12
            .as_ref()
            .and_then(|msg| msg.get("aReqValue").copied());

        if self.params.has_feature(FeatureFlags::TPMS) {
            ret.tpms = Some(self.read_tpms(source, pt, "TPMS11")?);
        }
        if self.params.has_feature(FeatureFlags::AUTOHOLD) {
            ret.auto_hold = Some(source.get(pt, "ESP11", "AVH_STAT")?);
        }
        if self.params.has_feature(FeatureFlags::NAVI) {
            ret.nav_speed_limit = Some(source.get(pt, "Navi_HU", "SpeedLim_Nav_Clu")?);
        }

        if self.params.longitudinal_enabled {
            if let Some(manager) = cruise_override {
                let available_hint =
                    (self.params.scc_bus == SccBus::Camera).then_some(ret.cruise.available);
                let context = ButtonContext {
                    cruise_buttons: &self.cruise_buttons,
                    main_buttons: &self.main_buttons,
                };
                manager.amend(&mut ret, &context, available_hint);
            }
        }

        Ok(ret)
    }
}
