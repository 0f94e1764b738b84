//! End-to-end fusion cycles on the CAN-FD dialect

use car_state_decoder::conversions::KPH_TO_MS;
use car_state_decoder::{
    derive_car_params, Bus, ButtonEvent, ButtonType, CarParams, CarStateFusion, DeriveOptions,
    Fingerprint, PlatformFlags, TableSignalSource, VariantProfile,
};

const PT: Bus = Bus::Powertrain;
const CAM: Bus = Bus::Camera;

/// Derive a CAN-FD ICE variant from an empty fingerprint: alternate
/// buttons, tertiary gear layout, camera-routed cruise info.
fn canfd_params() -> CarParams {
    let profile = VariantProfile {
        base_flags: PlatformFlags::CANFD,
        ..VariantProfile::default()
    };
    derive_car_params(
        &Fingerprint::new(),
        &[],
        &profile,
        &DeriveOptions::default(),
    )
}

fn canfd_source() -> TableSignalSource {
    let mut s = TableSignalSource::new();

    s.set(PT, "CRUISE_BUTTONS_ALT", "DISTANCE_UNIT", 0.0); // metric
    s.set(PT, "CRUISE_BUTTONS_ALT", "CRUISE_BUTTONS", 0.0);
    s.set(PT, "CRUISE_BUTTONS_ALT", "ADAPTIVE_CRUISE_MAIN_BTN", 0.0);
    s.set(PT, "CRUISE_BUTTONS_ALT", "LDA_BTN", 0.0);
    s.set(PT, "CRUISE_BUTTONS_ALT", "COUNTER", 12.0);

    s.set(PT, "ACCELERATOR_BRAKE_ALT", "ACCELERATOR_PEDAL_PRESSED", 0.0);
    s.set(PT, "TCS", "DriverBraking", 0.0);
    s.set(PT, "TCS", "ACCEnable", 0.0);
    s.set(PT, "TCS", "ACC_REQ", 0.0);
    s.set(PT, "TCS", "BRAKE_LIGHT", 0.0);

    s.set(PT, "DOORS_SEATBELTS", "DRIVER_DOOR", 0.0);
    s.set(PT, "DOORS_SEATBELTS", "DRIVER_SEATBELT", 1.0);

    s.set(PT, "GEAR_ALT_2", "GEAR", 4.0);
    s.set_label(PT, "GEAR_ALT_2", "GEAR", 4, "D");

    for signal in ["WHL_SpdFLVal", "WHL_SpdFRVal", "WHL_SpdRLVal", "WHL_SpdRRVal"] {
        s.set(PT, "WHEEL_SPEEDS", signal, 0.0);
    }

    s.set(PT, "STEERING_SENSORS", "STEERING_ANGLE", 0.0);
    s.set(PT, "STEERING_SENSORS", "STEERING_RATE", 0.0);
    s.set(PT, "MDPS", "STEERING_COL_TORQUE", 0.0);
    s.set(PT, "MDPS", "STEERING_OUT_TORQUE", 0.0);
    s.set(PT, "MDPS", "LKA_FAULT", 0.0);

    s.set(PT, "BLINKERS", "LEFT_LAMP", 0.0);
    s.set(PT, "BLINKERS", "RIGHT_LAMP", 0.0);

    s.set(CAM, "SCC_CONTROL", "ACCMode", 0.0);
    s.set(CAM, "SCC_CONTROL", "CRUISE_STANDSTILL", 0.0);
    s.set(CAM, "SCC_CONTROL", "VSetDis", 0.0);

    s.set(PT, "BRAKE", "BRAKE_LIGHT", 0.0);
    s.set(PT, "ESP_STATUS", "AUTO_HOLD", 0.0);

    s
}

fn set_wheel_speeds(s: &mut TableSignalSource, kph: f64) {
    for signal in ["WHL_SpdFLVal", "WHL_SpdFRVal", "WHL_SpdRLVal", "WHL_SpdRRVal"] {
        s.set(PT, "WHEEL_SPEEDS", signal, kph);
    }
}

#[test]
fn standstill_needs_all_four_wheels() {
    let mut source = canfd_source();
    let mut fusion = CarStateFusion::new(canfd_params());

    let state = fusion.update(&source, None).unwrap();
    assert!(state.standstill);

    // one spinning wheel is enough to leave standstill
    source.set(PT, "WHEEL_SPEEDS", "WHL_SpdRLVal", 5.0);
    let state = fusion.update(&source, None).unwrap();
    assert!(!state.standstill);
}

#[test]
fn lane_assist_button_toggles_cruise_availability() {
    let mut source = canfd_source();
    let mut fusion = CarStateFusion::new(canfd_params());

    let state = fusion.update(&source, None).unwrap();
    assert!(!state.cruise.available);

    // press
    source.set(PT, "CRUISE_BUTTONS_ALT", "LDA_BTN", 1.0);
    let state = fusion.update(&source, None).unwrap();
    assert!(state.cruise.available);
    assert_eq!(
        state.button_events,
        vec![ButtonEvent { button: ButtonType::LaneAssist, pressed: true }]
    );

    // held: latch keeps its value, no new edge
    let state = fusion.update(&source, None).unwrap();
    assert!(state.cruise.available);
    assert!(state.button_events.is_empty());

    // release then press again toggles back off
    source.set(PT, "CRUISE_BUTTONS_ALT", "LDA_BTN", 0.0);
    fusion.update(&source, None).unwrap();
    source.set(PT, "CRUISE_BUTTONS_ALT", "LDA_BTN", 1.0);
    let state = fusion.update(&source, None).unwrap();
    assert!(!state.cruise.available);
}

#[test]
fn cruise_info_is_read_from_the_camera_bus() {
    let mut source = canfd_source();
    source.set(CAM, "SCC_CONTROL", "ACCMode", 2.0);
    source.set(CAM, "SCC_CONTROL", "VSetDis", 90.0);

    let mut fusion = CarStateFusion::new(canfd_params());
    let state = fusion.update(&source, None).unwrap();
    assert!(state.cruise.enabled);
    assert!((state.cruise.speed - 90.0 * KPH_TO_MS).abs() < 1e-9);
    assert!(fusion.cruise_info().is_some());
}

#[test]
fn gas_pressed_bit_for_combustion_cars() {
    let mut source = canfd_source();
    let mut fusion = CarStateFusion::new(canfd_params());

    let state = fusion.update(&source, None).unwrap();
    assert!(!state.gas_pressed);
    assert_eq!(state.gas, 0.0);

    source.set(PT, "ACCELERATOR_BRAKE_ALT", "ACCELERATOR_PEDAL_PRESSED", 1.0);
    let state = fusion.update(&source, None).unwrap();
    assert!(state.gas_pressed);
}

#[test]
fn ev_pedal_scales_by_raw_code_range() {
    let profile = VariantProfile {
        base_flags: PlatformFlags::CANFD | PlatformFlags::EV,
        ..VariantProfile::default()
    };
    let params = derive_car_params(
        &Fingerprint::new(),
        &[],
        &profile,
        &DeriveOptions::default(),
    );

    let mut source = canfd_source();
    source.set(PT, "ACCELERATOR", "ACCELERATOR_PEDAL", 127.5);
    source.set(PT, "ACCELERATOR", "GEAR", 4.0);
    source.set_label(PT, "ACCELERATOR", "GEAR", 4, "D");
    source.set(PT, "MANUAL_SPEED_LIMIT_ASSIST", "MSLA_ENABLED", 1.0);

    let mut fusion = CarStateFusion::new(params);
    let state = fusion.update(&source, None).unwrap();
    assert!((state.gas - 0.5).abs() < 1e-9);
    assert!(state.gas_pressed);
    // the EV speed limiter replaces non-adaptive cruise
    assert!(state.cruise.non_adaptive);
}

#[test]
fn auto_hold_suppressed_while_cruise_is_enabled() {
    let mut source = canfd_source();
    source.set(PT, "ESP_STATUS", "AUTO_HOLD", 1.0);

    let mut fusion = CarStateFusion::new(canfd_params());
    let state = fusion.update(&source, None).unwrap();
    assert_eq!(state.auto_hold, Some(1.0));
    assert!(state.brake_hold_active);
    assert!(state.brake_lights); // auto hold keeps the brake lights on

    source.set(CAM, "SCC_CONTROL", "ACCMode", 1.0);
    let state = fusion.update(&source, None).unwrap();
    assert_eq!(state.auto_hold, Some(0.0));
    assert!(!state.brake_hold_active); // enabled but not at a cruise standstill
}

#[test]
fn steer_fault_debounce_matches_classic_dialect() {
    let mut source = canfd_source();
    set_wheel_speeds(&mut source, 40.0);
    source.set(PT, "MDPS", "LKA_FAULT", 1.0);

    let mut fusion = CarStateFusion::new(canfd_params());
    for _ in 0..49 {
        let state = fusion.update(&source, None).unwrap();
        assert!(!state.steer_fault_temporary);
    }
    let state = fusion.update(&source, None).unwrap();
    assert!(state.steer_fault_temporary);
}

#[test]
fn button_frame_is_retained_with_its_counter() {
    let source = canfd_source();
    let mut fusion = CarStateFusion::new(canfd_params());
    fusion.update(&source, None).unwrap();

    assert_eq!(fusion.buttons_counter(), 12);
    let frame = fusion.canfd_buttons().unwrap();
    assert_eq!(frame["COUNTER"], 12.0);
    assert_eq!(frame["CRUISE_BUTTONS"], 0.0);
}

#[test]
fn imperial_distance_unit_rescales_set_speed() {
    let mut source = canfd_source();
    source.set(PT, "CRUISE_BUTTONS_ALT", "DISTANCE_UNIT", 1.0); // imperial
    source.set(CAM, "SCC_CONTROL", "ACCMode", 1.0);
    source.set(CAM, "SCC_CONTROL", "VSetDis", 60.0);

    let mut fusion = CarStateFusion::new(canfd_params());
    let state = fusion.update(&source, None).unwrap();
    assert!((state.cruise.speed - 60.0 * 0.44704).abs() < 1e-9);
}
