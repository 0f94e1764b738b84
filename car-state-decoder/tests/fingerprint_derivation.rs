//! End-to-end flag derivation scenarios
//!
//! Each scenario feeds a full fingerprint through `derive_car_params` and
//! checks the resulting capability record and safety-config ordering.

use car_state_decoder::{
    derive_car_params, subscriptions, DeriveOptions, EcuKind, Fingerprint, PlatformFlags,
    SafetyModel, SafetyParamFlags, SccBus, VariantProfile,
};

/// Classic-dialect fingerprint with the adaptive-cruise messages on the
/// primary bus and a camera that only sends the lateral message.
fn classic_fingerprint() -> Fingerprint {
    Fingerprint::from_observations([
        (0, 0x386), // wheel speeds
        (0, 0x2b0), // steering sensors
        (0, 0x420), // SCC11
        (0, 0x421), // SCC12
        (1, 0x500), // radar tracks
        (2, 0x340), // LKAS11
    ])
}

#[test]
fn classic_base_variant_gets_single_standard_entry() {
    let params = derive_car_params(
        &classic_fingerprint(),
        &[],
        &VariantProfile::default(),
        &DeriveOptions::default(),
    );

    assert!(params.longitudinal_available);
    assert!(!params.longitudinal_enabled); // no operator opt-in
    assert_eq!(params.scc_bus, SccBus::Primary);
    assert!(!params.radar_unavailable);
    assert_eq!(params.safety_configs.len(), 1);
    assert_eq!(params.safety_configs[0].model, SafetyModel::Standard);
    assert!(params.safety_configs[0].param.is_empty());
}

#[test]
fn lka_relay_without_adas_ecu_forces_longitudinal_off() {
    let mut fingerprint = classic_fingerprint();
    fingerprint.insert(2, 0x50); // relay marker on the camera bus

    // no ADAS ECU answered the firmware query
    let params = derive_car_params(
        &fingerprint,
        &[EcuKind::Eps, EcuKind::Engine],
        &VariantProfile::default(),
        &DeriveOptions {
            experimental_long: true,
            ..DeriveOptions::default()
        },
    );
    assert!(!params.longitudinal_available);
    assert!(!params.longitudinal_enabled);

    // with the ECU present the same fingerprint keeps longitudinal
    let params = derive_car_params(
        &fingerprint,
        &[EcuKind::Adas],
        &VariantProfile::default(),
        &DeriveOptions {
            experimental_long: true,
            ..DeriveOptions::default()
        },
    );
    assert!(params.longitudinal_available);
    assert!(params.longitudinal_enabled);
}

#[test]
fn operator_opt_in_gates_longitudinal_and_sets_the_param_bit() {
    let params = derive_car_params(
        &classic_fingerprint(),
        &[],
        &VariantProfile::default(),
        &DeriveOptions {
            experimental_long: true,
            ..DeriveOptions::default()
        },
    );
    assert!(params.longitudinal_enabled);
    assert!(!params.pcm_cruise); // we track engagement from the buttons
    assert!(params.safety_configs[0]
        .param
        .contains(SafetyParamFlags::LONG));
}

#[test]
fn unsupported_variant_never_enables_longitudinal() {
    let profile = VariantProfile {
        unsupported_longitudinal: true,
        ..VariantProfile::default()
    };
    let params = derive_car_params(
        &classic_fingerprint(),
        &[],
        &profile,
        &DeriveOptions {
            experimental_long: true,
            ..DeriveOptions::default()
        },
    );
    assert!(!params.longitudinal_available);
    assert!(!params.longitudinal_enabled);
}

#[test]
fn camera_routed_cruise_replaces_the_safety_model() {
    let mut fingerprint = classic_fingerprint();
    fingerprint.insert(2, 0x50a); // SCC13 behind the camera
    fingerprint.insert(2, 0x389); // SCC14 behind the camera

    let params = derive_car_params(
        &fingerprint,
        &[],
        &VariantProfile::default(),
        &DeriveOptions {
            scc_on_camera_bus: true,
            ..DeriveOptions::default()
        },
    );
    assert_eq!(params.scc_bus, SccBus::Camera);
    assert!(params.longitudinal_enabled); // forced on with camera cruise
    assert!(!params.radar_unavailable);
    assert!(params.pcm_cruise);
    assert_eq!(params.safety_configs.len(), 1);
    assert_eq!(params.safety_configs[0].model, SafetyModel::Legacy);
    assert!(params.safety_configs[0]
        .param
        .contains(SafetyParamFlags::LONG));
    assert!(params.has_feature(car_state_decoder::FeatureFlags::SCC13));
    assert!(params.has_feature(car_state_decoder::FeatureFlags::SCC14));
}

#[test]
fn canfd_camera_scc_variant_full_derivation() {
    let profile = VariantProfile {
        name: "canfd-ice".to_string(),
        base_flags: PlatformFlags::CANFD,
        ..VariantProfile::default()
    };
    // no relay markers: E-CAN is bus 0, camera bus 2
    let fingerprint = Fingerprint::from_observations([
        (0, 0x1cf), // primary button layout
        (0, 0x130), // primary gear message
        (0, 0x1e5), // blind spot ECU
        (0, 0x60),  // auto hold
        (0, 0x3a0), // tire pressure
    ]);

    let params = derive_car_params(&fingerprint, &[], &profile, &DeriveOptions::default());

    assert!(params.has_flag(PlatformFlags::CANFD_CAMERA_SCC));
    assert!(!params.has_flag(PlatformFlags::CANFD_ALT_BUTTONS));
    assert!(!params.has_flag(PlatformFlags::CANFD_ALT_GEARS));
    assert!(params.enable_bsm);
    assert!(params.has_feature(car_state_decoder::FeatureFlags::AUTOHOLD));
    assert!(params.has_feature(car_state_decoder::FeatureFlags::TPMS));
    assert_eq!(params.canfd_buses.unwrap().ecan, 0);
    assert_eq!(params.safety_configs.len(), 1);
    assert_eq!(params.safety_configs[0].model, SafetyModel::CanFd);
    assert!(params.safety_configs[0]
        .param
        .contains(SafetyParamFlags::CAMERA_SCC));
}

#[test]
fn canfd_hybrid_marker_sets_gas_semantics() {
    let profile = VariantProfile {
        base_flags: PlatformFlags::CANFD,
        ..VariantProfile::default()
    };
    let fingerprint = Fingerprint::from_observations([(0, 0x105), (0, 0x1cf), (0, 0x130)]);

    let params = derive_car_params(
        &fingerprint,
        &[],
        &profile,
        &DeriveOptions {
            experimental_long: true,
            ..DeriveOptions::default()
        },
    );
    assert!(params.has_flag(PlatformFlags::HYBRID));
    let param = params.safety_configs.last().unwrap().param;
    assert!(param.contains(SafetyParamFlags::HYBRID_GAS));
    assert!(param.contains(SafetyParamFlags::LONG));
    assert!(!param.contains(SafetyParamFlags::EV_GAS));
}

#[test]
fn canfd_radar_scc_variant_keeps_stock_cruise_routing() {
    let profile = VariantProfile {
        base_flags: PlatformFlags::CANFD,
        canfd_radar_scc: true,
        ..VariantProfile::default()
    };
    let fingerprint = Fingerprint::from_observations([(0, 0x1cf), (0, 0x130)]);

    let params = derive_car_params(
        &fingerprint,
        &[],
        &profile,
        &DeriveOptions {
            experimental_long: true,
            ..DeriveOptions::default()
        },
    );
    assert!(!params.has_flag(PlatformFlags::CANFD_CAMERA_SCC));
    // radar-based cruise keeps longitudinal off the table
    assert!(!params.longitudinal_available);
    assert!(!params.longitudinal_enabled);
}

#[test]
fn derivation_and_subscriptions_are_deterministic() {
    let fingerprint = classic_fingerprint();
    let profile = VariantProfile::default();
    let options = DeriveOptions {
        experimental_long: true,
        ..DeriveOptions::default()
    };

    let a = derive_car_params(&fingerprint, &[], &profile, &options);
    let b = derive_car_params(&fingerprint, &[], &profile, &options);
    assert_eq!(a, b);
    assert_eq!(a.flags.bits(), b.flags.bits());
    assert_eq!(a.safety_configs, b.safety_configs);
    assert_eq!(subscriptions(&a), subscriptions(&b));
}

#[test]
fn fingerprint_replays_identically_from_json() {
    let fingerprint = classic_fingerprint();
    let json = serde_json::to_string(&fingerprint).unwrap();
    let replayed: Fingerprint = serde_json::from_str(&json).unwrap();

    let direct = derive_car_params(
        &fingerprint,
        &[],
        &VariantProfile::default(),
        &DeriveOptions::default(),
    );
    let from_json = derive_car_params(
        &replayed,
        &[],
        &VariantProfile::default(),
        &DeriveOptions::default(),
    );
    assert_eq!(direct, from_json);
}
