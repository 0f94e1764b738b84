//! Car State Decoder Library
//!
//! Decodes a vehicle's CAN-bus traffic into a normalized, validated
//! vehicle-state snapshot once per control cycle, and derives the
//! capability flags, actuation limits and safety-firmware configuration
//! for a specific vehicle variant from observed bus traffic.
//!
//! # Architecture
//!
//! Two tightly coupled subsystems:
//! - Flag derivation runs once per drive: a bus fingerprint plus the
//!   detected ECUs, the static variant profile and the operator options
//!   become an immutable [`CarParams`] record and an ordered safety
//!   configuration.
//! - State fusion runs once per control tick: [`CarStateFusion`] reads the
//!   latest decoded signal values through the [`SignalSource`] seam and
//!   emits one immutable [`VehicleState`], absorbing the wire dialect,
//!   unit systems, sensor noise and button-edge timing on the way.
//!
//! The library does NOT:
//! - Parse CAN frames or signal databases (the external codec does)
//! - Encode outbound actuation commands (it only retains the raw frame
//!   copies the encoder needs)
//! - Run the control loops that consume the decoded state
//!
//! # Example Usage
//!
//! ```no_run
//! use car_state_decoder::{
//!     derive_car_params, CarStateFusion, DeriveOptions, Fingerprint,
//!     TableSignalSource, VariantProfile,
//! };
//!
//! // Once per drive: derive the capability record from the fingerprint
//! let fingerprint = Fingerprint::from_observations([(0, 0x386), (0, 0x2b0)]);
//! let profile = VariantProfile::default();
//! let params = derive_car_params(&fingerprint, &[], &profile, &DeriveOptions::default());
//!
//! // Every control tick: fuse the latest signal snapshot into one state
//! let source = TableSignalSource::new(); // the real codec adapter in production
//! let mut fusion = CarStateFusion::new(params);
//! match fusion.update(&source, None) {
//!     Ok(state) => println!("v_ego = {:.2} m/s", state.v_ego),
//!     Err(e) => eprintln!("cycle failed: {}", e),
//! }
//! ```

// Public modules
pub mod buttons;
pub mod conversions;
pub mod cruise;
pub mod filters;
pub mod fingerprint;
pub mod flags;
pub mod fusion;
pub mod params;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use cruise::{ButtonContext, CruiseStateOverride};
pub use fingerprint::{derive_car_params, EcuKind, Fingerprint};
pub use flags::{FeatureFlags, PlatformFlags, SafetyConfig, SafetyModel, SafetyParamFlags};
pub use fusion::messages::{subscriptions, BusSubscriptions, MessageSubscription};
pub use fusion::CarStateFusion;
pub use params::{CanFdBuses, CarParams, DeriveOptions, SccBus, VariantProfile};
pub use source::{SignalSource, TableSignalSource};
pub use types::{
    Bus, ButtonEvent, ButtonType, CarStateError, CruiseState, GearShifter, MessageSnapshot,
    Result, TpmsState, VehicleState, WheelSpeeds,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
