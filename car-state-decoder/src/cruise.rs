//! Injected cruise-state collaborator
//!
//! When this crate owns longitudinal control, engagement state is tracked
//! from button history rather than from the stock cruise computer. That
//! tracking lives outside the decoder; fusion only hands it the freshly
//! built state once per cycle and lets it amend the cruise fields. The
//! collaborator is passed explicitly into the update call — it is never
//! looked up as ambient global state.

use crate::buttons::ButtonRing;
use crate::types::VehicleState;

/// Button history handed to the collaborator alongside the state.
pub struct ButtonContext<'a> {
    pub cruise_buttons: &'a ButtonRing,
    pub main_buttons: &'a ButtonRing,
}

/// Narrow seam for an external engagement-state manager.
pub trait CruiseStateOverride {
    /// Possibly amend the cruise fields of `state`. `available_hint` is the
    /// stock availability reading when the cruise subsystem sits behind the
    /// camera bus, `None` when no such reading applies.
    fn amend(
        &mut self,
        state: &mut VehicleState,
        buttons: &ButtonContext<'_>,
        available_hint: Option<bool>,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ForceEnabled;

    impl CruiseStateOverride for ForceEnabled {
        fn amend(
            &mut self,
            state: &mut VehicleState,
            _buttons: &ButtonContext<'_>,
            _available_hint: Option<bool>,
        ) {
            state.cruise.enabled = true;
        }
    }

    #[test]
    fn test_override_amends_state() {
        let mut state = VehicleState::default();
        let cruise = ButtonRing::new();
        let main = ButtonRing::new();
        let ctx = ButtonContext {
            cruise_buttons: &cruise,
            main_buttons: &main,
        };
        ForceEnabled.amend(&mut state, &ctx, Some(false));
        assert!(state.cruise.enabled);
    }
}
