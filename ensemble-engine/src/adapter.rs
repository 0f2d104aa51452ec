//! The seam between the simulation and a theme.
//!
//! The engine stays ignorant of geography, schedules, and presentation; a
//! theme supplies those judgments through this trait. All hooks have safe
//! defaults so a minimal theme only overrides what it cares about.

use ensemble_core::needs::NeedKind;
use ensemble_core::types::CharacterId;
use ensemble_core::world_event::WorldEventChange;

/// Theme-side policy consulted by the engine each tick.
pub trait ThemeAdapter {
    /// Whether two characters are allowed to meet right now (proximity,
    /// schedules, closed doors — the theme decides).
    fn can_encounter(&self, a: CharacterId, b: CharacterId) -> bool;

    /// Situational framing for an encounter between `a` and `b`, fed into
    /// agent prompts ("by the coffee machine", "on the night watch").
    fn encounter_context(&self, a: CharacterId, b: CharacterId) -> String;

    /// Pairs the theme would like to see meet this tick. The engine still
    /// applies cooldowns and queue rules to each.
    fn encounter_candidates(&self, tick: u64) -> Vec<(CharacterId, CharacterId)>;

    /// Task readiness: whether the character is present and able to make
    /// progress on assigned work this tick.
    fn can_work(&self, _id: CharacterId) -> bool {
        true
    }

    /// A need crossed the urgency threshold; the theme may route the
    /// character to a bathroom, kitchen, or bed.
    fn on_need_urgent(&self, _id: CharacterId, _kind: NeedKind, _value: f32) {}

    /// A world event started or ended.
    fn on_event(&self, _change: &WorldEventChange) {}
}

/// A permissive adapter with no geography: everyone can always meet in
/// one shared room. Useful as a starting point and in tests.
#[derive(Debug, Clone, Default)]
pub struct OpenFloorAdapter {
    /// Framing used for every encounter.
    pub setting: String,
}

impl OpenFloorAdapter {
    /// Create an adapter with the given setting description.
    #[must_use]
    pub fn new(setting: impl Into<String>) -> Self {
        Self {
            setting: setting.into(),
        }
    }
}

impl ThemeAdapter for OpenFloorAdapter {
    fn can_encounter(&self, _a: CharacterId, _b: CharacterId) -> bool {
        true
    }

    fn encounter_context(&self, _a: CharacterId, _b: CharacterId) -> String {
        if self.setting.is_empty() {
            "a shared common room".to_string()
        } else {
            self.setting.clone()
        }
    }

    fn encounter_candidates(&self, _tick: u64) -> Vec<(CharacterId, CharacterId)> {
        Vec::new()
    }
}
