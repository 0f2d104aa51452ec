//! Physiological needs — per-character scalars that rise every tick.
//!
//! Each registered character carries a small fixed set of needs. Values
//! rise monotonically at configured rates, clamp at 100, and fire an
//! urgency exactly once per threshold crossing: a per-(character, need)
//! latch suppresses repeat firing while the value sits above the
//! threshold, and only an explicit `satisfy` clears it. Mood penalties for
//! unmet urgent needs are additive across needs within a tick.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::NeedsConfig;
use crate::types::CharacterId;

/// The fixed set of simulated needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    /// Needs a bathroom break.
    Bladder,
    /// Needs food.
    Hunger,
    /// Needs a drink.
    Thirst,
    /// Needs rest.
    Energy,
}

impl NeedKind {
    /// All need kinds, in decay order.
    #[must_use]
    pub fn all() -> &'static [NeedKind] {
        &[Self::Bladder, Self::Hunger, Self::Thirst, Self::Energy]
    }
}

impl fmt::Display for NeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Bladder => "bladder",
            Self::Hunger => "hunger",
            Self::Thirst => "thirst",
            Self::Energy => "energy",
        };
        write!(f, "{s}")
    }
}

/// One need's current value plus its urgency latch.
#[derive(Debug, Clone, Copy)]
struct NeedState {
    value: f32,
    urgent_latched: bool,
}

/// An edge-triggered urgency: fired once when a need crosses the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgentNeed {
    /// Whose need.
    pub character: CharacterId,
    /// Which need.
    pub kind: NeedKind,
    /// Value at the moment of crossing.
    pub value: f32,
}

/// Tracks and decays needs for every registered character.
#[derive(Debug)]
pub struct NeedsManager {
    config: NeedsConfig,
    needs: HashMap<CharacterId, HashMap<NeedKind, NeedState>>,
}

impl NeedsManager {
    /// Create a manager with the given tuning.
    #[must_use]
    pub fn new(config: NeedsConfig) -> Self {
        Self {
            config,
            needs: HashMap::new(),
        }
    }

    /// Register a character with all needs at zero.
    pub fn register(&mut self, id: CharacterId) {
        self.register_with(id, &[]);
    }

    /// Register a character with specific initial values (unset needs
    /// start at zero). Re-registering resets the character's needs.
    pub fn register_with(&mut self, id: CharacterId, initial: &[(NeedKind, f32)]) {
        let mut map = HashMap::new();
        for kind in NeedKind::all() {
            map.insert(
                *kind,
                NeedState {
                    value: 0.0,
                    urgent_latched: false,
                },
            );
        }
        for (kind, value) in initial {
            map.insert(
                *kind,
                NeedState {
                    value: value.clamp(0.0, 100.0),
                    urgent_latched: false,
                },
            );
        }
        self.needs.insert(id, map);
    }

    /// Drop all need records for a character.
    pub fn unregister(&mut self, id: CharacterId) {
        self.needs.remove(&id);
    }

    /// Whether the character is registered.
    #[must_use]
    pub fn is_registered(&self, id: CharacterId) -> bool {
        self.needs.contains_key(&id)
    }

    /// Current value of one need, if registered.
    #[must_use]
    pub fn value(&self, id: CharacterId, kind: NeedKind) -> Option<f32> {
        self.needs.get(&id).and_then(|m| m.get(&kind)).map(|s| s.value)
    }

    /// Advance every need by one tick.
    ///
    /// Returns the urgencies that fired this tick — exactly one per
    /// (character, need) threshold crossing, never one per tick.
    pub fn tick(&mut self) -> Vec<UrgentNeed> {
        let threshold = self.config.urgent_threshold;
        let mut fired = Vec::new();

        for (&character, needs) in &mut self.needs {
            for (&kind, state) in needs.iter_mut() {
                state.value = (state.value + self.config.rate(kind)).min(100.0);

                if state.value >= threshold && !state.urgent_latched {
                    state.urgent_latched = true;
                    fired.push(UrgentNeed {
                        character,
                        kind,
                        value: state.value,
                    });
                }
            }
        }

        fired
    }

    /// Satisfy a need: subtract the configured amount (floored at zero)
    /// and clear the urgency latch. Returns `false` for unknown ids.
    pub fn satisfy(&mut self, id: CharacterId, kind: NeedKind) -> bool {
        let Some(state) = self.needs.get_mut(&id).and_then(|m| m.get_mut(&kind)) else {
            return false;
        };
        state.value = (state.value - self.config.satisfy_amount).max(0.0);
        state.urgent_latched = false;
        true
    }

    /// Mood penalty for this character's currently urgent needs.
    ///
    /// Returns a non-positive value: `-penalty` per need at or above the
    /// urgent threshold, additive across needs.
    #[must_use]
    pub fn mood_penalty(&self, id: CharacterId) -> f32 {
        let Some(needs) = self.needs.get(&id) else {
            return 0.0;
        };
        let urgent = needs
            .values()
            .filter(|s| s.value >= self.config.urgent_threshold)
            .count();
        -(urgent as f32) * self.config.mood_penalty_per_urgent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> NeedsManager {
        NeedsManager::new(NeedsConfig::default())
    }

    #[test]
    fn needs_rise_and_clamp() {
        let mut needs = manager();
        let id = CharacterId::new();
        needs.register_with(id, &[(NeedKind::Bladder, 99.9)]);

        needs.tick();
        assert!((needs.value(id, NeedKind::Bladder).expect("registered") - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn urgency_fires_exactly_once_per_crossing() {
        let mut needs = manager();
        let id = CharacterId::new();
        needs.register_with(id, &[(NeedKind::Thirst, 79.9)]);

        let first = needs.tick();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, NeedKind::Thirst);

        // Still above threshold — the latch must suppress a second fire.
        for _ in 0..10 {
            assert!(needs.tick().is_empty());
        }
    }

    #[test]
    fn satisfy_clears_latch_and_rearms() {
        let mut needs = manager();
        let id = CharacterId::new();
        needs.register_with(id, &[(NeedKind::Hunger, 79.9)]);

        assert_eq!(needs.tick().len(), 1);
        assert!(needs.satisfy(id, NeedKind::Hunger));

        let value = needs.value(id, NeedKind::Hunger).expect("registered");
        assert!(value < 80.0, "satisfy should pull the value below urgent");

        // Climb back over the threshold: a fresh urgency must fire.
        let mut refired = 0;
        for _ in 0..200 {
            refired += needs.tick().len();
        }
        assert_eq!(refired, 1);
    }

    #[test]
    fn satisfy_does_not_go_negative() {
        let mut needs = manager();
        let id = CharacterId::new();
        needs.register_with(id, &[(NeedKind::Energy, 10.0)]);

        needs.satisfy(id, NeedKind::Energy);
        assert!(needs.value(id, NeedKind::Energy).expect("registered").abs() < f32::EPSILON);
    }

    #[test]
    fn mood_penalty_is_additive() {
        let mut needs = manager();
        let id = CharacterId::new();
        needs.register_with(id, &[(NeedKind::Bladder, 95.0), (NeedKind::Thirst, 90.0)]);

        assert!((needs.mood_penalty(id) + 4.0).abs() < f32::EPSILON);
        assert!(needs.mood_penalty(CharacterId::new()).abs() < f32::EPSILON);
    }

    #[test]
    fn unregister_drops_records() {
        let mut needs = manager();
        let id = CharacterId::new();
        needs.register(id);
        needs.unregister(id);

        assert!(!needs.is_registered(id));
        assert!(needs.value(id, NeedKind::Hunger).is_none());
        assert!(!needs.satisfy(id, NeedKind::Hunger));
    }
}
