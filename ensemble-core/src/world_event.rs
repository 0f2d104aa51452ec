//! World events — probabilistic, duration-bound happenings.
//!
//! Event types live in an immutable catalog built once at startup. Each
//! tick the manager first expires events whose duration has elapsed, then
//! — on a fixed roll cadence — rolls each non-active type's probability
//! once and starts the first that fires. A type can never be active twice
//! concurrently. `inject` is the god-mode path that bypasses probability.
//!
//! Start/end lifecycle is reported as returned change lists; the engine
//! forwards them to the theme adapter and the event stream rather than the
//! catalog holding callbacks.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::WorldEventConfig;

/// Static definition of a world-event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEventDef {
    /// Type name (unique key in the catalog).
    pub name: String,
    /// Human-readable description, also fed to agent prompts.
    pub description: String,
    /// How long an instance lasts, in ticks. 0 = permanent.
    pub duration_ticks: u64,
    /// Probability of starting per roll window (0.0–1.0).
    pub probability: f64,
    /// Zone tags the event affects (theme-interpreted).
    #[serde(default)]
    pub zones: Vec<String>,
}

/// Immutable table of registered event types.
#[derive(Debug, Clone, Default)]
pub struct WorldEventCatalog {
    defs: HashMap<String, WorldEventDef>,
}

impl WorldEventCatalog {
    /// Build a catalog from a list of definitions. Later duplicates of a
    /// name replace earlier ones.
    #[must_use]
    pub fn from_defs(defs: Vec<WorldEventDef>) -> Self {
        Self {
            defs: defs.into_iter().map(|d| (d.name.clone(), d)).collect(),
        }
    }

    /// Look up a definition by type name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&WorldEventDef> {
        self.defs.get(name)
    }

    /// All registered type names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.defs.keys().map(String::as_str).collect()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &WorldEventDef> {
        self.defs.values()
    }
}

/// A live (or just-ended) instance of an event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Type name.
    pub name: String,
    /// Description (possibly overridden at injection).
    pub description: String,
    /// Tick the instance started.
    pub start_tick: u64,
    /// Instance duration in ticks. 0 = permanent.
    pub duration_ticks: u64,
    /// Affected zone tags.
    pub zones: Vec<String>,
}

/// A lifecycle transition produced by [`EventManager::tick`] or `inject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum WorldEventChange {
    /// The event just started.
    Started(WorldEvent),
    /// The event's duration elapsed.
    Ended(WorldEvent),
}

/// Runs the event lifecycle against an immutable catalog.
#[derive(Debug)]
pub struct EventManager {
    catalog: WorldEventCatalog,
    config: WorldEventConfig,
    active: HashMap<String, WorldEvent>,
}

impl EventManager {
    /// Create a manager over a catalog.
    #[must_use]
    pub fn new(catalog: WorldEventCatalog, config: WorldEventConfig) -> Self {
        Self {
            catalog,
            config,
            active: HashMap::new(),
        }
    }

    /// Whether a type currently has an active instance.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// Currently active events.
    pub fn active(&self) -> impl Iterator<Item = &WorldEvent> {
        self.active.values()
    }

    /// Advance one tick: expire elapsed events, then (on the roll cadence)
    /// roll each non-active type once and start the first that fires.
    pub fn tick(&mut self, tick: u64) -> Vec<WorldEventChange> {
        let mut changes = Vec::new();

        // Expire first, so a freshly ended type may re-roll this tick.
        let expired: Vec<String> = self
            .active
            .values()
            .filter(|e| e.duration_ticks > 0 && tick >= e.start_tick + e.duration_ticks)
            .map(|e| e.name.clone())
            .collect();
        for name in expired {
            if let Some(event) = self.active.remove(&name) {
                debug!(event = %event.name, tick, "world event ended");
                changes.push(WorldEventChange::Ended(event));
            }
        }

        if self.config.roll_interval_ticks > 0 && tick % self.config.roll_interval_ticks == 0 {
            let mut rng = rand::thread_rng();
            for def in self.catalog.iter() {
                if self.active.contains_key(&def.name) {
                    continue;
                }
                if def.probability > 0.0 && rng.gen_bool(def.probability.min(1.0)) {
                    let event = Self::instantiate(def, tick, None);
                    debug!(event = %event.name, tick, "world event started (rolled)");
                    self.active.insert(def.name.clone(), event.clone());
                    changes.push(WorldEventChange::Started(event));
                    break; // inject only the first that fires per window
                }
            }
        }

        changes
    }

    /// Start an event by fiat, bypassing probability.
    ///
    /// Returns `None` for unknown types or types that are already active
    /// (a single bad call from the adapter must not halt the tick).
    pub fn inject(
        &mut self,
        name: &str,
        tick: u64,
        description_override: Option<String>,
    ) -> Option<WorldEventChange> {
        if self.active.contains_key(name) {
            return None;
        }
        let def = self.catalog.get(name)?;
        let event = Self::instantiate(def, tick, description_override);
        debug!(event = %event.name, tick, "world event started (injected)");
        self.active.insert(name.to_string(), event.clone());
        Some(WorldEventChange::Started(event))
    }

    /// Render active events as a short text block for agent context.
    /// Returns an empty string when nothing is happening.
    #[must_use]
    pub fn active_summary(&self) -> String {
        if self.active.is_empty() {
            return String::new();
        }
        let mut lines: Vec<String> = self
            .active
            .values()
            .map(|e| format!("- {}: {} (since tick {})", e.name, e.description, e.start_tick))
            .collect();
        lines.sort();
        format!("Happening right now:\n{}", lines.join("\n"))
    }

    fn instantiate(def: &WorldEventDef, tick: u64, description: Option<String>) -> WorldEvent {
        WorldEvent {
            name: def.name.clone(),
            description: description.unwrap_or_else(|| def.description.clone()),
            start_tick: tick,
            duration_ticks: def.duration_ticks,
            zones: def.zones.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, duration: u64, probability: f64) -> WorldEventDef {
        WorldEventDef {
            name: name.to_string(),
            description: format!("{name} is happening"),
            duration_ticks: duration,
            probability,
            zones: vec![],
        }
    }

    fn manager(defs: Vec<WorldEventDef>) -> EventManager {
        EventManager::new(
            WorldEventCatalog::from_defs(defs),
            WorldEventConfig { roll_interval_ticks: 10 },
        )
    }

    #[test]
    fn certain_event_fires_on_roll_cadence() {
        let mut events = manager(vec![def("fire_drill", 5, 1.0)]);

        // Off-cadence ticks roll nothing.
        assert!(events.tick(3).is_empty());

        let changes = events.tick(10);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], WorldEventChange::Started(_)));
        assert!(events.is_active("fire_drill"));
    }

    #[test]
    fn impossible_event_never_fires() {
        let mut events = manager(vec![def("eclipse", 5, 0.0)]);
        for tick in 0..200 {
            assert!(events.tick(tick).is_empty());
        }
    }

    #[test]
    fn events_expire_after_duration() {
        let mut events = manager(vec![def("fire_drill", 5, 0.0)]);
        events.inject("fire_drill", 10, None).expect("inject");

        assert!(events.tick(14).is_empty());
        let changes = events.tick(15);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], WorldEventChange::Ended(_)));
        assert!(!events.is_active("fire_drill"));
    }

    #[test]
    fn permanent_events_never_expire() {
        let mut events = manager(vec![def("renovation", 0, 0.0)]);
        events.inject("renovation", 1, None).expect("inject");

        for tick in 2..500 {
            assert!(events.tick(tick).is_empty());
        }
        assert!(events.is_active("renovation"));
    }

    #[test]
    fn type_is_exclusive_while_active() {
        let mut events = manager(vec![def("fire_drill", 100, 1.0)]);
        events.inject("fire_drill", 5, None).expect("first inject");

        assert!(events.inject("fire_drill", 6, None).is_none());
        // The roll cadence must also skip the active type.
        assert!(events.tick(10).is_empty());
    }

    #[test]
    fn inject_unknown_type_is_a_noop() {
        let mut events = manager(vec![]);
        assert!(events.inject("flood", 1, None).is_none());
    }

    #[test]
    fn inject_supports_description_override() {
        let mut events = manager(vec![def("party", 10, 0.0)]);
        events
            .inject("party", 1, Some("surprise birthday cake in the kitchen".into()))
            .expect("inject");

        let summary = events.active_summary();
        assert!(summary.contains("surprise birthday cake"));
    }

    #[test]
    fn summary_is_empty_when_quiet() {
        let events = manager(vec![def("party", 10, 0.0)]);
        assert!(events.active_summary().is_empty());
    }
}
