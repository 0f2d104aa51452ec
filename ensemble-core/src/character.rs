//! Character store — identity, traits, mood, and lifecycle state.
//!
//! The registry is the single owner of every [`Character`]. Other
//! subsystems hold only [`CharacterId`]s and mutate characters through the
//! registry (needs apply mood penalties, tasks apply boosts and drains,
//! encounters flip state in and out of `Talking`).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::types::{CharacterId, CharacterState, Traits, clamp_scale};

/// Running counters kept per character.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CharacterStats {
    /// Completed encounters this character took part in.
    pub social_interactions: u32,
    /// Encounters whose average sentiment was strong enough to remember.
    pub memorable_moments: u32,
}

/// A simulated person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Unique id.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Free-text appearance descriptors ("red scarf", "tired eyes").
    pub appearance: Vec<String>,
    /// Personality dimensions, 0–100 each.
    pub traits: Traits,
    /// Current mood, 0–100, clamped on every mutation.
    pub mood: f32,
    /// Current lifecycle state.
    pub state: CharacterState,
    /// Marks throwaway characters (walk-ons a theme may cull freely).
    pub is_temp: bool,
    /// Running counters.
    pub stats: CharacterStats,
}

impl Character {
    /// Create a character with neutral traits and mood.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            appearance: Vec::new(),
            traits: Traits::default(),
            mood: 50.0,
            state: CharacterState::Idle,
            is_temp: false,
            stats: CharacterStats::default(),
        }
    }

    /// Set traits (builder style).
    #[must_use]
    pub fn with_traits(mut self, traits: Traits) -> Self {
        self.traits = traits;
        self
    }

    /// Set starting mood (builder style, clamped).
    #[must_use]
    pub fn with_mood(mut self, mood: f32) -> Self {
        self.mood = clamp_scale(mood);
        self
    }

    /// Set appearance descriptors (builder style).
    #[must_use]
    pub fn with_appearance(mut self, descriptors: Vec<String>) -> Self {
        self.appearance = descriptors;
        self
    }

    /// Mark as a temporary walk-on character (builder style).
    #[must_use]
    pub fn temp(mut self) -> Self {
        self.is_temp = true;
        self
    }

    /// Shift mood by `delta`, clamped to 0–100.
    pub fn adjust_mood(&mut self, delta: f32) {
        self.mood = clamp_scale(self.mood + delta);
    }
}

/// Name pool used by [`CharacterRegistry::generate`].
const GENERATED_NAMES: &[&str] = &[
    "Avery", "Blake", "Casey", "Dana", "Ellis", "Frankie", "Gale", "Harper",
    "Indra", "Jules", "Kit", "Lane", "Morgan", "Noel", "Oakley", "Perry",
    "Quinn", "Reese", "Sage", "Tatum",
];

/// Entity store for all live characters.
#[derive(Debug, Default)]
pub struct CharacterRegistry {
    characters: HashMap<CharacterId, Character>,
}

impl CharacterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a character, returning its id.
    pub fn add(&mut self, character: Character) -> CharacterId {
        let id = character.id;
        debug!(%id, name = %character.name, "character added");
        self.characters.insert(id, character);
        id
    }

    /// Create a character with a random name and randomized traits.
    pub fn generate(&mut self) -> CharacterId {
        let mut rng = rand::thread_rng();
        let name = GENERATED_NAMES[rng.gen_range(0..GENERATED_NAMES.len())];
        let character = Character::new(format!("{name}-{}", rng.gen_range(10..100)))
            .with_traits(Traits::new(
                rng.gen_range(20.0..80.0),
                rng.gen_range(20.0..80.0),
                rng.gen_range(20.0..80.0),
                rng.gen_range(20.0..80.0),
                rng.gen_range(20.0..80.0),
            ))
            .with_mood(rng.gen_range(40.0..70.0));
        self.add(character)
    }

    /// Remove a character, returning it if it existed.
    ///
    /// The caller (the engine) is responsible for excising relationship
    /// edges and need records for the removed id.
    pub fn remove(&mut self, id: CharacterId) -> Option<Character> {
        let removed = self.characters.remove(&id);
        if removed.is_some() {
            debug!(%id, "character removed");
        }
        removed
    }

    /// Look up a character.
    #[must_use]
    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Look up a character mutably.
    pub fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Whether the id is present.
    #[must_use]
    pub fn contains(&self, id: CharacterId) -> bool {
        self.characters.contains_key(&id)
    }

    /// All live character ids.
    #[must_use]
    pub fn ids(&self) -> Vec<CharacterId> {
        self.characters.keys().copied().collect()
    }

    /// Iterate over all characters.
    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Number of live characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Set a character's lifecycle state. No-op for unknown ids.
    pub fn set_state(&mut self, id: CharacterId, state: CharacterState) {
        if let Some(character) = self.characters.get_mut(&id) {
            character.state = state;
        }
    }

    /// Shift a character's mood by `delta` (clamped). No-op for unknown ids.
    pub fn adjust_mood(&mut self, id: CharacterId, delta: f32) {
        if let Some(character) = self.characters.get_mut(&id) {
            character.adjust_mood(delta);
        }
    }

    /// Current mood, if the character exists.
    #[must_use]
    pub fn mood(&self, id: CharacterId) -> Option<f32> {
        self.characters.get(&id).map(|c| c.mood)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut registry = CharacterRegistry::new();
        let id = registry.add(Character::new("Mara"));

        let character = registry.get(id).expect("should exist");
        assert_eq!(character.name, "Mara");
        assert_eq!(character.state, CharacterState::Idle);
        assert!((character.mood - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn generate_produces_distinct_characters() {
        let mut registry = CharacterRegistry::new();
        let a = registry.generate();
        let b = registry.generate();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn mood_is_clamped() {
        let mut registry = CharacterRegistry::new();
        let id = registry.add(Character::new("Mara").with_mood(95.0));

        registry.adjust_mood(id, 50.0);
        assert!((registry.mood(id).expect("exists") - 100.0).abs() < f32::EPSILON);

        registry.adjust_mood(id, -250.0);
        assert!(registry.mood(id).expect("exists").abs() < f32::EPSILON);
    }

    #[test]
    fn remove_returns_character() {
        let mut registry = CharacterRegistry::new();
        let id = registry.add(Character::new("Mara"));

        let removed = registry.remove(id).expect("should return it");
        assert_eq!(removed.name, "Mara");
        assert!(!registry.contains(id));
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn characters_round_trip_through_json() {
        let character = Character::new("Mara")
            .with_appearance(vec!["red scarf".into()])
            .with_mood(62.0);
        let json = serde_json::to_string(&character).expect("serializes");
        let back: Character = serde_json::from_str(&json).expect("deserializes");

        assert_eq!(back.id, character.id);
        assert_eq!(back.appearance, character.appearance);
        assert!((back.mood - 62.0).abs() < f32::EPSILON);
    }

    #[test]
    fn state_changes_ignore_unknown_ids() {
        let mut registry = CharacterRegistry::new();
        registry.set_state(CharacterId::new(), CharacterState::Working);
        registry.adjust_mood(CharacterId::new(), 10.0);
        assert!(registry.is_empty());
    }
}
