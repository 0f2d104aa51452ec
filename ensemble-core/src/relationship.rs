//! Directional relationship graph.
//!
//! Every ordered pair of live characters has at most one edge, keyed
//! `(from, to)` and fully independent of the reverse edge: A's view of B
//! is updated with A's own sentiment from an encounter, never with B's.
//! Affection and resentment therefore need not be mutual.
//!
//! Trust, liking and respect start neutral at 50 and move with sentiment.
//! Familiarity starts at 0 and only ever rises — how well you know
//! someone is independent of how the interactions felt.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::config::RelationshipConfig;
use crate::types::{CharacterId, clamp_scale, clamp_sentiment};

/// One direction of a pairwise relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Confidence the other will act well (0–100, starts 50).
    pub trust: f32,
    /// Plain affection (0–100, starts 50).
    pub liking: f32,
    /// Regard for the other's competence and character (0–100, starts 50).
    pub respect: f32,
    /// Monotone measure of shared history (0–100, starts 0).
    pub familiarity: f32,
    /// Total encounters between the pair, from this side's bookkeeping.
    pub interaction_count: u32,
    /// Ring buffer of the most recent sentiments (-1..+1).
    pub recent_sentiments: VecDeque<f32>,
    /// FIFO of free-text reflections produced after encounters.
    pub memory_notes: VecDeque<String>,
    /// Tick of the last interaction, if any.
    pub last_interaction: Option<u64>,
}

impl Relationship {
    /// A brand-new edge with neutral defaults.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            trust: 50.0,
            liking: 50.0,
            respect: 50.0,
            familiarity: 0.0,
            interaction_count: 0,
            recent_sentiments: VecDeque::new(),
            memory_notes: VecDeque::new(),
            last_interaction: None,
        }
    }

    /// Mean of the recent sentiment ring (0.0 when empty).
    #[must_use]
    pub fn average_sentiment(&self) -> f32 {
        if self.recent_sentiments.is_empty() {
            return 0.0;
        }
        self.recent_sentiments.iter().sum::<f32>() / self.recent_sentiments.len() as f32
    }
}

impl Default for Relationship {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Discrete rapport label derived purely from familiarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rapport {
    /// Familiarity below 5.
    Stranger,
    /// Familiarity 5–14.
    Colleague,
    /// Familiarity 15–29.
    Acquaintance,
    /// Familiarity 30–49.
    Friend,
    /// Familiarity 50 and up.
    CloseFriend,
}

impl Rapport {
    /// Classify a familiarity value.
    #[must_use]
    pub fn from_familiarity(familiarity: f32) -> Self {
        match familiarity {
            f if f >= 50.0 => Self::CloseFriend,
            f if f >= 30.0 => Self::Friend,
            f if f >= 15.0 => Self::Acquaintance,
            f if f >= 5.0 => Self::Colleague,
            _ => Self::Stranger,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stranger => "stranger",
            Self::Colleague => "colleague",
            Self::Acquaintance => "acquaintance",
            Self::Friend => "friend",
            Self::CloseFriend => "close friend",
        }
    }
}

impl fmt::Display for Rapport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Owns every directional edge in the simulation.
#[derive(Debug)]
pub struct RelationshipManager {
    config: RelationshipConfig,
    edges: HashMap<(CharacterId, CharacterId), Relationship>,
}

impl RelationshipManager {
    /// Create an empty graph with the given tuning.
    #[must_use]
    pub fn new(config: RelationshipConfig) -> Self {
        Self {
            config,
            edges: HashMap::new(),
        }
    }

    /// Wire a new character into the graph: neutral edges in both
    /// directions to every existing character.
    pub fn add_character(&mut self, new_id: CharacterId, existing: &[CharacterId]) {
        for &other in existing {
            if other == new_id {
                continue;
            }
            self.edges.entry((new_id, other)).or_insert_with(Relationship::neutral);
            self.edges.entry((other, new_id)).or_insert_with(Relationship::neutral);
        }
    }

    /// Delete every edge where `id` is source or target.
    pub fn remove_character(&mut self, id: CharacterId) {
        self.edges.retain(|(from, to), _| *from != id && *to != id);
    }

    /// Look up an edge without creating it.
    #[must_use]
    pub fn get(&self, from: CharacterId, to: CharacterId) -> Option<&Relationship> {
        self.edges.get(&(from, to))
    }

    /// Look up an edge, lazily creating it with neutral defaults.
    pub fn get_or_create(&mut self, from: CharacterId, to: CharacterId) -> &mut Relationship {
        self.edges.entry((from, to)).or_insert_with(Relationship::neutral)
    }

    /// All outgoing edges for a character.
    #[must_use]
    pub fn relationships_for(&self, id: CharacterId) -> Vec<(CharacterId, &Relationship)> {
        self.edges
            .iter()
            .filter(|((from, _), _)| *from == id)
            .map(|((_, to), rel)| (*to, rel))
            .collect()
    }

    /// Total edge count (both directions counted separately).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether any edge references `id` in either direction.
    #[must_use]
    pub fn references(&self, id: CharacterId) -> bool {
        self.edges.keys().any(|(from, to)| *from == id || *to == id)
    }

    /// Apply one side's outcome of an encounter to the `from → to` edge.
    ///
    /// Trust, liking and respect move with the (clamped) sentiment at
    /// their configured scales; familiarity rises by a fixed amount
    /// regardless of sign. The reverse edge is untouched.
    pub fn update_after_encounter(
        &mut self,
        from: CharacterId,
        to: CharacterId,
        sentiment: f32,
        memory_note: impl Into<String>,
        tick: u64,
    ) {
        let sentiment = clamp_sentiment(sentiment);
        let base = sentiment * self.config.sentiment_scale;
        let trust_delta = base * self.config.trust_scale;
        let liking_delta = base * self.config.liking_scale;
        let respect_delta = base * self.config.respect_scale;
        let familiarity_gain = self.config.familiarity_gain;
        let capacity = self.config.history_capacity;

        let edge = self.get_or_create(from, to);
        edge.trust = clamp_scale(edge.trust + trust_delta);
        edge.liking = clamp_scale(edge.liking + liking_delta);
        edge.respect = clamp_scale(edge.respect + respect_delta);
        edge.familiarity = clamp_scale(edge.familiarity + familiarity_gain);
        edge.interaction_count += 1;
        edge.last_interaction = Some(tick);

        edge.recent_sentiments.push_back(sentiment);
        while edge.recent_sentiments.len() > capacity {
            edge.recent_sentiments.pop_front();
        }

        let note = memory_note.into();
        if !note.is_empty() {
            edge.memory_notes.push_back(note);
            while edge.memory_notes.len() > capacity {
                edge.memory_notes.pop_front();
            }
        }
    }

    /// Rapport label for the `from → to` direction (Stranger if no edge).
    #[must_use]
    pub fn rapport(&self, from: CharacterId, to: CharacterId) -> Rapport {
        self.get(from, to)
            .map_or(Rapport::Stranger, |r| Rapport::from_familiarity(r.familiarity))
    }

    /// Render the `from → to` edge as a short text block for an agent's
    /// situational context.
    #[must_use]
    pub fn context_for(&self, from: CharacterId, to: CharacterId, to_name: &str) -> String {
        let Some(edge) = self.get(from, to) else {
            return format!("You have never met {to_name} before.");
        };
        if edge.interaction_count == 0 {
            return format!("You have never met {to_name} before.");
        }

        let rapport = Rapport::from_familiarity(edge.familiarity);
        let mut out = format!(
            "{to_name} is a {rapport} ({} conversations so far). \
             Trust {:.0}/100, liking {:.0}/100, respect {:.0}/100.",
            edge.interaction_count, edge.trust, edge.liking, edge.respect,
        );

        let avg = edge.average_sentiment();
        if avg > 0.3 {
            out.push_str(" Recent conversations have felt good.");
        } else if avg < -0.3 {
            out.push_str(" Recent conversations have gone badly.");
        }

        if !edge.memory_notes.is_empty() {
            out.push_str(" You remember: ");
            let notes: Vec<&str> = edge
                .memory_notes
                .iter()
                .rev()
                .take(3)
                .map(String::as_str)
                .collect();
            out.push_str(&notes.join("; "));
            out.push('.');
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RelationshipManager {
        RelationshipManager::new(RelationshipConfig::default())
    }

    #[test]
    fn add_character_creates_both_directions() {
        let mut rels = manager();
        let (a, b, c) = (CharacterId::new(), CharacterId::new(), CharacterId::new());

        rels.add_character(a, &[]);
        rels.add_character(b, &[a]);
        rels.add_character(c, &[a, b]);

        // 2 edges for (a,b) + 4 edges touching c.
        assert_eq!(rels.edge_count(), 6);
        assert!(rels.get(a, b).is_some());
        assert!(rels.get(b, a).is_some());
        assert!(rels.get(c, a).is_some());
    }

    #[test]
    fn directions_never_leak() {
        let mut rels = manager();
        let (a, b) = (CharacterId::new(), CharacterId::new());
        rels.add_character(a, &[]);
        rels.add_character(b, &[a]);

        rels.update_after_encounter(a, b, 0.8, "they were great", 10);
        rels.update_after_encounter(b, a, -0.8, "they were awful", 10);

        let ab = rels.get(a, b).expect("edge a→b");
        let ba = rels.get(b, a).expect("edge b→a");
        assert!(ab.liking > 50.0, "a should like b more");
        assert!(ba.liking < 50.0, "b should like a less");
        // Both still got to know each other.
        assert!((ab.familiarity - ba.familiarity).abs() < f32::EPSILON);
        assert!(ab.familiarity > 0.0);
    }

    #[test]
    fn delta_scales_match_tuning() {
        let mut rels = manager();
        let (a, b) = (CharacterId::new(), CharacterId::new());

        rels.update_after_encounter(a, b, 1.0, "", 1);
        let edge = rels.get(a, b).expect("edge");

        // sentiment 1.0 → base 5.0 → trust +4, liking +5, respect +2.5
        assert!((edge.trust - 54.0).abs() < 0.001);
        assert!((edge.liking - 55.0).abs() < 0.001);
        assert!((edge.respect - 52.5).abs() < 0.001);
        assert!((edge.familiarity - 3.0).abs() < 0.001);
    }

    #[test]
    fn familiarity_rises_even_on_bad_encounters() {
        let mut rels = manager();
        let (a, b) = (CharacterId::new(), CharacterId::new());

        for i in 0..5 {
            rels.update_after_encounter(a, b, -1.0, "argued again", i);
        }

        let edge = rels.get(a, b).expect("edge");
        assert!((edge.familiarity - 15.0).abs() < 0.001);
        assert!(edge.liking < 50.0);
    }

    #[test]
    fn history_buffers_are_bounded() {
        let mut rels = manager();
        let (a, b) = (CharacterId::new(), CharacterId::new());

        for i in 0..25 {
            rels.update_after_encounter(a, b, 0.1, format!("note {i}"), i);
        }

        let edge = rels.get(a, b).expect("edge");
        assert_eq!(edge.recent_sentiments.len(), 10);
        assert_eq!(edge.memory_notes.len(), 10);
        // Oldest entries dropped.
        assert_eq!(edge.memory_notes.front().map(String::as_str), Some("note 15"));
        assert_eq!(edge.interaction_count, 25);
    }

    #[test]
    fn rapport_thresholds() {
        assert_eq!(Rapport::from_familiarity(0.0), Rapport::Stranger);
        assert_eq!(Rapport::from_familiarity(5.0), Rapport::Colleague);
        assert_eq!(Rapport::from_familiarity(15.0), Rapport::Acquaintance);
        assert_eq!(Rapport::from_familiarity(30.0), Rapport::Friend);
        assert_eq!(Rapport::from_familiarity(50.0), Rapport::CloseFriend);
    }

    #[test]
    fn remove_character_excises_every_edge() {
        let mut rels = manager();
        let (a, b, c) = (CharacterId::new(), CharacterId::new(), CharacterId::new());
        rels.add_character(a, &[]);
        rels.add_character(b, &[a]);
        rels.add_character(c, &[a, b]);

        rels.remove_character(b);

        assert!(!rels.references(b));
        assert!(rels.relationships_for(b).is_empty());
        // The a↔c edges survive.
        assert_eq!(rels.edge_count(), 2);
    }

    #[test]
    fn context_mentions_rapport_and_notes() {
        let mut rels = manager();
        let (a, b) = (CharacterId::new(), CharacterId::new());

        let stranger_ctx = rels.context_for(a, b, "Noor");
        assert!(stranger_ctx.contains("never met"));

        for i in 0..6 {
            rels.update_after_encounter(a, b, 0.7, "shared a joke about the printer", i);
        }

        let ctx = rels.context_for(a, b, "Noor");
        assert!(ctx.contains("Noor"));
        assert!(ctx.contains("acquaintance"));
        assert!(ctx.contains("printer"));
        assert!(ctx.contains("felt good"));
    }
}
