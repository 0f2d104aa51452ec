//! Encounters — queued, multi-turn conversations between two characters.
//!
//! Encounters are requested (by the theme or by force) into a FIFO queue
//! and played out at most one per `process_next` call. Playing one out
//! runs a depth-scaled series of alternating exchanges, has both sides
//! privately reflect, applies relationship updates once per direction,
//! and puts both participants on cooldown.
//!
//! Wall-clock rate limiting lives here rather than in the tick loop so a
//! fast host tick cannot flood a local LLM with prompt traffic.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use ensemble_core::character::CharacterRegistry;
use ensemble_core::config::EncounterConfig;
use ensemble_core::relationship::RelationshipManager;
use ensemble_core::types::{CharacterId, CharacterState, SimTimestamp};

use crate::agent::{SocialAgent, TurnContext};
use crate::events::SimEvent;

/// Unique identifier for an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterId(pub Uuid);

impl EncounterId {
    /// Create a new random encounter ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EncounterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One spoken line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    /// Who spoke.
    pub speaker: CharacterId,
    /// Speaker's display name at the time.
    pub speaker_name: String,
    /// The line.
    pub text: String,
    /// Wall-clock time the line was produced.
    pub at: DateTime<Utc>,
}

/// Lifecycle of an encounter record.
///
/// There is no active or failed variant: an encounter plays out
/// synchronously inside a single `process_next` call (no observer can see
/// it mid-flight), and agent failures degrade to stub replies rather than
/// failing the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    /// Waiting in the queue.
    Queued,
    /// Played out; archived in the completed log.
    Completed,
}

/// A requested or completed conversation between two characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    /// Encounter id.
    pub id: EncounterId,
    /// First participant (speaks first).
    pub a: CharacterId,
    /// Second participant.
    pub b: CharacterId,
    /// Theme-supplied framing.
    pub context: String,
    /// When the encounter was queued.
    pub queued: SimTimestamp,
    /// Lines spoken, in order. Empty until played out.
    pub transcript: Vec<DialogueLine>,
    /// First participant's average sentiment, set on completion.
    pub sentiment_a: f32,
    /// Second participant's average sentiment, set on completion.
    pub sentiment_b: f32,
    /// First participant's private reflection, set on completion.
    pub note_a: String,
    /// Second participant's private reflection, set on completion.
    pub note_b: String,
    /// Lifecycle state.
    pub status: EncounterStatus,
}

/// How many alternating exchanges a conversation gets.
///
/// Depth grows with familiarity, peaks when both familiarity and mood are
/// high, and shrinks (never below one) when the pair is glum.
#[must_use]
pub fn conversation_depth(config: &EncounterConfig, familiarity: f32, mood: f32) -> u32 {
    let mut depth = 1;
    if familiarity >= config.depth2_familiarity {
        depth = 2;
    }
    if familiarity >= config.depth3_familiarity {
        depth = 3;
        if mood >= config.depth4_mood {
            depth = 4;
        }
    }
    if mood < config.low_mood_threshold {
        depth = (depth - 1).max(1);
    }
    depth
}

/// Owns the encounter queue, cooldowns, and the completed log.
pub struct EncounterManager {
    config: EncounterConfig,
    queue: VecDeque<Encounter>,
    cooldown_until: HashMap<CharacterId, u64>,
    last_process: Option<Instant>,
    bypass_rate_limit: bool,
    completed: VecDeque<Encounter>,
}

impl EncounterManager {
    /// Create a manager with the given tuning.
    #[must_use]
    pub fn new(config: EncounterConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            cooldown_until: HashMap::new(),
            last_process: None,
            bypass_rate_limit: false,
            completed: VecDeque::new(),
        }
    }

    /// Whether a character is still cooling down at `tick`.
    #[must_use]
    pub fn on_cooldown(&self, id: CharacterId, tick: u64) -> bool {
        self.cooldown_until.get(&id).is_some_and(|&until| tick < until)
    }

    /// Current queue length.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// The bounded completed-encounter log, oldest first.
    pub fn completed(&self) -> impl Iterator<Item = &Encounter> {
        self.completed.iter()
    }

    /// Request a conversation between `a` and `b`.
    ///
    /// Returns `None` (and logs why) when either id has no agent, either
    /// is on cooldown, or the unordered pair is already queued.
    pub fn queue_encounter(
        &mut self,
        a: CharacterId,
        b: CharacterId,
        tick: u64,
        context: String,
        agents: &HashMap<CharacterId, SocialAgent>,
    ) -> Option<EncounterId> {
        if a == b {
            return None;
        }
        if !agents.contains_key(&a) || !agents.contains_key(&b) {
            debug!(%a, %b, "encounter rejected: missing agent");
            return None;
        }
        if self.on_cooldown(a, tick) || self.on_cooldown(b, tick) {
            debug!(%a, %b, tick, "encounter rejected: cooldown");
            return None;
        }
        if self
            .queue
            .iter()
            .any(|e| (e.a == a && e.b == b) || (e.a == b && e.b == a))
        {
            debug!(%a, %b, "encounter rejected: pair already queued");
            return None;
        }

        let encounter = Encounter {
            id: EncounterId::new(),
            a,
            b,
            context,
            queued: SimTimestamp::now(tick),
            transcript: Vec::new(),
            sentiment_a: 0.0,
            sentiment_b: 0.0,
            note_a: String::new(),
            note_b: String::new(),
            status: EncounterStatus::Queued,
        };
        let id = encounter.id;
        debug!(encounter = %id, %a, %b, "encounter queued");
        self.queue.push_back(encounter);
        Some(id)
    }

    /// Queue an encounter jumping every gate: both cooldowns are cleared,
    /// the pair goes to the front of the queue, and the next
    /// `process_next` skips the rate limit once.
    pub fn force_encounter(
        &mut self,
        a: CharacterId,
        b: CharacterId,
        tick: u64,
        context: String,
        agents: &HashMap<CharacterId, SocialAgent>,
    ) -> Option<EncounterId> {
        self.cooldown_until.remove(&a);
        self.cooldown_until.remove(&b);
        let id = self.queue_encounter(a, b, tick, context, agents)?;
        if let Some(position) = self.queue.iter().position(|e| e.id == id)
            && position != 0
            && let Some(encounter) = self.queue.remove(position)
        {
            self.queue.push_front(encounter);
        }
        self.bypass_rate_limit = true;
        Some(id)
    }

    /// Drop a removed character's queued encounters and cooldown entry.
    pub fn remove_character(&mut self, id: CharacterId) {
        self.queue.retain(|e| e.a != id && e.b != id);
        self.cooldown_until.remove(&id);
    }

    /// Play out at most one queued encounter.
    ///
    /// Returns the events it produced, empty when the wall-clock rate
    /// limit has not elapsed or the queue is empty. Encounters whose
    /// participants have since disappeared are silently discarded.
    pub async fn process_next(
        &mut self,
        tick: u64,
        world_context: &str,
        agents: &HashMap<CharacterId, SocialAgent>,
        registry: &mut CharacterRegistry,
        relationships: &mut RelationshipManager,
    ) -> Vec<SimEvent> {
        let rate_limit = Duration::from_millis(self.config.rate_limit_ms);
        if !self.bypass_rate_limit
            && self.last_process.is_some_and(|at| at.elapsed() < rate_limit)
        {
            return Vec::new();
        }

        // Discard stale entries until a playable encounter surfaces.
        let mut encounter = loop {
            let Some(encounter) = self.queue.pop_front() else {
                return Vec::new();
            };
            if registry.contains(encounter.a)
                && registry.contains(encounter.b)
                && agents.contains_key(&encounter.a)
                && agents.contains_key(&encounter.b)
            {
                break encounter;
            }
            debug!(encounter = %encounter.id, "dropping stale queued encounter");
        };

        self.last_process = Some(Instant::now());
        self.bypass_rate_limit = false;

        let (a, b) = (encounter.a, encounter.b);
        let familiarity = {
            let ab = relationships.get(a, b).map_or(0.0, |r| r.familiarity);
            let ba = relationships.get(b, a).map_or(0.0, |r| r.familiarity);
            (ab + ba) / 2.0
        };
        let mood = {
            let ma = registry.mood(a).unwrap_or(50.0);
            let mb = registry.mood(b).unwrap_or(50.0);
            (ma + mb) / 2.0
        };
        let depth = conversation_depth(&self.config, familiarity, mood);

        registry.set_state(a, CharacterState::Talking);
        registry.set_state(b, CharacterState::Talking);

        debug!(encounter = %encounter.id, %a, %b, depth, "encounter started");
        let mut events = vec![SimEvent::EncounterStart {
            tick,
            encounter: encounter.id,
            a,
            b,
        }];

        let mut transcript: Vec<DialogueLine> = Vec::new();
        let mut sentiment_sums = (0.0f32, 0.0f32);

        for _ in 0..depth {
            for (speaker, listener) in [(a, b), (b, a)] {
                let reply = {
                    let (Some(character), Some(partner)) =
                        (registry.get(speaker), registry.get(listener))
                    else {
                        continue;
                    };
                    let Some(agent) = agents.get(&speaker) else {
                        continue;
                    };
                    let ctx = TurnContext {
                        character,
                        partner,
                        relationship_context: relationships.context_for(
                            speaker,
                            listener,
                            &partner.name,
                        ),
                        world_context,
                        situation: &encounter.context,
                        rapport: relationships.rapport(speaker, listener),
                        transcript: &transcript,
                    };
                    agent.respond(&ctx).await
                };

                if speaker == a {
                    sentiment_sums.0 += reply.sentiment;
                } else {
                    sentiment_sums.1 += reply.sentiment;
                }

                let line = DialogueLine {
                    speaker,
                    speaker_name: registry
                        .get(speaker)
                        .map_or_else(String::new, |c| c.name.clone()),
                    text: reply.text,
                    at: Utc::now(),
                };
                events.push(SimEvent::DialogueLine {
                    tick,
                    encounter: encounter.id,
                    line: line.clone(),
                });
                transcript.push(line);
            }
        }

        let turns = depth as f32;
        let sentiment_a = sentiment_sums.0 / turns;
        let sentiment_b = sentiment_sums.1 / turns;

        // Both sides take private stock of the conversation.
        let note_a = Self::reflect_one(a, b, &encounter, world_context, &transcript, agents, registry, relationships).await;
        let note_b = Self::reflect_one(b, a, &encounter, world_context, &transcript, agents, registry, relationships).await;

        relationships.update_after_encounter(a, b, sentiment_a, note_a.clone(), tick);
        relationships.update_after_encounter(b, a, sentiment_b, note_b.clone(), tick);

        self.cooldown_until.insert(a, tick + self.config.cooldown_ticks);
        self.cooldown_until.insert(b, tick + self.config.cooldown_ticks);

        for (id, sentiment) in [(a, sentiment_a), (b, sentiment_b)] {
            registry.set_state(id, CharacterState::Idle);
            if let Some(character) = registry.get_mut(id) {
                character.stats.social_interactions += 1;
                if sentiment.abs() >= self.config.memorable_sentiment_threshold {
                    character.stats.memorable_moments += 1;
                }
            }
        }

        events.push(SimEvent::EncounterEnd {
            tick,
            encounter: encounter.id,
            a,
            b,
            sentiment_a,
            sentiment_b,
            exchanges: depth,
        });
        debug!(encounter = %encounter.id, sentiment_a, sentiment_b, "encounter ended");

        encounter.transcript = transcript;
        encounter.sentiment_a = sentiment_a;
        encounter.sentiment_b = sentiment_b;
        encounter.note_a = note_a;
        encounter.note_b = note_b;
        encounter.status = EncounterStatus::Completed;
        self.completed.push_back(encounter);
        while self.completed.len() > self.config.completed_log_capacity {
            self.completed.pop_front();
        }

        events
    }

    #[allow(clippy::too_many_arguments)]
    async fn reflect_one(
        speaker: CharacterId,
        listener: CharacterId,
        encounter: &Encounter,
        world_context: &str,
        transcript: &[DialogueLine],
        agents: &HashMap<CharacterId, SocialAgent>,
        registry: &CharacterRegistry,
        relationships: &RelationshipManager,
    ) -> String {
        let (Some(character), Some(partner)) = (registry.get(speaker), registry.get(listener))
        else {
            return String::new();
        };
        let Some(agent) = agents.get(&speaker) else {
            return String::new();
        };
        let ctx = TurnContext {
            character,
            partner,
            relationship_context: relationships.context_for(speaker, listener, &partner.name),
            world_context,
            situation: &encounter.context,
            rapport: relationships.rapport(speaker, listener),
            transcript,
        };
        agent.reflect(&ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_core::character::Character;
    use ensemble_core::config::RelationshipConfig;

    fn depth(familiarity: f32, mood: f32) -> u32 {
        conversation_depth(&EncounterConfig::default(), familiarity, mood)
    }

    #[test]
    fn depth_scales_with_familiarity_and_mood() {
        assert_eq!(depth(0.0, 50.0), 1);
        assert_eq!(depth(30.0, 50.0), 2);
        assert_eq!(depth(50.0, 50.0), 3);
        assert_eq!(depth(50.0, 60.0), 4);
        assert_eq!(depth(60.0, 70.0), 4);
    }

    #[test]
    fn low_mood_shortens_but_never_kills() {
        assert_eq!(depth(0.0, 20.0), 1);
        assert_eq!(depth(35.0, 20.0), 1);
        assert_eq!(depth(55.0, 20.0), 2);
    }

    struct Fixture {
        manager: EncounterManager,
        registry: CharacterRegistry,
        relationships: RelationshipManager,
        agents: HashMap<CharacterId, SocialAgent>,
        a: CharacterId,
        b: CharacterId,
    }

    fn fixture() -> Fixture {
        let mut registry = CharacterRegistry::new();
        let a = registry.add(Character::new("Mara").with_mood(70.0));
        let b = registry.add(Character::new("Jules").with_mood(70.0));

        let mut relationships = RelationshipManager::new(RelationshipConfig::default());
        relationships.add_character(a, &[]);
        relationships.add_character(b, &[a]);

        let mut agents = HashMap::new();
        agents.insert(a, SocialAgent::new_stub());
        agents.insert(b, SocialAgent::new_stub());

        Fixture {
            manager: EncounterManager::new(EncounterConfig::default()),
            registry,
            relationships,
            agents,
            a,
            b,
        }
    }

    #[test]
    fn queue_rejects_bad_requests() {
        let mut f = fixture();
        let stranger = CharacterId::new();

        assert!(f.manager.queue_encounter(f.a, f.a, 1, String::new(), &f.agents).is_none());
        assert!(f.manager.queue_encounter(f.a, stranger, 1, String::new(), &f.agents).is_none());

        assert!(f.manager.queue_encounter(f.a, f.b, 1, String::new(), &f.agents).is_some());
        // Same unordered pair cannot queue twice.
        assert!(f.manager.queue_encounter(f.b, f.a, 1, String::new(), &f.agents).is_none());
    }

    #[tokio::test]
    async fn encounter_runs_and_updates_both_directions() {
        let mut f = fixture();
        f.manager
            .queue_encounter(f.a, f.b, 5, "the break room".into(), &f.agents)
            .expect("queued");

        let events = f
            .manager
            .process_next(5, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;

        assert!(matches!(events.first(), Some(SimEvent::EncounterStart { .. })));
        assert!(matches!(events.last(), Some(SimEvent::EncounterEnd { .. })));
        // Depth 1 at familiarity 0: one exchange, two lines.
        let lines = events
            .iter()
            .filter(|e| matches!(e, SimEvent::DialogueLine { .. }))
            .count();
        assert_eq!(lines, 2);

        let ab = f.relationships.get(f.a, f.b).expect("edge");
        let ba = f.relationships.get(f.b, f.a).expect("edge");
        assert_eq!(ab.interaction_count, 1);
        assert_eq!(ba.interaction_count, 1);
        assert!((ab.familiarity - 3.0).abs() < f32::EPSILON);

        assert!(f.manager.on_cooldown(f.a, 6));
        assert!(f.manager.on_cooldown(f.b, 6));
        assert!(!f.manager.on_cooldown(f.a, 5 + 30));

        let mara = f.registry.get(f.a).expect("exists");
        assert_eq!(mara.state, CharacterState::Idle);
        assert_eq!(mara.stats.social_interactions, 1);
        assert_eq!(f.manager.completed().count(), 1);
    }

    #[tokio::test]
    async fn archive_keeps_both_reflections() {
        let mut f = fixture();
        f.manager
            .queue_encounter(f.a, f.b, 5, "the break room".into(), &f.agents)
            .expect("queued");
        f.manager
            .process_next(5, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;

        let archived = f.manager.completed().next().expect("archived");
        assert_eq!(archived.status, EncounterStatus::Completed);
        // Each side's private note survives alongside the transcript, not
        // only in the relationship edges.
        assert!(archived.note_a.contains("Jules"));
        assert!(archived.note_b.contains("Mara"));
    }

    #[tokio::test]
    async fn cooldown_blocks_requeue_for_both() {
        let mut f = fixture();
        let c = f.registry.add(Character::new("Kit"));
        f.relationships.add_character(c, &[f.a, f.b]);
        f.agents.insert(c, SocialAgent::new_stub());

        f.manager
            .queue_encounter(f.a, f.b, 1, String::new(), &f.agents)
            .expect("queued");
        f.manager
            .process_next(1, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;

        // Both the same pair and a fresh partner are blocked during cooldown.
        assert!(f.manager.queue_encounter(f.a, f.b, 10, String::new(), &f.agents).is_none());
        assert!(f.manager.queue_encounter(f.a, c, 10, String::new(), &f.agents).is_none());
        // After the cooldown expires the pair may meet again.
        assert!(f.manager.queue_encounter(f.a, c, 31, String::new(), &f.agents).is_some());
    }

    #[tokio::test]
    async fn rate_limit_spaces_out_processing() {
        let mut f = fixture();
        let c = f.registry.add(Character::new("Kit"));
        f.relationships.add_character(c, &[f.a, f.b]);
        f.agents.insert(c, SocialAgent::new_stub());

        f.manager
            .queue_encounter(f.a, f.b, 1, String::new(), &f.agents)
            .expect("queued");
        f.manager
            .queue_encounter(f.a, c, 1, String::new(), &f.agents)
            .expect("queued");

        let first = f
            .manager
            .process_next(1, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;
        assert!(!first.is_empty());

        // Within the rate-limit window the second request is a no-op.
        let second = f
            .manager
            .process_next(2, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;
        assert!(second.is_empty());
        assert_eq!(f.manager.queued_len(), 1);
    }

    #[tokio::test]
    async fn force_bypasses_cooldown_and_rate_limit() {
        let mut f = fixture();
        f.manager
            .queue_encounter(f.a, f.b, 1, String::new(), &f.agents)
            .expect("queued");
        f.manager
            .process_next(1, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;

        // Cooldown is live, the rate limit window is open, yet force runs.
        f.manager
            .force_encounter(f.a, f.b, 2, String::new(), &f.agents)
            .expect("forced");
        let events = f
            .manager
            .process_next(2, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;
        assert!(matches!(events.first(), Some(SimEvent::EncounterStart { .. })));
    }

    #[tokio::test]
    async fn removed_participant_discards_queued_encounter() {
        let mut f = fixture();
        f.manager
            .queue_encounter(f.a, f.b, 1, String::new(), &f.agents)
            .expect("queued");

        f.registry.remove(f.b);
        let events = f
            .manager
            .process_next(1, "", &f.agents, &mut f.registry, &mut f.relationships)
            .await;
        assert!(events.is_empty());
        assert_eq!(f.manager.queued_len(), 0);
    }

    #[test]
    fn remove_character_clears_queue_and_cooldown() {
        let mut f = fixture();
        f.manager
            .queue_encounter(f.a, f.b, 1, String::new(), &f.agents)
            .expect("queued");
        f.manager.remove_character(f.b);
        assert_eq!(f.manager.queued_len(), 0);
    }
}
