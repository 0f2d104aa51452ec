//! The simulation engine — a fixed-order tick pipeline over the core
//! subsystems.
//!
//! One `tick_once` call advances needs, work tasks, world events, encounter
//! intake, and at most one queued encounter, in that order. Every
//! externally visible effect is returned as a [`SimEvent`] list and pushed
//! to subscribers. The pipeline never errors: unknown ids are ignored,
//! LLM failures degrade inside the agents, and panicking subscribers are
//! caught per callback.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{info, warn};

use ensemble_core::character::{Character, CharacterRegistry};
use ensemble_core::config::EngineConfig;
use ensemble_core::needs::{NeedKind, NeedsManager};
use ensemble_core::relationship::RelationshipManager;
use ensemble_core::task::{TaskCatalog, TaskId, TaskManager};
use ensemble_core::types::{CharacterId, CharacterState};
use ensemble_core::world_event::{EventManager, WorldEventCatalog, WorldEventChange};
use ensemble_llm::{CostTracker, LlmClient, LlmProvider};

use crate::adapter::ThemeAdapter;
use crate::agent::SocialAgent;
use crate::encounter::EncounterManager;
use crate::events::SimEvent;

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not started, or stopped.
    Stopped,
    /// Ticking.
    Running,
    /// Suspended; `tick_once` is a no-op.
    Paused,
}

/// Handle returned by [`SocialEngine::on_event`]; pass back to
/// [`SocialEngine::unsubscribe`] to detach the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type EventCallback = Box<dyn Fn(&SimEvent)>;

/// Owns every subsystem and drives the simulation.
pub struct SocialEngine {
    config: EngineConfig,
    state: EngineState,
    tick: u64,
    registry: CharacterRegistry,
    needs: NeedsManager,
    relationships: RelationshipManager,
    world_events: EventManager,
    tasks: TaskManager,
    encounters: EncounterManager,
    agents: HashMap<CharacterId, SocialAgent>,
    adapter: Box<dyn ThemeAdapter>,
    subscribers: Vec<(u64, EventCallback)>,
    next_subscription: u64,
    cost: CostTracker,
    llm: Option<Arc<LlmClient>>,
    budget_warned: bool,
}

impl SocialEngine {
    /// Build an engine from config, the two content catalogs, and a theme
    /// adapter. An LLM client is constructed when `config.llm.provider` is
    /// `"ollama"` or `"openai"`; otherwise every agent is rule-based.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        world_events: WorldEventCatalog,
        tasks: TaskCatalog,
        adapter: Box<dyn ThemeAdapter>,
    ) -> Self {
        let llm = match config.llm.provider.as_str() {
            "ollama" => Some(Arc::new(LlmClient::new(
                LlmProvider::Ollama {
                    base_url: config.llm.base_url.clone(),
                },
                config.llm.model.clone(),
                config.llm.max_retries,
            ))),
            "openai" => Some(Arc::new(LlmClient::new(
                LlmProvider::OpenAiCompatible {
                    base_url: config.llm.base_url.clone(),
                    api_key: config.llm.api_key.clone().unwrap_or_default(),
                },
                config.llm.model.clone(),
                config.llm.max_retries,
            ))),
            _ => None,
        };

        Self {
            state: EngineState::Stopped,
            tick: 0,
            registry: CharacterRegistry::new(),
            needs: NeedsManager::new(config.needs.clone()),
            relationships: RelationshipManager::new(config.relationship.clone()),
            world_events: EventManager::new(world_events, config.world_events.clone()),
            tasks: TaskManager::new(tasks, config.tasks.clone()),
            encounters: EncounterManager::new(config.encounter.clone()),
            agents: HashMap::new(),
            adapter,
            subscribers: Vec::new(),
            next_subscription: 0,
            cost: CostTracker::new(),
            llm,
            budget_warned: false,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start ticking. Only valid from `Stopped`; returns whether the state
    /// changed.
    pub fn start(&mut self) -> bool {
        if self.state != EngineState::Stopped {
            return false;
        }
        self.state = EngineState::Running;
        info!("engine started");
        self.emit(SimEvent::EngineStarted { tick: self.tick });
        true
    }

    /// Pause; `tick_once` becomes a no-op until resumed.
    pub fn pause(&mut self) -> bool {
        if self.state != EngineState::Running {
            return false;
        }
        self.state = EngineState::Paused;
        self.emit(SimEvent::EnginePaused { tick: self.tick });
        true
    }

    /// Resume from pause.
    pub fn resume(&mut self) -> bool {
        if self.state != EngineState::Paused {
            return false;
        }
        self.state = EngineState::Running;
        self.emit(SimEvent::EngineResumed { tick: self.tick });
        true
    }

    /// Stop the engine.
    pub fn stop(&mut self) -> bool {
        if self.state == EngineState::Stopped {
            return false;
        }
        self.state = EngineState::Stopped;
        info!("engine stopped");
        self.emit(SimEvent::EngineStopped { tick: self.tick });
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Ticks elapsed since construction.
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    // -----------------------------------------------------------------------
    // Characters
    // -----------------------------------------------------------------------

    /// Add a character and wire it into every subsystem.
    pub fn add_character(&mut self, character: Character) -> CharacterId {
        let id = self.registry.add(character);
        self.wire_character(id);
        id
    }

    /// Create a randomly named character and wire it in.
    pub fn generate_character(&mut self) -> CharacterId {
        let id = self.registry.generate();
        self.wire_character(id);
        id
    }

    fn wire_character(&mut self, id: CharacterId) {
        let others: Vec<CharacterId> =
            self.registry.ids().into_iter().filter(|&o| o != id).collect();
        self.relationships.add_character(id, &others);
        self.needs.register(id);
        let agent = match &self.llm {
            Some(client) => {
                SocialAgent::new_llm(Arc::clone(client), self.cost.clone(), &self.config.llm)
            }
            None => SocialAgent::new_stub(),
        };
        self.agents.insert(id, agent);
    }

    /// Remove a character, excising its relationships, needs, queued
    /// encounters, and agent. Returns the character if it existed.
    pub fn remove_character(&mut self, id: CharacterId) -> Option<Character> {
        let removed = self.registry.remove(id)?;
        self.relationships.remove_character(id);
        self.needs.unregister(id);
        self.encounters.remove_character(id);
        self.agents.remove(&id);
        Some(removed)
    }

    /// The character registry.
    #[must_use]
    pub fn registry(&self) -> &CharacterRegistry {
        &self.registry
    }

    /// The relationship graph.
    #[must_use]
    pub fn relationships(&self) -> &RelationshipManager {
        &self.relationships
    }

    /// The task manager.
    #[must_use]
    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    /// The encounter manager.
    #[must_use]
    pub fn encounters(&self) -> &EncounterManager {
        &self.encounters
    }

    // -----------------------------------------------------------------------
    // Subscribers
    // -----------------------------------------------------------------------

    /// Subscribe to the event stream. The callback runs synchronously for
    /// every emitted event; a panicking callback is caught and logged.
    pub fn on_event(&mut self, callback: impl Fn(&SimEvent) + 'static) -> Subscription {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        Subscription(id)
    }

    /// Detach a subscriber.
    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscribers.retain(|(id, _)| *id != subscription.0);
    }

    fn emit(&self, event: SimEvent) {
        for (id, callback) in &self.subscribers {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                warn!(subscriber = *id, "event subscriber panicked");
            }
        }
    }

    fn dispatch(&self, events: &[SimEvent]) {
        for event in events {
            self.emit(event.clone());
        }
    }

    // -----------------------------------------------------------------------
    // Tick pipeline
    // -----------------------------------------------------------------------

    /// Advance the simulation by one tick.
    ///
    /// No-op unless `Running`. Returns every event produced, in order;
    /// subscribers see the same list.
    pub async fn tick_once(&mut self) -> Vec<SimEvent> {
        if self.state != EngineState::Running {
            return Vec::new();
        }
        self.tick += 1;
        let tick = self.tick;
        let mut out = Vec::new();

        // Needs rise; urgencies fire once per crossing.
        for urgent in self.needs.tick() {
            self.adapter.on_need_urgent(urgent.character, urgent.kind, urgent.value);
            out.push(SimEvent::NeedUrgent {
                tick,
                character: urgent.character,
                kind: urgent.kind,
                value: urgent.value,
            });
        }
        for id in self.registry.ids() {
            let penalty = self.needs.mood_penalty(id);
            if penalty < 0.0 {
                self.registry.adjust_mood(id, penalty);
            }
        }

        // Work tasks progress while assignees are ready.
        let outcome = {
            let adapter = &self.adapter;
            self.tasks.tick(tick, |id| adapter.can_work(id))
        };
        for (id, delta) in outcome.mood_deltas {
            self.registry.adjust_mood(id, delta);
        }
        for done in outcome.completed {
            for &id in &done.assigned_to {
                self.registry.adjust_mood(id, done.completion_mood_boost);
                self.registry.set_state(id, CharacterState::Idle);
            }
            out.push(SimEvent::TaskCompleted {
                tick,
                task: done.id,
                def_name: done.def_name,
                characters: done.assigned_to,
            });
        }

        // World events expire and roll.
        for change in self.world_events.tick(tick) {
            self.adapter.on_event(&change);
            out.push(match change {
                WorldEventChange::Started(event) => SimEvent::WorldEventStarted { tick, event },
                WorldEventChange::Ended(event) => SimEvent::WorldEventEnded { tick, event },
            });
        }

        // Encounter intake, gated by the spend budget.
        if self.is_over_budget() {
            if !self.budget_warned {
                warn!(
                    cap_usd = self.config.budget.cap_usd,
                    spent = self.cost.total_cost(),
                    "budget reached; no new encounters will start"
                );
                self.budget_warned = true;
            }
        } else {
            for (a, b) in self.adapter.encounter_candidates(tick) {
                if self.adapter.can_encounter(a, b) {
                    let context = self.adapter.encounter_context(a, b);
                    self.encounters.queue_encounter(a, b, tick, context, &self.agents);
                }
            }
        }

        // At most one encounter plays out per tick.
        let summary = self.world_events.active_summary();
        let encounter_events = self
            .encounters
            .process_next(tick, &summary, &self.agents, &mut self.registry, &mut self.relationships)
            .await;
        out.extend(encounter_events);

        self.dispatch(&out);
        out
    }

    // -----------------------------------------------------------------------
    // Manual overrides
    // -----------------------------------------------------------------------

    /// Run an encounter between two characters right now, ignoring
    /// cooldowns and the rate limit. Returns the produced events (empty if
    /// either character is unknown).
    pub async fn force_encounter(&mut self, a: CharacterId, b: CharacterId) -> Vec<SimEvent> {
        let context = self.adapter.encounter_context(a, b);
        if self
            .encounters
            .force_encounter(a, b, self.tick, context, &self.agents)
            .is_none()
        {
            return Vec::new();
        }
        let summary = self.world_events.active_summary();
        let events = self
            .encounters
            .process_next(self.tick, &summary, &self.agents, &mut self.registry, &mut self.relationships)
            .await;
        self.dispatch(&events);
        events
    }

    /// Start a world event by fiat. Returns the emitted event, or `None`
    /// for unknown or already-active types.
    pub fn inject_world_event(
        &mut self,
        name: &str,
        description_override: Option<String>,
    ) -> Option<SimEvent> {
        let change = self.world_events.inject(name, self.tick, description_override)?;
        self.adapter.on_event(&change);
        let event = match change {
            WorldEventChange::Started(event) => SimEvent::WorldEventStarted {
                tick: self.tick,
                event,
            },
            WorldEventChange::Ended(event) => SimEvent::WorldEventEnded {
                tick: self.tick,
                event,
            },
        };
        self.emit(event.clone());
        Some(event)
    }

    /// Satisfy one of a character's needs. Returns `false` for unknown ids.
    pub fn satisfy_need(&mut self, id: CharacterId, kind: NeedKind) -> bool {
        self.needs.satisfy(id, kind)
    }

    /// Assign a task to characters, marking them `Working`. Returns `None`
    /// for unknown task types or if any character is unknown.
    pub fn assign_task(
        &mut self,
        type_name: &str,
        characters: Vec<CharacterId>,
        zone: Option<String>,
    ) -> Option<TaskId> {
        if !characters.iter().all(|&id| self.registry.contains(id)) {
            return None;
        }
        let assigned = characters.clone();
        let id = self.tasks.assign(type_name, characters, zone, self.tick)?;
        for character in assigned {
            self.registry.set_state(character, CharacterState::Working);
        }
        Some(id)
    }

    /// Create an unassigned queued task. Returns `None` for unknown types.
    pub fn queue_task(&mut self, type_name: &str, zone: Option<String>) -> Option<TaskId> {
        self.tasks.queue_task(type_name, zone)
    }

    /// Interrupt one active task, parking it with progress preserved and
    /// returning its assignees to `Idle`. Returns `false` if the id is not
    /// active.
    pub fn interrupt_task(&mut self, id: TaskId, reason: &str) -> bool {
        if !self.tasks.interrupt(id, reason) {
            return false;
        }
        if let Some(task) = self.tasks.task(id) {
            for character in task.assigned_to.clone() {
                self.registry.set_state(character, CharacterState::Idle);
            }
        }
        true
    }

    /// Resume the first interrupted task assigned to `character`, marking
    /// every assignee `Working` again. Returns the task id if one matched.
    pub fn resume_interrupted_task(&mut self, character: CharacterId) -> Option<TaskId> {
        let id = self.tasks.resume_interrupted(character, self.tick)?;
        if let Some(task) = self.tasks.task(id) {
            for assignee in task.assigned_to.clone() {
                self.registry.set_state(assignee, CharacterState::Working);
            }
        }
        Some(id)
    }

    /// Interrupt every active task, parking them with progress preserved.
    pub fn interrupt_all_tasks(&mut self, reason: &str) {
        self.tasks.interrupt_all(reason);
        for id in self.registry.ids() {
            if self.registry.get(id).map(|c| c.state) == Some(CharacterState::Working) {
                self.registry.set_state(id, CharacterState::Idle);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Budget
    // -----------------------------------------------------------------------

    /// Whether aggregate LLM spend has reached the configured cap.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.cost.total_cost() >= self.config.budget.cap_usd
    }

    /// A handle onto the shared cost ledger.
    #[must_use]
    pub fn cost_tracker(&self) -> CostTracker {
        self.cost.clone()
    }
}
