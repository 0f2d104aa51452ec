//! Work tasks — registered types and the lifecycle of task instances.
//!
//! Task types live in an immutable catalog. Instances move through
//! queued → in_progress ⇄ interrupted → completed (terminal). Progress
//! accrues by `1/duration` per tick, but only while every assignee passes
//! the adapter-supplied readiness predicate. Interruption parks a task at
//! the front of the queue with its progress intact; it is never discarded.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::config::TaskConfig;
use crate::types::CharacterId;

/// Unique identifier for a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new random task ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static definition of a task type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDef {
    /// Type name (unique key in the catalog).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Ticks of ready work needed to complete an instance.
    pub duration_ticks: u64,
    /// Default zone the work happens in.
    pub zone: String,
    /// Mood delta applied to each assignee per active tick (often negative:
    /// work is draining).
    pub mood_effect_per_tick: f32,
    /// Mood boost applied once to each assignee on completion.
    pub completion_mood_boost: f32,
}

/// Immutable table of registered task types.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    defs: HashMap<String, TaskDef>,
}

impl TaskCatalog {
    /// Build a catalog from a list of definitions.
    #[must_use]
    pub fn from_defs(defs: Vec<TaskDef>) -> Self {
        Self {
            defs: defs.into_iter().map(|d| (d.name.clone(), d)).collect(),
        }
    }

    /// Look up a definition by type name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.defs.get(name)
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
}

/// Lifecycle state of a task instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for assignment/resumption.
    Queued,
    /// Actively accruing progress.
    InProgress,
    /// Paused with progress preserved.
    Interrupted,
    /// Finished (terminal).
    Completed,
}

/// A task instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Instance id.
    pub id: TaskId,
    /// Name of the [`TaskDef`] this instance was created from.
    pub def_name: String,
    /// Assigned characters (1..N).
    pub assigned_to: Vec<CharacterId>,
    /// Zone the work happens in.
    pub zone: String,
    /// Completion fraction in [0, 1].
    pub progress: f32,
    /// Lifecycle state.
    pub status: TaskStatus,
    /// Why the task was interrupted; present only while `Interrupted`.
    pub interrupted_by: Option<String>,
    /// Tick the instance first became active, if it has.
    pub started_tick: Option<u64>,
}

/// Record of a finished task, handed back so the engine can apply the
/// completion boost and reset character states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTask {
    /// Instance id.
    pub id: TaskId,
    /// Task type name.
    pub def_name: String,
    /// Who worked it.
    pub assigned_to: Vec<CharacterId>,
    /// One-shot mood boost per assignee, from the type definition.
    pub completion_mood_boost: f32,
    /// Tick of completion.
    pub tick: u64,
}

/// Everything one call to [`TaskManager::tick`] produced.
#[derive(Debug, Default)]
pub struct TaskTickOutcome {
    /// Tasks that reached full progress this tick.
    pub completed: Vec<CompletedTask>,
    /// Per-character mood deltas from active work this tick.
    pub mood_deltas: Vec<(CharacterId, f32)>,
}

/// Owns all task instances and their lifecycle.
#[derive(Debug)]
pub struct TaskManager {
    catalog: TaskCatalog,
    config: TaskConfig,
    queue: VecDeque<Task>,
    active: Vec<Task>,
    completed: VecDeque<Task>,
}

impl TaskManager {
    /// Create a manager over a catalog.
    #[must_use]
    pub fn new(catalog: TaskCatalog, config: TaskConfig) -> Self {
        Self {
            catalog,
            config,
            queue: VecDeque::new(),
            active: Vec::new(),
            completed: VecDeque::new(),
        }
    }

    /// Create an immediately active instance assigned to `characters`.
    ///
    /// Returns `None` for unknown types or an empty assignee list.
    pub fn assign(
        &mut self,
        type_name: &str,
        characters: Vec<CharacterId>,
        zone: Option<String>,
        tick: u64,
    ) -> Option<TaskId> {
        if characters.is_empty() {
            return None;
        }
        let def = self.catalog.get(type_name)?;
        let task = Task {
            id: TaskId::new(),
            def_name: def.name.clone(),
            assigned_to: characters,
            zone: zone.unwrap_or_else(|| def.zone.clone()),
            progress: 0.0,
            status: TaskStatus::InProgress,
            interrupted_by: None,
            started_tick: Some(tick),
        };
        let id = task.id;
        debug!(task = %id, r#type = type_name, "task assigned");
        self.active.push(task);
        Some(id)
    }

    /// Create an unassigned queued instance.
    ///
    /// Returns `None` for unknown types.
    pub fn queue_task(&mut self, type_name: &str, zone: Option<String>) -> Option<TaskId> {
        let def = self.catalog.get(type_name)?;
        let task = Task {
            id: TaskId::new(),
            def_name: def.name.clone(),
            assigned_to: Vec::new(),
            zone: zone.unwrap_or_else(|| def.zone.clone()),
            progress: 0.0,
            status: TaskStatus::Queued,
            interrupted_by: None,
            started_tick: None,
        };
        let id = task.id;
        self.queue.push_back(task);
        Some(id)
    }

    /// Interrupt an active task: park it at the front of the queue with
    /// progress preserved. Returns `false` if the id is not active.
    pub fn interrupt(&mut self, id: TaskId, reason: impl Into<String>) -> bool {
        let Some(index) = self.active.iter().position(|t| t.id == id) else {
            return false;
        };
        let mut task = self.active.remove(index);
        task.status = TaskStatus::Interrupted;
        task.interrupted_by = Some(reason.into());
        debug!(task = %id, progress = task.progress, "task interrupted");
        self.queue.push_front(task);
        true
    }

    /// Interrupt every active task with the same reason.
    pub fn interrupt_all(&mut self, reason: &str) {
        let ids: Vec<TaskId> = self.active.iter().map(|t| t.id).collect();
        for id in ids {
            self.interrupt(id, reason);
        }
    }

    /// Pull the first interrupted task assigned to `character` back to
    /// active, keeping its progress. Returns the task id if one matched.
    pub fn resume_interrupted(&mut self, character: CharacterId, tick: u64) -> Option<TaskId> {
        let index = self.queue.iter().position(|t| {
            t.status == TaskStatus::Interrupted && t.assigned_to.contains(&character)
        })?;
        let mut task = self.queue.remove(index)?;
        task.status = TaskStatus::InProgress;
        task.interrupted_by = None;
        task.started_tick.get_or_insert(tick);
        let id = task.id;
        debug!(task = %id, progress = task.progress, "task resumed");
        self.active.push(task);
        Some(id)
    }

    /// Advance all active tasks one tick.
    ///
    /// A task progresses only while *every* assignee passes `ready` (the
    /// adapter's present-and-working predicate). Finished tasks move to
    /// the bounded completion log.
    pub fn tick<F>(&mut self, tick: u64, ready: F) -> TaskTickOutcome
    where
        F: Fn(CharacterId) -> bool,
    {
        let mut outcome = TaskTickOutcome::default();
        let mut finished: Vec<usize> = Vec::new();

        for (index, task) in self.active.iter_mut().enumerate() {
            if !task.assigned_to.iter().all(|&c| ready(c)) {
                continue;
            }

            let Some(def) = self.catalog.get(&task.def_name) else {
                continue;
            };
            let step = if def.duration_ticks == 0 {
                1.0
            } else {
                1.0 / def.duration_ticks as f32
            };
            task.progress = (task.progress + step).min(1.0);

            if def.mood_effect_per_tick != 0.0 {
                for &character in &task.assigned_to {
                    outcome.mood_deltas.push((character, def.mood_effect_per_tick));
                }
            }

            if task.progress >= 1.0 {
                task.status = TaskStatus::Completed;
                outcome.completed.push(CompletedTask {
                    id: task.id,
                    def_name: task.def_name.clone(),
                    assigned_to: task.assigned_to.clone(),
                    completion_mood_boost: def.completion_mood_boost,
                    tick,
                });
                finished.push(index);
            }
        }

        for index in finished.into_iter().rev() {
            let task = self.active.remove(index);
            debug!(task = %task.id, r#type = %task.def_name, "task completed");
            self.completed.push_back(task);
            while self.completed.len() > self.config.completed_log_capacity {
                self.completed.pop_front();
            }
        }

        outcome
    }

    /// Find a task instance in any non-terminal collection or the
    /// completion log.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.active
            .iter()
            .chain(self.queue.iter())
            .chain(self.completed.iter())
            .find(|t| t.id == id)
    }

    /// Currently active tasks.
    #[must_use]
    pub fn active(&self) -> &[Task] {
        &self.active
    }

    /// Queued and interrupted tasks, front first.
    pub fn queued(&self) -> impl Iterator<Item = &Task> {
        self.queue.iter()
    }

    /// The bounded completion log, oldest first.
    pub fn completed(&self) -> impl Iterator<Item = &Task> {
        self.completed.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TaskCatalog {
        TaskCatalog::from_defs(vec![
            TaskDef {
                name: "write_report".into(),
                description: "Quarterly report".into(),
                duration_ticks: 10,
                zone: "desk".into(),
                mood_effect_per_tick: -0.2,
                completion_mood_boost: 8.0,
            },
            TaskDef {
                name: "water_plants".into(),
                description: "Keep the ficus alive".into(),
                duration_ticks: 2,
                zone: "lounge".into(),
                mood_effect_per_tick: 0.1,
                completion_mood_boost: 2.0,
            },
        ])
    }

    fn manager() -> TaskManager {
        TaskManager::new(catalog(), TaskConfig::default())
    }

    #[test]
    fn assign_creates_active_instance() {
        let mut tasks = manager();
        let worker = CharacterId::new();

        let id = tasks
            .assign("write_report", vec![worker], None, 1)
            .expect("known type");
        let task = tasks.task(id).expect("exists");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.zone, "desk");
    }

    #[test]
    fn unknown_type_returns_none() {
        let mut tasks = manager();
        assert!(tasks.assign("juggle", vec![CharacterId::new()], None, 1).is_none());
        assert!(tasks.queue_task("juggle", None).is_none());
    }

    #[test]
    fn progress_only_while_ready() {
        let mut tasks = manager();
        let worker = CharacterId::new();
        let id = tasks.assign("write_report", vec![worker], None, 1).expect("assign");

        tasks.tick(2, |_| false);
        assert!(tasks.task(id).expect("exists").progress.abs() < f32::EPSILON);

        tasks.tick(3, |_| true);
        assert!((tasks.task(id).expect("exists").progress - 0.1).abs() < 0.001);
    }

    #[test]
    fn multi_assignee_needs_everyone_ready() {
        let mut tasks = manager();
        let (a, b) = (CharacterId::new(), CharacterId::new());
        let id = tasks.assign("write_report", vec![a, b], None, 1).expect("assign");

        tasks.tick(2, |c| c == a); // b is away
        assert!(tasks.task(id).expect("exists").progress.abs() < f32::EPSILON);
    }

    #[test]
    fn completion_moves_to_log_and_reports_boost() {
        let mut tasks = manager();
        let worker = CharacterId::new();
        tasks.assign("water_plants", vec![worker], None, 1).expect("assign");

        assert!(tasks.tick(2, |_| true).completed.is_empty());
        let outcome = tasks.tick(3, |_| true);
        assert_eq!(outcome.completed.len(), 1);
        let done = &outcome.completed[0];
        assert!((done.completion_mood_boost - 2.0).abs() < f32::EPSILON);
        assert!(tasks.active().is_empty());
        assert_eq!(tasks.completed().count(), 1);
    }

    #[test]
    fn interruption_preserves_progress() {
        let mut tasks = manager();
        let worker = CharacterId::new();
        let id = tasks.assign("write_report", vec![worker], None, 1).expect("assign");

        for tick in 0..4 {
            tasks.tick(tick, |_| true);
        }
        let before = tasks.task(id).expect("exists").progress;
        assert!((before - 0.4).abs() < 0.001);

        assert!(tasks.interrupt(id, "fire drill"));
        let parked = tasks.task(id).expect("exists");
        assert_eq!(parked.status, TaskStatus::Interrupted);
        assert_eq!(parked.interrupted_by.as_deref(), Some("fire drill"));

        let resumed = tasks.resume_interrupted(worker, 20).expect("resumes");
        assert_eq!(resumed, id);
        let task = tasks.task(id).expect("exists");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.progress >= before, "progress never resets");
        assert!(task.interrupted_by.is_none());
    }

    #[test]
    fn interrupted_tasks_go_to_front_of_queue() {
        let mut tasks = manager();
        let worker = CharacterId::new();
        tasks.queue_task("water_plants", None).expect("queue");
        let id = tasks.assign("write_report", vec![worker], None, 1).expect("assign");

        tasks.interrupt(id, "meeting");
        let front = tasks.queued().next().expect("non-empty queue");
        assert_eq!(front.id, id);
    }

    #[test]
    fn interrupt_all_clears_active() {
        let mut tasks = manager();
        tasks.assign("write_report", vec![CharacterId::new()], None, 1).expect("assign");
        tasks.assign("water_plants", vec![CharacterId::new()], None, 1).expect("assign");

        tasks.interrupt_all("power outage");
        assert!(tasks.active().is_empty());
        assert_eq!(tasks.queued().count(), 2);
    }

    #[test]
    fn mood_deltas_reported_while_working() {
        let mut tasks = manager();
        let worker = CharacterId::new();
        tasks.assign("write_report", vec![worker], None, 1).expect("assign");

        let outcome = tasks.tick(2, |_| true);
        assert_eq!(outcome.mood_deltas.len(), 1);
        assert_eq!(outcome.mood_deltas[0].0, worker);
        assert!((outcome.mood_deltas[0].1 + 0.2).abs() < 0.001);
    }
}
