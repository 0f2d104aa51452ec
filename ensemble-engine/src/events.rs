//! The observable event stream.
//!
//! Every externally visible thing the simulation does is reported as a
//! [`SimEvent`], pushed to subscribers and returned from `tick_once` in
//! occurrence order. All variants carry the tick they happened on and
//! serialize with a `type` tag, so a theme can pipe the stream straight to
//! a log or a websocket.

use serde::{Deserialize, Serialize};

use ensemble_core::needs::NeedKind;
use ensemble_core::task::TaskId;
use ensemble_core::types::CharacterId;
use ensemble_core::world_event::WorldEvent;

use crate::encounter::{DialogueLine, EncounterId};

/// One observable simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    /// A need crossed the urgency threshold.
    NeedUrgent {
        /// Tick of occurrence.
        tick: u64,
        /// Whose need.
        character: CharacterId,
        /// Which need.
        kind: NeedKind,
        /// Value at the crossing.
        value: f32,
    },
    /// A work task reached full progress.
    TaskCompleted {
        /// Tick of occurrence.
        tick: u64,
        /// Task instance.
        task: TaskId,
        /// Task type name.
        def_name: String,
        /// Who worked it.
        characters: Vec<CharacterId>,
    },
    /// A world event started (rolled or injected).
    WorldEventStarted {
        /// Tick of occurrence.
        tick: u64,
        /// The event instance.
        event: WorldEvent,
    },
    /// A world event's duration elapsed.
    WorldEventEnded {
        /// Tick of occurrence.
        tick: u64,
        /// The event instance.
        event: WorldEvent,
    },
    /// A queued encounter began playing out.
    EncounterStart {
        /// Tick of occurrence.
        tick: u64,
        /// Encounter id.
        encounter: EncounterId,
        /// First participant.
        a: CharacterId,
        /// Second participant.
        b: CharacterId,
    },
    /// One spoken line inside an encounter.
    DialogueLine {
        /// Tick of occurrence.
        tick: u64,
        /// Encounter id.
        encounter: EncounterId,
        /// The line.
        line: DialogueLine,
    },
    /// An encounter finished and its relationship updates were applied.
    EncounterEnd {
        /// Tick of occurrence.
        tick: u64,
        /// Encounter id.
        encounter: EncounterId,
        /// First participant.
        a: CharacterId,
        /// Second participant.
        b: CharacterId,
        /// First participant's average sentiment across the exchange.
        sentiment_a: f32,
        /// Second participant's average sentiment across the exchange.
        sentiment_b: f32,
        /// How many exchanges (pairs of lines) were spoken.
        exchanges: u32,
    },
    /// The engine entered `Running` from `Stopped`.
    EngineStarted {
        /// Tick of occurrence.
        tick: u64,
    },
    /// The engine paused.
    EnginePaused {
        /// Tick of occurrence.
        tick: u64,
    },
    /// The engine resumed from pause.
    EngineResumed {
        /// Tick of occurrence.
        tick: u64,
    },
    /// The engine stopped.
    EngineStopped {
        /// Tick of occurrence.
        tick: u64,
    },
}

impl SimEvent {
    /// The tick this event happened on.
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            Self::NeedUrgent { tick, .. }
            | Self::TaskCompleted { tick, .. }
            | Self::WorldEventStarted { tick, .. }
            | Self::WorldEventEnded { tick, .. }
            | Self::EncounterStart { tick, .. }
            | Self::DialogueLine { tick, .. }
            | Self::EncounterEnd { tick, .. }
            | Self::EngineStarted { tick }
            | Self::EnginePaused { tick }
            | Self::EngineResumed { tick }
            | Self::EngineStopped { tick } => *tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SimEvent::NeedUrgent {
            tick: 7,
            character: CharacterId::new(),
            kind: NeedKind::Hunger,
            value: 81.0,
        };
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["type"], "need_urgent");
        assert_eq!(json["tick"], 7);
        assert_eq!(json["kind"], "hunger");
    }

    #[test]
    fn tick_accessor_covers_lifecycle() {
        assert_eq!(SimEvent::EngineStarted { tick: 3 }.tick(), 3);
        assert_eq!(SimEvent::EngineStopped { tick: 9 }.tick(), 9);
    }
}
