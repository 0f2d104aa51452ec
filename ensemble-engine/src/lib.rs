//! # ensemble-engine — Orchestration Layer for Ensemble
//!
//! Drives the simulation: one `tick_once` call advances needs, work tasks,
//! world events, and at most one queued encounter, in a fixed order. Themes
//! plug in through the [`ThemeAdapter`] trait and observe the simulation
//! through the [`SimEvent`] subscriber stream.
//!
//! Nothing in the tick pipeline returns an error. Recoverable failures
//! (LLM outages, malformed replies, unknown ids, panicking subscribers)
//! degrade locally and are logged; the simulation keeps ticking.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod adapter;
pub mod agent;
pub mod encounter;
pub mod engine;
pub mod events;

pub use adapter::{OpenFloorAdapter, ThemeAdapter};
pub use agent::SocialAgent;
pub use encounter::{DialogueLine, Encounter, EncounterId, EncounterManager};
pub use engine::{EngineState, SocialEngine, Subscription};
pub use events::SimEvent;
