//! # Ensemble Core Library
//!
//! Theme-agnostic state for a tick-driven social simulation.
//!
//! Every simulated person is a [`Character`] with personality traits, a mood,
//! physiological needs, assigned work, and directional relationships to
//! everyone else. This crate owns that state and its per-tick evolution:
//!
//! - **Characters** — identity, traits, mood, lifecycle state
//! - **Needs** — scalar needs that rise over time and fire urgency events
//! - **Relationships** — directional edges with trust/liking/respect/familiarity
//! - **World events** — probabilistic, duration-bound happenings
//! - **Tasks** — queued → active → completed/interrupted work instances
//!
//! The conversational layer (agents, encounters, orchestration) lives in
//! `ensemble-engine`; the generative-text plumbing lives in `ensemble-llm`.
//! Nothing in this crate performs I/O beyond loading configuration.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod character;
pub mod config;
pub mod error;
pub mod needs;
pub mod relationship;
pub mod task;
pub mod types;
pub mod world_event;

pub use character::{Character, CharacterRegistry};
pub use config::EngineConfig;
pub use error::CoreError;
pub use types::*;
