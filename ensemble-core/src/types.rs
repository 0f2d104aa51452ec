//! Core type definitions shared across the simulation kernel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a simulated character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    /// Create a new random character ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Simulation timestamp: a monotonically increasing tick plus the wall-clock
/// time at which it was taken (for logs and exported event streams).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTimestamp {
    /// Simulation tick.
    pub tick: u64,
    /// Corresponding real-world wall-clock time.
    pub real_time: DateTime<Utc>,
}

impl SimTimestamp {
    /// Stamp the given tick at the current wall-clock time.
    #[must_use]
    pub fn now(tick: u64) -> Self {
        Self {
            tick,
            real_time: Utc::now(),
        }
    }

    /// Ticks elapsed since `other` (saturating).
    #[must_use]
    pub fn ticks_since(&self, other: &Self) -> u64 {
        self.tick.saturating_sub(other.tick)
    }
}

// ---------------------------------------------------------------------------
// Personality Traits
// ---------------------------------------------------------------------------

/// Named personality dimensions, each on a 0–100 scale.
///
/// Traits modulate stub dialogue, prompt persona text, and (via the theme
/// adapter) whatever behavior a theme wants to hang off them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    /// Warmth toward others (0 = cold, 100 = effusive).
    pub friendliness: f32,
    /// Tendency to joke (0 = humorless, 100 = constant wisecracks).
    pub humor: f32,
    /// Gravity and focus (0 = flippant, 100 = all business).
    pub seriousness: f32,
    /// Sensitivity to others' feelings (0 = oblivious, 100 = deeply attuned).
    pub empathy: f32,
    /// Willingness to push a point (0 = deferential, 100 = domineering).
    pub assertiveness: f32,
}

impl Traits {
    /// Create traits with every value clamped to the 0–100 scale.
    #[must_use]
    pub fn new(
        friendliness: f32,
        humor: f32,
        seriousness: f32,
        empathy: f32,
        assertiveness: f32,
    ) -> Self {
        Self {
            friendliness: friendliness.clamp(0.0, 100.0),
            humor: humor.clamp(0.0, 100.0),
            seriousness: seriousness.clamp(0.0, 100.0),
            empathy: empathy.clamp(0.0, 100.0),
            assertiveness: assertiveness.clamp(0.0, 100.0),
        }
    }

    /// Render a short prose description of the personality, suitable for
    /// inclusion in an agent's system prompt.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.push(scale_word(
            self.friendliness,
            "reserved and distant",
            "polite but guarded",
            "warm and approachable",
        ));
        parts.push(scale_word(
            self.humor,
            "entirely serious",
            "occasionally wry",
            "quick to joke",
        ));
        parts.push(scale_word(
            self.empathy,
            "oblivious to others' feelings",
            "considerate",
            "deeply attuned to others",
        ));
        parts.push(scale_word(
            self.assertiveness,
            "deferential",
            "even-keeled",
            "forceful and direct",
        ));
        parts.join(", ")
    }
}

fn scale_word(value: f32, low: &'static str, mid: &'static str, high: &'static str) -> &'static str {
    if value < 35.0 {
        low
    } else if value < 65.0 {
        mid
    } else {
        high
    }
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            friendliness: 50.0,
            humor: 50.0,
            seriousness: 50.0,
            empathy: 50.0,
            assertiveness: 50.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Character State
// ---------------------------------------------------------------------------

/// What a character is currently doing, as far as the kernel cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterState {
    /// Available for encounters and task assignment.
    #[default]
    Idle,
    /// Mid-encounter; not eligible for a second conversation.
    Talking,
    /// Occupied by the theme (moving, eating, off-screen).
    Busy,
    /// Actively progressing an assigned task.
    Working,
}

impl fmt::Display for CharacterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Talking => "talking",
            Self::Busy => "busy",
            Self::Working => "working",
        };
        write!(f, "{s}")
    }
}

/// Clamp a mood or trait-style scalar onto the canonical 0–100 scale.
#[must_use]
pub fn clamp_scale(value: f32) -> f32 {
    value.clamp(0.0, 100.0)
}

/// Clamp a sentiment onto the canonical -1..+1 scale.
#[must_use]
pub fn clamp_sentiment(value: f32) -> f32 {
    value.clamp(-1.0, 1.0)
}
