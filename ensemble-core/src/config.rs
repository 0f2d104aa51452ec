//! Configuration for the simulation kernel.
//!
//! Maps directly to `ensemble.toml`. Every empirically tuned constant in the
//! kernel — need rates, urgency thresholds, relationship deltas, encounter
//! depth thresholds, the rate limit, cooldowns, the spend budget — lives
//! here so themes can retune without touching code. The tables are built
//! once at startup and passed by reference into the engine; nothing mutates
//! them afterwards.

use serde::{Deserialize, Serialize};

use crate::needs::NeedKind;

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Physiological need decay and urgency settings.
    #[serde(default)]
    pub needs: NeedsConfig,
    /// Relationship update scaling.
    #[serde(default)]
    pub relationship: RelationshipConfig,
    /// World-event roll cadence.
    #[serde(default)]
    pub world_events: WorldEventConfig,
    /// Task bookkeeping limits.
    #[serde(default)]
    pub tasks: TaskConfig,
    /// Encounter scheduling, depth, and cooldowns.
    #[serde(default)]
    pub encounter: EncounterConfig,
    /// Generative text service settings.
    #[serde(default)]
    pub llm: LlmSettings,
    /// Spend budget for AI-backed encounters.
    #[serde(default)]
    pub budget: BudgetConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::CoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Physiological needs tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedsConfig {
    /// Bladder rise per tick.
    #[serde(default = "default_0_8")]
    pub bladder_rate: f32,
    /// Hunger rise per tick.
    #[serde(default = "default_0_5")]
    pub hunger_rate: f32,
    /// Thirst rise per tick.
    #[serde(default = "default_0_6")]
    pub thirst_rate: f32,
    /// Energy-depletion rise per tick.
    #[serde(default = "default_0_3")]
    pub energy_rate: f32,
    /// Value at which a need becomes urgent (fires once per crossing).
    #[serde(default = "default_80")]
    pub urgent_threshold: f32,
    /// Amount subtracted by `satisfy` (not necessarily to zero).
    #[serde(default = "default_70")]
    pub satisfy_amount: f32,
    /// Mood penalty applied per urgent need per tick (positive magnitude).
    #[serde(default = "default_2_0")]
    pub mood_penalty_per_urgent: f32,
}

impl NeedsConfig {
    /// Per-tick rise rate for a given need.
    #[must_use]
    pub fn rate(&self, kind: NeedKind) -> f32 {
        match kind {
            NeedKind::Bladder => self.bladder_rate,
            NeedKind::Hunger => self.hunger_rate,
            NeedKind::Thirst => self.thirst_rate,
            NeedKind::Energy => self.energy_rate,
        }
    }
}

impl Default for NeedsConfig {
    fn default() -> Self {
        Self {
            bladder_rate: 0.8,
            hunger_rate: 0.5,
            thirst_rate: 0.6,
            energy_rate: 0.3,
            urgent_threshold: 80.0,
            satisfy_amount: 70.0,
            mood_penalty_per_urgent: 2.0,
        }
    }
}

/// Relationship delta scaling applied after each encounter.
///
/// These mirror the tuning of the system this kernel was distilled from:
/// a base sentiment multiplier of 5, with trust moving at 0.8× the liking
/// rate and respect at 0.5×. Familiarity rises by a fixed amount whatever
/// the sentiment — people who fight still get to know each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    /// Base multiplier applied to the -1..+1 sentiment before axis scaling.
    #[serde(default = "default_5_0")]
    pub sentiment_scale: f32,
    /// Trust axis scale (relative to the base).
    #[serde(default = "default_0_8")]
    pub trust_scale: f32,
    /// Liking axis scale.
    #[serde(default = "default_1_0")]
    pub liking_scale: f32,
    /// Respect axis scale.
    #[serde(default = "default_0_5")]
    pub respect_scale: f32,
    /// Unconditional familiarity gain per interaction.
    #[serde(default = "default_3_0")]
    pub familiarity_gain: f32,
    /// Capacity of the sentiment ring and memory-note FIFO.
    #[serde(default = "default_10_usize")]
    pub history_capacity: usize,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            sentiment_scale: 5.0,
            trust_scale: 0.8,
            liking_scale: 1.0,
            respect_scale: 0.5,
            familiarity_gain: 3.0,
            history_capacity: 10,
        }
    }
}

/// World-event manager tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldEventConfig {
    /// How often (in ticks) registered event probabilities are rolled.
    #[serde(default = "default_20")]
    pub roll_interval_ticks: u64,
}

impl Default for WorldEventConfig {
    fn default() -> Self {
        Self {
            roll_interval_ticks: 20,
        }
    }
}

/// Task manager tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Completed-task log capacity (oldest entries silently drop).
    #[serde(default = "default_50_usize")]
    pub completed_log_capacity: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            completed_log_capacity: 50,
        }
    }
}

/// Encounter scheduling and conversational-depth tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// Ticks a participant must wait after an encounter before the next.
    #[serde(default = "default_30")]
    pub cooldown_ticks: u64,
    /// Minimum wall-clock milliseconds between queue advances.
    #[serde(default = "default_1000")]
    pub rate_limit_ms: u64,
    /// Average familiarity needed for a 2-exchange conversation.
    #[serde(default = "default_30_f32")]
    pub depth2_familiarity: f32,
    /// Average familiarity needed for a 3-exchange conversation.
    #[serde(default = "default_50_f32")]
    pub depth3_familiarity: f32,
    /// Average mood needed (together with depth-3 familiarity) for depth 4.
    #[serde(default = "default_60_f32")]
    pub depth4_mood: f32,
    /// Below this average mood, depth is reduced by one (floor 1).
    #[serde(default = "default_30_f32")]
    pub low_mood_threshold: f32,
    /// Completed-encounter log capacity.
    #[serde(default = "default_20_usize")]
    pub completed_log_capacity: usize,
    /// |average sentiment| at or above which an encounter counts as a
    /// memorable moment in character stats.
    #[serde(default = "default_0_6")]
    pub memorable_sentiment_threshold: f32,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            cooldown_ticks: 30,
            rate_limit_ms: 1000,
            depth2_familiarity: 30.0,
            depth3_familiarity: 50.0,
            depth4_mood: 60.0,
            low_mood_threshold: 30.0,
            completed_log_capacity: 20,
            memorable_sentiment_threshold: 0.6,
        }
    }
}

/// Generative text service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_none")]
    pub provider: String,
    /// Base URL for the provider's API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// API key for providers that need one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens per generated reply.
    #[serde(default = "default_200")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_0_8_f32")]
    pub temperature: f32,
    /// Hard timeout for any call, in milliseconds.
    #[serde(default = "default_8000")]
    pub timeout_ms: u64,
    /// Retries before degrading to the rule-based stub.
    #[serde(default = "default_2")]
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "qwen2.5:1.5b".to_string(),
            max_tokens: 200,
            temperature: 0.8,
            timeout_ms: 8000,
            max_retries: 2,
        }
    }
}

/// Spend budget for AI-backed encounters.
///
/// Once the cost tracker's aggregate spend reaches `cap_usd`, the engine
/// keeps advancing needs, tasks and events but stops initiating new
/// encounters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Budget cap in USD.
    #[serde(default = "default_5_usd")]
    pub cap_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self { cap_usd: 5.0 }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_none() -> String { "none".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "qwen2.5:1.5b".to_string() }
fn default_0_3() -> f32 { 0.3 }
fn default_0_5() -> f32 { 0.5 }
fn default_0_6() -> f32 { 0.6 }
fn default_0_8() -> f32 { 0.8 }
fn default_0_8_f32() -> f32 { 0.8 }
fn default_1_0() -> f32 { 1.0 }
fn default_2_0() -> f32 { 2.0 }
fn default_3_0() -> f32 { 3.0 }
fn default_5_0() -> f32 { 5.0 }
fn default_30_f32() -> f32 { 30.0 }
fn default_50_f32() -> f32 { 50.0 }
fn default_60_f32() -> f32 { 60.0 }
fn default_70() -> f32 { 70.0 }
fn default_80() -> f32 { 80.0 }
fn default_2() -> u32 { 2 }
fn default_200() -> u32 { 200 }
fn default_20() -> u64 { 20 }
fn default_30() -> u64 { 30 }
fn default_1000() -> u64 { 1000 }
fn default_8000() -> u64 { 8000 }
fn default_10_usize() -> usize { 10 }
fn default_20_usize() -> usize { 20 }
fn default_50_usize() -> usize { 50 }
fn default_5_usd() -> f64 { 5.0 }
