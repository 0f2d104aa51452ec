//! Cost accounting for LLM calls.
//!
//! Every generated turn records its token counts here; the engine reads
//! the running total to enforce the spend budget. The tracker is cheap to
//! clone — clones share one ledger behind a mutex, so the engine and any
//! observers see the same totals.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Bounded length of the recent-call log.
const CALL_LOG_CAPACITY: usize = 256;

/// Per-token pricing for the configured model, in USD per 1000 tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Prompt-side price per 1000 tokens.
    pub input_per_1k: f64,
    /// Completion-side price per 1000 tokens.
    pub output_per_1k: f64,
}

impl Default for ModelPricing {
    fn default() -> Self {
        // Local models cost nothing; cloud callers set real rates.
        Self {
            input_per_1k: 0.0,
            output_per_1k: 0.0,
        }
    }
}

/// One recorded LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Caller key (the engine uses the character id).
    pub caller: String,
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Completion tokens.
    pub completion_tokens: u32,
    /// Cost of this call in USD.
    pub cost_usd: f64,
    /// When the call completed.
    pub at: DateTime<Utc>,
}

struct CostTrackerInner {
    pricing: ModelPricing,
    total_cost: f64,
    total_calls: u64,
    per_caller: HashMap<String, f64>,
    recent: Vec<CallRecord>,
}

/// Thread-safe running ledger of LLM spend.
#[derive(Clone)]
pub struct CostTracker {
    inner: Arc<Mutex<CostTrackerInner>>,
}

impl CostTracker {
    /// Create a tracker with zero-cost (local model) pricing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_pricing(ModelPricing::default())
    }

    /// Create a tracker with explicit pricing.
    #[must_use]
    pub fn with_pricing(pricing: ModelPricing) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CostTrackerInner {
                pricing,
                total_cost: 0.0,
                total_calls: 0,
                per_caller: HashMap::new(),
                recent: Vec::new(),
            })),
        }
    }

    /// Record one completed call. Returns its cost in USD.
    pub fn record_call(
        &self,
        caller: impl Into<String>,
        prompt_tokens: u32,
        completion_tokens: u32,
    ) -> f64 {
        let caller = caller.into();
        let mut inner = self.inner.lock();

        let cost_usd = (f64::from(prompt_tokens) / 1000.0) * inner.pricing.input_per_1k
            + (f64::from(completion_tokens) / 1000.0) * inner.pricing.output_per_1k;

        inner.total_cost += cost_usd;
        inner.total_calls += 1;
        *inner.per_caller.entry(caller.clone()).or_insert(0.0) += cost_usd;

        inner.recent.push(CallRecord {
            caller,
            prompt_tokens,
            completion_tokens,
            cost_usd,
            at: Utc::now(),
        });
        if inner.recent.len() > CALL_LOG_CAPACITY {
            inner.recent.remove(0);
        }

        cost_usd
    }

    /// Aggregate spend in USD.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.inner.lock().total_cost
    }

    /// Total recorded calls.
    #[must_use]
    pub fn total_calls(&self) -> u64 {
        self.inner.lock().total_calls
    }

    /// Spend attributed to one caller.
    #[must_use]
    pub fn cost_for(&self, caller: &str) -> f64 {
        self.inner.lock().per_caller.get(caller).copied().unwrap_or(0.0)
    }

    /// Snapshot of the bounded recent-call log, oldest first.
    #[must_use]
    pub fn recent_calls(&self) -> Vec<CallRecord> {
        self.inner.lock().recent.clone()
    }
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new()
    }
}
