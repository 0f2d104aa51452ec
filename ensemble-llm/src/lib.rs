//! # ensemble-llm — LLM Abstraction Layer for Ensemble
//!
//! Provides a unified chat-completion interface across backends:
//!   - **Ollama** (local, recommended default)
//!   - **OpenAI-compatible API** (also works with Anthropic, Together, etc.)
//!
//! All generative calls in Ensemble go through this crate, ensuring:
//!   - Multi-turn chat framing (system prompt + role-tagged transcript)
//!   - Timeout management and bounded retries
//!   - Lenient structured-output parsing (models wrap JSON in prose)
//!   - Per-caller cost accounting for budget enforcement
//!
//! Every call can fail; callers degrade to rule-based generation on error.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod client;
pub mod cost;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use cost::CostTracker;
pub use error::LlmError;
pub use types::{AgentReply, ChatMessage, LlmRequest, LlmResponse, Role};
