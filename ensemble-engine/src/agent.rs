//! Character agents — the conversational policy behind each character.
//!
//! Every character gets one [`SocialAgent`] with a fixed interface and two
//! backends: LLM-backed (prompts built from the character sheet and
//! situation, structured JSON replies) or a deterministic rule-based stub.
//! The stub is also the degradation path: any LLM failure logs a warning
//! and falls through to it, so an encounter always completes.

use std::sync::Arc;

use tracing::warn;

use ensemble_core::character::Character;
use ensemble_core::config::LlmSettings;
use ensemble_core::relationship::Rapport;
use ensemble_llm::prompt::{
    ENCOUNTER_OPEN_USER, ENCOUNTER_SYSTEM, ENCOUNTER_TURN_USER, REFLECTION_SYSTEM,
    REFLECTION_USER, render_template,
};
use ensemble_llm::{AgentReply, ChatMessage, CostTracker, LlmClient, LlmRequest};

use crate::encounter::DialogueLine;

/// Everything an agent needs to produce one turn.
pub struct TurnContext<'a> {
    /// The character being prompted.
    pub character: &'a Character,
    /// The conversation partner.
    pub partner: &'a Character,
    /// Rendered relationship block (the speaker's view of the partner).
    pub relationship_context: String,
    /// Rendered active world events, possibly empty.
    pub world_context: &'a str,
    /// Theme-supplied framing ("by the coffee machine").
    pub situation: &'a str,
    /// The speaker's rapport with the partner.
    pub rapport: Rapport,
    /// Lines spoken so far, oldest first.
    pub transcript: &'a [DialogueLine],
}

enum Backend {
    Llm {
        client: Arc<LlmClient>,
        cost: CostTracker,
        max_tokens: u32,
        temperature: f32,
        timeout_ms: u64,
    },
    Stub,
}

/// One character's conversational policy.
pub struct SocialAgent {
    backend: Backend,
}

impl SocialAgent {
    /// Create a rule-based agent.
    #[must_use]
    pub fn new_stub() -> Self {
        Self {
            backend: Backend::Stub,
        }
    }

    /// Create an LLM-backed agent that reports token usage to `cost`.
    #[must_use]
    pub fn new_llm(client: Arc<LlmClient>, cost: CostTracker, settings: &LlmSettings) -> Self {
        Self {
            backend: Backend::Llm {
                client,
                cost,
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
                timeout_ms: settings.timeout_ms,
            },
        }
    }

    /// Produce the character's next spoken line.
    ///
    /// Never fails: LLM errors degrade to the rule-based reply.
    pub async fn respond(&self, ctx: &TurnContext<'_>) -> AgentReply {
        match &self.backend {
            Backend::Stub => stub_respond(ctx),
            Backend::Llm {
                client,
                cost,
                max_tokens,
                temperature,
                timeout_ms,
            } => {
                let user = if ctx.transcript.is_empty() {
                    render_template(
                        ENCOUNTER_OPEN_USER,
                        &[("partner_name", &ctx.partner.name), ("location", ctx.situation)],
                    )
                } else {
                    render_template(ENCOUNTER_TURN_USER, &[("partner_name", &ctx.partner.name)])
                };

                let mut messages = transcript_messages(ctx);
                messages.push(ChatMessage::user(user));

                let request = LlmRequest::new(system_prompt(ctx), messages)
                    .with_max_tokens(*max_tokens)
                    .with_temperature(*temperature)
                    .with_timeout(*timeout_ms);

                match client.generate(&request).await {
                    Ok(response) => {
                        cost.record_call(
                            ctx.character.id.to_string(),
                            response.prompt_tokens,
                            response.completion_tokens,
                        );
                        match client.parse_structured::<AgentReply>(&response) {
                            Ok(reply) => AgentReply::new(reply.text, reply.sentiment),
                            Err(e) => {
                                warn!(character = %ctx.character.name, error = %e, "malformed agent reply, using stub");
                                stub_respond(ctx)
                            }
                        }
                    }
                    Err(e) => {
                        warn!(character = %ctx.character.name, error = %e, "LLM call failed, using stub");
                        stub_respond(ctx)
                    }
                }
            }
        }
    }

    /// Produce the character's private one-line note about the encounter.
    ///
    /// Never fails: LLM errors degrade to the rule-based note.
    pub async fn reflect(&self, ctx: &TurnContext<'_>) -> String {
        match &self.backend {
            Backend::Stub => stub_reflect(ctx),
            Backend::Llm {
                client,
                cost,
                max_tokens,
                temperature,
                timeout_ms,
            } => {
                let system = render_template(
                    REFLECTION_SYSTEM,
                    &[
                        ("character_name", ctx.character.name.as_str()),
                        ("partner_name", ctx.partner.name.as_str()),
                    ],
                );
                let transcript = ctx
                    .transcript
                    .iter()
                    .map(|l| format!("{}: {}", l.speaker_name, l.text))
                    .collect::<Vec<_>>()
                    .join("\n");
                let user = render_template(
                    REFLECTION_USER,
                    &[
                        ("transcript", transcript.as_str()),
                        ("partner_name", ctx.partner.name.as_str()),
                    ],
                );

                let request = LlmRequest::new(system, vec![ChatMessage::user(user)])
                    .with_max_tokens(*max_tokens)
                    .with_temperature(*temperature)
                    .with_timeout(*timeout_ms);

                match client.generate(&request).await {
                    Ok(response) => {
                        cost.record_call(
                            ctx.character.id.to_string(),
                            response.prompt_tokens,
                            response.completion_tokens,
                        );
                        match client.parse_structured::<AgentReply>(&response) {
                            Ok(reply) => reply.text,
                            Err(e) => {
                                warn!(character = %ctx.character.name, error = %e, "malformed reflection, using stub");
                                stub_reflect(ctx)
                            }
                        }
                    }
                    Err(e) => {
                        warn!(character = %ctx.character.name, error = %e, "LLM reflection failed, using stub");
                        stub_reflect(ctx)
                    }
                }
            }
        }
    }
}

/// Render the situated system prompt for one speaker.
fn system_prompt(ctx: &TurnContext<'_>) -> String {
    let appearance = if ctx.character.appearance.is_empty() {
        "nothing notable".to_string()
    } else {
        ctx.character.appearance.join(", ")
    };
    render_template(
        ENCOUNTER_SYSTEM,
        &[
            ("character_name", ctx.character.name.as_str()),
            ("setting_description", ctx.situation),
            ("personality_description", &ctx.character.traits.describe()),
            ("mood_description", mood_words(ctx.character.mood)),
            ("appearance", &appearance),
            ("partner_name", ctx.partner.name.as_str()),
            ("relationship_context", &ctx.relationship_context),
            ("world_context", ctx.world_context),
        ],
    )
}

/// Map the transcript to role-tagged chat messages from the speaker's
/// perspective: own lines are `assistant`, the partner's are `user`.
fn transcript_messages(ctx: &TurnContext<'_>) -> Vec<ChatMessage> {
    ctx.transcript
        .iter()
        .map(|line| {
            if line.speaker == ctx.character.id {
                ChatMessage::assistant(line.text.clone())
            } else {
                ChatMessage::user(line.text.clone())
            }
        })
        .collect()
}

/// Verbal mood bucket for prompts.
fn mood_words(mood: f32) -> &'static str {
    if mood < 30.0 {
        "in a foul mood"
    } else if mood < 45.0 {
        "a little low"
    } else if mood <= 65.0 {
        "steady"
    } else if mood < 80.0 {
        "in good spirits"
    } else {
        "having a great day"
    }
}

// ---------------------------------------------------------------------------
// Rule-based fallback
// ---------------------------------------------------------------------------

const LOW_MOOD_LINES: &[&str] = &[
    "Sorry {partner}, I'm not great company right now.",
    "Can we keep this short, {partner}? Long day.",
];

const STRANGER_LINES: &[&str] = &[
    "Hi, I'm {name}. I don't think we've crossed paths before.",
    "Nice to meet you, {partner}.",
    "How are you finding this place, {partner}?",
];

const ACQUAINTANCE_LINES: &[&str] = &[
    "Good to see you again, {partner}.",
    "How's your day going, {partner}?",
    "Busy one today, isn't it?",
];

const FRIEND_LINES: &[&str] = &[
    "There you are, {partner}! I was hoping to run into you.",
    "You won't believe the morning I've had, {partner}.",
    "Same time tomorrow, {partner}?",
];

/// Deterministic reply from mood, traits, and rapport.
fn stub_respond(ctx: &TurnContext<'_>) -> AgentReply {
    let character = ctx.character;
    let pool = if character.mood < 30.0 {
        LOW_MOOD_LINES
    } else {
        match ctx.rapport {
            Rapport::Stranger | Rapport::Colleague => STRANGER_LINES,
            Rapport::Acquaintance => ACQUAINTANCE_LINES,
            Rapport::Friend | Rapport::CloseFriend => FRIEND_LINES,
        }
    };
    let index = (character.name.len() + ctx.transcript.len()) % pool.len();
    let text = pool[index]
        .replace("{name}", &character.name)
        .replace("{partner}", &ctx.partner.name);
    AgentReply::new(text, stub_sentiment(ctx))
}

/// Deterministic private note.
fn stub_reflect(ctx: &TurnContext<'_>) -> String {
    let sentiment = stub_sentiment(ctx);
    let feeling = if sentiment >= 0.25 {
        "left in better spirits"
    } else if sentiment <= -0.25 {
        "came away drained"
    } else {
        "nothing remarkable"
    };
    format!("Chatted with {}; {}.", ctx.partner.name, feeling)
}

/// Sentiment from mood and friendliness, nudged by rapport.
fn stub_sentiment(ctx: &TurnContext<'_>) -> f32 {
    let character = ctx.character;
    let base = (character.mood - 50.0) / 100.0 * 0.6
        + (character.traits.friendliness - 50.0) / 100.0 * 0.4;
    let bonus = match ctx.rapport {
        Rapport::Friend => 0.1,
        Rapport::CloseFriend => 0.2,
        _ => 0.0,
    };
    (base + bonus).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_core::types::Traits;

    fn context<'a>(
        character: &'a Character,
        partner: &'a Character,
        rapport: Rapport,
    ) -> TurnContext<'a> {
        TurnContext {
            character,
            partner,
            relationship_context: String::new(),
            world_context: "",
            situation: "the break room",
            rapport,
            transcript: &[],
        }
    }

    #[tokio::test]
    async fn stub_is_deterministic() {
        let mara = Character::new("Mara").with_mood(70.0);
        let jules = Character::new("Jules");
        let agent = SocialAgent::new_stub();

        let first = agent.respond(&context(&mara, &jules, Rapport::Stranger)).await;
        let second = agent.respond(&context(&mara, &jules, Rapport::Stranger)).await;
        assert_eq!(first.text, second.text);
        assert!((first.sentiment - second.sentiment).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn rapport_changes_register() {
        let mara = Character::new("Mara").with_mood(70.0);
        let jules = Character::new("Jules");
        let agent = SocialAgent::new_stub();

        let cold = agent.respond(&context(&mara, &jules, Rapport::Stranger)).await;
        let warm = agent.respond(&context(&mara, &jules, Rapport::CloseFriend)).await;
        assert_ne!(cold.text, warm.text);
        assert!(warm.sentiment > cold.sentiment);
    }

    #[tokio::test]
    async fn low_mood_turns_curt() {
        let mara = Character::new("Mara").with_mood(15.0);
        let jules = Character::new("Jules");
        let agent = SocialAgent::new_stub();

        let reply = agent.respond(&context(&mara, &jules, Rapport::Friend)).await;
        assert!(reply.sentiment < 0.0);
        assert!(reply.text.contains("Jules"));
    }

    #[tokio::test]
    async fn stub_reflection_names_the_partner() {
        let mara = Character::new("Mara")
            .with_mood(85.0)
            .with_traits(Traits::new(90.0, 50.0, 50.0, 50.0, 50.0));
        let jules = Character::new("Jules");
        let agent = SocialAgent::new_stub();

        let note = agent.reflect(&context(&mara, &jules, Rapport::Friend)).await;
        assert!(note.contains("Jules"));
        assert!(note.contains("better spirits"));
    }

    #[tokio::test]
    async fn llm_agent_degrades_to_stub_when_unavailable() {
        let mara = Character::new("Mara").with_mood(70.0);
        let jules = Character::new("Jules");
        let agent = SocialAgent::new_llm(
            Arc::new(LlmClient::none()),
            CostTracker::new(),
            &LlmSettings::default(),
        );

        let reply = agent.respond(&context(&mara, &jules, Rapport::Stranger)).await;
        assert!(!reply.text.is_empty());
    }
}
