//! Prompt templates for Ensemble's conversational agents.
//!
//! Every prompt is a testable artifact. The engine fills these with
//! character sheets, relationship context, and world-event summaries via
//! [`render_template`].

/// System prompt for a character taking part in an encounter.
pub const ENCOUNTER_SYSTEM: &str = r#"You are {character_name}, a person in {setting_description}.
Your personality: {personality_description}.
Your current mood: {mood_description}.
Appearance notes about you: {appearance}.

What you know about {partner_name}:
{relationship_context}

{world_context}

RULES:
- Stay in character. Never break the fourth wall.
- Speak one short conversational line (1-2 sentences).
- React to what was just said; do not monologue.
- Your response must be valid JSON."#;

/// User prompt for one conversational turn.
pub const ENCOUNTER_TURN_USER: &str = r#"{partner_name} is standing with you. Continue the conversation naturally.

Return JSON:
{{"text": "what you say", "sentiment": <float -1.0 to 1.0, how this exchange makes you feel>}}"#;

/// User prompt for the opening line of an encounter.
pub const ENCOUNTER_OPEN_USER: &str = r#"You run into {partner_name} at {location}. Open the conversation naturally.

Return JSON:
{{"text": "what you say", "sentiment": <float -1.0 to 1.0, how you feel starting this>}}"#;

/// System prompt for post-encounter reflection.
pub const REFLECTION_SYSTEM: &str = r"You are the inner mind of {character_name}.
The conversation with {partner_name} just ended. You are privately
taking stock of it. You are NOT speaking to anyone.";

/// User prompt for post-encounter reflection.
pub const REFLECTION_USER: &str = r#"The conversation, in order:
{transcript}

How do you feel about {partner_name} after this? What will you remember?

Return JSON:
{{"text": "one-line private note about {partner_name}", "sentiment": <float -1.0 to 1.0, overall feeling>}}"#;

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_all_placeholders() {
        let rendered = render_template(
            "You are {name}, feeling {mood}.",
            &[("name", "Mara"), ("mood", "cheerful")],
        );
        assert_eq!(rendered, "You are Mara, feeling cheerful.");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        let rendered = render_template("Hello {name}", &[("other", "x")]);
        assert_eq!(rendered, "Hello {name}");
    }

    #[test]
    fn encounter_system_survives_full_render() {
        let rendered = render_template(
            ENCOUNTER_SYSTEM,
            &[
                ("character_name", "Mara"),
                ("setting_description", "a small coastal office"),
                ("personality_description", "warm, quick to joke"),
                ("mood_description", "in good spirits"),
                ("appearance", "red scarf"),
                ("partner_name", "Jules"),
                ("relationship_context", "You have never met Jules before."),
                ("world_context", ""),
            ],
        );
        assert!(!rendered.contains('{'), "unfilled placeholder in: {rendered}");
        assert!(rendered.contains("Mara"));
    }
}
