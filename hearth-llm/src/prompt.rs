//! Prompt templates for reflection and day planning.
//!
//! Templates use `{name}` placeholders filled by [`render_template`].
//! Literal braces in the JSON examples are doubled (`{{`), and
//! [`render_template`] collapses them after substitution.

use hearth_core::planning::AgentState;

/// Reflection system prompt.
pub const REFLECTION_SYSTEM: &str = r"You are the inner voice of {agent_name}, an autonomous agent in a shared world.
You are reflecting on your recent experiences during a quiet moment.
Look for patterns and lessons. Be concrete and brief.
You are NOT speaking to anyone. This is a private thought.";

/// Reflection user prompt.
pub const REFLECTION_USER: &str = r#"Your recent memories, oldest first:
{memories_formatted}

What higher-level insight do these experiences suggest? Answer in one or two sentences.

Return JSON:
{{"reflection": "your insight"}}"#;

/// Day-plan system prompt.
pub const PLAN_SYSTEM: &str = r"You are {agent_name}, an autonomous agent planning your day.
Plans must be realistic for your current condition and build on what you did recently.
Use 24-hour times. Your response must be valid JSON.";

/// Day-plan user prompt.
pub const PLAN_USER: &str = r#"Your condition:
{state_formatted}

What you did in the last day, oldest first:
{memories_formatted}

Plan today. Return JSON:
{{"overview": "one-line summary", "goals": ["goal", ...], "hourly_schedule": [{{"time": "HH:MM", "activity": "what you will do"}}, ...]}}"#;

/// Replace each `{key}` with its value, then collapse doubled braces.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result.replace("{{", "{").replace("}}", "}")
}

/// Numbered list of memory contents; `(nothing yet)` when empty.
#[must_use]
pub fn format_memories(contents: &[String]) -> String {
    if contents.is_empty() {
        return "(nothing yet)".to_string();
    }
    contents
        .iter()
        .enumerate()
        .map(|(i, content)| format!("{}. {}", i + 1, content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Energy, hunger, location and inventory as prompt lines.
#[must_use]
pub fn format_state(state: &AgentState) -> String {
    let mut out = format!("- energy: {:.0}/100\n- hunger: {:.0}/100", state.energy, state.hunger);
    if let Some(location) = &state.location {
        out.push_str(&format!("\n- location: {location}"));
    }
    if state.inventory.is_empty() {
        out.push_str("\n- inventory: empty");
    } else {
        let items: Vec<String> = state
            .inventory
            .iter()
            .map(|(item, count)| format!("{item} x{count}"))
            .collect();
        out.push_str(&format!("\n- inventory: {}", items.join(", ")));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_placeholders_and_unescapes_braces() {
        let rendered = render_template(REFLECTION_USER, &[("memories_formatted", "1. chopped wood")]);
        assert!(rendered.contains("1. chopped wood"));
        assert!(rendered.contains(r#"{"reflection": "your insight"}"#));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn memories_are_numbered() {
        let formatted = format_memories(&["saw a tree".to_string(), " met Bob ".to_string()]);
        assert_eq!(formatted, "1. saw a tree\n2. met Bob");
        assert_eq!(format_memories(&[]), "(nothing yet)");
    }

    #[test]
    fn state_lists_inventory_in_name_order() {
        let mut state = AgentState::default();
        state.inventory.insert("wood".to_string(), 3);
        state.inventory.insert("stone".to_string(), 1);
        let formatted = format_state(&state);
        assert!(formatted.contains("energy: 100/100"));
        assert!(formatted.contains("inventory: stone x1, wood x3"));
        assert!(!formatted.contains("location"));
    }

    #[test]
    fn state_includes_location_when_known() {
        let state = AgentState {
            location: Some(hearth_core::types::Location::new(1.0, 2.0, 3.0)),
            ..AgentState::default()
        };
        let formatted = format_state(&state);
        assert!(formatted.contains("\n- location: "));
        assert!(formatted.ends_with("- inventory: empty"));
    }
}
