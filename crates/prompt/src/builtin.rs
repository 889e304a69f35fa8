//! Prompts shipped with the binary.

use crate::types::PromptDefinition;

/// Identifier of the diagnosis prompt used by the context synthesizer.
pub const DIAGNOSIS_PROMPT_ID: &str = "triage.diagnosis";

const DIAGNOSIS_TEMPLATE: &str = "\
You are a support engineer assistant. The current date is {{currentDate}}.
A user has reported this issue:

{{query}}

Here are related support tickets from the past:

{{context}}

Based on this information, answer in simple terms:
- What might be causing this issue?
- What should the user check?
- Mention if similar issues were resolved and how. Include the ticket link if available and relevant steps.
Be clear and use bullet points if needed. Keep the response concise and focused on the user's issue.";

/// The built-in diagnosis prompt.
///
/// Variables: `query`, `context`, `currentDate`.
pub fn diagnosis_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DIAGNOSIS_PROMPT_ID.to_string(),
        title: "Ticket diagnosis".to_string(),
        api_version: "1.0".to_string(),
        created_by: "triage".to_string(),
        system: None,
        template: DIAGNOSIS_TEMPLATE.to_string(),
    }
}

/// Look up a built-in prompt by id.
pub fn builtin_prompt(id: &str) -> Option<PromptDefinition> {
    match id {
        DIAGNOSIS_PROMPT_ID => Some(diagnosis_prompt()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnosis_prompt_asks_for_cause_checks_and_resolutions() {
        let prompt = diagnosis_prompt();
        assert!(prompt.template.contains("{{query}}"));
        assert!(prompt.template.contains("{{context}}"));
        assert!(prompt.template.contains("{{currentDate}}"));
        assert!(prompt.template.contains("What might be causing this issue?"));
        assert!(prompt.template.contains("What should the user check?"));
        assert!(prompt.template.contains("ticket link"));
    }

    #[test]
    fn test_builtin_lookup() {
        assert!(builtin_prompt(DIAGNOSIS_PROMPT_ID).is_some());
        assert!(builtin_prompt("missing").is_none());
    }
}
