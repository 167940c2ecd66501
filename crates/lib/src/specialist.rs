//! Domain specialists and the responder that runs them.
//!
//! The three specialists share one backend and model and differ only in persona. Each one is
//! able to answer in English, Urdu, or French.

use crate::llm::{ChatRequest, LlmBackend, LlmError, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialist {
    Mechatronics,
    Avionics,
    Electrical,
}

impl Specialist {
    pub const ALL: [Specialist; 3] = [
        Specialist::Mechatronics,
        Specialist::Avionics,
        Specialist::Electrical,
    ];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Specialist::Mechatronics => "Mechatronics Expert",
            Specialist::Avionics => "Avionics Expert",
            Specialist::Electrical => "Electrical Engineering Expert",
        }
    }

    /// Capability text used only by the router to pick a specialist; never shown to the user.
    pub fn handoff_description(self) -> &'static str {
        match self {
            Specialist::Mechatronics => {
                "Expert in mechatronics, combining mechanical, electrical, and computer systems."
            }
            Specialist::Avionics => "Expert in avionics and aircraft electronic systems.",
            Specialist::Electrical => {
                "Expert in electrical circuits, power systems, and electronics."
            }
        }
    }

    /// Persona instructions sent as the system message.
    pub fn instructions(self) -> &'static str {
        match self {
            Specialist::Mechatronics => "You are an expert in Mechatronics Engineering. Respond clearly and helpfully. Support communication in English, Urdu, and French.",
            Specialist::Avionics => "You are an expert in Avionics Engineering. Respond clearly and helpfully. Support communication in English, Urdu, and French.",
            Specialist::Electrical => "You are an expert in Electrical Engineering. Respond clearly and helpfully. Support communication in English, Urdu, and French.",
        }
    }

    /// Name of the handoff tool offered to the router model.
    pub fn tool_name(self) -> &'static str {
        match self {
            Specialist::Mechatronics => "transfer_to_mechatronics_expert",
            Specialist::Avionics => "transfer_to_avionics_expert",
            Specialist::Electrical => "transfer_to_electrical_engineering_expert",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Specialist::ALL
            .into_iter()
            .find(|s| s.tool_name() == name.trim())
    }

    /// Handoff tool: description is the capability text, one optional `language` argument.
    pub fn handoff_tool(self) -> ToolDefinition {
        ToolDefinition::function(
            self.tool_name(),
            format!("Handoff to the {}. {}", self.name(), self.handoff_description()),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "language": {
                        "type": "string",
                        "enum": ["english", "urdu", "french"],
                        "description": "Language the user is writing in and expects the answer in."
                    }
                }
            }),
        )
    }
}

impl fmt::Display for Specialist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reply language the router detected. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Urdu,
    French,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Some(Language::English),
            "urdu" | "ur" => Some(Language::Urdu),
            "french" | "fr" | "français" | "francais" => Some(Language::French),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Urdu => "Urdu",
            Language::French => "French",
        }
    }
}

/// Runs a specialist persona against the backend.
#[derive(Debug, Clone)]
pub struct SpecialistResponder {
    model: String,
}

impl SpecialistResponder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// System message for a specialist, with the language hint appended when known.
    pub fn system_prompt(specialist: Specialist, language: Option<Language>) -> String {
        match language {
            Some(l) => format!(
                "{} The user is writing in {}; reply in {}.",
                specialist.instructions(),
                l.name(),
                l.name()
            ),
            None => format!(
                "{} Reply in the language the user writes in.",
                specialist.instructions()
            ),
        }
    }

    /// One free-text call with the raw input. Backend errors propagate; a blank reply (safety
    /// block, empty completion) is `EmptyResponse`.
    pub async fn respond(
        &self,
        backend: &dyn LlmBackend,
        specialist: Specialist,
        language: Option<Language>,
        input: &str,
    ) -> Result<String, LlmError> {
        let system = Self::system_prompt(specialist, language);
        let request = ChatRequest::new(&self.model, &system, input);
        let response = backend.chat(request).await?;
        if response.content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::stub::StubBackend;

    #[test]
    fn tool_names_round_trip_and_are_distinct() {
        for s in Specialist::ALL {
            assert_eq!(Specialist::from_tool_name(s.tool_name()), Some(s));
        }
        assert_eq!(Specialist::from_tool_name("transfer_to_chef"), None);
    }

    #[test]
    fn every_persona_supports_three_languages() {
        for s in Specialist::ALL {
            let text = s.instructions();
            for lang in ["English", "Urdu", "French"] {
                assert!(text.contains(lang), "{} lacks {}", s, lang);
            }
        }
    }

    #[test]
    fn language_parsing_is_lenient() {
        assert_eq!(Language::parse(" French "), Some(Language::French));
        assert_eq!(Language::parse("ur"), Some(Language::Urdu));
        assert_eq!(Language::parse("EN"), Some(Language::English));
        assert_eq!(Language::parse("klingon"), None);
    }

    #[test]
    fn system_prompt_carries_language_hint() {
        let p = SpecialistResponder::system_prompt(Specialist::Electrical, Some(Language::French));
        assert!(p.starts_with(Specialist::Electrical.instructions()));
        assert!(p.ends_with("reply in French."));
    }

    #[tokio::test]
    async fn respond_returns_backend_text_verbatim() {
        let backend = StubBackend::new().answer("  V = I × R  ");
        let out = SpecialistResponder::new("m")
            .respond(&backend, Specialist::Electrical, None, "Explain Ohm's law")
            .await
            .unwrap();
        assert_eq!(out, "  V = I × R  ");
        let req = &backend.requests()[0];
        assert_eq!(req.user_input(), Some("Explain Ohm's law"));
        assert!(req
            .instructions()
            .unwrap()
            .contains("expert in Electrical Engineering"));
    }

    #[tokio::test]
    async fn blank_reply_is_empty_response() {
        for blank in ["", "  \n "] {
            let backend = StubBackend::new().answer(blank);
            let err = SpecialistResponder::new("m")
                .respond(&backend, Specialist::Avionics, None, "What is ARINC 429?")
                .await
                .unwrap_err();
            assert!(matches!(err, LlmError::EmptyResponse), "{:?}", err);
        }
    }
}
