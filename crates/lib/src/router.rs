//! Router: admission check, then handoff to exactly one specialist.
//!
//! `Start -> AdmissionChecked -> {Dispatched, Rejected}`. The admission check always completes
//! before any other backend call; a rejection ends the dispatch without calling a specialist.
//! Backend failures are reported as their own outcome and never look like a rejection.

use crate::guardrail::TopicGuardrail;
use crate::llm::{ChatRequest, LlmBackend, LlmError, ToolCall, ToolChoice};
use crate::specialist::{Language, Specialist, SpecialistResponder};
use std::fmt;
use std::sync::Arc;

const TRIAGE_INSTRUCTIONS: &str = "You are the Engineer Trainer. You determine which engineering domain \
(Mechatronics, Avionics, Electrical) is best suited to respond to the user's question, and hand the \
question off by calling exactly one of the transfer tools. Also consider the language the user prefers \
(English, Urdu, or French) and pass it as the language argument.";

/// Which backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Admission,
    Handoff,
    Specialist,
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStage::Admission => f.write_str("admission"),
            DispatchStage::Handoff => f.write_str("handoff"),
            DispatchStage::Specialist => f.write_str("specialist"),
        }
    }
}

/// Result of one dispatch.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Admission passed and one specialist answered.
    Dispatched {
        specialist: Specialist,
        language: Option<Language>,
        output: String,
    },
    /// Admission check flagged the input as off-topic; no specialist ran.
    Rejected { reasoning: String },
    /// A backend call failed at `stage`.
    BackendFailure { stage: DispatchStage, error: LlmError },
}

/// Holds the specialists and the shared backend; read-only after construction.
pub struct EngineerRouter {
    backend: Arc<dyn LlmBackend>,
    model: String,
    guardrail: TopicGuardrail,
    responder: SpecialistResponder,
}

impl EngineerRouter {
    pub fn new(backend: Arc<dyn LlmBackend>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            backend,
            guardrail: TopicGuardrail::new(model.clone()),
            responder: SpecialistResponder::new(model.clone()),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn dispatch(&self, input: &str) -> DispatchOutcome {
        let verdict = match self.guardrail.check(self.backend.as_ref(), input).await {
            Ok(v) => v,
            Err(error) => {
                return DispatchOutcome::BackendFailure {
                    stage: DispatchStage::Admission,
                    error,
                }
            }
        };
        if verdict.is_irrelevant {
            log::info!("router: tripwire triggered, input rejected");
            return DispatchOutcome::Rejected {
                reasoning: verdict.reasoning,
            };
        }

        let (specialist, language) = match self.select_specialist(input).await {
            Ok(choice) => choice,
            Err(error) => {
                return DispatchOutcome::BackendFailure {
                    stage: DispatchStage::Handoff,
                    error,
                }
            }
        };
        log::info!(
            "router: handoff to {} (language: {})",
            specialist,
            language.map_or("unspecified", Language::name)
        );

        match self
            .responder
            .respond(self.backend.as_ref(), specialist, language, input)
            .await
        {
            Ok(output) => DispatchOutcome::Dispatched {
                specialist,
                language,
                output,
            },
            Err(error) => DispatchOutcome::BackendFailure {
                stage: DispatchStage::Specialist,
                error,
            },
        }
    }

    /// Ask the model which specialist should answer. Exactly one is chosen or this fails.
    async fn select_specialist(
        &self,
        input: &str,
    ) -> Result<(Specialist, Option<Language>), LlmError> {
        let tools = Specialist::ALL.iter().map(|s| s.handoff_tool()).collect();
        let request = ChatRequest::new(&self.model, TRIAGE_INSTRUCTIONS, input)
            .with_tools(tools, ToolChoice::Required);
        let response = self.backend.chat(request).await?;
        pick_handoff(&response.tool_calls).ok_or_else(|| {
            LlmError::MalformedOutput(format!(
                "no handoff to a known specialist (tool calls: {:?}, content: {:?})",
                response
                    .tool_calls
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>(),
                response.content
            ))
        })
    }
}

/// First tool call that names a known specialist. Later calls are ignored.
fn pick_handoff(calls: &[ToolCall]) -> Option<(Specialist, Option<Language>)> {
    calls.iter().find_map(|call| {
        let specialist = Specialist::from_tool_name(&call.name)?;
        let language = call
            .arguments
            .get("language")
            .and_then(|v| v.as_str())
            .and_then(Language::parse);
        Some((specialist, language))
    })
}
