//! Message handler: exactly one outbound reply per inbound message.
//!
//! Greeting fast-path first (no backend traffic), then the router. Only this layer decides how
//! an outcome is framed for the user.

use crate::channels::InboundMessage;
use crate::config::{self, Config};
use crate::greeting::{GreetingVocabulary, GREETING_REPLY};
use crate::llm::OpenAiCompatClient;
use crate::router::{DispatchOutcome, EngineerRouter};
use crate::specialist::Specialist;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Reply when the admission check rejects the input.
pub const REFUSAL_REPLY: &str = "❌ Your input was blocked because it's not related to Mechatronics, Avionics, or Electrical Engineering.";

/// Reply when a backend call fails. Distinct from the refusal.
pub const FAILURE_REPLY: &str =
    "⚠️ Sorry, the engineering assistant is unavailable right now. Please try again later.";

/// What produced an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "specialist", rename_all = "lowercase")]
pub enum ReplyKind {
    Greeting,
    Refusal,
    Answer(Specialist),
    Failure,
}

impl ReplyKind {
    pub fn label(self) -> &'static str {
        match self {
            ReplyKind::Greeting => "greeting",
            ReplyKind::Refusal => "refusal",
            ReplyKind::Answer(_) => "answer",
            ReplyKind::Failure => "failure",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, ReplyKind::Failure)
    }
}

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Id of the inbound message this answers.
    pub reply_to: Uuid,
    pub kind: ReplyKind,
    pub text: String,
}

/// Entry point for one user turn. Cheap to share across tasks (read-only).
pub struct MessageHandler {
    greetings: GreetingVocabulary,
    router: EngineerRouter,
}

impl MessageHandler {
    pub fn new(greetings: GreetingVocabulary, router: EngineerRouter) -> Self {
        Self { greetings, router }
    }

    /// Build the handler from resolved config: OpenAI-compatible client, model, greeting vocabulary.
    /// Fails when no API key is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = OpenAiCompatClient::from_config(config)?;
        let model = config::resolve_model(config);
        log::info!("backend: {} (model {})", client.base_url(), model);
        let greetings = if config.greetings.phrases.is_empty() {
            GreetingVocabulary::default()
        } else {
            GreetingVocabulary::new(&config.greetings.phrases)
        };
        Ok(Self::new(
            greetings,
            EngineerRouter::new(Arc::new(client), model),
        ))
    }

    pub fn router(&self) -> &EngineerRouter {
        &self.router
    }

    pub async fn handle(&self, msg: &InboundMessage) -> OutboundMessage {
        let (kind, text) = if self.greetings.matches(&msg.text) {
            log::debug!("handler[{}]: greeting fast-path", msg.id);
            (ReplyKind::Greeting, GREETING_REPLY.to_string())
        } else {
            match self.router.dispatch(&msg.text).await {
                DispatchOutcome::Dispatched {
                    specialist, output, ..
                } => (ReplyKind::Answer(specialist), output),
                DispatchOutcome::Rejected { reasoning } => {
                    log::info!("handler[{}]: refused ({})", msg.id, reasoning);
                    (ReplyKind::Refusal, REFUSAL_REPLY.to_string())
                }
                DispatchOutcome::BackendFailure { stage, error } => {
                    log::error!(
                        "handler[{}]: backend failure during {}: {}",
                        msg.id,
                        stage,
                        error
                    );
                    (ReplyKind::Failure, FAILURE_REPLY.to_string())
                }
            }
        };
        OutboundMessage {
            reply_to: msg.id,
            kind,
            text,
        }
    }
}
