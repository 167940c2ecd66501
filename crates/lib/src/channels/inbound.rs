//! Inbound message from a channel: one user turn, handled once and not retained.

use uuid::Uuid;

/// A message from a channel to be answered by the message handler.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Per-message id for log correlation.
    pub id: Uuid,
    pub channel_id: String,
    pub conversation_id: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            text: text.into(),
        }
    }
}
