//! Channel registry: running channel connectors by id, used to deliver replies.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel not configured: {0}")]
    NotConfigured(&'static str),
    #[error("channel request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("channel api error: {0}")]
    Api(String),
}

/// Handle to a running channel connector.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;
    /// Stop the connector's inbound loop.
    fn stop(&self);
    /// Deliver one outbound text to a conversation.
    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), ChannelError>;
}

/// Registry of channel ids to handles. Shared across the gateway.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn ChannelHandle>>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the handle's own id; a previous handle with that id is stopped.
    pub async fn register(&self, handle: Arc<dyn ChannelHandle>) {
        let id = handle.id().to_string();
        if let Some(old) = self.inner.write().await.insert(id.clone(), handle) {
            log::debug!("channel {} re-registered, stopping previous connector", id);
            old.stop();
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn ChannelHandle>> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every registered connector.
    pub async fn stop_all(&self) {
        for handle in self.inner.read().await.values() {
            handle.stop();
        }
    }
}
