//! Telegram channel: long-poll getUpdates and reply with sendMessage via the Bot API.

use crate::channels::inbound::InboundMessage;
use crate::channels::registry::{ChannelError, ChannelHandle};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_TIMEOUT: u64 = 30;

/// sendMessage rejects text over 4096 characters; replies are split below that.
const MAX_MESSAGE_CHARS: usize = 3800;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Telegram connector: forwards text messages as inbound messages and sends replies.
pub struct TelegramChannel {
    token: String,
    api_base: String,
    running: AtomicBool,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, TELEGRAM_API_BASE)
    }

    /// Use a different Bot API base URL (local Bot API server, tests).
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            running: AtomicBool::new(false),
            client: reqwest::Client::new(),
        }
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Start the getUpdates long-poll loop, forwarding messages to `inbound_tx`.
    pub fn start_inbound(
        self: Arc<Self>,
        inbound_tx: mpsc::Sender<InboundMessage>,
    ) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("telegram channel: starting getUpdates long-poll loop");
        tokio::spawn(async move {
            run_get_updates_loop(self, inbound_tx).await;
        })
    }

    /// Call getUpdates (long poll). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), ChannelError> {
        let mut url = format!("{}?timeout={}", self.method_url("getUpdates"), LONG_POLL_TIMEOUT);
        if let Some(off) = offset {
            url.push_str(&format!("&offset={}", off));
        }
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("getUpdates failed: {} {}", status, body)));
        }
        let data: GetUpdatesResponse = res.json().await?;
        if !data.ok {
            return Err(ChannelError::Api("getUpdates returned ok: false".to_string()));
        }
        let next_offset = data.result.iter().map(|u| u.update_id).max().map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    /// Send a text message to a chat via sendMessage, split into several messages when it is
    /// longer than Telegram allows. Stops at the first part that fails.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        if self.token.trim().is_empty() {
            return Err(ChannelError::NotConfigured("telegram bot token"));
        }
        let parts = split_reply(text, MAX_MESSAGE_CHARS);
        if parts.len() > 1 {
            log::debug!("telegram: reply to {} split into {} messages", chat_id, parts.len());
        }
        for part in parts {
            self.send_message_part(chat_id, part).await?;
        }
        Ok(())
    }

    async fn send_message_part(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        let res = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!(
                "sendMessage failed: {} {}",
                status, body
            )));
        }
        Ok(())
    }
}

/// Split `text` into parts of at most `max_chars` characters, preferring paragraph breaks, then
/// line breaks, then spaces. Always returns at least one part.
fn split_reply(text: &str, max_chars: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = text;
    loop {
        let (part, tail) = split_at_boundary(rest, max_chars);
        parts.push(part);
        if tail.is_empty() {
            return parts;
        }
        rest = tail;
    }
}

fn split_at_boundary(text: &str, max_chars: usize) -> (&str, &str) {
    let cut = match text.char_indices().nth(max_chars) {
        Some((i, _)) => i,
        None => return (text, ""),
    };
    let region = &text[..cut];
    if let Some(pos) = region.rfind("\n\n").filter(|&p| p > 0) {
        return (&text[..pos], text[pos + 2..].trim_start());
    }
    if let Some(pos) = region.rfind('\n').filter(|&p| p > 0) {
        return (&text[..pos], text[pos + 1..].trim_start());
    }
    if let Some(pos) = region.rfind(' ').filter(|&p| p > 0) {
        return (&text[..pos], &text[pos + 1..]);
    }
    (region, &text[cut..])
}

/// Text messages from a batch of updates, as inbound messages for the "telegram" channel.
fn updates_to_inbound(updates: Vec<TelegramUpdate>) -> Vec<InboundMessage> {
    updates
        .into_iter()
        .filter_map(|u| {
            let msg = u.message?;
            let text = msg.text?;
            Some(InboundMessage::new("telegram", msg.chat.id.to_string(), text))
        })
        .collect()
}

async fn run_get_updates_loop(
    channel: Arc<TelegramChannel>,
    inbound_tx: mpsc::Sender<InboundMessage>,
) {
    let mut offset: Option<i64> = None;
    while channel.running() {
        match channel.get_updates(offset).await {
            Ok((updates, next)) => {
                if next.is_some() {
                    offset = next;
                }
                for inbound in updates_to_inbound(updates) {
                    if inbound_tx.send(inbound).await.is_err() {
                        log::debug!("telegram: inbound channel closed, stopping loop");
                        return;
                    }
                }
            }
            Err(e) => {
                log::warn!("telegram getUpdates error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
            }
        }
    }
    log::info!("telegram channel: getUpdates loop stopped");
}

#[async_trait]
impl ChannelHandle for TelegramChannel {
    fn id(&self) -> &str {
        "telegram"
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn send_message(&self, conversation_id: &str, text: &str) -> Result<(), ChannelError> {
        self.send_text(conversation_id, text).await
    }
}
