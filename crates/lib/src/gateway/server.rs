//! Gateway HTTP server and channel processing loop.

use crate::channels::{ChannelRegistry, InboundMessage, TelegramChannel};
use crate::config::{self, Config};
use crate::handler::{MessageHandler, ReplyKind};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channel id for messages posted to `POST /message`.
const HTTP_CHANNEL_ID: &str = "http";

/// Shared state for the gateway. The handler is read-only and shared by all requests.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub handler: Arc<MessageHandler>,
    pub channel_registry: ChannelRegistry,
}

/// Body of `POST /message`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub text: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// HTTP routes: `GET /` health, `POST /message` one turn.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/message", post(post_message))
        .with_state(state)
}

/// Run the gateway: build the handler from config, start channels, serve until Ctrl+C / SIGTERM.
pub async fn run_gateway(config: Config) -> Result<()> {
    let handler = Arc::new(MessageHandler::from_config(&config)?);
    serve(config, handler).await
}

/// Serve with an already-built handler.
pub async fn serve(config: Config, handler: Arc<MessageHandler>) -> Result<()> {
    let channel_registry = ChannelRegistry::new();
    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(64);
    let mut channel_tasks: Vec<JoinHandle<()>> = Vec::new();

    if let Some(token) = config::resolve_telegram_token(&config) {
        let telegram = Arc::new(TelegramChannel::new(token));
        channel_tasks.push(telegram.clone().start_inbound(inbound_tx.clone()));
        channel_registry.register(telegram).await;
        log::info!("telegram channel registered and getUpdates loop started");
    }
    drop(inbound_tx);

    let processor = spawn_inbound_processor(handler.clone(), channel_registry.clone(), inbound_rx);

    let state = GatewayState {
        config: Arc::new(config.clone()),
        handler,
        channel_registry: channel_registry.clone(),
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(channel_registry, channel_tasks))
        .await
        .context("gateway server exited")?;
    processor.abort();
    log::info!("gateway stopped");
    Ok(())
}

/// Handle channel messages as they arrive; each message gets its own task and one reply.
fn spawn_inbound_processor(
    handler: Arc<MessageHandler>,
    registry: ChannelRegistry,
    mut inbound_rx: mpsc::Receiver<InboundMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = inbound_rx.recv().await {
            let handler = handler.clone();
            let registry = registry.clone();
            tokio::spawn(async move {
                process_inbound_message(&handler, &registry, msg).await;
            });
        }
    })
}

/// Run the handler for one channel message and deliver the reply on the same conversation.
async fn process_inbound_message(
    handler: &MessageHandler,
    registry: &ChannelRegistry,
    msg: InboundMessage,
) {
    let reply = handler.handle(&msg).await;
    log::debug!(
        "inbound[{}]: {} reply on {}/{}",
        msg.id,
        reply.kind.label(),
        msg.channel_id,
        msg.conversation_id
    );
    let Some(channel) = registry.get(&msg.channel_id).await else {
        log::warn!("inbound[{}]: channel {} not registered", msg.id, msg.channel_id);
        return;
    };
    if let Err(e) = channel.send_message(&msg.conversation_id, &reply.text).await {
        log::warn!("inbound[{}]: send_message failed: {}", msg.id, e);
    }
}

/// Completes on SIGINT or SIGTERM, then stops channel connectors and awaits their tasks.
async fn shutdown_signal(channel_registry: ChannelRegistry, channel_tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, stopping channels");

    channel_registry.stop_all().await;
    for h in channel_tasks {
        // The long poll may be mid-request; don't wait out its timeout.
        h.abort();
        let _ = h.await;
    }
    log::info!("channel tasks finished");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let channels = state.channel_registry.ids().await;
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "model": state.handler.router().model(),
        "channels": channels,
    }))
}

/// POST /message runs one turn. A backend failure is answered with 502 so callers see it.
async fn post_message(
    State(state): State<GatewayState>,
    Json(body): Json<MessageRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let conversation_id = body.conversation_id.unwrap_or_else(|| "default".to_string());
    let msg = InboundMessage::new(HTTP_CHANNEL_ID, conversation_id, body.text);
    let reply = state.handler.handle(&msg).await;
    let specialist = match reply.kind {
        ReplyKind::Answer(s) => Some(s),
        _ => None,
    };
    let status = if reply.kind.is_failure() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (
        status,
        Json(json!({
            "id": reply.reply_to,
            "kind": reply.kind.label(),
            "specialist": specialist,
            "reply": reply.text,
        })),
    )
}
