//! Configuration types and loading.
//!
//! Config is loaded once at startup from a JSON file (e.g. `~/.trainer/config.json`) and the
//! environment. Environment variables override file values; there is no hot reload.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Remote text-generation backend (endpoint, key, model).
    #[serde(default)]
    pub backend: BackendConfig,

    /// Greeting fast-path vocabulary.
    #[serde(default)]
    pub greetings: GreetingsConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Channel settings (e.g. Telegram).
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Backend endpoint and credentials. All fields can be overridden from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// OpenAI-compatible base URL. Overridden by TRAINER_BASE_URL.
    pub base_url: Option<String>,

    /// API key. Overridden by TRAINER_API_KEY, then GEMINI_API_KEY.
    pub api_key: Option<String>,

    /// Model id used for the guardrail, the handoff and the specialists. Overridden by TRAINER_MODEL.
    pub model: Option<String>,

    /// Per-request timeout in seconds (default 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Greeting vocabulary override. When `phrases` is empty the built-in vocabulary is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GreetingsConfig {
    #[serde(default)]
    pub phrases: Vec<String>,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 15152).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    15152
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub telegram: TelegramChannelConfig,
}

/// Telegram channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramChannelConfig {
    /// Bot token from BotFather. Overridden by TELEGRAM_BOT_TOKEN env when set.
    pub bot_token: Option<String>,
}

/// Read an env var, trimmed; empty counts as unset.
fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the backend API key: TRAINER_API_KEY, then GEMINI_API_KEY, then config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    env_nonempty("TRAINER_API_KEY")
        .or_else(|| env_nonempty("GEMINI_API_KEY"))
        .or_else(|| trimmed(config.backend.api_key.as_ref()))
}

/// Resolve the backend base URL: TRAINER_BASE_URL overrides config; falls back to Gemini.
pub fn resolve_base_url(config: &Config) -> String {
    env_nonempty("TRAINER_BASE_URL")
        .or_else(|| trimmed(config.backend.base_url.as_ref()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the model id: TRAINER_MODEL overrides config; falls back to DEFAULT_MODEL.
pub fn resolve_model(config: &Config) -> String {
    env_nonempty("TRAINER_MODEL")
        .or_else(|| trimmed(config.backend.model.as_ref()))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

/// Resolve the Telegram bot token: env TELEGRAM_BOT_TOKEN overrides config.
pub fn resolve_telegram_token(config: &Config) -> Option<String> {
    env_nonempty("TELEGRAM_BOT_TOKEN")
        .or_else(|| trimmed(config.channels.telegram.bot_token.as_ref()))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("TRAINER_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".trainer").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (TRAINER_CONFIG_PATH or ~/.trainer/config.json).
/// Missing file => default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
