//! Communication channels (e.g. Telegram).
//!
//! Channels deliver inbound messages to the gateway and send the handler's replies back.

mod inbound;
mod registry;
mod telegram;

pub use inbound::InboundMessage;
pub use registry::{ChannelError, ChannelHandle, ChannelRegistry};
pub use telegram::{TelegramChannel, TelegramUpdate};
