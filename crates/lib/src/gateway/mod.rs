//! Gateway: HTTP transport for the message handler, plus channel connectors.
//!
//! Single port. `GET /` is a health probe; `POST /message` answers one message. Channel
//! messages (e.g. Telegram) go through the same handler and are answered on their channel.

mod server;

pub use server::{router, run_gateway, serve, GatewayState, MessageRequest};
