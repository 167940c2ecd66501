//! Engineer Trainer core library: greeting fast-path, topic guardrail, and routing of
//! engineering questions to one of three specialists, shared by the CLI and the gateway.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod greeting;
pub mod guardrail;
pub mod handler;
pub mod init;
pub mod llm;
pub mod router;
pub mod specialist;
