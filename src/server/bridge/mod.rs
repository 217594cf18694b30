//! Realtime call bridge
//!
//! Relays a live phone call between the telephony provider's media-stream
//! WebSocket and a conversational voice agent's WebSocket:
//! - demultiplexes the telephony control frames (`start`, `media`, `stop`)
//! - converts audio between μ-law 8kHz and linear PCM 16kHz when needed
//! - relays the agent's payment tool calls to the internal payments API
//!
//! Each call owns exactly one session task and two sockets; closing either
//! socket tears the pair down.

mod agent;
mod codec;
mod messages;
mod session;
#[cfg(test)]
mod session_integration_tests;
mod tools;

pub use agent::AgentConnector;
pub use session::handle_media_upgrade;

use thiserror::Error;

/// Bridge-related errors
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The signed-URL handshake failed. Fatal for the call: the caller is a
    /// live human and a retry would mean dead air.
    #[error("Signed URL request failed: {0}")]
    SignedUrl(String),

    #[error("Agent socket error: {0}")]
    AgentSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
