//! Bridge Configuration
//!
//! Configuration for the voice-agent provider, the internal payments API
//! and the listening socket. Everything comes from environment variables.

use serde::{Deserialize, Serialize};

/// Runtime configuration for the bridge server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Address to bind the HTTP/WebSocket listener to
    pub host: String,

    /// Port to bind the HTTP/WebSocket listener to
    pub port: u16,

    /// API key for the voice-agent provider
    pub agent_api_key: String,

    /// Identifier of the configured conversational agent
    pub agent_id: String,

    /// Base URL of the voice-agent provider API
    pub agent_api_base: String,

    /// URL of the internal payment-collection endpoint
    pub payment_url: String,

    /// Optional bearer token for the payment endpoint
    pub payment_token: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            agent_api_key: String::new(),
            agent_id: String::new(),
            agent_api_base: "https://api.elevenlabs.io".to_string(),
            payment_url: String::new(),
            payment_token: None,
        }
    }
}

impl BridgeConfig {
    /// Create config from environment variables
    pub fn from_env() -> Option<Self> {
        let agent_api_key = std::env::var("AGENT_API_KEY").ok()?;
        let agent_id = std::env::var("AGENT_ID").ok()?;
        let payment_url = std::env::var("PAYMENT_API_URL").ok()?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let agent_api_base = std::env::var("AGENT_API_BASE")
            .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string());

        Some(Self {
            host,
            port,
            agent_api_key,
            agent_id,
            agent_api_base,
            payment_url,
            payment_token: std::env::var("PAYMENT_API_TOKEN").ok(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.agent_api_key.is_empty() {
            return Err("Agent API key is required".to_string());
        }
        if self.agent_id.is_empty() {
            return Err("Agent ID is required".to_string());
        }
        if self.payment_url.is_empty() {
            return Err("Payment endpoint URL is required".to_string());
        }
        if !self.agent_api_base.starts_with("http://") && !self.agent_api_base.starts_with("https://")
        {
            return Err("Agent API base must be an http(s) URL".to_string());
        }
        if !self.payment_url.starts_with("http://") && !self.payment_url.starts_with("https://") {
            return Err("Payment endpoint must be an http(s) URL".to_string());
        }
        Ok(())
    }

    /// URL that issues short-lived signed WebSocket endpoints for the agent
    pub fn signed_url_endpoint(&self) -> String {
        format!(
            "{}/v1/convai/conversation/get-signed-url",
            self.agent_api_base.trim_end_matches('/')
        )
    }
}
