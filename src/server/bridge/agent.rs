//! Voice-agent connector
//!
//! Per call: fetch a short-lived signed WebSocket URL from the agent
//! provider, connect, and seed the conversation with the call context
//! (client, invoice, amount, due date) via a full prompt override. The
//! signed-URL fetch is the one fatal failure point — without an agent there
//! is no call, and retrying would leave the caller in dead air.

use std::collections::HashMap;

use futures::SinkExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::BridgeError;
use crate::config::BridgeConfig;

/// Outbound WebSocket to the voice agent.
pub type AgentSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Context for one call, extracted from the telephony `start` frame.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub client_name: String,
    pub invoice_number: String,
    pub amount: String,
    pub due_date: String,
}

impl CallContext {
    /// Build from the dialer's custom parameters, with neutral fallbacks so
    /// a sparsely-parameterized call still gets a coherent prompt.
    pub fn from_parameters(params: &HashMap<String, String>) -> Self {
        let get = |key: &str, fallback: &str| {
            params
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            client_name: get("client_name", "the client"),
            invoice_number: get("invoice_number", "unknown"),
            amount: get("amount", "the outstanding amount"),
            due_date: get("due_date", "recently"),
        }
    }
}

const PROMPT_TEMPLATE: &str = "\
You are a friendly accounts-receivable assistant calling on behalf of a small business. \
You are speaking with {client_name} about invoice {invoice_number} over the amount of {amount}, \
which was due {due_date}.

Guidelines for this phone call:
- Keep responses short and natural for voice
- Confirm the invoice details before asking for payment
- If the caller agrees to pay, collect card number, expiry date and CVV, \
then use the collect_payment tool
- Read back the result of the payment attempt to the caller
- If the caller declines or wants a human, thank them and end the call politely";

const FIRST_MESSAGE_TEMPLATE: &str = "Hello, am I speaking with {client_name}? \
I'm calling about invoice {invoice_number} over {amount} that was due {due_date}.";

fn substitute(template: &str, context: &CallContext) -> String {
    template
        .replace("{client_name}", &context.client_name)
        .replace("{invoice_number}", &context.invoice_number)
        .replace("{amount}", &context.amount)
        .replace("{due_date}", &context.due_date)
}

/// The initiation frame sent as the first message on the agent socket.
pub fn initiation_message(context: &CallContext) -> serde_json::Value {
    json!({
        "type": "conversation_initiation_client_data",
        "dynamic_variables": {
            "client_name": context.client_name,
            "invoice_number": context.invoice_number,
            "amount": context.amount,
            "due_date": context.due_date,
        },
        "conversation_config_override": {
            "agent": {
                "prompt": {
                    "prompt": substitute(PROMPT_TEMPLATE, context),
                },
                "first_message": substitute(FIRST_MESSAGE_TEMPLATE, context),
            }
        }
    })
}

/// True when the agent already emits telephony-native μ-law at 8kHz, so the
/// codec translator can be bypassed for the rest of the session. Only the
/// exact format qualifies: μ-law at any other rate still needs conversion.
pub fn output_is_ulaw_8k(format: &str) -> bool {
    format == "ulaw_8000"
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    signed_url: String,
}

/// Client for opening per-call agent sessions
#[derive(Clone)]
pub struct AgentConnector {
    http: Client,
    api_key: String,
    agent_id: String,
    signed_url_endpoint: String,
}

impl AgentConnector {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.agent_api_key.clone(),
            agent_id: config.agent_id.clone(),
            signed_url_endpoint: config.signed_url_endpoint(),
        }
    }

    /// One HTTP round trip for a short-lived signed connection URL.
    async fn signed_url(&self) -> Result<String, BridgeError> {
        let response = self
            .http
            .get(&self.signed_url_endpoint)
            .query(&[("agent_id", self.agent_id.as_str())])
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| BridgeError::SignedUrl(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::SignedUrl(format!("status {}: {}", status, body)));
        }

        let parsed: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::SignedUrl(e.to_string()))?;
        Ok(parsed.signed_url)
    }

    /// Open the agent socket and send the initiation frame.
    ///
    /// There is deliberately no connect timeout here; the only cancellation
    /// mechanism is the caller hanging up, which drops this future.
    pub async fn connect(&self, context: &CallContext) -> Result<AgentSocket, BridgeError> {
        let url = self.signed_url().await?;

        let (mut socket, _response) = tokio_tungstenite::connect_async(&url).await?;

        let init = initiation_message(context);
        socket.send(Message::Text(init.to_string().into())).await?;

        tracing::debug!(
            "Agent session opened for invoice {}",
            context.invoice_number
        );
        Ok(socket)
    }
}
