//! Internal payments API client
//!
//! One POST per payment attempt against the dashboard's payment-collection
//! endpoint. The bridge never retries: a declined or failed attempt is
//! narrated back to the caller, who can try again in the same conversation.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {message}")]
    Api { message: String },
}

/// Card and invoice details extracted from the agent's tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
    pub invoice_number: String,
    pub amount: f64,
    #[serde(default)]
    pub client_name: Option<String>,
}

/// Response shape of the payment-collection endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct PaymentClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl PaymentClient {
    pub fn new(endpoint: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            token,
        }
    }

    /// Attempt to collect a payment. Exactly one HTTP round trip.
    pub async fn collect(&self, request: &PaymentRequest) -> Result<PaymentResponse, PaymentError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request);

        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Api { message });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_from_tool_parameters() {
        let params = serde_json::json!({
            "card_number": "4242424242424242",
            "expiry_date": "12/27",
            "cvv": "123",
            "invoice_number": "INV-2041",
            "amount": 450.0
        });
        let request: PaymentRequest = serde_json::from_value(params).unwrap();
        assert_eq!(request.invoice_number, "INV-2041");
        assert_eq!(request.amount, 450.0);
        assert!(request.client_name.is_none());
    }

    #[test]
    fn test_request_rejects_missing_card_fields() {
        let params = serde_json::json!({
            "invoice_number": "INV-2041",
            "amount": 450.0
        });
        assert!(serde_json::from_value::<PaymentRequest>(params).is_err());
    }

    #[test]
    fn test_response_tolerates_absent_optionals() {
        let response: PaymentResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(response.success);
        assert!(response.message.is_none());
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_collect_surfaces_transport_failure() {
        // Nothing listens on port 1, so the request fails fast.
        let client = PaymentClient::new("http://127.0.0.1:1/collect".to_string(), None);
        let request = PaymentRequest {
            card_number: "4242424242424242".to_string(),
            expiry_date: "12/27".to_string(),
            cvv: "123".to_string(),
            invoice_number: "INV-1".to_string(),
            amount: 10.0,
            client_name: None,
        };
        assert!(client.collect(&request).await.is_err());
    }
}
