//! Tool-call relay
//!
//! The agent drives payment collection through a structured tool call. The
//! relay forwards it to the internal payments API and always answers with
//! exactly one `client_tool_result` — including on malformed parameters and
//! transport failures, so the agent's turn-taking never stalls waiting for
//! a reply that will not come. Unknown tool names are a no-op.

use super::messages::{ClientToolResult, ToolCall};
use crate::server::payments::{PaymentClient, PaymentRequest};

/// The one tool the bridge knows how to execute.
pub const COLLECT_PAYMENT_TOOL: &str = "collect_payment";

/// Handle a tool invocation from the agent.
///
/// Returns the single result frame owed to the agent, or `None` when the
/// tool is not recognized.
pub async fn relay_tool_call(
    payments: &PaymentClient,
    call: ToolCall,
) -> Option<ClientToolResult> {
    if call.tool_name != COLLECT_PAYMENT_TOOL {
        tracing::debug!("Ignoring unknown tool call: {}", call.tool_name);
        return None;
    }

    let (result, is_error) = match serde_json::from_value::<PaymentRequest>(call.parameters) {
        Err(e) => {
            tracing::warn!("Malformed payment parameters: {}", e);
            (
                "The payment details were incomplete. Please confirm the card number, \
                 expiry date and security code with the caller and try again."
                    .to_string(),
                true,
            )
        }
        Ok(request) => match payments.collect(&request).await {
            Ok(response) if response.success => {
                let narrative = response.message.unwrap_or_else(|| {
                    format!(
                        "The payment of {} for invoice {} was processed successfully.",
                        request.amount, request.invoice_number
                    )
                });
                (narrative, false)
            }
            Ok(response) => {
                let narrative = response
                    .error
                    .or(response.message)
                    .unwrap_or_else(|| "The payment was declined.".to_string());
                (narrative, true)
            }
            Err(e) => {
                tracing::error!(
                    "Payment request for invoice {} failed: {}",
                    request.invoice_number,
                    e
                );
                (
                    "The payment could not be processed right now. Please ask the caller \
                     to try again later or pay through the dashboard."
                        .to_string(),
                    true,
                )
            }
        },
    };

    Some(ClientToolResult::new(call.tool_call_id, result, is_error))
}
