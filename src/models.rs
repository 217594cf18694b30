use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of one bridged phone call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Initiated,
    InProgress,
    Completed,
    Failed,
}

impl CallStatus {
    pub fn display_name(&self) -> &str {
        match self {
            CallStatus::Initiated => "Connecting...",
            CallStatus::InProgress => "In Call",
            CallStatus::Completed => "Completed",
            CallStatus::Failed => "Failed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, CallStatus::Initiated | CallStatus::InProgress)
    }
}

/// Snapshot of a call tracked by the bridge.
///
/// The dashboard owns the persisted call row; this is the bridge-local view
/// updated as a side effect of session events and exposed for monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    pub status: CallStatus,
    #[serde(rename = "clientName")]
    pub client_name: Option<String>,
    #[serde(rename = "invoiceNumber")]
    pub invoice_number: Option<String>,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "endedAt")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(rename = "durationSeconds")]
    pub duration_seconds: Option<i64>,
    /// Last thing the agent said, kept as the call outcome text.
    pub outcome: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&CallStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        assert_eq!(
            serde_json::to_string(&CallStatus::Initiated).unwrap(),
            "\"initiated\""
        );
    }

    #[test]
    fn test_status_activity() {
        assert!(CallStatus::Initiated.is_active());
        assert!(CallStatus::InProgress.is_active());
        assert!(!CallStatus::Completed.is_active());
        assert!(!CallStatus::Failed.is_active());
    }
}
