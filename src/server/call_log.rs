//! Call Log
//!
//! In-memory registry of calls currently flowing through the bridge. The
//! dashboard owns the persisted call rows; this registry tracks the bridge's
//! side of each call (status, timestamps, outcome text) so live calls can be
//! monitored and their duration logged at teardown.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{CallRecord, CallStatus};

/// Registry of active call sessions, keyed by stream id
#[derive(Clone, Default)]
pub struct CallLog {
    records: Arc<RwLock<HashMap<String, CallRecord>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new call once the telephony stream has started.
    pub async fn call_started(
        &self,
        stream_sid: &str,
        client_name: Option<String>,
        invoice_number: Option<String>,
    ) {
        let record = CallRecord {
            stream_sid: stream_sid.to_string(),
            status: CallStatus::Initiated,
            client_name,
            invoice_number,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            outcome: None,
        };

        let mut records = self.records.write().await;
        records.insert(stream_sid.to_string(), record);
    }

    /// Mark a call as bridged: audio is flowing both directions.
    pub async fn call_bridged(&self, stream_sid: &str) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(stream_sid) {
            record.status = CallStatus::InProgress;
        }
    }

    /// Keep the agent's most recent utterance as the call outcome text.
    pub async fn set_outcome(&self, stream_sid: &str, outcome: &str) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(stream_sid) {
            record.outcome = Some(outcome.to_string());
        }
    }

    /// Close out a call and drop it from the registry.
    pub async fn call_ended(&self, stream_sid: &str) -> Option<CallRecord> {
        self.finish(stream_sid, CallStatus::Completed, None).await
    }

    /// Close out a call that never reached (or fell out of) bridging.
    pub async fn call_failed(&self, stream_sid: &str, reason: &str) -> Option<CallRecord> {
        self.finish(stream_sid, CallStatus::Failed, Some(reason.to_string()))
            .await
    }

    async fn finish(
        &self,
        stream_sid: &str,
        status: CallStatus,
        outcome: Option<String>,
    ) -> Option<CallRecord> {
        let mut records = self.records.write().await;
        let mut record = records.remove(stream_sid)?;

        let ended_at = Utc::now();
        record.status = status;
        record.ended_at = Some(ended_at);
        record.duration_seconds = Some((ended_at - record.started_at).num_seconds());
        if outcome.is_some() {
            record.outcome = outcome;
        }

        tracing::info!(
            "Call {} {} (duration: {}s)",
            record.stream_sid,
            record.status.display_name(),
            record.duration_seconds.unwrap_or(0)
        );
        Some(record)
    }

    /// Snapshot of all calls still in the registry.
    pub async fn active_calls(&self) -> Vec<CallRecord> {
        let records = self.records.read().await;
        records.values().cloned().collect()
    }

    /// Whether a call is currently tracked.
    pub async fn has_call(&self, stream_sid: &str) -> bool {
        let records = self.records.read().await;
        records.contains_key(stream_sid)
    }
}
