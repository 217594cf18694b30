//! Call session
//!
//! One session per phone call, owning both sockets for the call's lifetime.
//! The telephony socket arrives as a WebSocket upgrade; the agent socket is
//! opened once the `start` frame delivers the call context. Everything runs
//! on a single cooperative task: a `select!` loop over both streams, so audio
//! stays in arrival order per direction and no locking is needed.
//!
//! Lifecycle: AwaitingStart → ConnectingAgent → Bridging → Closing → Closed,
//! with errors on either socket short-circuiting to teardown of the pair.

use std::pin::pin;
use std::sync::Arc;

use axum::extract::ws::{Message as TelMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as AgentWsMessage;

use super::agent::{output_is_ulaw_8k, AgentSocket, CallContext};
use super::codec;
use super::messages::{
    AgentMessage, ClientToolResult, TelephonyMediaFrame, TelephonyMessage, UserAudioChunk,
};
use super::tools;
use crate::server::AppState;

/// Lifecycle of one call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingStart,
    ConnectingAgent,
    Bridging,
    Closing,
    Closed,
}

struct CallSession {
    state: SessionState,
    /// Off once the agent reports it already speaks μ-law 8kHz.
    convert_audio: bool,
}

impl CallSession {
    fn new() -> Self {
        Self {
            state: SessionState::AwaitingStart,
            convert_audio: true,
        }
    }

    fn advance(&mut self, next: SessionState) {
        tracing::debug!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Accept the telephony media-stream upgrade and run the call to completion.
pub async fn handle_media_upgrade(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_session(socket, state).await {
            tracing::error!("Call session ended with error: {}", e);
        }
    })
}

async fn run_session(
    mut telephony: WebSocket,
    app: Arc<AppState>,
) -> Result<(), super::BridgeError> {
    let mut session = CallSession::new();

    // Await the `start` frame carrying the stream id and call context.
    let (stream_sid, context) = loop {
        let frame = match telephony.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                tracing::warn!("Telephony socket error before start: {}", e);
                return Ok(());
            }
            None => return Ok(()),
        };
        match parse_telephony(&frame) {
            Some(TelephonyMessage::Start { start }) => {
                let context = CallContext::from_parameters(&start.custom_parameters);
                break (start.stream_sid, context);
            }
            Some(TelephonyMessage::Media { .. }) => {
                // Real-time audio is unbuffered; frames before start are lost.
                tracing::trace!("Dropping media frame before start");
            }
            Some(TelephonyMessage::Stop { .. }) => {
                let _ = telephony.send(TelMessage::Close(None)).await;
                return Ok(());
            }
            _ => {
                if matches!(frame, TelMessage::Close(_)) {
                    return Ok(());
                }
            }
        }
    };

    tracing::info!(
        "Call {} started for {} (invoice {})",
        stream_sid,
        context.client_name,
        context.invoice_number
    );
    app.call_log
        .call_started(
            &stream_sid,
            Some(context.client_name.clone()),
            Some(context.invoice_number.clone()),
        )
        .await;

    // Open the agent side without blocking the read loop: media arriving
    // while the handshake is in flight is dropped, not queued.
    session.advance(SessionState::ConnectingAgent);
    let mut agent: AgentSocket = {
        let mut connect = pin!(app.agent.connect(&context));
        loop {
            tokio::select! {
                result = &mut connect => match result {
                    Ok(socket) => break socket,
                    Err(e) => {
                        tracing::error!("Call {}: agent connection failed: {}", stream_sid, e);
                        app.call_log.call_failed(&stream_sid, &e.to_string()).await;
                        let _ = telephony.send(TelMessage::Close(None)).await;
                        return Err(e);
                    }
                },
                frame = telephony.next() => match frame {
                    Some(Ok(frame)) => match parse_telephony(&frame) {
                        Some(TelephonyMessage::Media { .. }) => {
                            tracing::trace!("Dropping media frame while agent connects");
                        }
                        Some(TelephonyMessage::Stop { .. }) => {
                            app.call_log.call_ended(&stream_sid).await;
                            let _ = telephony.send(TelMessage::Close(None)).await;
                            return Ok(());
                        }
                        _ => {
                            if matches!(frame, TelMessage::Close(_)) {
                                app.call_log.call_ended(&stream_sid).await;
                                return Ok(());
                            }
                        }
                    },
                    Some(Err(e)) => {
                        tracing::warn!("Call {}: telephony socket error: {}", stream_sid, e);
                        app.call_log.call_failed(&stream_sid, "telephony socket error").await;
                        return Ok(());
                    }
                    None => {
                        app.call_log.call_ended(&stream_sid).await;
                        return Ok(());
                    }
                },
            }
        }
    };

    session.advance(SessionState::Bridging);
    app.call_log.call_bridged(&stream_sid).await;

    // Media flows both directions; tool calls may interleave. Either socket
    // closing or erroring exits the loop and tears down the pair.
    loop {
        tokio::select! {
            frame = telephony.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        tracing::warn!("Call {}: telephony socket error: {}", stream_sid, e);
                        break;
                    }
                    None => break,
                };
                if matches!(frame, TelMessage::Close(_)) {
                    break;
                }
                match parse_telephony(&frame) {
                    Some(TelephonyMessage::Media { media }) => {
                        let Some(chunk) = caller_chunk(&media.payload, session.convert_audio) else {
                            continue;
                        };
                        let frame = UserAudioChunk { user_audio_chunk: chunk };
                        let text = serde_json::to_string(&frame).expect("audio chunk serializes");
                        if agent.send(AgentWsMessage::Text(text.into())).await.is_err() {
                            tracing::warn!("Call {}: agent socket closed mid-call", stream_sid);
                            break;
                        }
                    }
                    Some(TelephonyMessage::Stop { stop }) => {
                        if let Some(call_sid) = stop.and_then(|s| s.call_sid) {
                            tracing::debug!("Call {}: stop frame for {}", stream_sid, call_sid);
                        }
                        break;
                    }
                    Some(TelephonyMessage::Start { .. }) => {
                        tracing::warn!("Call {}: duplicate start frame ignored", stream_sid);
                    }
                    _ => {}
                }
            }
            frame = agent.next() => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(e)) => {
                        tracing::warn!("Call {}: agent socket error: {}", stream_sid, e);
                        break;
                    }
                    None => break,
                };
                match frame {
                    AgentWsMessage::Text(text) => {
                        if !handle_agent_frame(
                            &app,
                            &mut session,
                            &stream_sid,
                            &mut telephony,
                            &mut agent,
                            text.as_str(),
                        )
                        .await
                        {
                            break;
                        }
                    }
                    AgentWsMessage::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    // Paired lifetime: whichever side ended first, close the other too.
    session.advance(SessionState::Closing);
    let _ = telephony.send(TelMessage::Close(None)).await;
    let _ = agent.close(None).await;
    app.call_log.call_ended(&stream_sid).await;
    session.advance(SessionState::Closed);
    tracing::info!("Call {} closed", stream_sid);
    Ok(())
}

/// Handle one JSON frame from the agent. Returns false when the session
/// should tear down.
async fn handle_agent_frame(
    app: &Arc<AppState>,
    session: &mut CallSession,
    stream_sid: &str,
    telephony: &mut WebSocket,
    agent: &mut AgentSocket,
    text: &str,
) -> bool {
    let message = match serde_json::from_str::<AgentMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Call {}: dropping malformed agent frame: {}", stream_sid, e);
            return true;
        }
    };

    match message {
        AgentMessage::ConversationInitiationMetadata {
            conversation_initiation_metadata_event: metadata,
        } => {
            if let Some(id) = metadata.conversation_id.as_deref() {
                tracing::debug!("Call {}: agent conversation {}", stream_sid, id);
            }
            if let Some(format) = metadata.agent_output_audio_format.as_deref() {
                if output_is_ulaw_8k(format) {
                    // Formats already match; skip conversion for the session.
                    session.convert_audio = false;
                    tracing::info!(
                        "Call {}: agent emits {}, codec translation disabled",
                        stream_sid,
                        format
                    );
                }
            }
            true
        }
        AgentMessage::Audio { audio_event } => {
            let Some(payload) = agent_chunk(&audio_event.audio_base_64, session.convert_audio)
            else {
                return true;
            };
            let frame = TelephonyMediaFrame::new(stream_sid, payload);
            let text = serde_json::to_string(&frame).expect("media frame serializes");
            if telephony.send(TelMessage::Text(text.into())).await.is_err() {
                tracing::warn!("Call {}: telephony socket closed mid-call", stream_sid);
                return false;
            }
            true
        }
        AgentMessage::AgentResponse {
            agent_response_event: event,
        } => {
            tracing::debug!("Call {}: agent said: {}", stream_sid, event.agent_response);
            app.call_log
                .set_outcome(stream_sid, &event.agent_response)
                .await;
            true
        }
        AgentMessage::ClientToolCall { client_tool_call } => {
            if let Some(result) = tools::relay_tool_call(&app.payments, client_tool_call).await {
                if send_tool_result(agent, &result).await.is_err() {
                    tracing::warn!("Call {}: agent socket closed during tool result", stream_sid);
                    return false;
                }
            }
            true
        }
        AgentMessage::Unknown => true,
    }
}

async fn send_tool_result(
    agent: &mut AgentSocket,
    result: &ClientToolResult,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let text = serde_json::to_string(result).expect("tool result serializes");
    agent.send(AgentWsMessage::Text(text.into())).await
}

fn parse_telephony(frame: &TelMessage) -> Option<TelephonyMessage> {
    let text = match frame {
        TelMessage::Text(text) => text.as_str(),
        _ => return None,
    };
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!("Dropping malformed telephony frame: {}", e);
            None
        }
    }
}

/// Prepare a caller audio payload for the agent: μ-law 8kHz in, base64
/// PCM-16 16kHz out — or passed through untouched when formats match.
fn caller_chunk(payload: &str, convert: bool) -> Option<String> {
    if !convert {
        return Some(payload.to_string());
    }
    match BASE64.decode(payload) {
        Ok(ulaw) => {
            let pcm = codec::upsample_ulaw_to_pcm16(&ulaw);
            Some(BASE64.encode(codec::samples_to_pcm16_bytes(&pcm)))
        }
        Err(e) => {
            tracing::warn!("Dropping undecodable caller audio: {}", e);
            None
        }
    }
}

/// Prepare an agent audio payload for the phone: PCM-16 16kHz in, base64
/// μ-law 8kHz out — or passed through untouched when formats match.
fn agent_chunk(audio_base_64: &str, convert: bool) -> Option<String> {
    if !convert {
        return Some(audio_base_64.to_string());
    }
    match BASE64.decode(audio_base_64) {
        Ok(bytes) => {
            let pcm = codec::pcm16_bytes_to_samples(&bytes);
            Some(BASE64.encode(codec::downsample_pcm16_to_ulaw(&pcm)))
        }
        Err(e) => {
            tracing::warn!("Dropping undecodable agent audio: {}", e);
            None
        }
    }
}
