//! WebSocket transport for the Live API.
//!
//! A connection is a pair of channels: client messages go out through
//! `outbound`, parsed server events come back on `events`. Dropping the
//! outbound sender closes the socket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::VoiceError;
use crate::live::{self, ClientMessage, LiveEvent, Setup};

pub const DEFAULT_LIVE_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

pub struct LiveConnection {
    pub outbound: mpsc::UnboundedSender<ClientMessage>,
    pub events: mpsc::UnboundedReceiver<LiveEvent>,
}

#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Open the transport and send `setup` as the first message.
    async fn connect(&self, setup: Setup) -> Result<LiveConnection, VoiceError>;
}

#[derive(Debug, Clone)]
pub struct GeminiLiveConnector {
    url: String,
    api_key: String,
}

impl GeminiLiveConnector {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl LiveConnector for GeminiLiveConnector {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection, VoiceError> {
        if self.api_key.is_empty() {
            return Err(VoiceError::Transport("Gemini API key is not configured".into()));
        }

        let url = format!("{}?key={}", self.url, self.api_key);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| VoiceError::Transport(e.to_string()))?;
        tracing::info!("Gemini Live socket connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();

        let setup_json = serde_json::to_string(&ClientMessage::Setup(setup))?;
        ws_write
            .send(WsMessage::Text(setup_json))
            .await
            .map_err(|e| VoiceError::Transport(e.to_string()))?;

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<LiveEvent>();

        // Writer: drain outbound until the session drops its sender.
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!("Failed to encode Live message: {e}");
                        continue;
                    }
                };
                if let Err(e) = ws_write.send(WsMessage::Text(json)).await {
                    tracing::warn!("Live socket write failed: {e}");
                    break;
                }
            }
            let _ = ws_write.close().await;
            tracing::debug!("Live writer finished");
        });

        // Reader: parse frames into events until the socket closes.
        tokio::spawn(async move {
            let reason = loop {
                let frame = match ws_read.next().await {
                    Some(Ok(WsMessage::Text(text))) => text.into_bytes(),
                    Some(Ok(WsMessage::Binary(bytes))) => bytes,
                    Some(Ok(WsMessage::Close(frame))) => break close_reason(frame),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => break Some(e.to_string()),
                    None => break None,
                };

                match live::parse_server_frame(&frame) {
                    Ok(events) => {
                        for event in events {
                            if events_tx.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => tracing::warn!("Unparseable Live frame: {e}"),
                }
            };
            let _ = events_tx.send(LiveEvent::Closed(reason));
        });

        Ok(LiveConnection {
            outbound: outbound_tx,
            events: events_rx,
        })
    }
}

/// Reason carried by a close frame; an empty reason is a plain close.
fn close_reason(frame: Option<CloseFrame<'_>>) -> Option<String> {
    frame
        .map(|f| f.reason.to_string())
        .filter(|reason| !reason.is_empty())
}
