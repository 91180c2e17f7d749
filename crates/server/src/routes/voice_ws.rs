//! Browser side of a voice session.
//!
//! Binary frames from the browser are capture frames (mono f32 LE). Text
//! frames are JSON tagged by `type`. A socket carries one session: it ends
//! with a final `state: idle` and the server closes the socket.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use voice_bridge::session::MicrophoneAccess;
use voice_bridge::{
    pcm, MonotonicClock, SessionEvent, SessionInput, SessionState, VoiceSession,
};

use crate::state::AppState;

/// Browser -> server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Start { microphone: MicrophoneAccess },
    Mute { muted: bool },
    Stop,
}

/// Server -> browser messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    State {
        state: SessionState,
    },
    Play {
        id: u64,
        start_at: f64,
        duration: f64,
        sample_rate: u32,
        /// base64 of mono f32 LE samples
        audio: String,
    },
    StopPlayback {
        ids: Vec<u64>,
    },
    Move {
        san: String,
        fen: String,
        history: Vec<String>,
    },
    Error {
        message: String,
    },
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::State(state) => ServerMessage::State { state },
            SessionEvent::Play(unit) => ServerMessage::Play {
                id: unit.id,
                start_at: unit.start_at,
                duration: unit.duration,
                sample_rate: unit.sample_rate,
                audio: BASE64_STANDARD.encode(pcm::f32_to_le_bytes(&unit.samples)),
            },
            SessionEvent::StopPlayback(ids) => ServerMessage::StopPlayback { ids },
            SessionEvent::MoveApplied(ack) => ServerMessage::Move {
                san: ack.san,
                fen: ack.board.fen,
                history: ack.board.history,
            },
            SessionEvent::Error(message) => ServerMessage::Error { message },
        }
    }
}

type Sender = SplitSink<WebSocket, Message>;

/// GET /api/voice
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Nothing happens until the browser reports the microphone prompt.
    let microphone = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(t))) => match serde_json::from_str::<ClientMessage>(t.as_str()) {
                Ok(ClientMessage::Start { microphone }) => break microphone,
                Ok(other) => tracing::debug!("Ignoring {other:?} before start"),
                Err(e) => {
                    let msg = ServerMessage::Error {
                        message: format!("Invalid message: {e}"),
                    };
                    if send_msg(&mut sender, &msg).await.is_err() {
                        return;
                    }
                }
            },
            Some(Ok(Message::Close(_))) | None => return,
            Some(Err(e)) => {
                tracing::debug!("Voice socket error before start: {e}");
                return;
            }
            Some(Ok(_)) => {}
        }
    };

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let session = VoiceSession::new(
        state.session_config(),
        Arc::new(state.board()),
        MonotonicClock::new(),
        events_tx,
    );
    let session_state = session.subscribe_state();
    let live = state.live.clone();
    let session_cancel = cancel.clone();
    let id = state
        .voice
        .replace(cancel.clone(), session_state, async move {
            if let Err(e) = session
                .run(live.as_ref(), microphone, input_rx, session_cancel)
                .await
            {
                tracing::warn!("Voice session ended with error: {e}");
            }
        })
        .await;
    tracing::info!("Voice session {id} started (microphone {microphone:?})");

    let mut board_rx = state.board_updates.subscribe();
    let mut board_open = true;

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => {
                    if send_msg(&mut sender, &ServerMessage::from(event)).await.is_err() {
                        break;
                    }
                }
                // The session dropped its side: it is over.
                None => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Binary(bytes))) => match pcm::f32_from_le_bytes(&bytes) {
                    Ok(samples) => forward(&input_tx, SessionInput::Frame(samples)),
                    Err(e) => tracing::warn!("Dropping capture frame: {e}"),
                },
                Some(Ok(Message::Text(t))) => match serde_json::from_str::<ClientMessage>(t.as_str()) {
                    Ok(ClientMessage::Mute { muted }) => forward(&input_tx, SessionInput::Mute(muted)),
                    Ok(ClientMessage::Stop) => forward(&input_tx, SessionInput::Stop),
                    Ok(ClientMessage::Start { .. }) => {
                        tracing::debug!("Ignoring repeated start on voice session {id}");
                    }
                    Err(e) => tracing::warn!("Invalid voice message: {e}"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    forward(&input_tx, SessionInput::Stop);
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!("Voice socket error: {e}");
                    forward(&input_tx, SessionInput::Stop);
                    break;
                }
                Some(Ok(_)) => {}
            },
            update = board_rx.recv(), if board_open => match update {
                Ok(board) => forward(&input_tx, SessionInput::BoardContext(board)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("Voice session {id} skipped {n} board update(s)");
                }
                Err(broadcast::error::RecvError::Closed) => board_open = false,
            },
        }
    }

    // The session may outlive the socket; make sure it winds down.
    cancel.cancel();
    let _ = sender.close().await;
    tracing::info!("Voice socket for session {id} closed");
}

fn forward(input: &mpsc::UnboundedSender<SessionInput>, msg: SessionInput) {
    // A finished session no longer listens.
    let _ = input.send(msg);
}

async fn send_msg(sender: &mut Sender, msg: &ServerMessage) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}
