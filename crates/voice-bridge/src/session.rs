//! Voice Session Controller.
//!
//! `Idle -> Connecting -> Active -> Idle`. One session is one call to
//! [`VoiceSession::run`]; it owns the capture gate, the playback scheduler and
//! the transport, and releases all of them before returning.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureGate;
use crate::error::VoiceError;
use crate::live::{
    Blob, ClientContent, ClientMessage, Content, GenerationConfig, LiveEvent,
    PrebuiltVoiceConfig, RealtimeInput, Setup, SpeechConfig, ToolResponse, VoiceConfig,
};
use crate::playback::{OutputClock, PlaybackScheduler, ScheduledUnit};
use crate::tools::{self, BoardControl, BoardState, Capability, MoveAck};
use crate::transport::{LiveConnection, LiveConnector};

pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_VOICE: &str = "Zephyr";

const ASSISTANT_INSTRUCTION: &str = "You are a professional chess voice assistant.
You help the user make moves on the board.
When they say a move, use the 'make_move' tool.
Be concise, encouraging, and sound like a sophisticated grandmaster.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
}

/// Outcome of the browser's microphone permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicrophoneAccess {
    Granted,
    Denied,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub voice: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LIVE_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

impl SessionConfig {
    /// First message of a session: audio responses, the assistant persona
    /// with the board as it stands, and the capability declarations.
    pub fn setup(&self, board: &BoardState) -> Setup {
        let model = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        let instruction = format!(
            "{ASSISTANT_INSTRUCTION}\nCurrent board state (FEN): {}.\nHistory of moves: {}.",
            board.fen,
            board.history.join(", ")
        );

        Setup {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice.clone(),
                        },
                    },
                },
            },
            system_instruction: Content::text(None, instruction),
            tools: vec![Capability::tool_block()],
        }
    }
}

/// Input from the user side of the session.
#[derive(Debug, Clone)]
pub enum SessionInput {
    /// One capture frame of mono float samples.
    Frame(Vec<f32>),
    Mute(bool),
    /// The board changed outside the voice path.
    BoardContext(BoardState),
    Stop,
}

/// Output towards the user side of the session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    State(SessionState),
    Play(ScheduledUnit),
    StopPlayback(Vec<u64>),
    MoveApplied(MoveAck),
    Error(String),
}

pub struct VoiceSession<C: OutputClock> {
    config: SessionConfig,
    board: Arc<dyn BoardControl>,
    scheduler: PlaybackScheduler<C>,
    capture: CaptureGate,
    state: watch::Sender<SessionState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    pending_context: Option<BoardState>,
}

impl<C: OutputClock> VoiceSession<C> {
    pub fn new(
        config: SessionConfig,
        board: Arc<dyn BoardControl>,
        clock: C,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            board,
            scheduler: PlaybackScheduler::new(clock),
            capture: CaptureGate::new(),
            state,
            events,
            pending_context: None,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Drive the session until the user stops it, the input side goes away,
    /// `cancel` fires, or the transport closes. Always ends in `Idle`.
    pub async fn run(
        mut self,
        connector: &dyn LiveConnector,
        microphone: MicrophoneAccess,
        mut input: mpsc::UnboundedReceiver<SessionInput>,
        cancel: CancellationToken,
    ) -> Result<(), VoiceError> {
        if microphone == MicrophoneAccess::Denied {
            let err = VoiceError::MicrophoneDenied;
            self.emit(SessionEvent::Error(err.to_string()));
            self.set_state(SessionState::Idle);
            return Err(err);
        }

        self.set_state(SessionState::Connecting);
        let setup = self.config.setup(&self.board.board_state());

        let connection = tokio::select! {
            _ = cancel.cancelled() => {
                self.set_state(SessionState::Idle);
                return Ok(());
            }
            result = connector.connect(setup) => result,
        };

        let LiveConnection {
            outbound,
            events: mut live_events,
        } = match connection {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("Voice session failed to connect: {e}");
                self.emit(SessionEvent::Error(e.to_string()));
                self.set_state(SessionState::Idle);
                return Err(e);
            }
        };

        let result = loop {
            let step = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Voice session cancelled");
                    Ok(ControlFlow::Break(()))
                }
                msg = input.recv() => match msg {
                    Some(msg) => self.handle_input(msg, &outbound),
                    None => Ok(ControlFlow::Break(())),
                },
                event = live_events.recv() => match event {
                    Some(event) => self.handle_event(event, &outbound),
                    None => Ok(ControlFlow::Break(())),
                },
            };

            match step {
                Ok(ControlFlow::Continue(())) => {}
                Ok(ControlFlow::Break(())) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        if let Err(e) = &result {
            self.emit(SessionEvent::Error(e.to_string()));
        }
        self.teardown(outbound);
        result
    }

    fn handle_input(
        &mut self,
        msg: SessionInput,
        outbound: &mpsc::UnboundedSender<ClientMessage>,
    ) -> Result<ControlFlow<()>, VoiceError> {
        match msg {
            SessionInput::Frame(samples) => {
                if let Some(blob) = self.capture.encode(&samples) {
                    send(outbound, realtime_audio(blob))?;
                }
            }
            SessionInput::Mute(muted) => {
                tracing::debug!("Voice output muted: {muted}");
                self.scheduler.set_muted(muted);
            }
            SessionInput::BoardContext(board) => {
                if self.state() == SessionState::Active {
                    send(outbound, board_update(&board))?;
                } else {
                    self.pending_context = Some(board);
                }
            }
            SessionInput::Stop => return Ok(ControlFlow::Break(())),
        }
        Ok(ControlFlow::Continue(()))
    }

    fn handle_event(
        &mut self,
        event: LiveEvent,
        outbound: &mpsc::UnboundedSender<ClientMessage>,
    ) -> Result<ControlFlow<()>, VoiceError> {
        match event {
            LiveEvent::SetupComplete => {
                self.capture.open();
                self.set_state(SessionState::Active);
                if let Some(board) = self.pending_context.take() {
                    send(outbound, board_update(&board))?;
                }
            }
            LiveEvent::ToolCall(calls) => {
                if self.state() != SessionState::Active {
                    tracing::warn!("Ignoring {} tool call(s) before setup completed", calls.len());
                    return Ok(ControlFlow::Continue(()));
                }
                let mut responses = Vec::with_capacity(calls.len());
                let mut applied = Vec::new();
                for call in &calls {
                    let outcome = tools::dispatch(call, self.board.as_ref());
                    responses.push(outcome.response);
                    applied.extend(outcome.applied);
                }
                send(
                    outbound,
                    ClientMessage::ToolResponse(ToolResponse {
                        function_responses: responses,
                    }),
                )?;
                for ack in applied {
                    send(outbound, board_update(&ack.board))?;
                    self.emit(SessionEvent::MoveApplied(ack));
                }
            }
            LiveEvent::Audio(blob) => {
                if self.state() != SessionState::Active {
                    tracing::debug!("Dropping audio chunk before setup completed");
                    return Ok(ControlFlow::Continue(()));
                }
                match self.scheduler.schedule_chunk(&blob.mime_type, &blob.data) {
                    Ok(Some(unit)) => self.emit(SessionEvent::Play(unit)),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Dropping undecodable audio chunk: {e}"),
                }
            }
            LiveEvent::Interrupted => {
                let stopped = self.scheduler.interrupt();
                tracing::debug!("Playback interrupted, stopping {} unit(s)", stopped.len());
                self.emit(SessionEvent::StopPlayback(stopped));
            }
            LiveEvent::TurnComplete => {
                tracing::debug!("Model turn complete");
            }
            LiveEvent::Closed(reason) => {
                match reason.filter(|r| !r.is_empty()) {
                    Some(reason) => {
                        tracing::warn!("Gemini Live session closed: {reason}");
                        self.emit(SessionEvent::Error(format!("Voice session closed: {reason}")));
                    }
                    None => tracing::info!("Gemini Live session closed"),
                }
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn teardown(&mut self, outbound: mpsc::UnboundedSender<ClientMessage>) {
        self.capture.close();
        let stopped = self.scheduler.interrupt();
        if !stopped.is_empty() {
            self.emit(SessionEvent::StopPlayback(stopped));
        }
        // Dropping the last sender closes the socket.
        drop(outbound);
        let (sent, dropped) = self.capture.counters();
        tracing::info!("Voice session ended ({sent} frames sent, {dropped} dropped)");
        self.set_state(SessionState::Idle);
    }

    fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
        self.emit(SessionEvent::State(state));
    }

    fn emit(&self, event: SessionEvent) {
        // The browser may already be gone; nothing to do then.
        let _ = self.events.send(event);
    }
}

fn send(
    outbound: &mpsc::UnboundedSender<ClientMessage>,
    msg: ClientMessage,
) -> Result<(), VoiceError> {
    outbound.send(msg).map_err(|_| VoiceError::Closed)
}

fn realtime_audio(blob: Blob) -> ClientMessage {
    ClientMessage::RealtimeInput(RealtimeInput {
        media_chunks: vec![blob],
    })
}

fn board_update(board: &BoardState) -> ClientMessage {
    ClientMessage::ClientContent(ClientContent {
        turns: vec![Content::text(Some("user"), board.context_text())],
        turn_complete: false,
    })
}
