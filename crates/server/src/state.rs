use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chess_core::{Game, MoveInput};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use voice_bridge::{
    BoardControl, BoardState, GeminiLiveConnector, LiveConnector, MoveAck, SessionConfig,
    SessionState,
};

use crate::clients::gemini::{CoachModel, GeminiClient};
use crate::coach::{self, CoachChat};
use crate::config::Config;
use crate::puzzle::PuzzleView;

/// Side-panel tab shown next to the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Chat,
    History,
    Puzzle,
}

/// Top-level state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: Arc<RwLock<Game>>,
    pub coach: Arc<CoachChat>,
    pub coach_model: Arc<dyn CoachModel>,
    pub puzzle: Arc<RwLock<Option<PuzzleView>>>,
    pub voice: Arc<VoiceSlot>,
    pub live: Arc<dyn LiveConnector>,
    pub active_tab: Arc<RwLock<Tab>>,
    /// Board changes made outside the voice path.
    pub board_updates: broadcast::Sender<BoardState>,
}

impl AppState {
    pub fn new(
        config: Config,
        coach_model: Arc<dyn CoachModel>,
        live: Arc<dyn LiveConnector>,
    ) -> Self {
        let (board_updates, _) = broadcast::channel(16);
        Self {
            config: Arc::new(config),
            game: Arc::new(RwLock::new(Game::new())),
            coach: Arc::new(CoachChat::new()),
            coach_model,
            puzzle: Arc::new(RwLock::new(None)),
            voice: Arc::new(VoiceSlot::default()),
            live,
            active_tab: Arc::new(RwLock::new(Tab::default())),
            board_updates,
        }
    }

    /// State wired to the real Gemini services.
    pub fn from_config(config: Config) -> Self {
        let coach_model = Arc::new(GeminiClient::new(
            config.gemini_base_url.clone(),
            config.gemini_api_key.clone(),
            config.coach_model.clone(),
            coach::SYSTEM_INSTRUCTION,
            config.coach_thinking_budget,
        ));
        let live = Arc::new(GeminiLiveConnector::new(
            config.live_url.clone(),
            config.gemini_api_key.clone(),
        ));
        Self::new(config, coach_model, live)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            model: self.config.live_model.clone(),
            voice: self.config.live_voice.clone(),
        }
    }

    pub fn board(&self) -> SharedBoard {
        SharedBoard {
            game: self.game.clone(),
        }
    }

    /// Tell an open voice session about a board change it did not make.
    pub fn publish_board(&self) {
        let board = board_state(&self.game.read());
        // No subscribers just means no voice session is open.
        let _ = self.board_updates.send(board);
    }
}

pub fn board_state(game: &Game) -> BoardState {
    BoardState {
        fen: game.fen(),
        history: game.san_history(),
    }
}

/// Voice access to the shared game. The only write path from voice into
/// game state.
pub struct SharedBoard {
    game: Arc<RwLock<Game>>,
}

impl BoardControl for SharedBoard {
    fn make_move(&self, notation: &str) -> Result<MoveAck, String> {
        let mut game = self.game.write();
        let applied = game
            .apply(&MoveInput::notation(notation))
            .map_err(|e| e.to_string())?;
        tracing::info!("Voice move {} -> {}", applied.record.san, applied.position.status);
        Ok(MoveAck {
            san: applied.record.san,
            board: board_state(&game),
        })
    }

    fn board_state(&self) -> BoardState {
        board_state(&self.game.read())
    }
}

struct ActiveVoice {
    id: u64,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

struct PendingVoice<F> {
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    session: F,
}

/// At most one voice session runs at a time; starting a new one replaces
/// the old.
#[derive(Default)]
pub struct VoiceSlot {
    next_id: AtomicU64,
    current: Mutex<Option<ActiveVoice>>,
}

impl VoiceSlot {
    /// Cancel the running session, if any, and wait for its teardown.
    pub async fn stop_current(&self) {
        let previous = self.current.lock().take();
        if let Some(previous) = previous {
            tracing::info!("Replacing voice session {}", previous.id);
            previous.cancel.cancel();
            if let Err(e) = previous.task.await {
                tracing::warn!("Voice session {} ended abnormally: {e}", previous.id);
            }
        }
    }

    /// Replace whatever is running with `session`. The slot is cleared again
    /// when the session finishes on its own.
    pub async fn replace<F>(
        self: &Arc<Self>,
        cancel: CancellationToken,
        state: watch::Receiver<SessionState>,
        session: F,
    ) -> u64
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut pending = PendingVoice {
            cancel,
            state,
            session,
        };
        loop {
            self.stop_current().await;
            // Another start may have claimed the slot while we waited.
            match self.try_install(id, pending) {
                Ok(()) => return id,
                Err(back) => pending = back,
            }
        }
    }

    /// Install the session only if the slot is empty; hands it back otherwise.
    fn try_install<F>(
        self: &Arc<Self>,
        id: u64,
        pending: PendingVoice<F>,
    ) -> Result<(), PendingVoice<F>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut current = self.current.lock();
        if current.is_some() {
            return Err(pending);
        }

        let PendingVoice {
            cancel,
            state,
            session,
        } = pending;
        let slot = Arc::clone(self);
        let task = tokio::spawn(async move {
            session.await;
            slot.release(id);
        });
        *current = Some(ActiveVoice {
            id,
            cancel,
            state,
            task,
        });
        Ok(())
    }

    fn release(&self, id: u64) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|active| active.id == id) {
            *current = None;
        }
    }

    pub fn state(&self) -> SessionState {
        self.current
            .lock()
            .as_ref()
            .map(|active| *active.state.borrow())
            .unwrap_or(SessionState::Idle)
    }
}
