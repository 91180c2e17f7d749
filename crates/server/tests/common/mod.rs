#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use server::app::build_router;
use server::clients::gemini::{CoachModel, CoachReply};
use server::config::Config;
use server::state::AppState;
use tokio::sync::{mpsc, Notify};
use voice_bridge::live::{ClientMessage, LiveEvent, Setup};
use voice_bridge::{LiveConnection, LiveConnector, VoiceError};

/// Coach that answers only after `release` is notified.
pub struct GatedCoach {
    pub release: Notify,
    pub prompts: Mutex<Vec<String>>,
    pub reply: CoachReply,
}

impl GatedCoach {
    pub fn new(text: &str, thinking: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            release: Notify::new(),
            prompts: Mutex::new(Vec::new()),
            reply: CoachReply {
                text: text.to_string(),
                thinking: thinking.map(str::to_string),
            },
        })
    }
}

#[async_trait]
impl CoachModel for GatedCoach {
    async fn generate(&self, prompt: &str) -> Result<CoachReply, String> {
        self.prompts.lock().push(prompt.to_string());
        self.release.notified().await;
        Ok(self.reply.clone())
    }
}

/// Remote end of an in-memory Live connection.
pub struct LiveRemote {
    pub from_client: mpsc::UnboundedReceiver<ClientMessage>,
    pub to_client: mpsc::UnboundedSender<LiveEvent>,
}

/// Hands out queued in-memory connections, one per session.
#[derive(Default)]
pub struct FakeLive {
    connections: Mutex<Vec<LiveConnection>>,
    pub setups: Mutex<Vec<Setup>>,
}

impl FakeLive {
    pub fn queue(&self) -> LiveRemote {
        let (outbound, from_client) = mpsc::unbounded_channel();
        let (to_client, events) = mpsc::unbounded_channel();
        self.connections.lock().push(LiveConnection { outbound, events });
        LiveRemote {
            from_client,
            to_client,
        }
    }
}

#[async_trait]
impl LiveConnector for FakeLive {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection, VoiceError> {
        self.setups.lock().push(setup);
        let mut queued = self.connections.lock();
        if queued.is_empty() {
            return Err(VoiceError::Transport("no connection queued".into()));
        }
        Ok(queued.remove(0))
    }
}

pub struct TestApp {
    pub base_url: String,
    pub ws_url: String,
    pub state: AppState,
    pub coach: Arc<GatedCoach>,
    pub live: Arc<FakeLive>,
}

pub async fn spawn_app() -> TestApp {
    let coach = GatedCoach::new("Develop your knights before your bishops.", Some("The center is open."));
    let live = Arc::new(FakeLive::default());
    let state = AppState::new(Config::default(), coach.clone(), live.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{addr}"),
        ws_url: format!("ws://{addr}/api/voice"),
        state,
        coach,
        live,
    }
}
