#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("Microphone permission denied")]
    MicrophoneDenied,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Audio codec error: {0}")]
    Codec(String),

    #[error("Voice session closed")]
    Closed,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
