//! Gemini Live (BidiGenerateContent) wire messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---- Client -> server ----

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
    ToolResponse(ToolResponse),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: Value,
}

// ---- Shared ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.into()),
                inline_data: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

// ---- Server -> client ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCall>,
    pub go_away: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub turn_complete: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

/// Flattened view of a server message, in handling order.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    SetupComplete,
    ToolCall(Vec<FunctionCall>),
    Audio(Blob),
    Interrupted,
    TurnComplete,
    Closed(Option<String>),
}

impl ServerMessage {
    pub fn into_events(self) -> Vec<LiveEvent> {
        let mut events = Vec::new();

        if self.setup_complete.is_some() {
            events.push(LiveEvent::SetupComplete);
        }
        if let Some(call) = self.tool_call {
            if !call.function_calls.is_empty() {
                events.push(LiveEvent::ToolCall(call.function_calls));
            }
        }
        if let Some(content) = self.server_content {
            if let Some(turn) = content.model_turn {
                events.extend(
                    turn.parts
                        .into_iter()
                        .filter_map(|p| p.inline_data)
                        .filter(|blob| blob.mime_type.starts_with("audio/"))
                        .map(LiveEvent::Audio),
                );
            }
            if content.interrupted {
                events.push(LiveEvent::Interrupted);
            }
            if content.turn_complete {
                events.push(LiveEvent::TurnComplete);
            }
        }
        if let Some(reason) = self.go_away {
            events.push(LiveEvent::Closed(Some(format!("server going away: {reason}"))));
        }

        events
    }
}

/// Parse one inbound frame (text or binary JSON).
pub fn parse_server_frame(bytes: &[u8]) -> Result<Vec<LiveEvent>, serde_json::Error> {
    let message: ServerMessage = serde_json::from_slice(bytes)?;
    Ok(message.into_events())
}
