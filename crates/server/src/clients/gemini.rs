//! Gemini `generateContent` client for the coaching chat.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Text answer of one coach request plus the model's reasoning trace, if
/// it sent one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoachReply {
    pub text: String,
    pub thinking: Option<String>,
}

/// A model that can answer one coaching prompt.
#[async_trait]
pub trait CoachModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<CoachReply, String>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_instruction: String,
    thinking_budget: u32,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
        thinking_budget: u32,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_instruction: system_instruction.into(),
            thinking_budget,
        }
    }

    fn request_body(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![TextPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![TextPart {
                    text: self.system_instruction.clone(),
                }],
            },
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                    include_thoughts: true,
                },
            },
        }
    }
}

#[async_trait]
impl CoachModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<CoachReply, String> {
        if self.api_key.is_empty() {
            return Err("GEMINI_API_KEY is not set".to_string());
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .client
            .post(url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| format!("Gemini request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http_error(status, &body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Gemini response: {e}"))?;

        Ok(collect_reply(parsed))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
    include_thoughts: bool,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Answer text is every non-thought part of the first candidate; thought
/// parts are joined into the reasoning trace.
fn collect_reply(response: GenerateContentResponse) -> CoachReply {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut text = String::new();
    let mut thoughts = Vec::new();
    for part in parts {
        let Some(part_text) = part.text else { continue };
        if part.thought {
            thoughts.push(part_text);
        } else {
            text.push_str(&part_text);
        }
    }

    CoachReply {
        text,
        thinking: (!thoughts.is_empty()).then(|| thoughts.join("\n")),
    }
}

fn http_error(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorWrapper>(body)
        .ok()
        .map(|w| match (w.error.status, w.error.message) {
            (Some(s), Some(m)) => format!("{s}: {m}"),
            (None, Some(m)) => m,
            (Some(s), None) => s,
            (None, None) => body.to_string(),
        })
        .unwrap_or_else(|| body.to_string());
    format!("Gemini API error (HTTP {}): {detail}", status.as_u16())
}
