use std::env;

use voice_bridge::session::{DEFAULT_LIVE_MODEL, DEFAULT_VOICE};
use voice_bridge::transport::DEFAULT_LIVE_URL;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub coach_model: String,
    pub coach_thinking_budget: u32,
    pub live_url: String,
    pub live_model: String,
    pub live_voice: String,
    pub lichess_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            gemini_api_key: String::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            coach_model: "gemini-3-pro-preview".to_string(),
            coach_thinking_budget: 32768,
            live_url: DEFAULT_LIVE_URL.to_string(),
            live_model: DEFAULT_LIVE_MODEL.to_string(),
            live_voice: DEFAULT_VOICE.to_string(),
            lichess_base_url: "https://lichess.org".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            gemini_api_key: env::var("GEMINI_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .unwrap_or_default(),
            gemini_base_url: env::var("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            coach_model: env::var("COACH_MODEL").unwrap_or(defaults.coach_model),
            coach_thinking_budget: env::var("COACH_THINKING_BUDGET")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.coach_thinking_budget),
            live_url: env::var("GEMINI_LIVE_URL").unwrap_or(defaults.live_url),
            live_model: env::var("LIVE_MODEL").unwrap_or(defaults.live_model),
            live_voice: env::var("LIVE_VOICE").unwrap_or(defaults.live_voice),
            lichess_base_url: env::var("LICHESS_BASE_URL").unwrap_or(defaults.lichess_base_url),
        }
    }
}
