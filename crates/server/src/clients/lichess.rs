use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LichessPuzzle {
    pub game: PuzzleGame,
    pub puzzle: PuzzleInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleGame {
    pub id: String,
    pub perf: Perf,
    pub rated: bool,
    pub players: Vec<PuzzlePlayer>,
    pub pgn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perf {
    #[serde(default)]
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzlePlayer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub rating: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleInfo {
    pub id: String,
    pub rating: u32,
    pub plays: u32,
    pub initial_ply: u32,
    pub solution: Vec<String>,
    pub themes: Vec<String>,
}

pub struct LichessClient {
    client: Client,
    base_url: String,
}

impl LichessClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, String> {
        let client = Client::builder()
            .user_agent("GrandmasterVoiceChess/1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("HTTP client error: {e}"))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch today's puzzle. One attempt, no retry.
    pub async fn fetch_daily_puzzle(&self) -> Result<LichessPuzzle, String> {
        let url = format!("{}/api/puzzle/daily", self.base_url);

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| format!("Request error: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }

        resp.json::<LichessPuzzle>()
            .await
            .map_err(|e| format!("Body parse error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_daily_puzzle_payload() {
        let body = r#"{
            "game": {
                "id": "abcd1234",
                "perf": {"key": "blitz", "name": "Blitz"},
                "rated": true,
                "players": [
                    {"name": "Alice", "id": "alice", "color": "white", "rating": 2100},
                    {"name": "Bob", "title": "GM", "id": "bob", "color": "black", "rating": 2600}
                ],
                "pgn": "e4 e5 Nf3 Nc6",
                "clock": "3+0"
            },
            "puzzle": {
                "id": "Xyz12",
                "rating": 1850,
                "plays": 4200,
                "initialPly": 3,
                "solution": ["f1b5", "a7a6"],
                "themes": ["opening", "advantage", "short"]
            }
        }"#;

        let puzzle: LichessPuzzle = serde_json::from_str(body).unwrap();
        assert_eq!(puzzle.puzzle.id, "Xyz12");
        assert_eq!(puzzle.puzzle.initial_ply, 3);
        assert_eq!(puzzle.game.perf.name, "Blitz");
        assert_eq!(puzzle.game.players[1].title.as_deref(), Some("GM"));
        assert!(puzzle.game.players[0].title.is_none());
    }
}
