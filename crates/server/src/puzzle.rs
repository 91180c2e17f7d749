//! Display helpers for the daily puzzle panel.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::clients::lichess::{LichessPuzzle, PuzzlePlayer};

static CAPITAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([A-Z])").unwrap());

const MAX_THEMES: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct PuzzleView {
    #[serde(flatten)]
    pub puzzle: LichessPuzzle,
    pub players: String,
    pub themes: Vec<String>,
    pub training_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
}

impl PuzzleView {
    pub fn new(puzzle: LichessPuzzle) -> Self {
        let fen = match chess_core::pgn::replay(&puzzle.game.pgn) {
            Ok(game) => Some(game.fen()),
            Err(e) => {
                tracing::debug!("Puzzle game {} did not replay: {e}", puzzle.game.id);
                None
            }
        };
        Self {
            players: players_line(&puzzle.game.players),
            themes: display_themes(&puzzle.puzzle.themes),
            training_url: training_url(&puzzle.puzzle.id),
            fen,
            puzzle,
        }
    }
}

fn player_label(player: &PuzzlePlayer) -> String {
    match &player.title {
        Some(title) if !title.is_empty() => format!("{title} {}", player.name),
        _ => player.name.clone(),
    }
}

pub fn players_line(players: &[PuzzlePlayer]) -> String {
    players
        .iter()
        .map(player_label)
        .collect::<Vec<_>>()
        .join(" vs ")
}

/// `mateIn2` -> `mate In2`.
pub fn humanize_theme(theme: &str) -> String {
    CAPITAL_RE.replace_all(theme, " $1").trim().to_string()
}

pub fn display_themes(themes: &[String]) -> Vec<String> {
    themes
        .iter()
        .take(MAX_THEMES)
        .map(|t| humanize_theme(t))
        .collect()
}

pub fn training_url(puzzle_id: &str) -> String {
    format!("https://lichess.org/training/{puzzle_id}")
}
