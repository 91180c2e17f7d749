//! Move notation parsing.
//!
//! Accepts SAN (`e4`, `Nf3`, `O-O`, `exd8=Q+`) or coordinate pairs
//! (`e2e4`, `e2-e4`, `e7e8q`) and resolves them to a legal `shakmaty::Move`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use shakmaty::{san::SanPlus, uci::UciMove, CastlingMode, Chess, Move, Position, Role, Square};

use crate::error::MoveError;

static COORDINATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-h][1-8])\s*[-x]?\s*([a-h][1-8])\s*=?([qrbn])?$").unwrap()
});

/// A move as it arrives from the board or from the voice assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoveInput {
    /// Explicit source/destination squares. Promotions default to a queen.
    Squares { from: String, to: String },
    /// Free-form notation, SAN or coordinates.
    Notation {
        #[serde(rename = "move")]
        notation: String,
    },
}

impl MoveInput {
    pub fn notation(text: impl Into<String>) -> Self {
        MoveInput::Notation {
            notation: text.into(),
        }
    }

    pub fn squares(from: impl Into<String>, to: impl Into<String>) -> Self {
        MoveInput::Squares {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Human-readable form used in logs and acknowledgements.
    pub fn describe(&self) -> String {
        match self {
            MoveInput::Notation { notation } => notation.trim().to_string(),
            MoveInput::Squares { from, to } => format!("{from}{to}"),
        }
    }
}

/// Resolve a move input against `pos`. Never mutates the position.
pub fn resolve(pos: &Chess, input: &MoveInput) -> Result<Move, MoveError> {
    match input {
        MoveInput::Squares { from, to } => {
            let from_sq = parse_square(from)?;
            let to_sq = parse_square(to)?;
            find_by_squares(pos, from_sq, to_sq, None)
                .ok_or_else(|| MoveError::Illegal(input.describe()))
        }
        MoveInput::Notation { notation } => resolve_notation(pos, notation),
    }
}

fn resolve_notation(pos: &Chess, text: &str) -> Result<Move, MoveError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MoveError::Malformed(text.to_string()));
    }

    // Coordinates first: "b1c3" also parses as a (pawn) SAN move.
    if let Some(cap) = COORDINATE_RE.captures(text) {
        let from = parse_square(&cap[1])?;
        let to = parse_square(&cap[2])?;
        let promotion = cap.get(3).and_then(|m| promotion_role(m.as_str()));
        return find_by_squares(pos, from, to, promotion)
            .ok_or_else(|| MoveError::Illegal(text.to_string()));
    }

    // Spoken castling often arrives with zeros.
    let normalized = text.replace('0', "O");
    let san: SanPlus = normalized
        .parse()
        .map_err(|_| MoveError::Malformed(text.to_string()))?;

    san.san
        .to_move(pos)
        .map_err(|_| MoveError::Illegal(text.to_string()))
}

fn parse_square(text: &str) -> Result<Square, MoveError> {
    text.trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| MoveError::Malformed(text.to_string()))
}

fn promotion_role(text: &str) -> Option<Role> {
    match text.to_ascii_lowercase().as_str() {
        "q" => Some(Role::Queen),
        "r" => Some(Role::Rook),
        "b" => Some(Role::Bishop),
        "n" => Some(Role::Knight),
        _ => None,
    }
}

/// Find the legal move between two squares. Castling is matched by the
/// king's destination square, promotions by `promotion` (queen if unset).
fn find_by_squares(pos: &Chess, from: Square, to: Square, promotion: Option<Role>) -> Option<Move> {
    let wanted = promotion.unwrap_or(Role::Queen);
    pos.legal_moves().into_iter().find(|m| match m.to_uci(CastlingMode::Standard) {
        UciMove::Normal {
            from: f,
            to: t,
            promotion: p,
        } => f == from && t == to && p.map_or(true, |role| role == wanted),
        _ => false,
    })
}
