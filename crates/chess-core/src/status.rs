//! Game status derivation. Checkmate beats draw, draw beats check.

use serde::Serialize;
use shakmaty::{Chess, Position};

use crate::record::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusKind {
    Checkmate { winner: Side },
    Draw { reason: DrawReason },
    Check,
    Normal,
}

impl StatusKind {
    /// Derive the status of `pos`. `repetitions` is how many times the
    /// current position has occurred since the game started.
    pub fn derive(pos: &Chess, repetitions: u32) -> Self {
        if pos.is_checkmate() {
            // The side to move is mated; the other side delivered it.
            let winner = Side::from(pos.turn()).opposite();
            return StatusKind::Checkmate { winner };
        }
        if let Some(reason) = draw_reason(pos, repetitions) {
            return StatusKind::Draw { reason };
        }
        if pos.is_check() {
            return StatusKind::Check;
        }
        StatusKind::Normal
    }

    /// Status line shown above the board.
    pub fn describe(&self, turn: Side) -> String {
        match self {
            StatusKind::Checkmate { winner } => format!("Checkmate! {} wins!", winner.name()),
            StatusKind::Draw { .. } => "Draw!".to_string(),
            StatusKind::Check => format!("{} to move (Check!)", turn.name()),
            StatusKind::Normal => format!("{} to move", turn.name()),
        }
    }

    pub fn is_checkmate(&self) -> bool {
        matches!(self, StatusKind::Checkmate { .. })
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, StatusKind::Draw { .. })
    }
}

fn draw_reason(pos: &Chess, repetitions: u32) -> Option<DrawReason> {
    if pos.is_stalemate() {
        Some(DrawReason::Stalemate)
    } else if pos.is_insufficient_material() {
        Some(DrawReason::InsufficientMaterial)
    } else if pos.halfmoves() >= 100 {
        Some(DrawReason::FiftyMoveRule)
    } else if repetitions >= 3 {
        Some(DrawReason::ThreefoldRepetition)
    } else {
        None
    }
}
