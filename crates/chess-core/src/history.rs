//! Move history grouped into numbered white/black rows.

use serde::Serialize;

use crate::record::{MoveRecord, Side};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovePair {
    pub number: usize,
    pub white: Option<String>,
    pub black: Option<String>,
}

/// Pair up a history into notation rows. A history that starts with Black
/// (a game loaded from a black-to-move position) opens with an empty white cell.
pub fn move_pairs(history: &[MoveRecord]) -> Vec<MovePair> {
    let mut pairs: Vec<MovePair> = Vec::with_capacity(history.len() / 2 + 1);

    for record in history {
        match record.color {
            Side::White => pairs.push(MovePair {
                number: pairs.len() + 1,
                white: Some(record.san.clone()),
                black: None,
            }),
            Side::Black => match pairs.last_mut() {
                Some(last) if last.black.is_none() => last.black = Some(record.san.clone()),
                _ => pairs.push(MovePair {
                    number: pairs.len() + 1,
                    white: None,
                    black: Some(record.san.clone()),
                }),
            },
        }
    }

    pairs
}
