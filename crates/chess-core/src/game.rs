//! Game State Holder and Move Applier.

use std::collections::HashMap;

use serde::Serialize;
use shakmaty::{
    fen::Fen, san::SanPlus, uci::UciMove, CastlingMode, Chess, EnPassantMode, Move, Position,
};

use crate::error::MoveError;
use crate::notation::{self, MoveInput};
use crate::record::{MoveRecord, Side};
use crate::status::StatusKind;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Read-only view of the current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionSnapshot {
    pub fen: String,
    pub turn: Side,
    pub in_check: bool,
    pub checkmate: bool,
    pub draw: bool,
    pub status: String,
    /// Half-moves applied since the last reset.
    pub ply: usize,
}

/// Result of an accepted move.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedMove {
    pub record: MoveRecord,
    pub position: PositionSnapshot,
}

#[derive(Debug, Clone)]
pub struct Game {
    start: Chess,
    position: Chess,
    history: Vec<MoveRecord>,
    repetitions: HashMap<String, u32>,
    status: StatusKind,
}

impl Default for Game {
    fn default() -> Self {
        Self::with_position(Chess::default())
    }
}

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a game from an arbitrary position.
    pub fn from_fen(fen: &str) -> Result<Self, MoveError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| MoveError::InvalidFen(format!("{fen}: {e}")))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| MoveError::InvalidFen(format!("{fen}: {e}")))?;
        Ok(Self::with_position(pos))
    }

    fn with_position(pos: Chess) -> Self {
        let mut repetitions = HashMap::new();
        repetitions.insert(position_key(&pos), 1);
        let status = StatusKind::derive(&pos, 1);
        Self {
            start: pos.clone(),
            position: pos,
            history: Vec::new(),
            repetitions,
            status,
        }
    }

    /// Validate and apply a move. The move is played on a copy of the current
    /// position, so a rejected move leaves the game untouched.
    pub fn apply(&mut self, input: &MoveInput) -> Result<AppliedMove, MoveError> {
        let mv = notation::resolve(&self.position, input)?;
        let (from, to) = move_squares(&mv).ok_or_else(|| MoveError::Illegal(input.describe()))?;

        let side = Side::from(self.position.turn());
        let mut next = self.position.clone();
        let san = SanPlus::from_move_and_play_unchecked(&mut next, mv.clone()).to_string();

        let key = position_key(&next);
        let seen = self.repetitions.get(&key).copied().unwrap_or(0) + 1;

        self.position = next;
        self.repetitions.insert(key, seen);
        self.status = StatusKind::derive(&self.position, seen);

        let record = MoveRecord {
            from,
            to,
            san,
            color: side,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        self.history.push(record.clone());

        Ok(AppliedMove {
            record,
            position: self.snapshot(),
        })
    }

    /// Back to the standard starting position with an empty history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        let turn = self.turn();
        PositionSnapshot {
            fen: self.fen(),
            turn,
            in_check: self.position.is_check(),
            checkmate: self.status.is_checkmate(),
            draw: self.status.is_draw(),
            status: self.status.describe(turn),
            ply: self.history.len(),
        }
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    pub fn turn(&self) -> Side {
        Side::from(self.position.turn())
    }

    pub fn status(&self) -> StatusKind {
        self.status
    }

    pub fn status_text(&self) -> String {
        self.status.describe(self.turn())
    }

    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    pub fn san_history(&self) -> Vec<String> {
        self.history.iter().map(|r| r.san.clone()).collect()
    }

    /// Side that was to move when the game (re)started.
    pub fn starting_side(&self) -> Side {
        Side::from(self.start.turn())
    }

    /// Board context handed to the coach and the voice assistant.
    pub fn describe_for_prompt(&self) -> String {
        format!(
            "FEN: {}\nHistory: {}\nTurn: {}",
            self.fen(),
            self.san_history().join(", "),
            self.turn().name()
        )
    }
}

/// Source and destination squares as the board widget names them
/// (castling uses the king's destination).
fn move_squares(mv: &Move) -> Option<(String, String)> {
    match mv.to_uci(CastlingMode::Standard) {
        UciMove::Normal { from, to, .. } => Some((from.to_string(), to.to_string())),
        _ => None,
    }
}

/// Strips move counters from FEN, keeping placement + side + castling + ep.
pub fn normalize_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn position_key(pos: &Chess) -> String {
    normalize_fen(&Fen::from_position(pos, EnPassantMode::Legal).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(game: &mut Game, moves: &[&str]) {
        for mv in moves {
            game.apply(&MoveInput::notation(*mv))
                .unwrap_or_else(|e| panic!("{mv}: {e}"));
        }
    }

    #[test]
    fn test_new_game() {
        let game = Game::new();
        assert_eq!(game.fen(), STANDARD_START_FEN);
        assert_eq!(game.status_text(), "White to move");
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_e4_records_move_and_flips_turn() {
        let mut game = Game::new();
        let applied = game.apply(&MoveInput::notation("e4")).unwrap();
        assert_eq!(applied.record.from, "e2");
        assert_eq!(applied.record.to, "e4");
        assert_eq!(applied.record.san, "e4");
        assert_eq!(applied.record.color, Side::White);
        assert_eq!(applied.position.turn, Side::Black);
        assert_eq!(applied.position.status, "Black to move");
        assert_eq!(applied.position.ply, 1);
    }

    #[test]
    fn test_rejected_move_leaves_state() {
        let mut game = Game::new();
        play(&mut game, &["e4"]);
        let before = game.snapshot();
        assert!(game.apply(&MoveInput::notation("e4")).is_err());
        assert!(game.apply(&MoveInput::notation("Qxf7")).is_err());
        assert!(game.apply(&MoveInput::squares("a1", "a8")).is_err());
        assert_eq!(game.snapshot(), before);
        assert_eq!(game.history().len(), 1);
    }

    #[test]
    fn test_san_includes_check_and_mate_suffix() {
        let mut game = Game::new();
        play(&mut game, &["f3", "e5", "g4"]);
        let applied = game.apply(&MoveInput::notation("Qh4")).unwrap();
        assert_eq!(applied.record.san, "Qh4#");
        assert_eq!(applied.position.status, "Checkmate! Black wins!");
        assert!(applied.position.checkmate);
    }

    #[test]
    fn test_castling_record_uses_king_squares() {
        let mut game = Game::new();
        play(&mut game, &["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5"]);
        let applied = game.apply(&MoveInput::notation("O-O")).unwrap();
        assert_eq!(applied.record.from, "e1");
        assert_eq!(applied.record.to, "g1");
        assert_eq!(applied.record.san, "O-O");
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        play(
            &mut game,
            &["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1"],
        );
        assert_eq!(game.status_text(), "Black to move");
        play(&mut game, &["Ng8"]);
        assert_eq!(game.status_text(), "Draw!");
    }

    #[test]
    fn test_from_fen_black_to_move() {
        let mut game = Game::from_fen("4k3/8/8/8/8/8/8/4R2K b - - 0 1").unwrap();
        assert_eq!(game.starting_side(), Side::Black);
        assert_eq!(game.status_text(), "Black to move (Check!)");
        let applied = game.apply(&MoveInput::notation("Kd7")).unwrap();
        assert_eq!(applied.record.color, Side::Black);
        assert_eq!(applied.position.status, "White to move");
    }

    #[test]
    fn test_from_fen_rejects_garbage() {
        assert!(matches!(
            Game::from_fen("not a fen"),
            Err(MoveError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_reset() {
        let mut game = Game::new();
        play(&mut game, &["d4", "d5"]);
        game.reset();
        assert!(game.history().is_empty());
        assert_eq!(game.fen(), STANDARD_START_FEN);
        assert_eq!(game.status_text(), "White to move");
    }

    #[test]
    fn test_normalize_fen() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        assert_eq!(
            normalize_fen(fen),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3"
        );
    }

    #[test]
    fn test_prompt_context() {
        let mut game = Game::new();
        play(&mut game, &["e4", "c5"]);
        let ctx = game.describe_for_prompt();
        assert!(ctx.contains("History: e4, c5"));
        assert!(ctx.contains("Turn: White"));
    }
}
