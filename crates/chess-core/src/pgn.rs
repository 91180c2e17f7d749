//! SAN-list helpers for move text such as the PGN attached to a puzzle.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::MoveError;
use crate::game::Game;
use crate::notation::MoveInput;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static VARIATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O").unwrap()
});

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = HEADER_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_variations = VARIATION_RE.replace_all(&no_comments, "");

    MOVE_RE
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Play every move of `pgn` from the standard start and return the game.
pub fn replay(pgn: &str) -> Result<Game, MoveError> {
    let mut game = Game::new();
    for san in extract_moves(pgn) {
        game.apply(&MoveInput::notation(san))?;
    }
    Ok(game)
}
