//! Game state, move application and notation helpers for voice chess.
//!
//! Chess rules are delegated to `shakmaty`; this crate owns the position,
//! the append-only move history and the status line shown to the player.

pub mod error;
pub mod game;
pub mod history;
pub mod notation;
pub mod pgn;
pub mod record;
pub mod status;

pub use error::MoveError;
pub use game::{AppliedMove, Game, PositionSnapshot};
pub use notation::MoveInput;
pub use record::{MoveRecord, Side};
pub use status::{DrawReason, StatusKind};
