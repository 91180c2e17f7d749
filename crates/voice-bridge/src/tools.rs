//! Capabilities the remote model may invoke during a voice session.
//!
//! The set is closed: each capability parses its own arguments and maps them
//! to a result through [`BoardControl`], the session's only way to touch the
//! game.

use serde::Serialize;
use serde_json::{json, Value};

use crate::live::{FunctionCall, FunctionDeclaration, FunctionResponse, Tool};

/// Snapshot of the board handed to the voice model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardState {
    pub fen: String,
    pub history: Vec<String>,
}

impl BoardState {
    /// Context line forwarded into the live session after each move.
    pub fn context_text(&self) -> String {
        format!(
            "Board update. Current board state (FEN): {}. History of moves: {}.",
            self.fen,
            self.history.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveAck {
    pub san: String,
    pub board: BoardState,
}

/// Write access to the game, implemented by whoever owns it.
pub trait BoardControl: Send + Sync {
    /// Apply a move given as SAN or a square pair. `Err` carries the reason.
    fn make_move(&self, notation: &str) -> Result<MoveAck, String>;

    fn board_state(&self) -> BoardState;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    MakeMove,
}

impl Capability {
    pub const ALL: [Capability; 1] = [Capability::MakeMove];

    pub fn name(self) -> &'static str {
        match self {
            Capability::MakeMove => "make_move",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn declaration(self) -> FunctionDeclaration {
        match self {
            Capability::MakeMove => FunctionDeclaration {
                name: self.name().to_string(),
                description: "Executes a chess move spoken by the user.".to_string(),
                parameters: json!({
                    "type": "OBJECT",
                    "properties": {
                        "move": {
                            "type": "STRING",
                            "description": "The move in standard algebraic notation (e.g. e4, Nf3, O-O) or from-to format (e.g. e2e4)."
                        }
                    },
                    "required": ["move"]
                }),
            },
        }
    }

    /// Tool block registered once at session setup.
    pub fn tool_block() -> Tool {
        Tool {
            function_declarations: Self::ALL.iter().map(|c| c.declaration()).collect(),
        }
    }
}

/// A validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    MakeMove { notation: String },
}

impl Invocation {
    pub fn parse(call: &FunctionCall) -> Result<Self, String> {
        match Capability::from_name(&call.name) {
            Some(Capability::MakeMove) => {
                let notation = call
                    .args
                    .get("move")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| "Missing required argument: move".to_string())?;
                Ok(Invocation::MakeMove {
                    notation: notation.to_string(),
                })
            }
            None => Err(format!("Unknown function: {}", call.name)),
        }
    }
}

/// What a dispatched call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub response: FunctionResponse,
    /// Set when the call changed the board.
    pub applied: Option<MoveAck>,
}

pub fn dispatch(call: &FunctionCall, board: &dyn BoardControl) -> ToolOutcome {
    let respond = |body: Value| FunctionResponse {
        id: call.id.clone(),
        name: call.name.clone(),
        response: body,
    };

    match Invocation::parse(call) {
        Ok(Invocation::MakeMove { notation }) => match board.make_move(&notation) {
            Ok(ack) => ToolOutcome {
                response: respond(json!({ "result": format!("Moved {notation}") })),
                applied: Some(ack),
            },
            Err(reason) => {
                tracing::debug!("Voice move rejected: {reason}");
                ToolOutcome {
                    response: respond(json!({ "result": format!("Invalid move: {notation}") })),
                    applied: None,
                }
            }
        },
        Err(message) => {
            tracing::warn!("Rejected tool call {}: {message}", call.name);
            ToolOutcome {
                response: respond(json!({ "error": message })),
                applied: None,
            }
        }
    }
}
