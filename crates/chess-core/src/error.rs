#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("Unparseable move: {0}")]
    Malformed(String),

    #[error("Illegal move: {0}")]
    Illegal(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
}
