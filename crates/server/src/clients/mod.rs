pub mod gemini;
pub mod lichess;
