pub mod chat;
pub mod game;
pub mod health;
pub mod puzzle;
pub mod shell;
pub mod voice_ws;
