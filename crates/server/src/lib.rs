pub mod app;
pub mod clients;
pub mod coach;
pub mod config;
pub mod error;
pub mod puzzle;
pub mod routes;
pub mod state;
