// Public API for integration tests and potential library usage

pub mod app;
pub mod broadcast;
pub mod config;
pub mod hooks;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod types;
pub mod ws;
