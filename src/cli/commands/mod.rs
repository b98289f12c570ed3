//! CLI command implementations.

mod about;
mod ask;
mod chat;
mod config;
mod doctor;
mod history;
mod models;
mod serve;
mod transcribe;

pub use about::run_about;
pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use history::run_history;
pub use models::run_models;
pub use serve::run_serve;
pub use transcribe::run_transcribe;
