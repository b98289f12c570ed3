//! The conversation layer shared by the terminal chat and the HTTP API.
//!
//! A turn takes the user's text (typed or transcribed), optionally rewrites
//! it, streams it through an agent built from the current chat settings and
//! projects every agent event into [`Rendered`] items.

mod projection;
mod service;
mod session;

pub use projection::{project_event, Rendered};
pub use service::{ChatService, TurnOutcome};
pub use session::{display_history, Session, SessionHandle, SessionStore};
