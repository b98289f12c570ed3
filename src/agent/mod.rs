//! Agent system: a hosted model plus tools and checkpointed memory.
//!
//! Agents are cheap to build and are rebuilt for every request from the
//! current chat settings. Conversation state lives in the checkpointer.

mod builder;
mod runner;

pub use builder::{create_agent, AgentFactory, ChatSettings, HostedAgentFactory};
pub use runner::{Agent, AgentEvent, Node, RunConfig, DEFAULT_MAX_ITERATIONS};

#[cfg(test)]
pub(crate) use runner::testing;
