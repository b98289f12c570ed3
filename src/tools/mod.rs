//! Tools the agent may invoke mid-response.

mod tavily;

pub use tavily::{TavilySearch, TAVILY_TOOL_NAME};

use crate::config::Settings;
use crate::error::Result;
use crate::llm::ToolSpec;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// An external capability exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    /// Run the tool with model-provided arguments.
    async fn call(&self, args: &Value) -> Result<Value>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Feature toggles that decide which tools an agent gets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolToggles {
    pub search_web: bool,
}

/// Assemble the tool list for a request.
pub fn create_tools(toggles: ToolToggles, settings: &Settings) -> Result<Vec<Arc<dyn Tool>>> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

    if toggles.search_web {
        tools.push(Arc::new(TavilySearch::from_settings(settings)?));
    }

    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_off_yields_no_tools() {
        let tools = create_tools(ToolToggles { search_web: false }, &Settings::default()).unwrap();
        assert!(tools.is_empty());
    }

    #[test]
    fn test_search_on_yields_tavily() {
        let tools = create_tools(ToolToggles { search_web: true }, &Settings::default()).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), TAVILY_TOOL_NAME);
        assert_eq!(tools[0].spec().parameters["required"][0], "query");
    }
}
