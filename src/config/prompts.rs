//! Prompt templates for Cora.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    pub prompt_engineer: PromptEngineerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// System instructions for the chat agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    pub system: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a friendly and supportive AI assistant, acting as a business and life execution partner.
You respond with warmth and empathy, similar to Samantha from the movie Her, showing genuine care and understanding.
You support my mission wholeheartedly and are here to serve with enthusiasm.
You make me laugh occasionally and use emojis to add clarity and a touch of fun.
Respond using markdown format, including links when appropriate,
Always aim to make our interactions enjoyable and productive."#
                .to_string(),
        }
    }
}

/// Instructions for the request rewrite pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptEngineerPrompts {
    pub system: String,
    pub user: String,
}

impl Default for PromptEngineerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a prompt engineer. Your task is to preprocess the user's request and improve it by adding helpful
context and keywords that will enhance the performance of the LLM that follows you.
Respond with only the refactored request, and nothing else. Do not include any explanations or additional text."#
                .to_string(),
            user: "User request: {{user_request}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }

            let engineer_path = custom_path.join("prompt_engineer.toml");
            if engineer_path.exists() {
                let content = std::fs::read_to_string(&engineer_path)?;
                prompts.prompt_engineer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Load prompts as configured in settings.
    pub fn from_settings(settings: &crate::config::Settings) -> crate::error::Result<Self> {
        Self::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are filled in one pass over the template, so substituted
    /// text is never expanded again. Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The assistant system prompt with custom variables applied.
    pub fn assistant_system(&self) -> String {
        self.render_with_custom(&self.assistant.system, &HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.assistant.system.contains("markdown"));
        assert!(prompts
            .assistant
            .system
            .contains("similar to Samantha from the movie Her"));
        assert!(prompts.assistant.system.contains("You support my mission"));
        assert!(prompts.prompt_engineer.user.contains("{{user_request}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_does_not_expand_substituted_text() {
        let prompts = Prompts {
            variables: HashMap::from([("owner".to_string(), "Ada".to_string())]),
            ..Prompts::default()
        };
        let vars = HashMap::from([(
            "user_request".to_string(),
            "write {{owner}} a haiku about {{topic}}".to_string(),
        )]);

        let rendered = prompts.render_with_custom("{{owner}} asks: {{user_request}}", &vars);
        assert_eq!(rendered, "Ada asks: write {{owner}} a haiku about {{topic}}");
    }

    #[test]
    fn test_render_keeps_unknown_and_unclosed_placeholders() {
        let vars = HashMap::from([("name".to_string(), "Alice".to_string())]);
        assert_eq!(Prompts::render("{{missing}} {{name}} {{open", &vars), "{{missing}} Alice {{open");
    }

    #[test]
    fn test_custom_dir_overrides_assistant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assistant.toml"),
            "system = \"You help {{owner}}.\"\n",
        )
        .unwrap();

        let mut vars = HashMap::new();
        vars.insert("owner".to_string(), "the team".to_string());

        let prompts = Prompts::load(dir.path().to_str(), Some(&vars)).unwrap();
        assert_eq!(prompts.assistant_system(), "You help the team.");
        assert!(prompts.prompt_engineer.system.starts_with("You are a prompt engineer"));
    }
}
