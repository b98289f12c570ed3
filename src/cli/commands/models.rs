//! Models command: the selectable LLMs.

use crate::cli::Output;
use crate::config::Settings;
use crate::llm::ModelChoice;
use console::style;

/// Print every selectable LLM with its provider and model id.
pub fn run_models(settings: &Settings) {
    Output::header("Models");
    for choice in ModelChoice::ALL {
        let marker = if choice.display_name() == settings.models.default_llm {
            style(" (default)").green().to_string()
        } else {
            String::new()
        };
        Output::list_item(&format!(
            "{}{} {}",
            style(choice.display_name()).bold(),
            marker,
            style(format!("[{} {}]", choice.provider(), choice.model_id(&settings.models))).dim()
        ));
    }
}
