use rustyline::{CompletionType, Config, Editor, Result};

const DEFAULT_PROMPT: &str = "You: ";

/// Prompt shown before each line. Prefixed with `custom_prompt` when one is
/// given, e.g. the number of answered turns.
pub fn generate_prompt(custom_prompt: Option<&str>) -> String {
    match custom_prompt {
        Some(prefix) => format!("[{}] {}", prefix, DEFAULT_PROMPT),
        None => DEFAULT_PROMPT.to_string(),
    }
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();
    Editor::with_config(config)
}
