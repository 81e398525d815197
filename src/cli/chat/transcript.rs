use color_print::cformat;

use super::conversation_state::ConversationStore;

pub const ASSISTANT_LABEL: &str = "AI Mentor";

/// Answered turns, most recent first. An in-flight user turn is skipped.
pub fn turns_newest_first(store: &ConversationStore) -> impl Iterator<Item = (&str, &str)> {
    store
        .user_turns()
        .iter()
        .zip(store.assistant_turns())
        .rev()
        .map(|(user, assistant)| (user.as_str(), assistant.as_str()))
}

pub fn render_transcript(store: &ConversationStore) -> String {
    if store.completed_turns() == 0 {
        return "No conversation yet.\n".to_string();
    }

    let mut rendered = String::new();
    for (user, assistant) in turns_newest_first(store) {
        rendered.push_str(&cformat!("<green><bold>You:</bold></green> {}\n", user));
        rendered.push_str(&render_reply(assistant));
        rendered.push('\n');
    }
    rendered
}

pub fn render_reply(text: &str) -> String {
    cformat!("<cyan><bold>{}:</bold></cyan> {}\n", ASSISTANT_LABEL, text)
}
