/// Per-session chat log: user and assistant utterances kept index-aligned,
/// plus a single pending slot handed from input capture to the turn processor.
///
/// Both logs are append-only. Once a turn is fully processed they have the
/// same length; while a request is in flight the user log is one ahead.
#[derive(Debug, Default)]
pub struct ConversationStore {
    user_turns: Vec<String>,
    assistant_turns: Vec<String>,
    pending_input: Option<String>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user utterance. Blank text is not recorded and `false` is
    /// returned.
    pub fn record_user_turn(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.user_turns.push(text.to_string());
        true
    }

    pub fn record_assistant_turn(&mut self, text: &str) {
        self.assistant_turns.push(text.to_string());
    }

    /// Replaces whatever is waiting in the pending slot.
    pub fn set_pending(&mut self, text: impl Into<String>) {
        self.pending_input = Some(text.into());
    }

    pub fn take_pending(&mut self) -> Option<String> {
        self.pending_input.take()
    }

    pub fn user_turns(&self) -> &[String] {
        &self.user_turns
    }

    pub fn assistant_turns(&self) -> &[String] {
        &self.assistant_turns
    }

    /// Number of answered turns.
    pub fn completed_turns(&self) -> usize {
        self.assistant_turns.len().min(self.user_turns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.user_turns.is_empty() && self.assistant_turns.is_empty()
    }
}
