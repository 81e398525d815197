use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use super::conversation_state::ConversationStore;
use super::message::Message;
use crate::completion_client::{CompletionEndpoint, CompletionRequest, RawCompletion};
use crate::config::ChatConfig;

/// Recorded in place of a reply when a successful response carries no `output`.
pub const NO_ANSWER_FALLBACK: &str = "No answer found.";

/// How a single turn ended. Both variants are recorded as the assistant turn
/// through their display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered(String),
    /// `status` is `None` when the endpoint was never reached.
    Faulted { status: Option<u16>, body: String },
}

impl TurnOutcome {
    /// Interprets an HTTP result. Only a 200 with a JSON body is an answer.
    pub fn from_response(raw: RawCompletion) -> Self {
        if raw.status != 200 {
            return TurnOutcome::Faulted { status: Some(raw.status), body: raw.body };
        }

        match serde_json::from_str::<Value>(&raw.body) {
            Ok(payload) => TurnOutcome::Answered(extract_output(&payload)),
            Err(e) => {
                warn!("Completion endpoint returned a non-JSON body: {}", e);
                TurnOutcome::Faulted { status: Some(raw.status), body: raw.body }
            }
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered(_))
    }
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnOutcome::Answered(text) => f.write_str(text),
            TurnOutcome::Faulted { status: Some(code), body } => write!(f, "Error: {}, {}", code, body),
            TurnOutcome::Faulted { status: None, body } => write!(f, "Error: request failed, {}", body),
        }
    }
}

fn extract_output(payload: &Value) -> String {
    match payload.get("output") {
        None | Some(Value::Null) => NO_ANSWER_FALLBACK.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Turns the pending input of a [`ConversationStore`] into one completion
/// call and records whatever comes back.
pub struct TurnProcessor<E> {
    system_prompt: String,
    max_tokens: u32,
    temperature: f64,
    endpoint: E,
}

impl<E> TurnProcessor<E> {
    pub fn new(system_prompt: impl Into<String>, max_tokens: u32, temperature: f64, endpoint: E) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            max_tokens,
            temperature,
            endpoint,
        }
    }

    pub fn from_config(config: &ChatConfig, endpoint: E) -> Self {
        Self::new(config.system_prompt.clone(), config.max_tokens, config.temperature, endpoint)
    }

    /// System message first, then user and assistant turns interleaved by
    /// index. A trailing user turn without a reply is kept.
    pub fn build_message_sequence(&self, store: &ConversationStore) -> Vec<Message> {
        let user_turns = store.user_turns();
        let assistant_turns = store.assistant_turns();
        let turn_count = user_turns.len().max(assistant_turns.len());

        let mut messages = Vec::with_capacity(1 + user_turns.len() + assistant_turns.len());
        messages.push(Message::system(self.system_prompt.as_str()));

        for i in 0..turn_count {
            if let Some(text) = user_turns.get(i) {
                messages.push(Message::user(text.as_str()));
            }
            if let Some(text) = assistant_turns.get(i) {
                messages.push(Message::assistant(text.as_str()));
            }
        }

        messages
    }
}

impl<E: CompletionEndpoint> TurnProcessor<E> {
    /// Consumes the pending input and runs one turn.
    ///
    /// Returns `None` without touching the store or the endpoint when there
    /// is no pending input or it is blank. Otherwise exactly one user turn
    /// and one assistant turn are appended, whatever the endpoint does.
    pub async fn process_turn(&self, store: &mut ConversationStore) -> Option<TurnOutcome> {
        let text = store.take_pending()?;
        if !store.record_user_turn(&text) {
            debug!("Ignoring blank input");
            return None;
        }

        let messages = self.build_message_sequence(store);
        debug!("Built message sequence of {} messages", messages.len());

        // Only the tail of the sequence is sent; the endpoint takes a single prompt.
        let latest_user_message = messages.last().map_or(text.as_str(), |m| m.content.as_str());

        let request = CompletionRequest {
            input: latest_user_message.to_string(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let outcome = match self.endpoint.complete(&request).await {
            Ok(raw) => TurnOutcome::from_response(raw),
            Err(e) => TurnOutcome::Faulted { status: None, body: e.to_string() },
        };

        match &outcome {
            TurnOutcome::Answered(_) => debug!("Turn {} answered", store.user_turns().len()),
            TurnOutcome::Faulted { status, .. } => {
                warn!("Turn {} faulted (status: {:?})", store.user_turns().len(), status)
            }
        }

        store.record_assistant_turn(&outcome.to_string());
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;
    use crate::cli::chat::message::Role;
    use crate::completion_client::{CompletionClient, CompletionError};

    struct FakeEndpoint {
        reply: RawCompletion,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeEndpoint {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: RawCompletion { status, body: body.to_string() },
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionEndpoint for FakeEndpoint {
        async fn complete(&self, request: &CompletionRequest) -> Result<RawCompletion, CompletionError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn processor(status: u16, body: &str) -> TurnProcessor<FakeEndpoint> {
        TurnProcessor::new("You are a mentor.", 100, 0.5, FakeEndpoint::replying(status, body))
    }

    async fn submit<E: CompletionEndpoint>(
        processor: &TurnProcessor<E>,
        store: &mut ConversationStore,
        text: &str,
    ) -> Option<TurnOutcome> {
        store.set_pending(text);
        processor.process_turn(store).await
    }

    #[test]
    fn test_build_message_sequence_empty_store_is_system_only() {
        let fixture = processor(200, "{}");
        let actual = fixture.build_message_sequence(&ConversationStore::new());
        assert_eq!(actual, vec![Message::system("You are a mentor.")]);
    }

    #[test]
    fn test_build_message_sequence_keeps_trailing_user_turn() {
        let fixture = processor(200, "{}");
        let mut store = ConversationStore::new();
        store.record_user_turn("a");
        store.record_assistant_turn("x");
        store.record_user_turn("b");

        let actual = fixture.build_message_sequence(&store);

        let expected = vec![
            Message::system("You are a mentor."),
            Message::user("a"),
            Message::assistant("x"),
            Message::user("b"),
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_build_message_sequence_walks_longer_log() {
        let fixture = processor(200, "{}");
        let mut store = ConversationStore::new();
        store.record_user_turn("a");
        store.record_assistant_turn("x");
        store.record_assistant_turn("y");

        let actual: Vec<Role> = fixture
            .build_message_sequence(&store)
            .into_iter()
            .map(|m| m.role)
            .collect();

        assert_eq!(actual, vec![Role::System, Role::User, Role::Assistant, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_process_turn_records_answer() {
        let fixture = processor(200, r#"{"output":"hi"}"#);
        let mut store = ConversationStore::new();

        let actual = submit(&fixture, &mut store, "hello").await;

        assert_eq!(actual, Some(TurnOutcome::Answered("hi".to_string())));
        assert_eq!(store.user_turns(), &["hello".to_string()]);
        assert_eq!(store.assistant_turns(), &["hi".to_string()]);
        assert_eq!(
            fixture.endpoint.requests(),
            vec![CompletionRequest { input: "hello".to_string(), max_tokens: 100, temperature: 0.5 }]
        );
    }

    #[tokio::test]
    async fn test_process_turn_missing_output_uses_fallback() {
        let fixture = processor(200, "{}");
        let mut store = ConversationStore::new();

        submit(&fixture, &mut store, "hello").await;

        assert_eq!(store.assistant_turns(), &[NO_ANSWER_FALLBACK.to_string()]);
    }

    #[tokio::test]
    async fn test_process_turn_null_output_uses_fallback() {
        let fixture = processor(200, r#"{"output":null}"#);
        let mut store = ConversationStore::new();

        let actual = submit(&fixture, &mut store, "hello").await;

        assert_eq!(actual, Some(TurnOutcome::Answered(NO_ANSWER_FALLBACK.to_string())));
    }

    #[tokio::test]
    async fn test_process_turn_non_string_output_is_rendered_as_json() {
        let fixture = processor(200, r#"{"output":42}"#);
        let mut store = ConversationStore::new();

        submit(&fixture, &mut store, "hello").await;

        assert_eq!(store.assistant_turns(), &["42".to_string()]);
    }

    #[tokio::test]
    async fn test_process_turn_server_error_is_recorded_as_reply() {
        let fixture = processor(500, "boom");
        let mut store = ConversationStore::new();

        let actual = submit(&fixture, &mut store, "hello").await;

        assert_eq!(
            actual,
            Some(TurnOutcome::Faulted { status: Some(500), body: "boom".to_string() })
        );
        assert_eq!(store.user_turns(), &["hello".to_string()]);
        assert_eq!(store.assistant_turns(), &["Error: 500, boom".to_string()]);
    }

    #[tokio::test]
    async fn test_process_turn_non_200_success_is_faulted() {
        let fixture = processor(201, r#"{"output":"hi"}"#);
        let mut store = ConversationStore::new();

        let actual = submit(&fixture, &mut store, "hello").await.unwrap();

        assert!(!actual.is_answered());
    }

    #[tokio::test]
    async fn test_process_turn_non_json_success_is_faulted() {
        let fixture = processor(200, "<html>oops</html>");
        let mut store = ConversationStore::new();

        submit(&fixture, &mut store, "hello").await;

        assert_eq!(store.assistant_turns(), &["Error: 200, <html>oops</html>".to_string()]);
    }

    #[tokio::test]
    async fn test_process_turn_transport_failure_is_recorded_as_reply() {
        let endpoint = CompletionClient::new(Url::parse("http://127.0.0.1:1/").unwrap(), "secret");
        let fixture = TurnProcessor::new("You are a mentor.", 100, 0.5, endpoint);
        let mut store = ConversationStore::new();

        let actual = submit(&fixture, &mut store, "hello").await.unwrap();

        assert!(matches!(actual, TurnOutcome::Faulted { status: None, .. }));
        assert_eq!(store.user_turns().len(), 1);
        assert!(store.assistant_turns()[0].starts_with("Error: request failed, "));
    }

    #[tokio::test]
    async fn test_process_turn_blank_input_is_ignored() {
        let fixture = processor(200, r#"{"output":"hi"}"#);
        let mut store = ConversationStore::new();

        assert_eq!(submit(&fixture, &mut store, "").await, None);
        assert_eq!(submit(&fixture, &mut store, "   \t").await, None);

        assert!(store.is_empty());
        assert_eq!(store.take_pending(), None);
        assert!(fixture.endpoint.requests().is_empty());
    }

    #[tokio::test]
    async fn test_process_turn_without_pending_is_noop() {
        let fixture = processor(200, r#"{"output":"hi"}"#);
        let mut store = ConversationStore::new();

        assert_eq!(fixture.process_turn(&mut store).await, None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_process_turn_sends_only_latest_message() {
        let fixture = processor(200, r#"{"output":"ok"}"#);
        let mut store = ConversationStore::new();

        for text in ["first", "second", "third"] {
            submit(&fixture, &mut store, text).await;
            assert_eq!(store.user_turns().len(), store.assistant_turns().len());
        }

        let actual: Vec<String> = fixture.endpoint.requests().into_iter().map(|r| r.input).collect();
        assert_eq!(actual, vec!["first", "second", "third"]);
    }
}
