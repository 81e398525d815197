pub mod conversation_state;
pub mod message;
pub mod prompt;
pub mod transcript;
pub mod turn_processor;

use std::io::Write;
use std::process::ExitCode;

use conversation_state::ConversationStore;
use eyre::Result;
use prompt::generate_prompt;
use rustyline::error::ReadlineError;
use tracing::{debug, info};
use transcript::{render_reply, render_transcript};
use turn_processor::{TurnOutcome, TurnProcessor};

use crate::completion_client::{CompletionClient, CompletionEndpoint};
use crate::config::ChatConfig;

const WELCOME_TEXT: &str = "
AI Mentor

Hi, I'm AI Mentor. Ask me anything about artificial intelligence.

/history      Show the conversation, most recent first
/help         Show the help dialogue
/quit         Quit the application
";

const HELP_TEXT: &str = "
AI Mentor

/history      Show the conversation, most recent first
/clear        Start a new conversation
/help         Show this help dialogue
/quit         Quit the application
";

pub struct ChatContext<E = CompletionClient> {
    output: Box<dyn Write>,
    input: Option<String>,
    interactive: bool,
    store: ConversationStore,
    processor: TurnProcessor<E>,
}

impl ChatContext<CompletionClient> {
    pub fn from_config(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        config: &ChatConfig,
    ) -> Self {
        let processor = TurnProcessor::from_config(config, CompletionClient::from_config(config));
        Self::new(output, input, interactive, processor)
    }
}

impl<E: CompletionEndpoint> ChatContext<E> {
    pub fn new(
        output: Box<dyn Write>,
        input: Option<String>,
        interactive: bool,
        processor: TurnProcessor<E>,
    ) -> Self {
        Self {
            output,
            input,
            interactive,
            store: ConversationStore::new(),
            processor,
        }
    }

    pub async fn run(&mut self) -> Result<ExitCode> {
        // Non-interactive mode: a single turn
        if let Some(input) = self.input.take() {
            let outcome = self.submit(&input).await?;
            return match outcome {
                Some(outcome) if !outcome.is_answered() => Ok(ExitCode::FAILURE),
                _ => Ok(ExitCode::SUCCESS),
            };
        }

        if self.interactive {
            self.print_welcome()?;
            self.run_interactive().await?;
        }

        Ok(ExitCode::SUCCESS)
    }

    fn print_welcome(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME_TEXT)?;
        Ok(())
    }

    async fn run_interactive(&mut self) -> Result<()> {
        let mut rl = prompt::rl()?;

        loop {
            let turn_number = (self.store.completed_turns() + 1).to_string();
            let prompt_text = generate_prompt(Some(&turn_number));

            match rl.readline(&prompt_text) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }

                    rl.add_history_entry(line.as_str());

                    if line.trim() == "/quit" {
                        break;
                    }

                    self.handle_input(&line).await?;
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    writeln!(self.output, "Error: {}", e)?;
                    break;
                }
            }
        }

        info!("Chat session ended after {} turns", self.store.completed_turns());
        Ok(())
    }

    async fn handle_input(&mut self, input: &str) -> Result<()> {
        match input.trim() {
            "/help" => {
                writeln!(self.output, "{}", HELP_TEXT)?;
            }
            "/history" => {
                write!(self.output, "{}", render_transcript(&self.store))?;
            }
            "/clear" => {
                if self.store.is_empty() {
                    writeln!(self.output, "Nothing to clear.")?;
                } else {
                    self.store = ConversationStore::new();
                    writeln!(self.output, "Conversation cleared.")?;
                }
            }
            _ => {
                self.submit(input).await?;
            }
        }

        Ok(())
    }

    /// Hands `input` to the processor as pending text and prints the reply.
    async fn submit(&mut self, input: &str) -> Result<Option<TurnOutcome>> {
        self.store.set_pending(input);

        let outcome = self.processor.process_turn(&mut self.store).await;
        match &outcome {
            Some(outcome) => write!(self.output, "{}", render_reply(&outcome.to_string()))?,
            None => debug!("Nothing to submit"),
        }
        self.output.flush()?;

        Ok(outcome)
    }
}
