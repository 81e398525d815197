mod cli;
mod completion_client;
mod config;

use std::io;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use eyre::{Result, WrapErr};
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::ChatContext;
use crate::config::{ChatConfig, ConfigOverrides};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Send a single message and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    endpoint: EndpointArgs,
}

/// Settings that override the MENTOR_* environment variables.
#[derive(Args, Debug, Default)]
struct EndpointArgs {
    /// Completion endpoint URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Maximum number of tokens in a reply
    #[arg(long, global = true)]
    max_tokens: Option<u32>,

    /// Sampling temperature (0 to 2)
    #[arg(long, global = true)]
    temperature: Option<f64>,

    /// Persona text sent as the system message
    #[arg(long, global = true)]
    system_prompt: Option<String>,
}

impl From<EndpointArgs> for ConfigOverrides {
    fn from(args: EndpointArgs) -> Self {
        Self {
            api_url: args.api_url,
            max_tokens: args.max_tokens,
            temperature: args.temperature,
            system_prompt: args.system_prompt,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        /// Send a single message and exit
        #[arg(short, long)]
        input: Option<String>,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let (input, verbose) = match cli.command {
        Some(Commands::Chat { input, verbose }) => (input.or(cli.input), verbose || cli.verbose),
        None => (cli.input, cli.verbose),
    };

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).wrap_err("failed to set tracing subscriber")?;

    let config = match ChatConfig::load(cli.endpoint.into()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    debug!("Loaded configuration: {:?}", config);

    info!("Starting AI Mentor chat against {}", config.api_url);

    let interactive = input.is_none();
    let mut chat_context = ChatContext::from_config(Box::new(io::stdout()), input, interactive, &config);
    chat_context.run().await
}
