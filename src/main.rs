use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scribe_gateway::db::{self, HistoryRepo};
use scribe_gateway::{
    ChatClient, Config, ConversationStore, FileLocator, IntentRouter, RequestProcessor,
    SessionManager,
};

/// Scribe - Voice-assistant backend for file reading and summarization
#[derive(Parser)]
#[command(name = "scribe", version, about)]
struct Cli {
    /// Identity to attribute utterances to
    #[arg(short, long, env = "SCRIBE_IDENTITY", default_value = "local")]
    identity: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a single utterance and print the response
    Ask {
        /// The utterance text
        text: String,
    },
    /// Interactive loop reading utterances from stdin
    Repl,
    /// Show the most recent persisted exchanges for the identity
    History {
        /// Number of exchanges to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "scribe_gateway=info,scribe=info",
        1 => "scribe_gateway=debug,scribe=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let pool = db::init(config.db_path())?;
    let repo = HistoryRepo::new(pool);
    let store: Arc<dyn ConversationStore> = Arc::new(repo.clone());

    match cli.command {
        Command::History { count } => {
            for pair in repo.last_n(&cli.identity, count)? {
                println!("[{}]", pair.timestamp.to_rfc3339());
                println!("  user:  {}", pair.user);
                println!("  agent: {}", pair.agent);
            }
            return Ok(());
        }
        Command::Ask { ref text } => {
            let sessions = build_sessions(&config, Arc::clone(&store))?;
            let response = sessions.on_user_utterance(&cli.identity, text).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            sessions.on_session_end(&cli.identity).await?;
        }
        Command::Repl => {
            let sessions = build_sessions(&config, Arc::clone(&store))?;
            let stdin = std::io::stdin();
            loop {
                print!("> ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if stdin.read_line(&mut line)? == 0 {
                    break;
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                match sessions.on_user_utterance(&cli.identity, line).await {
                    Ok(response) => println!("{}", response.message),
                    Err(e) => eprintln!("storage error: {e}"),
                }
            }
            sessions.on_session_end(&cli.identity).await?;
        }
    }

    Ok(())
}

fn build_sessions(
    config: &Config,
    store: Arc<dyn ConversationStore>,
) -> anyhow::Result<SessionManager> {
    let api_key = config
        .llm
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is required"))?;

    let chat = Arc::new(ChatClient::new(
        api_key,
        config.llm.model.clone(),
        config.llm.base_url.clone(),
    )?);

    let router = IntentRouter::new(chat.clone());
    let locator = FileLocator::new(&config.search_root);
    let processor = RequestProcessor::new(router, locator, chat, config.processor.clone());

    Ok(SessionManager::new(
        processor,
        store,
        config.flush_threshold,
        config.context_window,
    ))
}
