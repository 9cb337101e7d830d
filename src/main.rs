use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

use garden_bot::chat::TurnOutcome;
use garden_bot::core::config::AppPaths;
use garden_bot::core::logging;
use garden_bot::state::AppState;
use garden_bot::webhook::SkillRequest;

#[derive(Parser)]
#[command(name = "garden-bot", version, about = "Knowledge-base chat and skill webhook bot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk the corpus file and store its embeddings.
    Ingest {
        /// Drop the collection's passages before ingesting.
        #[arg(long)]
        rebuild: bool,
    },
    /// Ask the knowledge base questions in the terminal.
    Chat,
    /// Answer one skill request and post the answer to its callback URL.
    Webhook {
        /// Request JSON file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths).context("Failed to load configuration")?;

    match cli.command {
        Command::Ingest { rebuild } => ingest(&state, rebuild).await,
        Command::Chat => chat(&state).await,
        Command::Webhook { request } => webhook(&state, request).await,
    }
}

async fn ingest(state: &AppState, rebuild: bool) -> anyhow::Result<()> {
    let report = state.ingest(rebuild).await.context("Ingest failed")?;
    println!(
        "{} chunks, {} new passages, {} in knowledge base",
        report.chunks, report.inserted, report.total
    );
    Ok(())
}

async fn chat(state: &AppState) -> anyhow::Result<()> {
    let mut session = state
        .chat_session()
        .await
        .context("Failed to start chat session")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Ask a question, or type `quit` to exit.");
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        if !line.trim().is_empty() && !line.trim().eq_ignore_ascii_case("quit") {
            println!("thinking...");
        }

        match session.submit(&line).await {
            TurnOutcome::Reply(answer) | TurnOutcome::Failed(answer) => println!("bot> {}", answer),
            TurnOutcome::Skipped => {}
            TurnOutcome::Quit => break,
        }
    }

    Ok(())
}

async fn webhook(state: &AppState, request: PathBuf) -> anyhow::Result<()> {
    let body = if request.as_os_str() == "-" {
        let mut body = String::new();
        tokio::io::stdin()
            .read_to_string(&mut body)
            .await
            .context("Failed to read request from stdin")?;
        body
    } else {
        tokio::fs::read_to_string(&request)
            .await
            .with_context(|| format!("Failed to read {}", request.display()))?
    };

    let request = SkillRequest::from_json(&body).context("Invalid skill request")?;
    let responder = state
        .webhook_responder()
        .context("Failed to build webhook responder")?;

    let task = responder.handle(request).await?;
    println!("{}", task.answer());
    task.wait().await;

    Ok(())
}
