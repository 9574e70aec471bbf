//! Rapport application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize logging and open the SQLite database
//! 3. Dispatch to the ingest, tables, or chat command

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use rapport_chat::{
    ChatError, ChatResponder, ConversationMessage, LlmClient, MockLlmClient, StorageDataProvider,
};
use rapport_core::config::{ChatConfig, IngestConfig, RapportConfig};
use rapport_ingest::{IngestEngine, IngestFormat, TableMetadata};
use rapport_storage::{Database, TableStats};

use crate::cli::{CliArgs, Command};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config = RapportConfig::load_or_default(&config_file);

    // Logs go to stderr so command output on stdout stays machine readable.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(path = %config_file.display(), "Configuration loaded");

    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db = Arc::new(Database::new(&data_dir.join("rapport.db"))?);

    match args.command {
        Command::Ingest {
            file,
            table,
            format,
        } => {
            let metadata = run_ingest(db, config.ingest, &file, table.as_deref(), format)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Tables { json } => run_tables(db, json)?,
        Command::Chat { message } => run_chat(db, config.chat, message).await?,
    }

    Ok(())
}

fn run_ingest(
    db: Arc<Database>,
    config: IngestConfig,
    file: &Path,
    table: Option<&str>,
    format: Option<IngestFormat>,
) -> AppResult<TableMetadata> {
    let engine = IngestEngine::new(db, config);

    let metadata = match format {
        Some(format) => engine.ingest_file_as(file, table, format)?,
        None => engine.ingest_file(file, table)?,
    };

    for warning in &metadata.warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(metadata)
}

fn run_tables(db: Arc<Database>, json: bool) -> AppResult<()> {
    let registry = TableStats::new(db).registry()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("No tables ingested yet.");
        return Ok(());
    }

    println!(
        "{:<32} {:<6} {:>8} {:>8}  {}",
        "TABLE", "FORMAT", "ROWS", "COLUMNS", "INGESTED"
    );
    for entry in &registry {
        println!(
            "{:<32} {:<6} {:>8} {:>8}  {}",
            entry.table_name,
            entry.source_format,
            entry.row_count,
            entry.column_count,
            entry.ingested_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn run_chat(db: Arc<Database>, config: ChatConfig, message: Option<String>) -> AppResult<()> {
    let system_prompt = config.system_prompt.clone();
    let responder = ChatResponder::new(config, Arc::new(StorageDataProvider::new(db)));
    let client = MockLlmClient::new(responder);

    if !client.health_check().await? {
        return Err(Box::new(ChatError::LlmError(format!(
            "model {} is not reachable",
            client.model()
        ))));
    }
    let info = client.preload().await?;
    tracing::info!(model = %info.name, context_length = info.context_length, "Chat model ready");

    if let Some(message) = message {
        let reply = ask(&client, &system_prompt, &message).await?;
        println!("{}", reply);
        return Ok(());
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Ask about your contacts. /history shows tool calls, /clear resets, /quit exits.\n> ")
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "/quit" | "/exit" => break,
            "/clear" => {
                client.with_responder(|r| r.history_mut().clear())?;
                stdout.write_all(b"History cleared.\n").await?;
            }
            "/history" => {
                let calls = client.with_responder(|r| r.get_tool_call_history().to_vec())?;
                let text = serde_json::to_string_pretty(&calls)?;
                stdout.write_all(text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            _ => match ask(&client, &system_prompt, line).await {
                Ok(reply) => {
                    stdout.write_all(reply.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
                Err(ChatError::EmptyMessage) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Chat message rejected");
                    stdout.write_all(format!("error: {}\n", e).as_bytes()).await?;
                }
            },
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Send the stored history plus `message` to the model.
async fn ask(client: &MockLlmClient, system_prompt: &str, message: &str) -> Result<String, ChatError> {
    let mut messages = client.with_responder(|r| r.history().get_for_llm(Some(system_prompt)))?;
    messages.push(ConversationMessage::user(message));
    client.complete(&messages).await
}
