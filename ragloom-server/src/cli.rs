//! Command-line adapter.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::{Stream, StreamExt};
use ragloom_graph::GraphError;
use ragloom_rag::Source;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::app::AppState;
use crate::config::DEFAULT_CONFIG_FILE;
use crate::context::{SharedContext, openai_factory};
use crate::error::{Result, ServerError};
use crate::http::{ServerConfig, run_server};

#[derive(Debug, Parser)]
#[command(name = "ragloom")]
#[command(about = "Retrieval-augmented question answering over your documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file (created if missing)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Load, split, embed and index a text file
    Ingest {
        path: PathBuf,
    },

    /// Answer one question; reads it from stdin when omitted
    Ask {
        question: Option<String>,
    },

    /// Answer questions interactively until EOF
    Chat,
}

/// Read lines until a blank line or EOF and join them with `\n`.
///
/// Returns `None` at EOF when nothing was read.
pub async fn read_multiline<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            if lines.is_empty() {
                return Ok(None);
            }
            break;
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim().is_empty() {
            break;
        }
        lines.push(trimmed.to_string());
    }
    Ok(Some(lines.join("\n")))
}

/// Write fragments as they arrive and return the full answer.
///
/// Leading newlines are dropped from the first fragment only. The output
/// always ends with a newline, even when the stream fails part way.
pub async fn print_fragments<S, W>(fragments: S, out: &mut W) -> Result<String>
where
    S: Stream<Item = ragloom_graph::Result<String>>,
    W: AsyncWrite + Unpin,
{
    let mut fragments = std::pin::pin!(fragments);
    let mut answer = String::new();
    let mut first = true;
    while let Some(fragment) = fragments.next().await {
        let fragment = match fragment {
            Ok(fragment) => fragment,
            Err(e) => {
                out.write_all(b"\n").await?;
                out.flush().await?;
                return Err(e.into());
            }
        };
        let text = if first { fragment.trim_start_matches('\n') } else { fragment.as_str() };
        first = false;
        out.write_all(text.as_bytes()).await?;
        out.flush().await?;
        answer.push_str(text);
    }
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(answer)
}

/// Stream one answer to stdout and record the turn. Ctrl-C cancels the
/// generation.
async fn ask(state: &AppState, question: &str) -> Result<()> {
    let graph = state.retrieval_graph().await?;
    let history = state.history.snapshot().await;
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let mut stdout = tokio::io::stdout();
    let fragments = graph.fragments_with_history(question, &history, cancel);
    let result = print_fragments(fragments, &mut stdout).await;
    watcher.abort();
    state.history.append(question, result?).await;
    Ok(())
}

async fn chat(state: &AppState) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nQuestion (blank line to send, EOF to quit):\n").await?;
        stdout.flush().await?;
        let Some(question) = read_multiline(&mut stdin).await? else {
            return Ok(());
        };
        if question.trim().is_empty() {
            continue;
        }
        match ask(state, &question).await {
            Ok(()) => {}
            Err(ServerError::Graph(GraphError::Cancelled)) => {
                stdout.write_all(b"[cancelled]\n").await?;
            }
            Err(e) => {
                warn!(error = %e, "question failed");
                stdout.write_all(format!("Error: {e}\n").as_bytes()).await?;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let context = Arc::new(SharedContext::load(cli.config.clone(), openai_factory()).await?);
    let state = AppState::from_context(context).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(state, ServerConfig { host, port }, shutdown_signal()).await?;
        }
        Commands::Ingest { path } => {
            let ids = state.ingest(&Source::Path(path.clone())).await?;
            println!("Ingested {} chunks from {}", ids.len(), path.display());
        }
        Commands::Ask { question } => {
            let question = match question {
                Some(question) => question,
                None => {
                    let mut stdin = BufReader::new(tokio::io::stdin());
                    read_multiline(&mut stdin).await?.unwrap_or_default()
                }
            };
            if question.trim().is_empty() {
                anyhow::bail!("no question given");
            }
            state.prepare().await?;
            ask(&state, &question).await?;
        }
        Commands::Chat => {
            state.prepare().await?;
            chat(&state).await?;
        }
    }
    Ok(())
}
