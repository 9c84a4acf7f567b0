use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context as _;
use chatline_adapter::prelude::*;
use clap::Parser as _;
use futures::StreamExt as _;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{debug, warn};

mod cli;
mod config;
mod observability;
mod render;

use cli::{Cli, ReplInput};
use render::{RenderOp, TranscriptRenderer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    observability::init_observability();
    let cli = Cli::parse();

    let client_config = config::client_config(&cli)?;
    let store = Arc::new(FileSessionStore::new(&cli.session_file));
    let adapter = ChatAdapter::new(client_config, store).context("failed to build chat adapter")?;

    if cli.health {
        let health = adapter.health().await.context("health probe failed")?;
        println!("{}", health.status);
        return Ok(());
    }

    if let Some(message) = cli.message.as_deref() {
        let history = vec![Message::user(message)];
        run_turn(&adapter, &history, cli.thread_id.as_deref()).await?;
        return Ok(());
    }

    repl(&adapter, cli.thread_id.as_deref()).await
}

async fn repl(adapter: &ChatAdapter, thread_id: Option<&str>) -> anyhow::Result<()> {
    eprintln!(
        "chatline: {} ({} mode). /reset clears history, /quit exits, Ctrl-C stops a reply.",
        adapter.config().base_url,
        adapter.config().mode
    );
    let mut history: Vec<Message> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let text = match ReplInput::parse(&line) {
            ReplInput::Quit => break,
            ReplInput::Reset => {
                history.clear();
                eprintln!("history cleared");
                continue;
            }
            ReplInput::Skip => continue,
            ReplInput::Send(text) => text,
        };

        history.push(Message::user(text));
        match run_turn(adapter, &history, thread_id).await {
            Ok(Some(reply)) => history.push(Message::assistant(reply)),
            Ok(None) => {}
            Err(err) => eprintln!("error: {err:#}"),
        }
    }
    Ok(())
}

/// Runs one turn, rendering snapshots as they arrive.
///
/// Returns the final reply text, or `None` when the run was cancelled before
/// producing output.
async fn run_turn(
    adapter: &ChatAdapter,
    history: &[Message],
    thread_id: Option<&str>,
) -> anyhow::Result<Option<String>> {
    let abort = AbortHandle::new();
    let mut run = adapter.run(history, abort.clone(), thread_id);
    debug!(run_id = %run.run_id(), "turn started");

    let mut renderer = TranscriptRenderer::new();
    let mut stdout = std::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let next = tokio::select! {
            next = run.next() => next,
            signal = &mut ctrl_c, if !abort.is_aborted() => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for Ctrl-C");
                }
                abort.abort();
                continue;
            }
        };
        let Some(snapshot) = next else {
            break;
        };
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(err) => {
                if !renderer.shown().is_empty() {
                    writeln!(stdout)?;
                }
                return Err(err.into());
            }
        };
        match renderer.update(&snapshot.as_text()) {
            RenderOp::Append(suffix) => write!(stdout, "{suffix}")?,
            RenderOp::Replace(text) => write!(stdout, "\n{text}")?,
            RenderOp::Unchanged => {}
        }
        stdout.flush()?;
    }

    if abort.is_aborted() {
        eprintln!("\n[stopped]");
    } else {
        writeln!(stdout)?;
    }
    if renderer.shown().is_empty() {
        Ok(None)
    } else {
        Ok(Some(renderer.shown().to_string()))
    }
}
