use crate::engine::LifecycleEngine;
use crate::model::{DesiredAction, RunConfig, RunEvent, RunSummary, StatusState};
use crate::orchestrator::DialogFlow;
use crate::registry::RegistryClient;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ActionArg {
    /// Start every pipeline that is currently stopped
    Start,
    /// Stop every pipeline that is currently running
    Stop,
}

impl From<ActionArg> for DesiredAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Start => DesiredAction::Start,
            ActionArg::Stop => DesiredAction::Stop,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "pipeline-batch",
    version,
    about = "Bulk start/stop stream-processing pipelines with optional TUI"
)]
pub struct Cli {
    /// Lifecycle action to apply to the filtered pipelines
    #[arg(value_enum)]
    pub action: ActionArg,

    /// Base URL of the pipeline registry's management API
    #[arg(long, default_value = "http://localhost:8082")]
    pub base_url: String,

    /// Only touch pipelines carrying this category label (empty = all)
    #[arg(long, default_value = "")]
    pub category: String,

    /// Print the run summary as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text progress and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Skip the preview confirmation
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        base_url: args.base_url.clone(),
        action: args.action.into(),
        category: args.category.clone(),
        user_agent: format!("pipeline-batch-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json {
        return run_json(args).await;
    }

    if !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    run_text(args).await
}

/// Run the engine without progress output and print the summary as JSON.
/// Exit code is 0 even on partial failure; callers inspect the entries.
async fn run_json(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let client = RegistryClient::new(&cfg).context("build registry client")?;
    let pipelines = client
        .fetch_pipelines()
        .await
        .context("fetch pipeline collection")?;
    let dialog = DialogFlow::new(&pipelines, cfg.action, &cfg.category);

    let summary = if dialog.selection().is_empty() {
        RunSummary {
            timestamp_utc: RunSummary::timestamp_now(),
            action: cfg.action,
            entries: Vec::new(),
            succeeded: 0,
            failed: 0,
            refreshed: None,
        }
    } else {
        let engine = LifecycleEngine::new(client, dialog.selection().to_vec(), cfg.action);
        // No consumer for progress events in JSON mode.
        let (evt_tx, _) = mpsc::unbounded_channel::<RunEvent>();
        engine.run(evt_tx).await.context("bulk operation failed")?
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Ask for confirmation on the preview page. Reads one line from stdin off
/// the async runtime.
async fn confirm_preview() -> Result<bool> {
    let line = tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        std::io::stdin().read_line(&mut input).map(|_| input)
    })
    .await
    .context("stdin reader task failed")??;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

async fn run_text(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let client = RegistryClient::new(&cfg).context("build registry client")?;
    let pipelines = client
        .fetch_pipelines()
        .await
        .context("fetch pipeline collection")?;
    let mut dialog = DialogFlow::new(&pipelines, cfg.action, &cfg.category);

    let (out_tx, out_handle) = spawn_output_writer();

    if dialog.selection().is_empty() {
        let _ = out_tx.send(OutputLine::Stdout(
            "Nothing to do: all pipelines already in the desired state.".to_string(),
        ));
        drop(out_tx);
        let _ = out_handle.await;
        return Ok(());
    }

    let _ = out_tx.send(OutputLine::Stderr(format!(
        "About to {} {} pipeline(s):",
        cfg.action.verb(),
        dialog.selection().len()
    )));
    for p in dialog.selection() {
        let _ = out_tx.send(OutputLine::Stderr(format!("  - {}", p.name)));
    }

    if !args.yes {
        let _ = out_tx.send(OutputLine::Stderr("Proceed? [y/N] ".to_string()));
        if !confirm_preview().await? {
            let _ = out_tx.send(OutputLine::Stderr("Aborted.".to_string()));
            drop(out_tx);
            let _ = out_handle.await;
            return Ok(());
        }
    }

    let _ = dialog.advance();
    let total = dialog.selection().len();
    let engine = LifecycleEngine::new(client, dialog.selection().to_vec(), cfg.action);
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<RunEvent>();
    let handle = tokio::spawn(async move { engine.run(evt_tx).await });

    // The channel closes when the engine task finishes.
    while let Some(ev) = evt_rx.recv().await {
        match &ev {
            RunEvent::ItemStarted { index, name } => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "[{}/{}] {} {} ...",
                    index + 1,
                    total,
                    cfg.action.verb(),
                    name
                )));
            }
            RunEvent::ItemResolved { status, .. } => {
                let mark = match status {
                    StatusState::Success => "ok",
                    StatusState::Error => "FAILED",
                    StatusState::Waiting => "pending",
                };
                let _ = out_tx.send(OutputLine::Stderr(format!("      {}", mark)));
            }
            RunEvent::RunCompleted { .. } => {}
        }
        dialog.apply(&ev);
    }

    let summary = handle
        .await
        .context("engine task failed")?
        .context("bulk operation failed")?;

    for line in crate::summary::build_text_summary(&summary).lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
