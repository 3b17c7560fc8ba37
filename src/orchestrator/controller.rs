//! Run lifecycle controller.
//!
//! Owns engine task spawning on behalf of presentation layers and keeps at
//! most one run alive per dialog.

use crate::engine::LifecycleEngine;
use crate::model::{Pipeline, RunConfig, RunEvent, RunSummary};
use crate::registry::RegistryClient;
use anyhow::{Context, Result};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control the run.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// The dialog advanced from preview; dispatch the engine.
    StartRun,
    /// The dialog was dismissed.
    Quit,
}

/// React to UI commands until the dialog is dismissed. Dismissal is coarse:
/// an in-flight operation is not aborted. Quit waits for the active run to
/// finish so the outstanding request still resolves and mutates the status
/// log; those remaining events simply go unobserved.
pub(crate) async fn run_controller(
    cfg: &RunConfig,
    selection: Vec<Pipeline>,
    event_tx: UnboundedSender<RunEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut run_handle: Option<tokio::task::JoinHandle<Result<RunSummary>>> = None;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            UiCommand::StartRun => {
                if run_handle.is_some() {
                    continue;
                }
                let client = RegistryClient::new(cfg).context("build registry client")?;
                let engine = LifecycleEngine::new(client, selection.clone(), cfg.action);
                let tx = event_tx.clone();
                run_handle = Some(tokio::spawn(async move { engine.run(tx).await }));
            }
            UiCommand::Quit => break,
        }
    }

    if let Some(handle) = run_handle {
        let _ = handle.await;
    }

    Ok(())
}
