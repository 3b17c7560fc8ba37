//! Sequential lifecycle engine.
//!
//! Applies one start/stop operation at a time to a fixed selection of
//! pipelines, records a per-item status log, and emits events for
//! presentation layers. Per-item failures never abort the run.

use crate::model::{DesiredAction, Pipeline, RunEvent, RunSummary, StatusEntry, StatusState};
use crate::registry::RegistryClient;
use anyhow::Result;
use tokio::sync::mpsc;
use tracing::warn;

pub struct LifecycleEngine {
    client: RegistryClient,
    selection: Vec<Pipeline>,
    action: DesiredAction,
}

impl LifecycleEngine {
    /// `selection` is fixed for the run's duration; the engine iterates it by
    /// index and never changes its membership.
    pub fn new(client: RegistryClient, selection: Vec<Pipeline>, action: DesiredAction) -> Self {
        Self {
            client,
            selection,
            action,
        }
    }

    /// Drive every selected pipeline through the desired transition, index 0
    /// first, with at most one request in flight. After the final item
    /// resolves the pipeline collection is re-fetched once so displayed
    /// running flags reflect the registry's view.
    pub async fn run(self, event_tx: mpsc::UnboundedSender<RunEvent>) -> Result<RunSummary> {
        let mut entries: Vec<StatusEntry> = Vec::with_capacity(self.selection.len());

        for (index, pipeline) in self.selection.iter().enumerate() {
            entries.push(StatusEntry {
                name: pipeline.name.clone(),
                index,
                status: StatusState::Waiting,
            });
            let _ = event_tx.send(RunEvent::ItemStarted {
                index,
                name: pipeline.name.clone(),
            });

            // Transport failures and server-side rejections land in the same
            // terminal status; the distinction only survives in the logs.
            let status = match self.client.apply_action(&pipeline.id, self.action).await {
                Ok(op) if op.success => StatusState::Success,
                Ok(op) => {
                    warn!(
                        pipeline = %pipeline.name,
                        message = op.message.as_deref().unwrap_or("-"),
                        "registry rejected operation"
                    );
                    StatusState::Error
                }
                Err(err) => {
                    warn!(pipeline = %pipeline.name, %err, "operation failed");
                    StatusState::Error
                }
            };
            entries[index].status = status;
            let _ = event_tx.send(RunEvent::ItemResolved { index, status });
        }

        // An empty selection never touched the registry, so there is nothing
        // to refresh either.
        let refreshed = if entries.is_empty() {
            None
        } else {
            match self.client.fetch_pipelines().await {
                Ok(pipelines) => Some(pipelines),
                Err(err) => {
                    warn!(%err, "pipeline refresh after run failed");
                    None
                }
            }
        };

        let succeeded = entries
            .iter()
            .filter(|e| e.status == StatusState::Success)
            .count();
        let failed = entries.len() - succeeded;
        let summary = RunSummary {
            timestamp_utc: RunSummary::timestamp_now(),
            action: self.action,
            entries,
            succeeded,
            failed,
            refreshed,
        };
        let _ = event_tx.send(RunEvent::RunCompleted {
            summary: Box::new(summary.clone()),
        });
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunConfig;

    fn pipeline(id: &str, running: bool) -> Pipeline {
        Pipeline {
            id: id.into(),
            name: format!("pipeline {id}"),
            running,
            categories: Vec::new(),
        }
    }

    fn client_for(base_url: String) -> RegistryClient {
        RegistryClient::new(&RunConfig {
            base_url,
            action: DesiredAction::Start,
            category: String::new(),
            user_agent: "pipeline-batch-cli/test".into(),
        })
        .unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn processes_items_in_order_and_refreshes_once() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/pipelines/a/start")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/pipelines/b/start")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("GET", "/pipelines")
            .with_body(r#"[{"id":"a","name":"pipeline a","running":true}]"#)
            .expect(1)
            .create_async()
            .await;

        let engine = LifecycleEngine::new(
            client_for(server.url()),
            vec![pipeline("a", false), pipeline("b", false)],
            DesiredAction::Start,
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let summary = engine.run(tx).await.unwrap();

        assert_eq!(summary.entries.len(), 2);
        assert!(summary
            .entries
            .iter()
            .all(|e| e.status == StatusState::Success));
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.refreshed.as_ref().map(Vec::len), Some(1));
        refresh.assert_async().await;

        // Strict sequencing: each item resolves before the next one starts.
        let events = drain(&mut rx);
        assert!(matches!(events[0], RunEvent::ItemStarted { index: 0, .. }));
        assert!(matches!(events[1], RunEvent::ItemResolved { index: 0, .. }));
        assert!(matches!(events[2], RunEvent::ItemStarted { index: 1, .. }));
        assert!(matches!(events[3], RunEvent::ItemResolved { index: 1, .. }));
        assert!(matches!(events[4], RunEvent::RunCompleted { .. }));
    }

    #[tokio::test]
    async fn rejection_payload_marks_error_without_halting() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/pipelines/a/stop")
            .with_body(r#"{"success":false,"message":"nope"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/pipelines/b/stop")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/pipelines")
            .with_body("[]")
            .create_async()
            .await;

        let engine = LifecycleEngine::new(
            client_for(server.url()),
            vec![pipeline("a", true), pipeline("b", true)],
            DesiredAction::Stop,
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let summary = engine.run(tx).await.unwrap();

        assert_eq!(summary.entries[0].status, StatusState::Error);
        assert_eq!(summary.entries[1].status, StatusState::Success);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn transport_failure_is_indistinguishable_from_rejection() {
        // Nothing listens here; every request fails at the transport level.
        let engine = LifecycleEngine::new(
            client_for("http://127.0.0.1:9".into()),
            vec![pipeline("a", false), pipeline("b", false)],
            DesiredAction::Start,
        );
        let (tx, _rx) = mpsc::unbounded_channel();
        let summary = engine.run(tx).await.unwrap();

        assert_eq!(summary.entries.len(), 2);
        assert!(summary
            .entries
            .iter()
            .all(|e| e.status == StatusState::Error));
        // The refresh failed too, so there is no authoritative collection.
        assert!(summary.refreshed.is_none());
    }

    #[tokio::test]
    async fn empty_selection_is_immediately_terminal() {
        let mut server = mockito::Server::new_async().await;
        let refresh = server
            .mock("GET", "/pipelines")
            .expect(0)
            .create_async()
            .await;

        let engine =
            LifecycleEngine::new(client_for(server.url()), Vec::new(), DesiredAction::Start);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let summary = engine.run(tx).await.unwrap();

        assert!(summary.entries.is_empty());
        assert!(summary.refreshed.is_none());
        refresh.assert_async().await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RunEvent::RunCompleted { .. }));
    }
}
