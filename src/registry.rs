//! HTTP client for the pipeline registry's management API.
//!
//! The registry exposes three operations this tool consumes: list pipelines,
//! start one, stop one. Start/stop return a `{success, message?}` payload;
//! `success: false` is a server-side rejection and is reported separately
//! from transport failures so callers can log the distinction, even though
//! the run folds both into the same error status.

use crate::model::{DesiredAction, Pipeline, RunConfig};
use tracing::debug;

/// Payload returned by the registry for a start/stop operation.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OperationStatus {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Build a client from the run configuration. No per-request timeout is
    /// set: a hung registry stalls the run rather than spuriously failing an
    /// operation that may still land server-side.
    pub fn new(cfg: &RunConfig) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full pipeline collection from the source of truth.
    pub async fn fetch_pipelines(&self) -> Result<Vec<Pipeline>, RegistryError> {
        let url = format!("{}/pipelines", self.base_url);
        let pipelines: Vec<Pipeline> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(count = pipelines.len(), "fetched pipeline collection");
        Ok(pipelines)
    }

    /// Apply the desired lifecycle action to a single pipeline and return the
    /// registry's verdict.
    pub async fn apply_action(
        &self,
        id: &str,
        action: DesiredAction,
    ) -> Result<OperationStatus, RegistryError> {
        let url = format!("{}/pipelines/{}/{}", self.base_url, id, action.verb());
        let status: OperationStatus = self
            .http
            .post(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!(id, verb = action.verb(), success = status.success, "operation resolved");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(base_url: String) -> RunConfig {
        RunConfig {
            base_url,
            action: DesiredAction::Start,
            category: String::new(),
            user_agent: "pipeline-batch-cli/test".into(),
        }
    }

    #[tokio::test]
    async fn apply_action_parses_success_payload() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/pipelines/p1/start")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let client = RegistryClient::new(&test_config(server.url())).unwrap();
        let status = client
            .apply_action("p1", DesiredAction::Start)
            .await
            .unwrap();
        assert!(status.success);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn apply_action_surfaces_rejection_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/pipelines/p1/stop")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":false,"message":"element not reachable"}"#)
            .create_async()
            .await;

        let client = RegistryClient::new(&test_config(server.url())).unwrap();
        let status = client
            .apply_action("p1", DesiredAction::Stop)
            .await
            .unwrap();
        assert!(!status.success);
        assert_eq!(status.message.as_deref(), Some("element not reachable"));
    }

    #[tokio::test]
    async fn apply_action_maps_http_error_to_transport() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/pipelines/p1/start")
            .with_status(500)
            .create_async()
            .await;

        let client = RegistryClient::new(&test_config(server.url())).unwrap();
        let err = client.apply_action("p1", DesiredAction::Start).await;
        assert!(matches!(err, Err(RegistryError::Transport(_))));
    }

    #[tokio::test]
    async fn fetch_pipelines_decodes_collection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pipelines")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"_id":"a","name":"A","running":true,"pipelineCategories":["prod"]},
                    {"_id":"b","name":"B","running":false}]"#,
            )
            .create_async()
            .await;

        let client = RegistryClient::new(&test_config(server.url())).unwrap();
        let pipelines = client.fetch_pipelines().await.unwrap();
        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].id, "a");
        assert!(!pipelines[1].running);
    }
}
