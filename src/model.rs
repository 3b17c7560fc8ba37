use serde::{Deserialize, Serialize};

/// Connection and run parameters shared by all front-ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    pub action: DesiredAction,
    /// Empty string means "no category filtering".
    pub category: String,
    pub user_agent: String,
}

/// The lifecycle transition requested for the whole batch. Chosen once per
/// run and immutable for its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredAction {
    Start,
    Stop,
}

impl DesiredAction {
    /// The running flag a pipeline has once the action succeeded.
    pub fn target_running(self) -> bool {
        matches!(self, DesiredAction::Start)
    }

    pub fn verb(self) -> &'static str {
        match self {
            DesiredAction::Start => "start",
            DesiredAction::Stop => "stop",
        }
    }
}

/// A deployed pipeline as reported by the registry. The registry only ever
/// mutates `running` server-side; this tool never updates it locally and
/// relies on the end-of-run refresh instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub running: bool,
    #[serde(default, alias = "pipelineCategories")]
    pub categories: Vec<String>,
}

/// Outcome of a single start/stop operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Waiting,
    Success,
    Error,
}

impl StatusState {
    pub fn label(self) -> &'static str {
        match self {
            StatusState::Waiting => "waiting",
            StatusState::Success => "success",
            StatusState::Error => "error",
        }
    }
}

/// Per-pipeline record within a run. One entry is appended when the
/// operation is dispatched; `status` is updated in place when it resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEntry {
    pub name: String,
    pub index: usize,
    pub status: StatusState,
}

/// Events emitted by the engine and consumed by UI/CLI layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    ItemStarted {
        index: usize,
        name: String,
    },
    ItemResolved {
        index: usize,
        status: StatusState,
    },
    RunCompleted {
        // Box to keep RunEvent size small; RunSummary carries the full log.
        summary: Box<RunSummary>,
    },
}

/// Terminal aggregate of a run. A run with errors still completes normally;
/// callers inspect `entries` to detect partial failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp_utc: String,
    pub action: DesiredAction,
    pub entries: Vec<StatusEntry>,
    pub succeeded: usize,
    pub failed: usize,
    /// Authoritative pipeline collection re-fetched after the final item
    /// resolved. `None` when the refresh itself failed or nothing ran.
    pub refreshed: Option<Vec<Pipeline>>,
}

impl RunSummary {
    pub fn timestamp_now() -> String {
        time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into())
    }
}
