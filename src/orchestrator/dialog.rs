//! Dialog flow state machine.
//!
//! A UI-agnostic wrapper around one bulk run: a preview page listing the
//! pending selection, an installation page showing per-item status, and an
//! advance control whose label flips to "Close" once the run is terminal.
//! Presentation layers render this state and feed engine events back in; the
//! machine itself never performs I/O.

use crate::model::{DesiredAction, Pipeline, RunEvent, RunSummary, StatusEntry};
use crate::selection::select;

pub const NEXT_LABEL: &str = "Next";
pub const CLOSE_LABEL: &str = "Close";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Preview,
    Installation,
}

/// What the host should do after the advance control was activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Switch happened from preview to installation; start the engine run.
    StartRun,
    /// The dialog was already on the installation page; close it.
    Dismiss,
}

pub struct DialogFlow {
    page: Page,
    action: DesiredAction,
    selection: Vec<Pipeline>,
    status: Vec<StatusEntry>,
    running: bool,
    next_label: &'static str,
    summary: Option<RunSummary>,
}

impl DialogFlow {
    /// Compute the selection once and land on the preview page, or directly
    /// on the installation page with a "Close" label when there is nothing
    /// to do.
    pub fn new(pipelines: &[Pipeline], action: DesiredAction, category: &str) -> Self {
        let selection = select(pipelines, action, category);
        let (page, next_label) = if selection.is_empty() {
            (Page::Installation, CLOSE_LABEL)
        } else {
            (Page::Preview, NEXT_LABEL)
        };
        Self {
            page,
            action,
            selection,
            status: Vec::new(),
            running: false,
            next_label,
            summary: None,
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn action(&self) -> DesiredAction {
        self.action
    }

    /// The fixed, ordered set of pipelines this run will touch.
    pub fn selection(&self) -> &[Pipeline] {
        &self.selection
    }

    /// Append-only status log; entry `i` exists before entry `i + 1`.
    pub fn status_log(&self) -> &[StatusEntry] {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn next_label(&self) -> &'static str {
        self.next_label
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Activate the advance control. The host performs the returned action;
    /// repeated activation on the installation page keeps returning
    /// `Dismiss`.
    pub fn advance(&mut self) -> Advance {
        match self.page {
            Page::Installation => Advance::Dismiss,
            Page::Preview => {
                self.page = Page::Installation;
                self.running = true;
                Advance::StartRun
            }
        }
    }

    /// Fold an engine event into the observable run state.
    pub fn apply(&mut self, event: &RunEvent) {
        match event {
            RunEvent::ItemStarted { index, name } => {
                self.status.push(StatusEntry {
                    name: name.clone(),
                    index: *index,
                    status: crate::model::StatusState::Waiting,
                });
            }
            RunEvent::ItemResolved { index, status } => {
                if let Some(entry) = self.status.get_mut(*index) {
                    entry.status = *status;
                }
            }
            RunEvent::RunCompleted { summary } => {
                self.running = false;
                self.next_label = CLOSE_LABEL;
                self.summary = Some((**summary).clone());
            }
        }
    }
}
