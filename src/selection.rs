//! Computes which pipelines actually need the requested transition.

use crate::model::{DesiredAction, Pipeline};

/// Filter `pipelines` down to the ones whose running flag disagrees with the
/// desired action and whose categories match `category` (empty = match all).
/// Input order is preserved; an empty result means "nothing to do".
pub fn select(pipelines: &[Pipeline], action: DesiredAction, category: &str) -> Vec<Pipeline> {
    pipelines
        .iter()
        .filter(|p| p.running != action.target_running() && has_category(p, category))
        .cloned()
        .collect()
}

// The membership check is against the candidate pipeline's own categories,
// not any dialog-wide field.
fn has_category(pipeline: &Pipeline, category: &str) -> bool {
    category.is_empty() || pipeline.categories.iter().any(|c| c == category)
}
