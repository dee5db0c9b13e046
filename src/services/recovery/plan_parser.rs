//! Plan Parsing
//!
//! Recovery followed by typed deserialisation into a `Plan`.

use thiserror::Error;

use super::json_recovery::{recover_json_detailed, MalformedResponseError, DEFAULT_PREVIEW_CHARS};
use crate::models::plan::Plan;

#[derive(Error, Debug)]
pub enum PlanParseError {
    #[error(transparent)]
    Malformed(#[from] MalformedResponseError),

    /// JSON was recovered but does not have the plan shape
    #[error("Plan schema mismatch: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("Plan has no steps")]
    EmptyWhiteboard,
}

/// Recover and validate a plan from finished generation text.
pub fn parse_plan(text: &str) -> Result<Plan, PlanParseError> {
    parse_plan_with_preview(text, DEFAULT_PREVIEW_CHARS)
}

/// Like [`parse_plan`], with a custom error preview length.
pub fn parse_plan_with_preview(text: &str, preview_chars: usize) -> Result<Plan, PlanParseError> {
    let recovered = recover_json_detailed(text, preview_chars)?;
    let plan: Plan = serde_json::from_value(recovered.value)?;

    if plan.whiteboard.is_empty() {
        return Err(PlanParseError::EmptyWhiteboard);
    }

    let dangling = plan.dangling_references();
    if !dangling.is_empty() {
        let ids: Vec<_> = dangling
            .iter()
            .map(|d| format!("{}@{}", d.id, d.step_index))
            .collect();
        tracing::warn!(count = dangling.len(), ids = ?ids, "plan: unresolved element references");
    }

    tracing::info!(
        steps = plan.whiteboard.len(),
        stage = %recovered.stage,
        "plan: parsed"
    );
    Ok(plan)
}
