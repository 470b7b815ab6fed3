//! Branch resolver
//!
//! Advisory catalog of non-linear transition options per step, read from the
//! data-driven branch table. Callers use it to offer and validate
//! destinations for `move_to_step`; the engine itself restricts targets only
//! through the permission gate, so a caller can jump outside the catalog.
//! That asymmetry is deliberate.

use atelier_core::domain::branch::TransitionOption;

use super::EngineContext;

/// Named transition choices when departing `step_id`; empty for linear-only
/// steps.
pub fn branch_options<'a>(ctx: &'a EngineContext, step_id: &str) -> &'a [TransitionOption] {
    ctx.tables.branch_table.options(step_id)
}

/// Does the catalog offer `target` from `step_id`? Advisory only.
pub fn is_cataloged(ctx: &EngineContext, step_id: &str, target: &str) -> bool {
    branch_options(ctx, step_id)
        .iter()
        .any(|o| o.target_step_id == target)
}
