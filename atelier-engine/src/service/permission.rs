//! Permission gate
//!
//! Pure predicates over the live permission table, recomputed from the store
//! on every call and never cached, so permission edits take effect on the
//! very next transition attempt. Elevated roles bypass step-level checks but not
//! stage visibility. Step checks are made against the step being departed.

use atelier_core::domain::permission::{Capability, RolePermission};

use super::{EngineContext, EngineError, load_permission_table};
use crate::store::{self, PERMISSIONS_DOC, Store, collections};

/// May `role` transition work out of `step_id`? Unknown roles are denied.
pub async fn can_transition(
    store: &dyn Store,
    role: &str,
    step_id: &str,
) -> Result<bool, EngineError> {
    let table = load_permission_table(store).await?;
    Ok(table
        .role(role)
        .map(|p| p.can_act_on(step_id))
        .unwrap_or(false))
}

/// May `role` see steps grouped under `stage`? Elevation does not bypass this.
pub async fn can_view_stage(
    store: &dyn Store,
    role: &str,
    stage: u32,
) -> Result<bool, EngineError> {
    let table = load_permission_table(store).await?;
    Ok(table
        .role(role)
        .map(|p| p.viewable_stages.contains(&stage))
        .unwrap_or(false))
}

/// Single capability lookup backed by one permission record read.
pub async fn has_capability(
    store: &dyn Store,
    role: &str,
    capability: Capability,
) -> Result<bool, EngineError> {
    let table = load_permission_table(store).await?;
    Ok(table
        .role(role)
        .map(|p| p.has_capability(capability))
        .unwrap_or(false))
}

/// Gate a transition out of `step_id` for the acting session.
pub async fn require_transition(ctx: &EngineContext, step_id: &str) -> Result<(), EngineError> {
    if can_transition(ctx.store.as_ref(), &ctx.session.role, step_id).await? {
        Ok(())
    } else {
        Err(EngineError::PermissionDenied(format!(
            "role {} may not act on step {step_id}",
            ctx.session.role
        )))
    }
}

pub async fn require_capability(
    ctx: &EngineContext,
    capability: Capability,
) -> Result<(), EngineError> {
    if has_capability(ctx.store.as_ref(), &ctx.session.role, capability).await? {
        Ok(())
    } else {
        Err(EngineError::PermissionDenied(format!(
            "role {} lacks capability {capability:?}",
            ctx.session.role
        )))
    }
}

/// Create or replace one role's permission record.
pub async fn set_role_permission(
    ctx: &EngineContext,
    permission: RolePermission,
) -> Result<(), EngineError> {
    require_capability(ctx, Capability::ManagePermissions).await?;

    let mut table = load_permission_table(ctx.store.as_ref()).await?;
    table.roles.insert(permission.role.clone(), permission);
    store::save(
        ctx.store.as_ref(),
        collections::CONFIG,
        PERMISSIONS_DOC,
        &table,
    )
    .await?;

    tracing::info!(role = ?ctx.session.role, "permission table updated");
    Ok(())
}
