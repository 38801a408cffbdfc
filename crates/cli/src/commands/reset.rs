//! Password-reset commands.

use tracing::info;
use wonder_core::ResetRequestId;
use wonder_state::AppContext;

use super::{CommandError, CommandResult};

/// File a reset request for the signed-in customer.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` when nobody is signed in,
/// `StateError::Rejected` if a request is already pending, or a store error.
pub fn submit(ctx: &AppContext) -> CommandResult {
    let user = ctx
        .identity()
        .current_user()?
        .ok_or_else(|| CommandError::InvalidArgument("sign in before requesting a reset".to_owned()))?;
    let request = ctx.password_resets().submit(&user)?;
    info!(id = %request.id, email = %request.email, "Reset requested");
    Ok(())
}

/// Mark a request handled.
///
/// # Errors
///
/// Returns `StateError::NotFound` for an unknown request, or a store error.
pub fn resolve(ctx: &AppContext, id: ResetRequestId) -> CommandResult {
    let request = ctx.password_resets().resolve(id)?;
    info!(id = %request.id, email = %request.email, "Reset resolved");
    Ok(())
}

/// Print pending requests oldest first.
///
/// # Errors
///
/// Returns an error if the collection cannot be read.
pub fn list(ctx: &AppContext) -> CommandResult {
    let pending = ctx.password_resets().pending()?;
    if pending.is_empty() {
        info!("No pending reset requests");
    }
    for r in &pending {
        info!(id = %r.id, email = %r.email, name = %r.user_name, at = %r.requested_at, "Pending");
    }
    Ok(())
}
