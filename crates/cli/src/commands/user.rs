//! Identity commands: who this profile chats as.

use tracing::info;
use wonder_core::{ConversationId, Email, UserId};
use wonder_state::AppContext;
use wonder_state::models::SignedInUser;

use super::CommandResult;

/// Print the conversation id and display name in effect.
///
/// # Errors
///
/// Returns an error if the identity keys cannot be read.
pub fn whoami(ctx: &AppContext) -> CommandResult {
    let identity = ctx.identity();
    let conversation = identity.resolve()?;
    info!(
        %conversation,
        guest = conversation.is_guest(),
        name = %identity.display_name()?,
        context = %ctx.store().context(),
        "Identity"
    );
    Ok(())
}

/// Record a signed-in customer.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn sign_in(ctx: &AppContext, id: UserId, name: String, email: Email) -> CommandResult {
    let user = SignedInUser { id, name, email };
    ctx.identity().sign_in(&user)?;
    info!(conversation = %ConversationId::from_email(&user.email), "Signed in");
    Ok(())
}

/// Forget the signed-in customer.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn sign_out(ctx: &AppContext) -> CommandResult {
    ctx.identity().sign_out()?;
    Ok(())
}

/// Move a legacy guest thread onto the current identity.
///
/// # Errors
///
/// Returns an error if the chat log cannot be read or written.
pub fn adopt(ctx: &AppContext, legacy: &ConversationId) -> CommandResult {
    let moved = ctx.identity().adopt_legacy_guest(legacy)?;
    info!(%legacy, moved, "Legacy guest thread adopted");
    Ok(())
}
