//! Password-reset requests raised by customers and handled by staff.

use tracing::{info, instrument};
use wonder_core::{Channel, ResetRequestId};

use crate::clock::Clock;
use crate::error::{Result, StateError};
use crate::models::{Payload, PasswordResetRequest, ResetRef, SignedInUser};
use crate::notifications::NotificationDispatcher;
use crate::store::{Store, keys};

/// Reads and writes `passwordResetRequests`.
pub struct PasswordResets<'a> {
    store: &'a Store,
    clock: &'a dyn Clock,
}

impl<'a> PasswordResets<'a> {
    /// Create a new handle.
    #[must_use]
    pub const fn new(store: &'a Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// File a reset request for `user` and notify staff.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Rejected` if the same email already has a pending
    /// request, or a store error if the request could not be written.
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn submit(&self, user: &SignedInUser) -> Result<PasswordResetRequest> {
        let mut requests = self.load()?;
        if requests
            .iter()
            .any(|r| r.is_pending() && r.email == user.email)
        {
            return Err(StateError::rejected(
                "a password reset request for this email is already pending",
            ));
        }

        let id = requests
            .iter()
            .map(|r| r.id)
            .max()
            .map_or(ResetRequestId::new(1), |max| max.next());
        let request = PasswordResetRequest {
            id,
            email: user.email.clone(),
            user_name: user.name.clone(),
            user_id: user.id,
            requested_at: self.clock.now(),
            resolved: false,
            resolved_at: None,
        };
        requests.push(request.clone());
        self.store
            .save_collection(keys::PASSWORD_RESET_REQUESTS, &requests)?;
        info!(request_id = %request.id, "Password reset requested");

        NotificationDispatcher::new(self.store, self.clock).emit_best_effort(
            Channel::Admin,
            "Password Reset Request",
            &format!("{} ({}) asked for a password reset", user.name, user.email),
            Payload::PasswordReset(ResetRef {
                user_id: user.id,
                request_id: Some(request.id),
            }),
        );
        Ok(request)
    }

    /// Mark a request handled.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown request, or a store error.
    #[instrument(skip(self))]
    pub fn resolve(&self, id: ResetRequestId) -> Result<PasswordResetRequest> {
        let mut requests = self.load()?;
        let request = requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StateError::not_found("password reset request", id))?;

        if request.resolved {
            return Ok(request.clone());
        }
        request.resolved = true;
        request.resolved_at = Some(self.clock.now());
        let resolved = request.clone();

        self.store
            .save_collection(keys::PASSWORD_RESET_REQUESTS, &requests)?;
        info!("Password reset request resolved");
        Ok(resolved)
    }

    /// Unresolved requests, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn pending(&self) -> Result<Vec<PasswordResetRequest>> {
        let mut requests = self.load()?;
        requests.retain(PasswordResetRequest::is_pending);
        requests.sort_by_key(|r| (r.requested_at, r.id));
        Ok(requests)
    }

    fn load(&self) -> Result<Vec<PasswordResetRequest>> {
        Ok(self.store.load_collection(keys::PASSWORD_RESET_REQUESTS)?)
    }
}

/// Staff badge: unread admin notifications plus pending reset requests.
///
/// # Errors
///
/// Returns an error if either collection cannot be read.
pub fn admin_badge_count(store: &Store, clock: &dyn Clock) -> Result<usize> {
    let unread = NotificationDispatcher::new(store, clock).unread_count(Channel::Admin)?;
    let pending = PasswordResets::new(store, clock).pending()?.len();
    Ok(unread + pending)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use wonder_core::{Email, NotificationKind, UserId};

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{ContextId, KeyValueStore, MemoryStore};

    fn setup() -> (Store, ManualClock) {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        (
            Store::new(backend, ContextId::named("tab")),
            ManualClock::at_millis(1_700_000_000_000),
        )
    }

    fn user(email: &str) -> SignedInUser {
        SignedInUser {
            id: UserId::new(7),
            name: "Jane".to_owned(),
            email: Email::parse(email).unwrap(),
        }
    }

    #[test]
    fn test_submit_notifies_and_rejects_duplicates() {
        let (store, clock) = setup();
        let resets = PasswordResets::new(&store, &clock);

        let first = resets.submit(&user("jane@example.com")).unwrap();
        assert_eq!(first.id, ResetRequestId::new(1));
        assert!(matches!(
            resets.submit(&user("JANE@example.com")),
            Err(StateError::Rejected(_))
        ));

        let admin = NotificationDispatcher::new(&store, &clock).list(Channel::Admin).unwrap();
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].kind(), NotificationKind::PasswordReset);
    }

    #[test]
    fn test_resolve_allows_new_request() {
        let (store, clock) = setup();
        let resets = PasswordResets::new(&store, &clock);
        let first = resets.submit(&user("jane@example.com")).unwrap();

        let resolved = resets.resolve(first.id).unwrap();
        assert!(resolved.resolved);
        assert!(resolved.resolved_at.is_some());
        assert!(resets.pending().unwrap().is_empty());

        let second = resets.submit(&user("jane@example.com")).unwrap();
        assert_eq!(second.id, ResetRequestId::new(2));
    }

    #[test]
    fn test_resolve_unknown() {
        let (store, clock) = setup();
        let resets = PasswordResets::new(&store, &clock);
        assert!(matches!(
            resets.resolve(ResetRequestId::new(3)),
            Err(StateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_badge_counts_notifications_and_pending_requests() {
        let (store, clock) = setup();
        let resets = PasswordResets::new(&store, &clock);
        resets.submit(&user("jane@example.com")).unwrap();

        // One unread notification plus one pending request.
        assert_eq!(admin_badge_count(&store, &clock).unwrap(), 2);

        NotificationDispatcher::new(&store, &clock)
            .mark_all_read(Channel::Admin)
            .unwrap();
        assert_eq!(admin_badge_count(&store, &clock).unwrap(), 1);
    }
}
