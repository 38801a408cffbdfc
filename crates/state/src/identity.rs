//! Identity Resolver: which conversation this browser profile writes to.
//!
//! A signed-in customer is identified by their email. Anyone else gets an
//! anonymous `guest-<unix-ms>-<suffix>` id, created on first use and kept
//! under `guestId` so the conversation survives closed tabs.

use rand::Rng;
use tracing::{info, instrument, warn};
use wonder_core::ConversationId;

use crate::clock::Clock;
use crate::conversations::ConversationAggregator;
use crate::error::Result;
use crate::models::{GUEST_NAME, SignedInUser};
use crate::store::{Store, keys};

const GUEST_SUFFIX_LEN: usize = 9;

/// Random lowercase base-36 suffix for anonymous ids.
fn guest_suffix() -> String {
    let mut rng = rand::rng();
    (0..GUEST_SUFFIX_LEN)
        .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
        .collect()
}

/// Resolves and manages the identity of the local customer.
pub struct IdentityResolver<'a> {
    store: &'a Store,
    clock: &'a dyn Clock,
}

impl<'a> IdentityResolver<'a> {
    /// Create a new resolver.
    #[must_use]
    pub const fn new(store: &'a Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// The conversation id to use for this profile.
    ///
    /// Persists a new anonymous id on first call. If that write fails the id
    /// is still returned and a new one is minted next time.
    ///
    /// # Errors
    ///
    /// Returns an error only if the identity keys cannot be read.
    pub fn resolve(&self) -> Result<ConversationId> {
        if let Some(user) = self.current_user()? {
            return Ok(ConversationId::from_email(&user.email));
        }
        if let Some(existing) = self.guest_id()? {
            return Ok(existing);
        }

        let id = ConversationId::guest(self.clock.now_ms(), &guest_suffix());
        match self.store.save_value(keys::GUEST_ID, &id) {
            Ok(()) => info!(guest_id = %id, "Created anonymous id"),
            Err(e) => warn!(guest_id = %id, error = %e, "Failed to persist anonymous id"),
        }
        Ok(id)
    }

    /// The signed-in customer, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if `currentUser` cannot be read or decoded.
    pub fn current_user(&self) -> Result<Option<SignedInUser>> {
        Ok(self.store.load_value(keys::CURRENT_USER)?)
    }

    /// Name shown on outgoing messages: the customer's, or `Guest`.
    ///
    /// # Errors
    ///
    /// Returns an error if `currentUser` cannot be read.
    pub fn display_name(&self) -> Result<String> {
        Ok(self
            .current_user()?
            .map_or_else(|| GUEST_NAME.to_owned(), |u| u.name))
    }

    /// Record `user` as signed in.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn sign_in(&self, user: &SignedInUser) -> Result<()> {
        self.store.save_value(keys::CURRENT_USER, user)?;
        info!("Signed in");
        Ok(())
    }

    /// Forget the signed-in customer. The anonymous id is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn sign_out(&self) -> Result<()> {
        self.store.remove(keys::CURRENT_USER)?;
        info!("Signed out");
        Ok(())
    }

    /// Carry a session-scoped guest's messages over to the current identity.
    ///
    /// Only happens while the current identity has no messages of its own;
    /// otherwise the legacy thread is left alone. Returns how many messages
    /// moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the chat log cannot be read or written.
    #[instrument(skip(self), fields(legacy = %legacy))]
    pub fn adopt_legacy_guest(&self, legacy: &ConversationId) -> Result<usize> {
        let current = self.resolve()?;
        if &current == legacy {
            return Ok(0);
        }

        // Preview length is irrelevant here: reassigning never notifies.
        let chats = ConversationAggregator::new(self.store, self.clock, 0);
        if chats.has_messages(&current)? {
            return Ok(0);
        }
        chats.reassign(legacy, &current)
    }

    fn guest_id(&self) -> Result<Option<ConversationId>> {
        match self.store.load_value::<ConversationId>(keys::GUEST_ID) {
            Ok(id) => Ok(id),
            Err(e) => {
                warn!(error = %e, "Unreadable anonymous id, replacing it");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use wonder_core::{Email, Sender, UserId};

    use super::*;
    use crate::clock::ManualClock;
    use crate::models::MessageDraft;
    use crate::store::{ContextId, KeyValueStore, MemoryStore};

    fn setup() -> (Store, ManualClock) {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        (
            Store::new(backend, ContextId::named("tab")),
            ManualClock::at_millis(1_700_000_000_000),
        )
    }

    fn jane() -> SignedInUser {
        SignedInUser {
            id: UserId::new(1),
            name: "Jane".to_owned(),
            email: Email::parse("jane@example.com").unwrap(),
        }
    }

    #[test]
    fn test_guest_id_shape_and_stability() {
        let (store, clock) = setup();
        let identity = IdentityResolver::new(&store, &clock);

        let first = identity.resolve().unwrap();
        let second = identity.resolve().unwrap();

        assert_eq!(first, second);
        assert!(first.is_guest());
        let suffix = first.as_str().rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), GUEST_SUFFIX_LEN);
        assert!(first.as_str().starts_with("guest-1700000000000-"));
    }

    #[test]
    fn test_signed_in_user_uses_email() {
        let (store, clock) = setup();
        let identity = IdentityResolver::new(&store, &clock);
        let guest = identity.resolve().unwrap();

        identity.sign_in(&jane()).unwrap();
        assert_eq!(identity.resolve().unwrap().as_str(), "jane@example.com");
        assert_eq!(identity.display_name().unwrap(), "Jane");

        identity.sign_out().unwrap();
        assert_eq!(identity.resolve().unwrap(), guest);
        assert_eq!(identity.display_name().unwrap(), "Guest");
    }

    #[test]
    fn test_adopt_legacy_guest_moves_messages_once() {
        let (store, clock) = setup();
        let identity = IdentityResolver::new(&store, &clock);
        let chats = ConversationAggregator::new(&store, &clock, 50);
        let legacy = ConversationId::parse("guest-1-legacy").unwrap();
        chats
            .send_message(MessageDraft::from_client(legacy.clone(), "Guest", "old question"))
            .unwrap();

        assert_eq!(identity.adopt_legacy_guest(&legacy).unwrap(), 1);
        let current = identity.resolve().unwrap();
        assert_eq!(chats.load_thread(&current).unwrap().len(), 1);
        assert_eq!(chats.unread_in(&current, Sender::Admin).unwrap(), 1);
    }

    #[test]
    fn test_adopt_legacy_guest_keeps_existing_thread() {
        let (store, clock) = setup();
        let identity = IdentityResolver::new(&store, &clock);
        let chats = ConversationAggregator::new(&store, &clock, 50);
        let current = identity.resolve().unwrap();
        let legacy = ConversationId::parse("guest-1-legacy").unwrap();
        chats
            .send_message(MessageDraft::from_client(current, "Guest", "new"))
            .unwrap();
        chats
            .send_message(MessageDraft::from_client(legacy.clone(), "Guest", "old"))
            .unwrap();

        assert_eq!(identity.adopt_legacy_guest(&legacy).unwrap(), 0);
        assert!(chats.has_messages(&legacy).unwrap());
    }
}
