//! Persisted record shapes.
//!
//! Field names are the JSON compatibility surface shared with every other
//! client of the store. Older records written with the legacy names
//! (`userIdentifier`, `userName`, `type`, `message`, `data`) are still
//! accepted on read.

pub mod chat;
pub mod listing;
pub mod notification;
pub mod order;
pub mod user;

pub use chat::{Conversation, Message, MessageDraft};
pub use listing::{Category, FeaturedEntry, SlideshowImage};
pub use notification::{ChatRef, Notification, OrderRef, Payload, ResetRef};
pub use order::{Checkout, CustomerInfo, Order, OrderItem};
pub use user::{PasswordResetRequest, SignedInUser};

/// Display name used when nobody is signed in.
pub const GUEST_NAME: &str = "Guest";

/// First `max` characters of `text`, with `...` appended when cut.
#[must_use]
pub fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
