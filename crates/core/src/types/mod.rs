//! Core types for the Wonder storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod conversation;
pub mod email;
pub mod id;
pub mod status;

pub use conversation::{ConversationId, ConversationIdError, GUEST_PREFIX};
pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
