//! Wonder State - storefront messaging, notification and ordering core.
//!
//! Every execution context (a browser tab, an admin window, a CLI run)
//! works against one shared key-value store. This crate owns the records
//! kept there and the rules for changing them:
//!
//! - [`conversations`] - chat log aggregation into per-visitor conversations
//! - [`notifications`] - admin and client notification queues
//! - [`orders`] - order placement and the status state machine
//! - [`ordering`] - dense `1..N` ordering for featured products, slides and categories
//! - [`identity`] - who is chatting: signed-in email or durable guest id
//! - [`password_reset`] - customer reset requests handled by staff
//! - [`sessions`] - open staff chat windows
//! - [`sync`] - refreshing one context's view after another context writes
//!
//! # Architecture
//!
//! ```text
//! AppContext ──► Store ──► dyn KeyValueStore (MemoryStore | FileStore)
//!     │                         │
//!     │                         └─► ChangeFeed ──► Synchronizer (other contexts)
//!     └─► borrowed services (ConversationAggregator, OrderStateMachine, ...)
//! ```
//!
//! Services hold no state of their own. Each operation reads the whole
//! collection, changes it, and writes it back whole.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod clock;
pub mod config;
pub mod context;
pub mod conversations;
pub mod error;
pub mod identity;
pub mod models;
pub mod notifications;
pub mod ordering;
pub mod orders;
pub mod password_reset;
pub mod sessions;
pub mod store;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LogFormat, StateConfig};
pub use context::AppContext;
pub use error::{Result, StateError};
pub use ordering::{OrderedCollection, Position};
pub use sessions::ChatWindows;
pub use store::{ContextId, FileStore, KeyValueStore, MemoryStore, Store, StoreError};
pub use sync::{Badge, ReplyWatcher, Synchronizer, ViewObserver, ViewUpdate, Viewer};
