//! Wonder Core - Shared types library.
//!
//! This crate provides common types used across all Wonder storefront components:
//! - `state` - Messaging, notification, order-lifecycle and ordering core
//! - `cli` - Command-line tool driving the core against a JSON-file store
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no clocks. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, conversation
//!   identifiers, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
