//! Scenario tests for the Wonder storefront state.
//!
//! Every test builds a [`Harness`]: one in-memory store and one manual clock
//! shared by as many execution contexts as the scenario needs, the way
//! browser tabs share local storage.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wonder-integration-tests
//! ```

use std::sync::Arc;

use chrono::TimeDelta;
use rust_decimal::Decimal;
use wonder_core::{ConversationId, ProductId};
use wonder_state::models::{Checkout, CustomerInfo, OrderItem};
use wonder_state::{AppContext, Clock, ContextId, ManualClock, MemoryStore, StateConfig};

/// 2023-11-14T22:13:20Z, a fixed starting point for the manual clock.
pub const START_MS: i64 = 1_700_000_000_000;

/// Shared store and clock for a group of contexts.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(store),
            clock: Arc::new(ManualClock::at_millis(START_MS)),
        }
    }

    /// A new execution context named `name` attached to the shared store.
    #[must_use]
    pub fn context(&self, name: &str) -> AppContext {
        let clock: Arc<dyn Clock> = self.clock.clone();
        AppContext::with_context(
            self.store.clone(),
            ContextId::named(name),
            clock,
            StateConfig::default(),
        )
    }

    /// Move the shared clock forward.
    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(TimeDelta::seconds(secs));
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a conversation id, panicking on malformed test input.
///
/// # Panics
///
/// Panics if `s` is not a valid conversation id.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn conv(s: &str) -> ConversationId {
    ConversationId::parse(s).unwrap()
}

/// A one-line checkout for `name`.
#[must_use]
pub fn checkout(name: &str, price_cents: i64, quantity: u32) -> Checkout {
    Checkout {
        items: vec![OrderItem {
            product_id: ProductId::new(42),
            name: "USB-C cable".to_owned(),
            price: Decimal::new(price_cents, 2),
            quantity,
            image: None,
            color: None,
        }],
        customer: CustomerInfo {
            name: name.to_owned(),
            mobile: "09170000000".to_owned(),
            email: None,
            delivery_address: "1 Main St".to_owned(),
            transaction_id: "TX-1".to_owned(),
        },
        tax: Decimal::ZERO,
    }
}
