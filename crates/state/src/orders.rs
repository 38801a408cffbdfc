//! Order State Machine: checkout, status transitions and admin edits.
//!
//! The legal transitions live on [`OrderStatus`]. Transitions are silent:
//! only placing an order notifies staff.

use rust_decimal::Decimal;
use tracing::{info, instrument};
use wonder_core::{Channel, Email, OrderId, OrderStatus};

use crate::clock::Clock;
use crate::error::{Result, StateError};
use crate::models::{Checkout, Order, OrderRef, Payload};
use crate::notifications::NotificationDispatcher;
use crate::store::{Store, keys};

/// Reads and writes the `orders` collection.
pub struct OrderStateMachine<'a> {
    store: &'a Store,
    clock: &'a dyn Clock,
}

impl<'a> OrderStateMachine<'a> {
    /// Create a new state machine.
    #[must_use]
    pub const fn new(store: &'a Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Create a pending order and notify staff.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Rejected` for an empty cart or missing customer
    /// details, or a store error if the order could not be written. A failed
    /// notification does not fail the order.
    #[instrument(skip(self, checkout), fields(customer = %checkout.customer.name))]
    pub fn place_order(&self, checkout: Checkout) -> Result<Order> {
        validate(&checkout)?;

        let mut orders = self.load()?;
        let id = orders
            .iter()
            .map(|o| o.id)
            .max()
            .map_or(OrderId::new(1), |max| max.next());

        let subtotal = checkout.subtotal();
        let total = checkout.total();
        let order = Order {
            id,
            items: checkout.items,
            customer: checkout.customer,
            subtotal,
            tax: checkout.tax,
            total,
            status: OrderStatus::Pending,
            notes: String::new(),
            order_date: self.clock.now(),
        };

        orders.push(order.clone());
        self.store.save_collection(keys::ORDERS, &orders)?;
        info!(order_id = %order.id, %total, "Order placed");

        NotificationDispatcher::new(self.store, self.clock).emit_best_effort(
            Channel::Admin,
            "New Order Received",
            &format!(
                "New order #{} from {} - Total: {}",
                order.id,
                order.customer.name,
                format_total(order.total)
            ),
            Payload::Order(OrderRef { order_id: order.id }),
        );
        Ok(order)
    }

    /// Move an order to `target` if the status table allows it.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown order,
    /// `StateError::InvalidTransition` for a step outside the table (the
    /// order is left untouched), or a store error if the write fails.
    #[instrument(skip(self))]
    pub fn transition(&self, id: OrderId, target: OrderStatus, actor: &str) -> Result<Order> {
        let mut orders = self.load()?;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StateError::not_found("order", id))?;

        let from = order.status;
        if !from.can_transition_to(target) {
            return Err(StateError::InvalidTransition { from, to: target });
        }
        order.status = target;
        let updated = order.clone();

        self.store.save_collection(keys::ORDERS, &orders)?;
        info!(%from, to = %target, actor, "Order status changed");
        Ok(updated)
    }

    /// `pending -> processing`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::transition`].
    pub fn approve(&self, id: OrderId, actor: &str) -> Result<Order> {
        self.transition(id, OrderStatus::Processing, actor)
    }

    /// `processing -> completed`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::transition`].
    pub fn complete(&self, id: OrderId, actor: &str) -> Result<Order> {
        self.transition(id, OrderStatus::Completed, actor)
    }

    /// `pending | processing -> cancelled`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::transition`].
    pub fn reject(&self, id: OrderId, actor: &str) -> Result<Order> {
        self.transition(id, OrderStatus::Cancelled, actor)
    }

    /// Replace an order's notes (trimmed). Allowed in any status.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown order, or a store error.
    #[instrument(skip(self, notes))]
    pub fn update_notes(&self, id: OrderId, notes: &str) -> Result<Order> {
        let mut orders = self.load()?;
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StateError::not_found("order", id))?;
        notes.trim().clone_into(&mut order.notes);
        let updated = order.clone();

        self.store.save_collection(keys::ORDERS, &orders)?;
        info!("Order notes updated");
        Ok(updated)
    }

    /// Purge an order regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown order, or a store error.
    #[instrument(skip(self))]
    pub fn delete(&self, id: OrderId) -> Result<()> {
        let mut orders = self.load()?;
        let before = orders.len();
        orders.retain(|o| o.id != id);
        if orders.len() == before {
            return Err(StateError::not_found("order", id));
        }
        self.store.save_collection(keys::ORDERS, &orders)?;
        info!("Order deleted");
        Ok(())
    }

    /// One order.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` for an unknown order.
    pub fn get(&self, id: OrderId) -> Result<Order> {
        self.load()?
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| StateError::not_found("order", id))
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn list(&self) -> Result<Vec<Order>> {
        let mut orders = self.load()?;
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date).then_with(|| b.id.cmp(&a.id)));
        Ok(orders)
    }

    /// Orders whose customer name or mobile contains `term`, case-insensitively.
    /// A blank term matches everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn search(&self, term: &str) -> Result<Vec<Order>> {
        let needle = term.trim().to_lowercase();
        let mut orders = self.list()?;
        if !needle.is_empty() {
            orders.retain(|o| {
                o.customer.name.to_lowercase().contains(&needle)
                    || o.customer.mobile.to_lowercase().contains(&needle)
            });
        }
        Ok(orders)
    }

    /// Orders placed while signed in as `email`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn orders_for(&self, email: &Email) -> Result<Vec<Order>> {
        let mut orders = self.list()?;
        orders.retain(|o| o.customer.email.as_ref() == Some(email));
        Ok(orders)
    }

    fn load(&self) -> Result<Vec<Order>> {
        Ok(self.store.load_collection(keys::ORDERS)?)
    }
}

fn validate(checkout: &Checkout) -> Result<()> {
    if checkout.items.is_empty() {
        return Err(StateError::rejected("cart is empty"));
    }
    if checkout.items.iter().any(|i| i.quantity == 0) {
        return Err(StateError::rejected("item quantity must be at least 1"));
    }
    if checkout.items.iter().any(|i| i.price.is_sign_negative()) || checkout.tax.is_sign_negative() {
        return Err(StateError::rejected("amounts cannot be negative"));
    }
    let customer = &checkout.customer;
    for (field, value) in [
        ("name", &customer.name),
        ("mobile", &customer.mobile),
        ("delivery address", &customer.delivery_address),
        ("transaction id", &customer.transaction_id),
    ] {
        if value.trim().is_empty() {
            return Err(StateError::rejected(format!("customer {field} is required")));
        }
    }
    Ok(())
}

/// Total as shown in the staff notification.
fn format_total(total: Decimal) -> String {
    total.round_dp(2).normalize().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use wonder_core::ProductId;

    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{CustomerInfo, OrderItem};
    use crate::store::{ContextId, KeyValueStore, MemoryStore};

    fn setup() -> (Arc<MemoryStore>, Store, ManualClock) {
        let backend = Arc::new(MemoryStore::new());
        let shared: Arc<dyn KeyValueStore> = backend.clone();
        (
            backend,
            Store::new(shared, ContextId::named("tab")),
            ManualClock::at_millis(1_700_000_000_000),
        )
    }

    fn checkout(name: &str, mobile: &str, email: Option<&str>) -> Checkout {
        Checkout {
            items: vec![OrderItem {
                product_id: ProductId::new(4),
                name: "Phone".to_owned(),
                price: Decimal::new(25_000, 0),
                quantity: 2,
                image: None,
                color: None,
            }],
            customer: CustomerInfo {
                name: name.to_owned(),
                mobile: mobile.to_owned(),
                email: email.map(|e| Email::parse(e).unwrap()),
                delivery_address: "Kigali".to_owned(),
                transaction_id: "TX-1".to_owned(),
            },
            tax: Decimal::new(9_000, 0),
        }
    }

    #[test]
    fn test_place_order_assigns_sequential_ids_and_notifies() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);

        let first = orders.place_order(checkout("Jane", "0788", None)).unwrap();
        let second = orders.place_order(checkout("Bob", "0789", None)).unwrap();

        assert_eq!(first.id, OrderId::new(1));
        assert_eq!(second.id, OrderId::new(2));
        assert_eq!(first.status, OrderStatus::Pending);
        assert_eq!(first.subtotal, Decimal::new(50_000, 0));
        assert_eq!(first.total, Decimal::new(59_000, 0));

        let admin = NotificationDispatcher::new(&store, &clock).list(Channel::Admin).unwrap();
        assert_eq!(admin.len(), 2);
        assert!(admin.iter().any(|n| n.body == "New order #1 from Jane - Total: 59000"));
        let client = NotificationDispatcher::new(&store, &clock).list(Channel::Client).unwrap();
        assert!(client.is_empty());
    }

    #[test]
    fn test_legal_path_to_completed() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);
        let id = orders.place_order(checkout("Jane", "0788", None)).unwrap().id;

        orders.approve(id, "admin").unwrap();
        let done = orders.complete(id, "admin").unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
    }

    #[test]
    fn test_illegal_transitions_leave_status() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);
        let id = orders.place_order(checkout("Jane", "0788", None)).unwrap().id;

        let err = orders.complete(id, "admin").unwrap_err();
        assert!(matches!(
            err,
            StateError::InvalidTransition { from: OrderStatus::Pending, to: OrderStatus::Completed }
        ));
        assert_eq!(orders.get(id).unwrap().status, OrderStatus::Pending);

        orders.reject(id, "admin").unwrap();
        assert!(orders.approve(id, "admin").is_err());
        assert!(orders.reject(id, "admin").is_err());
        assert_eq!(orders.get(id).unwrap().status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_transitions_do_not_notify() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);
        let id = orders.place_order(checkout("Jane", "0788", None)).unwrap().id;
        orders.approve(id, "admin").unwrap();

        let admin = NotificationDispatcher::new(&store, &clock);
        assert_eq!(admin.list(Channel::Admin).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_order() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);
        assert!(matches!(
            orders.approve(OrderId::new(42), "admin"),
            Err(StateError::NotFound { entity: "order", .. })
        ));
        assert!(orders.delete(OrderId::new(42)).is_err());
    }

    #[test]
    fn test_notes_and_delete_from_terminal_state() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);
        let id = orders.place_order(checkout("Jane", "0788", None)).unwrap().id;
        orders.reject(id, "admin").unwrap();

        let updated = orders.update_notes(id, "  refunded via momo  ").unwrap();
        assert_eq!(updated.notes, "refunded via momo");

        orders.delete(id).unwrap();
        assert!(orders.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_search_and_orders_for() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);
        orders.place_order(checkout("Jane Doe", "0788111", Some("jane@example.com"))).unwrap();
        clock.advance(TimeDelta::minutes(1));
        orders.place_order(checkout("Bob", "0788222", None)).unwrap();

        let all = orders.list().unwrap();
        assert_eq!(all[0].customer.name, "Bob");

        assert_eq!(orders.search("jane").unwrap().len(), 1);
        assert_eq!(orders.search("0788").unwrap().len(), 2);
        assert_eq!(orders.search("  ").unwrap().len(), 2);

        let jane = Email::parse("jane@example.com").unwrap();
        assert_eq!(orders.orders_for(&jane).unwrap().len(), 1);
    }

    #[test]
    fn test_checkout_validation() {
        let (_, store, clock) = setup();
        let orders = OrderStateMachine::new(&store, &clock);

        let mut empty = checkout("Jane", "0788", None);
        empty.items.clear();
        assert!(matches!(orders.place_order(empty), Err(StateError::Rejected(_))));
        assert!(matches!(
            orders.place_order(checkout(" ", "0788", None)),
            Err(StateError::Rejected(_))
        ));
        assert!(orders.list().unwrap().is_empty());
    }

    #[test]
    fn test_order_survives_notification_quota() {
        let (backend, store, clock) = setup();
        backend.limit_key(keys::ADMIN_NOTIFICATIONS, 0);
        let orders = OrderStateMachine::new(&store, &clock);

        orders.place_order(checkout("Jane", "0788", None)).unwrap();
        assert_eq!(orders.list().unwrap().len(), 1);
    }
}
