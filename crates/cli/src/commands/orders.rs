//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! wonder orders place --name "Jane Doe" --mobile 0917000 --address "1 Main St" \
//!     --transaction TX-1 --item 42:2:19.99:"USB-C cable" --tax 4.80
//! wonder orders transition 1 processing
//! wonder orders list --search jane
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::info;
use wonder_core::{Email, OrderId, OrderStatus, ProductId};
use wonder_state::AppContext;
use wonder_state::models::{Checkout, CustomerInfo, OrderItem};

use super::CommandResult;

/// Parse a cart line written as `PRODUCT_ID:QUANTITY:PRICE:NAME`.
///
/// # Errors
///
/// Returns a message naming the malformed part.
pub fn parse_item(s: &str) -> Result<OrderItem, String> {
    let mut parts = s.splitn(4, ':');
    let mut next = |what: &str| {
        parts
            .next()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| format!("missing {what} in '{s}', expected PRODUCT_ID:QUANTITY:PRICE:NAME"))
    };

    let product_id = next("product id")?;
    let quantity = next("quantity")?;
    let price = next("price")?;
    let name = next("name")?;

    Ok(OrderItem {
        product_id: ProductId::from_str(product_id).map_err(|e| format!("product id: {e}"))?,
        quantity: quantity.parse().map_err(|e| format!("quantity: {e}"))?,
        price: Decimal::from_str(price).map_err(|e| format!("price: {e}"))?,
        name: name.to_owned(),
        image: None,
        color: None,
    })
}

/// Checkout details gathered from the command line.
#[derive(Debug)]
pub struct PlaceArgs {
    pub items: Vec<OrderItem>,
    pub name: String,
    pub mobile: String,
    pub email: Option<Email>,
    pub address: String,
    pub transaction: String,
    pub tax: Decimal,
}

/// Place an order.
///
/// # Errors
///
/// Returns an error if the checkout is rejected or cannot be stored.
pub fn place(ctx: &AppContext, args: PlaceArgs) -> CommandResult {
    let checkout = Checkout {
        items: args.items,
        customer: CustomerInfo {
            name: args.name,
            mobile: args.mobile,
            email: args.email,
            delivery_address: args.address,
            transaction_id: args.transaction,
        },
        tax: args.tax,
    };
    let order = ctx.orders().place_order(checkout)?;
    info!(id = %order.id, total = %order.total, status = %order.status, "Order placed");
    Ok(())
}

/// Print orders newest first, optionally filtered by name or mobile.
///
/// # Errors
///
/// Returns an error if the collection cannot be read.
pub fn list(ctx: &AppContext, search: Option<&str>) -> CommandResult {
    let orders = ctx.orders().search(search.unwrap_or_default())?;
    if orders.is_empty() {
        info!("No orders");
    }
    for o in &orders {
        info!(
            id = %o.id,
            status = %o.status,
            customer = %o.customer.name,
            mobile = %o.customer.mobile,
            total = %o.total,
            placed = %o.order_date,
            items = o.items.len(),
            "Order"
        );
    }
    Ok(())
}

/// Move an order to another status.
///
/// # Errors
///
/// Returns `StateError::InvalidTransition` for an illegal step,
/// `StateError::NotFound` for an unknown order, or a store error.
pub fn transition(ctx: &AppContext, id: OrderId, status: OrderStatus, actor: &str) -> CommandResult {
    let order = ctx.orders().transition(id, status, actor)?;
    info!(id = %order.id, status = %order.status, "Order updated");
    Ok(())
}

/// Replace an order's staff notes.
///
/// # Errors
///
/// Returns `StateError::NotFound` for an unknown order, or a store error.
pub fn notes(ctx: &AppContext, id: OrderId, notes: &str) -> CommandResult {
    let order = ctx.orders().update_notes(id, notes)?;
    info!(id = %order.id, notes = %order.notes, "Notes saved");
    Ok(())
}

/// Delete an order.
///
/// # Errors
///
/// Returns `StateError::NotFound` for an unknown order, or a store error.
pub fn delete(ctx: &AppContext, id: OrderId) -> CommandResult {
    ctx.orders().delete(id)?;
    info!(%id, "Order deleted");
    Ok(())
}
