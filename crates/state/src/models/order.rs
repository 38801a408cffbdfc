//! Orders placed at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wonder_core::{Email, OrderId, OrderStatus, ProductId};

/// A cart line captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(alias = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl OrderItem {
    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Who the order is for. Stored flattened into the order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(rename = "customerName")]
    pub name: String,
    #[serde(rename = "customerMobile")]
    pub mobile: String,
    #[serde(rename = "customerEmail", default)]
    pub email: Option<Email>,
    #[serde(rename = "deliveryAddress")]
    pub delivery_address: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
}

/// One order. Only `status` and `notes` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub customer: CustomerInfo,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
    pub order_date: DateTime<Utc>,
}

/// Everything checkout collects before an order exists.
///
/// Tax is computed by the caller; this crate does no currency arithmetic
/// beyond summing line totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkout {
    pub items: Vec<OrderItem>,
    pub customer: CustomerInfo,
    pub tax: Decimal,
}

impl Checkout {
    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    /// Subtotal plus tax.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal() + self.tax
    }
}
