//! Storefront lists kept in a dense 1..N order.

use serde::{Deserialize, Serialize};
use wonder_core::{CategoryId, ProductId, SlideId};

use crate::ordering::Ordered;

/// A product pinned to the home page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedEntry {
    pub product_id: ProductId,
    pub order: u32,
}

impl FeaturedEntry {
    /// An entry whose position is assigned on insert.
    #[must_use]
    pub const fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            order: 0,
        }
    }
}

impl Ordered for FeaturedEntry {
    type Key = ProductId;

    fn key(&self) -> ProductId {
        self.product_id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// One slide of the home page carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideshowImage {
    pub id: SlideId,
    pub image_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub link: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default = "enabled")]
    pub show_card: bool,
}

impl Ordered for SlideshowImage {
    type Key = SlideId;

    fn key(&self) -> SlideId {
        self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

/// A product category shown in navigation.
///
/// Older records carry no `order`; they read as 0 and a repair pass numbers
/// them by their position in the stored array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub order: u32,
}

impl Ordered for Category {
    type Key = CategoryId;

    fn key(&self) -> CategoryId {
        self.id
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn set_order(&mut self, order: u32) {
        self.order = order;
    }
}

const fn enabled() -> bool {
    true
}
