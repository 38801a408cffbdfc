//! Featured-product ordering commands.

use tracing::{info, warn};
use wonder_core::ProductId;
use wonder_state::models::FeaturedEntry;
use wonder_state::{AppContext, Position};

use super::CommandResult;

/// Print featured products in display order.
///
/// # Errors
///
/// Returns an error if the collection cannot be read.
pub fn list(ctx: &AppContext) -> CommandResult {
    let featured = ctx.featured();
    if featured.repair()? {
        warn!("Featured order had gaps or duplicates and was renumbered");
    }
    for entry in featured.list()? {
        info!(order = entry.order, product = %entry.product_id, "Featured");
    }
    Ok(())
}

/// Append a product at the bottom.
///
/// # Errors
///
/// Returns `StateError::Rejected` if the product is already featured, or a
/// store error.
pub fn add(ctx: &AppContext, product: ProductId) -> CommandResult {
    let order = ctx.featured().insert(FeaturedEntry::new(product))?;
    info!(%product, order, "Featured");
    Ok(())
}

/// Stop featuring a product.
///
/// # Errors
///
/// Returns an error if the collection cannot be read or written.
pub fn remove(ctx: &AppContext, product: ProductId) -> CommandResult {
    if ctx.featured().remove(product)? {
        info!(%product, "Unfeatured");
    } else {
        warn!(%product, "Product was not featured");
    }
    Ok(())
}

/// Put a product at an explicit position; out-of-range values are clamped.
///
/// # Errors
///
/// Returns an error if the collection cannot be read or written.
pub fn set(ctx: &AppContext, product: ProductId, order: i64) -> CommandResult {
    report(product, ctx.featured().set_order(product, order)?);
    Ok(())
}

/// Move a product to the top, bottom or middle.
///
/// # Errors
///
/// Returns an error if the collection cannot be read or written.
pub fn move_to(ctx: &AppContext, product: ProductId, position: Position) -> CommandResult {
    report(product, ctx.featured().move_to(product, position)?);
    Ok(())
}

fn report(product: ProductId, moved: bool) {
    if moved {
        info!(%product, "Moved");
    } else {
        warn!(%product, "Product was not featured");
    }
}
