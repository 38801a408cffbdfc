//! Dense 1..N ordering for featured products, slides and categories.
//!
//! Every mutation runs the same two phases: give the target entry a
//! provisional sort value (possibly equal to another entry's, or fractional),
//! then sort and renumber the whole collection 1..N. Renumbering is also the
//! repair pass: it accepts any `order` values (gaps, duplicates, zeros) and
//! produces a dense sequence, and running it twice changes nothing.
//!
//! # Ties
//!
//! - `set_order`: the moved entry and an entry already holding the requested
//!   value are kept in their current relative position.
//! - `move_to(Middle)`: the moved entry always lands exactly at `ceil(N/2)`.
//!   Moving down it sorts after the entry already holding that value, moving
//!   up it sorts before it.
//! - `Top` (0.5) and `Bottom` (N + 1) never tie.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use wonder_core::ProductId;

use crate::error::{Result, StateError};
use crate::models::{Category, FeaturedEntry, SlideshowImage};
use crate::store::{Store, keys};

/// An entry of a densely ordered collection.
pub trait Ordered {
    /// Identity of an entry within its collection.
    type Key: Copy + Eq + fmt::Debug + fmt::Display;

    fn key(&self) -> Self::Key;
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

/// Shortcut targets for [`move_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Top,
    Bottom,
    Middle,
}

impl std::str::FromStr for Position {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "middle" => Ok(Self::Middle),
            other => Err(StateError::rejected(format!("unknown position: {other}"))),
        }
    }
}

/// Stable-sort by `order` and assign 1..N.
pub fn renumber<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(Ordered::order);
    assign_dense(items);
}

/// Whether the `order` values are exactly `{1, ..., N}`.
#[must_use]
pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    let mut orders: Vec<u32> = items.iter().map(Ordered::order).collect();
    orders.sort_unstable();
    orders.iter().zip(1_u32..).all(|(&order, expected)| order == expected)
}

/// Append `entry` after the current last entry.
///
/// # Errors
///
/// Returns `StateError::Rejected` if an entry with the same key exists.
pub fn insert<T: Ordered>(items: &mut Vec<T>, mut entry: T) -> Result<u32> {
    let key = entry.key();
    if items.iter().any(|item| item.key() == key) {
        return Err(StateError::rejected(format!("{key} is already in the list")));
    }
    renumber(items);
    let order = next_order(items.len());
    entry.set_order(order);
    items.push(entry);
    Ok(order)
}

/// Drop the entry with `key` and close the gap. Returns whether it existed.
pub fn remove<T: Ordered>(items: &mut Vec<T>, key: T::Key) -> bool {
    let before = items.len();
    items.retain(|item| item.key() != key);
    renumber(items);
    items.len() != before
}

/// Move the entry with `key` to `requested`, clamped to `[1, N]`.
/// Returns whether the entry existed.
pub fn set_order<T: Ordered>(items: &mut Vec<T>, key: T::Key, requested: i64) -> bool {
    let n = i64::try_from(items.len()).unwrap_or(i64::MAX);
    let clamped = requested.clamp(1, n.max(1));
    #[allow(clippy::cast_precision_loss)]
    let target = clamped as f64;
    place(items, key, target, |_| 0)
}

/// Move the entry with `key` to the top, bottom or middle.
/// Returns whether the entry existed.
pub fn move_to<T: Ordered>(items: &mut Vec<T>, key: T::Key, position: Position) -> bool {
    let n = u32::try_from(items.len()).unwrap_or(u32::MAX);
    match position {
        Position::Top => place(items, key, 0.5, |_| 0),
        Position::Bottom => place(items, key, f64::from(n) + 1.0, |_| 0),
        Position::Middle => {
            let middle = n.div_ceil(2);
            place(items, key, f64::from(middle), |current| match current.cmp(&middle) {
                Ordering::Less => 1,
                Ordering::Greater => -1,
                Ordering::Equal => 0,
            })
        }
    }
}

/// Give `key` the provisional value `target`, then sort and renumber.
///
/// `bias` receives the moved entry's current position and breaks a tie with
/// another entry holding `target`: negative sorts before it, positive after
/// it, zero keeps current relative position.
fn place<T: Ordered>(
    items: &mut Vec<T>,
    key: T::Key,
    target: f64,
    bias: impl FnOnce(u32) -> i8,
) -> bool {
    renumber(items);
    let Some(moved) = items.iter().position(|item| item.key() == key) else {
        return false;
    };
    let moved_bias = items.get(moved).map_or(0, |item| bias(item.order()));

    let mut keyed: Vec<(f64, i8, usize, T)> = items
        .drain(..)
        .enumerate()
        .map(|(idx, item)| {
            if idx == moved {
                (target, moved_bias, idx, item)
            } else {
                (f64::from(item.order()), 0, idx, item)
            }
        })
        .collect();
    keyed.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });
    items.extend(keyed.into_iter().map(|(.., item)| item));
    assign_dense(items);
    true
}

fn assign_dense<T: Ordered>(items: &mut [T]) {
    for (item, order) in items.iter_mut().zip(1_u32..) {
        item.set_order(order);
    }
}

fn next_order(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX).saturating_add(1)
}

// =============================================================================
// Store-backed collections
// =============================================================================

/// A densely ordered collection persisted whole under one key.
///
/// Every mutation re-reads the collection, applies one reconciliation pass
/// and writes the whole collection back.
pub struct OrderedCollection<'a, T> {
    store: &'a Store,
    key: &'static str,
    _entry: PhantomData<T>,
}

impl<'a> OrderedCollection<'a, FeaturedEntry> {
    /// Featured products (`featuredProducts`).
    #[must_use]
    pub const fn featured(store: &'a Store) -> Self {
        Self::new(store, keys::FEATURED_PRODUCTS)
    }
}

impl<'a> OrderedCollection<'a, SlideshowImage> {
    /// Home page slides (`slideshowImages`).
    #[must_use]
    pub const fn slideshow(store: &'a Store) -> Self {
        Self::new(store, keys::SLIDESHOW_IMAGES)
    }
}

impl<'a> OrderedCollection<'a, Category> {
    /// Navigation categories (`categories`).
    #[must_use]
    pub const fn categories(store: &'a Store) -> Self {
        Self::new(store, keys::CATEGORIES)
    }
}

impl<'a, T> OrderedCollection<'a, T>
where
    T: Ordered + Serialize + DeserializeOwned,
{
    /// Wrap the collection stored under `key`.
    #[must_use]
    pub const fn new(store: &'a Store, key: &'static str) -> Self {
        Self {
            store,
            key,
            _entry: PhantomData,
        }
    }

    /// Entries sorted by `order`. Does not write.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    pub fn list(&self) -> Result<Vec<T>> {
        let mut items: Vec<T> = self.store.load_collection(self.key)?;
        items.sort_by_key(Ordered::order);
        Ok(items)
    }

    /// Append an entry at the end. Returns its position.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Rejected` if the key is already present, or a
    /// store error if the write fails.
    #[instrument(skip(self, entry), fields(collection = self.key, entry = %entry.key()))]
    pub fn insert(&self, entry: T) -> Result<u32> {
        let mut items: Vec<T> = self.store.load_collection(self.key)?;
        let order = insert(&mut items, entry)?;
        self.store.save_collection(self.key, &items)?;
        info!(order, "Added entry");
        Ok(order)
    }

    /// Remove an entry. A missing key is a no-op returning `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read or written.
    #[instrument(skip(self), fields(collection = self.key))]
    pub fn remove(&self, key: T::Key) -> Result<bool> {
        self.mutate(|items| remove(items, key), key)
    }

    /// Move an entry to a clamped 1-based position.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read or written.
    #[instrument(skip(self), fields(collection = self.key))]
    pub fn set_order(&self, key: T::Key, requested: i64) -> Result<bool> {
        self.mutate(|items| set_order(items, key, requested), key)
    }

    /// Move an entry to the top, bottom or middle.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read or written.
    #[instrument(skip(self), fields(collection = self.key))]
    pub fn move_to(&self, key: T::Key, position: Position) -> Result<bool> {
        self.mutate(|items| move_to(items, key, position), key)
    }

    /// Renumber the stored collection. Writes only if something changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read or written.
    pub fn repair(&self) -> Result<bool> {
        let mut items: Vec<T> = self.store.load_collection(self.key)?;
        let before: Vec<(T::Key, u32)> = items.iter().map(|i| (i.key(), i.order())).collect();
        renumber(&mut items);
        let changed = items
            .iter()
            .map(|i| (i.key(), i.order()))
            .ne(before.into_iter());
        if changed {
            self.store.save_collection(self.key, &items)?;
            info!(collection = self.key, "Repaired ordering");
        }
        Ok(changed)
    }

    fn mutate(&self, apply: impl FnOnce(&mut Vec<T>) -> bool, key: T::Key) -> Result<bool> {
        let mut items: Vec<T> = self.store.load_collection(self.key)?;
        if !apply(&mut items) {
            debug!(entry = %key, "Entry not in list, nothing to reconcile");
            return Ok(false);
        }
        self.store.save_collection(self.key, &items)?;
        Ok(true)
    }
}

// =============================================================================
// Featured products against the catalog
// =============================================================================

/// Read-only view of which products still exist.
pub trait Catalog {
    fn contains(&self, product: ProductId) -> bool;
}

impl Catalog for HashSet<ProductId> {
    fn contains(&self, product: ProductId) -> bool {
        Self::contains(self, &product)
    }
}

impl Catalog for BTreeSet<ProductId> {
    fn contains(&self, product: ProductId) -> bool {
        Self::contains(self, &product)
    }
}

impl Catalog for [ProductId] {
    fn contains(&self, product: ProductId) -> bool {
        self.iter().any(|&p| p == product)
    }
}

/// Featured product ids in display order, skipping deleted products.
///
/// Stale entries stay in the store; they are only hidden here.
#[must_use]
pub fn resolve_featured<C: Catalog + ?Sized>(entries: &[FeaturedEntry], catalog: &C) -> Vec<ProductId> {
    let mut sorted: Vec<&FeaturedEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.order);
    sorted
        .into_iter()
        .map(|e| e.product_id)
        .filter(|&p| catalog.contains(p))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::store::{ContextId, KeyValueStore, MemoryStore};

    fn entries(pairs: &[(i64, u32)]) -> Vec<FeaturedEntry> {
        pairs
            .iter()
            .map(|&(p, order)| FeaturedEntry {
                product_id: ProductId::new(p),
                order,
            })
            .collect()
    }

    fn layout(items: &[FeaturedEntry]) -> Vec<(i64, u32)> {
        let mut out: Vec<(i64, u32)> = items
            .iter()
            .map(|e| (e.product_id.as_i64(), e.order))
            .collect();
        out.sort_by_key(|&(_, order)| order);
        out
    }

    fn p(id: i64) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_move_to_top() {
        let mut items = entries(&[(1, 1), (2, 2), (3, 3)]);
        assert!(move_to(&mut items, p(3), Position::Top));
        assert_eq!(layout(&items), vec![(3, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_move_to_bottom() {
        let mut items = entries(&[(1, 1), (2, 2), (3, 3)]);
        assert!(move_to(&mut items, p(1), Position::Bottom));
        assert_eq!(layout(&items), vec![(2, 1), (3, 2), (1, 3)]);
    }

    #[test]
    fn test_move_to_middle_lands_on_middle() {
        // Moving up into the middle.
        let mut items = entries(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
        assert!(move_to(&mut items, p(5), Position::Middle));
        assert_eq!(layout(&items), vec![(1, 1), (2, 2), (5, 3), (3, 4), (4, 5)]);

        // Moving down into the middle.
        let mut items = entries(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
        assert!(move_to(&mut items, p(1), Position::Middle));
        assert_eq!(layout(&items), vec![(2, 1), (3, 2), (1, 3), (4, 4), (5, 5)]);
    }

    #[test]
    fn test_set_order_clamps() {
        let mut items = entries(&[(1, 1), (2, 2), (3, 3)]);
        assert!(set_order(&mut items, p(3), -10));
        // Clamped to 1, which ties with 1; the tie keeps 1 ahead.
        assert_eq!(layout(&items), vec![(1, 1), (3, 2), (2, 3)]);

        let mut items = entries(&[(1, 1), (2, 2), (3, 3)]);
        assert!(set_order(&mut items, p(2), 99));
        // Ties keep current relative position: 2 stays ahead of 3.
        assert_eq!(layout(&items), vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_set_order_moving_up() {
        let mut items = entries(&[(1, 1), (2, 2), (3, 3), (4, 4)]);
        assert!(set_order(&mut items, p(4), 2));
        assert_eq!(layout(&items), vec![(1, 1), (2, 2), (4, 3), (3, 4)]);
    }

    #[test]
    fn test_missing_key_is_noop() {
        let mut items = entries(&[(1, 1), (2, 2)]);
        assert!(!set_order(&mut items, p(9), 1));
        assert!(!move_to(&mut items, p(9), Position::Top));
        assert!(!remove(&mut items, p(9)));
        assert_eq!(layout(&items), vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn test_insert_appends_and_rejects_duplicates() {
        let mut items = entries(&[(1, 1), (2, 2)]);
        assert_eq!(insert(&mut items, FeaturedEntry::new(p(7))).unwrap(), 3);
        assert!(matches!(
            insert(&mut items, FeaturedEntry::new(p(1))),
            Err(StateError::Rejected(_))
        ));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_remove_closes_gap() {
        let mut items = entries(&[(1, 1), (2, 2), (3, 3)]);
        assert!(remove(&mut items, p(2)));
        assert_eq!(layout(&items), vec![(1, 1), (3, 2)]);
    }

    #[test]
    fn test_renumber_repairs_gaps_and_duplicates() {
        let mut items = entries(&[(1, 4), (2, 4), (3, 0), (4, 9)]);
        renumber(&mut items);
        assert_eq!(layout(&items), vec![(3, 1), (1, 2), (2, 3), (4, 4)]);
        assert!(is_dense(&items));
    }

    #[test]
    fn test_resolve_featured_skips_deleted_products() {
        let items = entries(&[(1, 2), (2, 1), (3, 3)]);
        let catalog: HashSet<ProductId> = [p(1), p(3)].into_iter().collect();
        assert_eq!(resolve_featured(&items, &catalog), vec![p(1), p(3)]);

        let slice: &[ProductId] = &[p(2)];
        assert_eq!(resolve_featured(&items, slice), vec![p(2)]);
    }

    #[test]
    fn test_position_from_str() {
        assert_eq!("TOP".parse::<Position>().unwrap(), Position::Top);
        assert!("sideways".parse::<Position>().is_err());
    }

    #[test]
    fn test_collection_round_trip_through_store() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = Store::new(backend, ContextId::named("admin"));
        let featured = OrderedCollection::featured(&store);

        for id in 1..=3 {
            featured.insert(FeaturedEntry::new(p(id))).unwrap();
        }
        assert!(featured.move_to(p(3), Position::Top).unwrap());
        assert!(!featured.remove(p(42)).unwrap());

        assert_eq!(layout(&featured.list().unwrap()), vec![(3, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_repair_writes_only_when_needed() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = Store::new(backend, ContextId::named("admin"));
        store
            .save_collection(keys::FEATURED_PRODUCTS, &entries(&[(1, 5), (2, 5)]))
            .unwrap();
        let featured = OrderedCollection::featured(&store);

        assert!(featured.repair().unwrap());
        assert!(!featured.repair().unwrap());
        assert_eq!(layout(&featured.list().unwrap()), vec![(1, 1), (2, 2)]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(i64),
        Remove(i64),
        SetOrder(i64, i64),
        Move(i64, Position),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let key = 0_i64..12;
        let position = prop_oneof![
            Just(Position::Top),
            Just(Position::Bottom),
            Just(Position::Middle),
        ];
        prop_oneof![
            key.clone().prop_map(Op::Insert),
            key.clone().prop_map(Op::Remove),
            (key.clone(), -5_i64..20).prop_map(|(k, o)| Op::SetOrder(k, o)),
            (key, position).prop_map(|(k, pos)| Op::Move(k, pos)),
        ]
    }

    proptest! {
        #[test]
        fn dense_after_any_operation_sequence(ops in proptest::collection::vec(op_strategy(), 0..60)) {
            let mut items: Vec<FeaturedEntry> = Vec::new();
            for op in ops {
                match op {
                    Op::Insert(k) => { let _ = insert(&mut items, FeaturedEntry::new(p(k))); }
                    Op::Remove(k) => { remove(&mut items, p(k)); }
                    Op::SetOrder(k, o) => { set_order(&mut items, p(k), o); }
                    Op::Move(k, pos) => { move_to(&mut items, p(k), pos); }
                }
                prop_assert!(is_dense(&items), "not dense: {:?}", layout(&items));
            }
        }

        #[test]
        fn renumber_is_idempotent_and_repairs(
            orders in proptest::collection::vec(0_u32..8, 0..20)
        ) {
            let pairs: Vec<(i64, u32)> = orders
                .into_iter()
                .zip(0_i64..)
                .map(|(order, id)| (id, order))
                .collect();
            let mut once = entries(&pairs);
            renumber(&mut once);
            let mut twice = once.clone();
            renumber(&mut twice);

            prop_assert!(is_dense(&once));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn move_to_top_puts_entry_first(n in 1_i64..15, pick in 0_i64..15) {
            let pairs: Vec<(i64, u32)> = (1..=n).zip(1_u32..).collect();
            let mut items = entries(&pairs);
            let target = (pick % n) + 1;
            move_to(&mut items, p(target), Position::Top);
            prop_assert_eq!(layout(&items).first().map(|&(id, _)| id), Some(target));
        }
    }
}
