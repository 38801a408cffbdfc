//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! Every persisted collection stores plain JSON integers, so the wrappers are
//! `#[serde(transparent)]` over `i64`.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`, `next()`
/// - `From<i64>` and `Into<i64>` implementations
/// - `Display` and `FromStr`
///
/// # Example
///
/// ```rust
/// # use wonder_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new(1);
/// let order_id = OrderId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }

            /// The id immediately after this one.
            #[must_use]
            pub const fn next(&self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(MessageId);
define_id!(NotificationId);
define_id!(SlideId);
define_id!(CategoryId);
define_id!(ResetRequestId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&OrderId::new(42)).unwrap();
        assert_eq!(json, "42");

        let parsed: MessageId = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(parsed.as_i64(), 1_700_000_000_000);
    }

    #[test]
    fn test_next_saturates() {
        assert_eq!(ProductId::new(1).next(), ProductId::new(2));
        assert_eq!(ProductId::new(i64::MAX).next(), ProductId::new(i64::MAX));
    }

    #[test]
    fn test_from_str_trims() {
        let id: OrderId = " 7 ".parse().unwrap();
        assert_eq!(id, OrderId::new(7));
        assert!("seven".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_ordering_follows_value() {
        let mut ids = vec![NotificationId::new(3), NotificationId::new(1)];
        ids.sort();
        assert_eq!(ids, vec![NotificationId::new(1), NotificationId::new(3)]);
    }
}
