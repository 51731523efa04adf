//! Value object trait: equality by value, not identity.
//!
//! A value object has no identity of its own. A `Quantity` of 5 is any other
//! `Quantity` of 5; a `StockPair` is nothing more than its warehouse and part ids.

/// Marker trait for value objects.
///
/// Implementors are immutable once constructed and compared by their attribute
/// values. Constructors are where validation happens, so a value that exists is
/// a value that is valid.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct Quantity(u64);
///
/// impl ValueObject for Quantity {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
