//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Registries and stores key their records by `Entity::Id`, so two records with
/// the same id are the same warehouse, part, balance row or movement.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
