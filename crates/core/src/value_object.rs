//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are **immutable**: `Money { 100, EUR }` equals
/// any other `Money { 100, EUR }`. To "modify" one, build a new value.
///
/// The trait requires `Clone + PartialEq + Debug` so values can be copied into
/// events, compared in tests and logged.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
