//! Interfaces for the items stored in the trees.
//!
//! The trees never look inside an item. They only need:
//!
//! - a totally ordered start position (`Positioned`),
//! - an end position for interval queries (`Spanned`),
//! - optionally a way to move (`Relocatable`) or cut (`Splittable`) it.
//!
//! Positions are any `Ord + Copy` scalar. Integers work, and so does
//! `num_rational::Rational64` for musical offsets like triplets.

use std::cmp::Ordering;
use std::fmt::Debug;

/// An item with a start position.
pub trait Positioned {
    /// The scalar key type.
    type Position: Ord + Copy + Debug;

    /// The start position, used as the search key.
    fn position(&self) -> Self::Position;

    /// Orders two items that share a position.
    ///
    /// The default treats all items as equal, so insertion order is kept.
    fn tiebreak(&self, other: &Self) -> Ordering {
        let _ = other;
        return Ordering::Equal;
    }
}

/// An item covering the half-open span `[position, end_position)`.
///
/// Implementors must guarantee `end_position() >= position()`.
pub trait Spanned: Positioned {
    fn end_position(&self) -> Self::Position;
}

/// An item that can be moved to another start position, keeping its length.
pub trait Relocatable: Positioned {
    fn relocate(&mut self, position: Self::Position);
}

/// The result of cutting an item at a position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Split<T> {
    /// The position was not strictly inside the item.
    Unchanged(T),
    /// `[start, at)` and `[at, end)`.
    Pieces(T, T),
}

impl<T> Split<T> {
    /// Number of items produced.
    pub fn count(&self) -> usize {
        return match self {
            Split::Unchanged(_) => 1,
            Split::Pieces(_, _) => 2,
        };
    }

    /// The produced items, left to right.
    pub fn into_vec(self) -> Vec<T> {
        return match self {
            Split::Unchanged(item) => vec![item],
            Split::Pieces(left, right) => vec![left, right],
        };
    }
}

/// An item that can be cut in two at a position inside its span.
pub trait Splittable: Spanned + Sized {
    fn split_at(self, position: Self::Position) -> Split<Self>;
}

/// Compares two spanned items by `(position, end_position)`, then tiebreak.
pub fn span_order<T: Spanned>(a: &T, b: &T) -> Ordering {
    return a
        .position()
        .cmp(&b.position())
        .then_with(|| a.end_position().cmp(&b.end_position()))
        .then_with(|| a.tiebreak(b));
}

/// Compares two items by tiebreak only; the default payload order.
pub fn tiebreak_order<T: Positioned>(a: &T, b: &T) -> Ordering {
    return a.tiebreak(b);
}
