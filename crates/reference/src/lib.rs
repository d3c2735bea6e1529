//! Linear-scan timespan collection.
//!
//! `NaiveTimespans` answers the same queries as `offset_tree::TimespanTree`
//! by scanning a sorted `Vec`. Every operation is O(n), and every answer
//! follows directly from the definitions, which makes it a model to check
//! the tree against in property tests and a baseline for benchmarks.
//!
//! | Query | Definition |
//! |-------|------------|
//! | starting at `p` | `start == p` |
//! | stopping at `p` | `end == p` |
//! | overlapping `p` | `start < p < end` |
//! | overlapping `[a, b)` | `start < b && a < end` |

use std::collections::BTreeSet;

use offset_tree::Spanned;
use offset_tree::Split;
use offset_tree::Splittable;
use offset_tree::position::span_order;

/// Items kept sorted by `(position, end_position, tiebreak)`.
#[derive(Clone, Debug)]
pub struct NaiveTimespans<T> {
    items: Vec<T>,
}

impl<T> Default for NaiveTimespans<T> {
    fn default() -> Self {
        return NaiveTimespans { items: Vec::new() };
    }
}

impl<T: Spanned> NaiveTimespans<T> {
    pub fn new() -> NaiveTimespans<T> {
        return NaiveTimespans::default();
    }

    pub fn len(&self) -> usize {
        return self.items.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.items.is_empty();
    }

    /// Insert after every item that does not sort after `item`.
    pub fn insert(&mut self, item: T) {
        let at = self.items.partition_point(|x| span_order(x, &item) != std::cmp::Ordering::Greater);
        self.items.insert(at, item);
    }

    pub fn remove(&mut self, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        let at = self.items.iter().position(|x| x == item)?;
        return Some(self.items.remove(at));
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        return self.items.get(index);
    }

    pub fn items(&self) -> &[T] {
        return &self.items;
    }

    pub fn starting_at(&self, position: T::Position) -> Vec<&T> {
        return self.items.iter().filter(|x| x.position() == position).collect();
    }

    pub fn stopping_at(&self, position: T::Position) -> Vec<&T> {
        return self.items.iter().filter(|x| x.end_position() == position).collect();
    }

    pub fn overlapping(&self, position: T::Position) -> Vec<&T> {
        return self
            .items
            .iter()
            .filter(|x| x.position() < position && position < x.end_position())
            .collect();
    }

    pub fn overlapping_range(&self, start: T::Position, end: T::Position) -> Vec<&T> {
        return self
            .items
            .iter()
            .filter(|x| x.position() < end && start < x.end_position())
            .collect();
    }

    pub fn offsets(&self) -> Vec<T::Position> {
        let offsets: BTreeSet<_> = self.items.iter().map(|x| x.position()).collect();
        return offsets.into_iter().collect();
    }

    pub fn end_times(&self) -> Vec<T::Position> {
        let ends: BTreeSet<_> = self.items.iter().map(|x| x.end_position()).collect();
        return ends.into_iter().collect();
    }

    pub fn position_after(&self, position: T::Position) -> Option<T::Position> {
        return self.items.iter().map(|x| x.position()).filter(|p| *p > position).min();
    }

    pub fn position_before(&self, position: T::Position) -> Option<T::Position> {
        return self.items.iter().map(|x| x.position()).filter(|p| *p < position).max();
    }

    /// Number of items sounding at `position` (starting there or passing through).
    pub fn sounding(&self, position: T::Position) -> usize {
        return self
            .items
            .iter()
            .filter(|x| x.position() == position || (x.position() < position && position < x.end_position()))
            .count();
    }

    /// Cut every item overlapping `position`; returns how many were cut.
    pub fn split_at(&mut self, position: T::Position) -> usize
    where
        T: Splittable + Clone,
    {
        let (cut, kept): (Vec<T>, Vec<T>) = self
            .items
            .drain(..)
            .partition(|x| x.position() < position && position < x.end_position());
        self.items = kept;
        let count = cut.len();
        for item in cut {
            match item.split_at(position) {
                Split::Pieces(left, right) => {
                    self.insert(left);
                    self.insert(right);
                }
                Split::Unchanged(item) => self.insert(item),
            }
        }
        return count;
    }
}

impl<T: Spanned> FromIterator<T> for NaiveTimespans<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut naive = NaiveTimespans::new();
        for item in iter {
            naive.insert(item);
        }
        return naive;
    }
}
