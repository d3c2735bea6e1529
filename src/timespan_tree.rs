//! Timespan tree: an element tree whose items are intervals.
//!
//! On top of the rank ranges, every node caches the lowest and highest
//! end position found in its subtree (`EndTimes`). The start position is
//! the search key, so the end-time bounds are what lets interval queries
//! skip whole subtrees:
//!
//! - `high <= p`: nothing below can still be sounding at `p`
//! - `p` outside `low..=high`: nothing below stops at `p`
//! - `node.position >= p`: the right subtree starts after `p`
//!
//! # Operations
//!
//! - `elements_starting_at`: O(log n)
//! - `elements_stopping_at` / `elements_overlapping`: O(log n + k) in practice
//! - `verticality_at`: all three of the above at one position
//! - `split_at`: cuts every item sounding across a position in two

use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Debug;
use std::ops::Index;
use std::ops::RangeBounds;

use log::debug;

use crate::avl::NONE;
use crate::avl::NodeIdx;
use crate::element::Augment;
use crate::element::ElementTree;
use crate::error::TreeError;
use crate::position::Positioned;
use crate::position::Relocatable;
use crate::position::Spanned;
use crate::position::Split;
use crate::position::Splittable;
use crate::verticality::Verticalities;
use crate::verticality::VerticalitiesNwise;
use crate::verticality::Verticality;

/// Minimum and maximum end position over a subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndTimes<P> {
    pub low: P,
    pub high: P,
}

impl<T: Spanned> Augment<T> for EndTimes<T::Position> {
    #[inline]
    fn of_item(item: &T) -> Self {
        let end = item.end_position();
        return EndTimes { low: end, high: end };
    }

    #[inline]
    fn combine(&mut self, other: &Self) {
        self.low = self.low.min(other.low);
        self.high = self.high.max(other.high);
    }
}

/// Items in the same position are kept sorted by end position, then tiebreak.
fn end_then_tiebreak<T: Spanned>(a: &T, b: &T) -> std::cmp::Ordering {
    return a
        .end_position()
        .cmp(&b.end_position())
        .then_with(|| a.tiebreak(b));
}

/// A collection of intervals supporting overlap and verticality queries.
pub struct TimespanTree<T: Spanned> {
    inner: ElementTree<T, EndTimes<T::Position>>,
}

impl<T: Spanned + Clone> Clone for TimespanTree<T> {
    fn clone(&self) -> Self {
        return TimespanTree { inner: self.inner.clone() };
    }
}

impl<T: Spanned + Debug> Debug for TimespanTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return self.inner.fmt(f);
    }
}

impl<T: Spanned> Default for TimespanTree<T> {
    fn default() -> Self {
        return TimespanTree::new();
    }
}

impl<T: Spanned> TimespanTree<T> {
    pub fn new() -> TimespanTree<T> {
        return TimespanTree {
            inner: ElementTree::with_order(end_then_tiebreak::<T>),
        };
    }

    /// An empty tree ordering same-position items by `order`.
    pub fn with_order(order: fn(&T, &T) -> std::cmp::Ordering) -> TimespanTree<T> {
        return TimespanTree { inner: ElementTree::with_order(order) };
    }

    /// Bulk-load; every item goes through `insert`.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> TimespanTree<T> {
        let mut tree = TimespanTree::new();
        tree.insert_many(items);
        return tree;
    }

    /// The underlying element tree, for read-only access.
    pub fn elements(&self) -> &ElementTree<T, EndTimes<T::Position>> {
        return &self.inner;
    }

    // --- Size ---

    #[inline]
    pub fn len(&self) -> usize {
        return self.inner.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.inner.is_empty();
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    // --- Mutation ---

    pub fn insert(&mut self, item: T) {
        self.inner.insert(item);
    }

    pub fn insert_many(&mut self, items: impl IntoIterator<Item = T>) {
        self.inner.insert_many(items);
    }

    /// Remove the first item equal to `item`; `None` if absent.
    pub fn remove(&mut self, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        return self.inner.remove(item);
    }

    pub fn remove_many<'i>(&mut self, items: impl IntoIterator<Item = &'i T>) -> usize
    where
        T: PartialEq + 'i,
    {
        return self.inner.remove_many(items);
    }

    pub fn remove_nth(&mut self, index: usize) -> Result<T, TreeError> {
        return self.inner.remove_nth(index);
    }

    /// Remove every item matching `pred`; returns how many went.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        return self.inner.retain(|item| !pred(item));
    }

    /// Apply `f` to the item at rank `index` and re-key it.
    pub fn modify(&mut self, index: usize, f: impl FnOnce(&mut T)) -> Result<(), TreeError> {
        return self.inner.modify(index, f);
    }

    /// Move `item` to start at the latest end time, then insert it.
    ///
    /// An item appended to an empty tree keeps its position.
    pub fn append(&mut self, mut item: T)
    where
        T: Relocatable,
    {
        if let Some(end) = self.latest_end_time() {
            item.relocate(end);
        }
        self.insert(item);
    }

    /// Split every item sounding across `position` into two.
    ///
    /// Returns the number of items that were split.
    pub fn split_at(&mut self, position: T::Position) -> usize
    where
        T: Splittable + Clone + PartialEq,
    {
        let sounding: Vec<T> = self.elements_overlapping(position).into_iter().cloned().collect();
        if sounding.is_empty() {
            return 0;
        }
        for item in &sounding {
            self.inner.remove_raw(item.position(), item);
        }
        let mut split = 0usize;
        for item in sounding {
            match item.split_at(position) {
                Split::Pieces(left, right) => {
                    self.inner.insert_raw(left.position(), left);
                    self.inner.insert_raw(right.position(), right);
                    split += 1;
                }
                Split::Unchanged(item) => {
                    self.inner.insert_raw(item.position(), item);
                }
            }
        }
        self.inner.refresh();
        debug!("split {} items at {:?}", split, position);
        return split;
    }

    /// `split_at` for each position in turn.
    pub fn split_at_many(&mut self, positions: impl IntoIterator<Item = T::Position>) -> usize
    where
        T: Splittable + Clone + PartialEq,
    {
        let mut split = 0usize;
        for position in positions {
            split += self.split_at(position);
        }
        return split;
    }

    // --- Rank access ---

    pub fn get(&self, index: usize) -> Option<&T> {
        return self.inner.get(index);
    }

    pub fn at(&self, index: isize) -> Result<&T, TreeError> {
        return self.inner.at(index);
    }

    pub fn first(&self) -> Option<&T> {
        return self.inner.first();
    }

    pub fn last(&self) -> Option<&T> {
        return self.inner.last();
    }

    pub fn slice(&self, range: impl RangeBounds<usize>) -> Result<Vec<&T>, TreeError> {
        return self.inner.slice(range);
    }

    pub fn index(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        return self.inner.index(item);
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        return self.inner.contains(item);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        return self.inner.iter();
    }

    pub fn iter_rev(&self) -> impl Iterator<Item = &T> + '_ {
        return self.inner.iter_rev();
    }

    // --- Interval queries ---

    /// Items starting exactly at `position`, sorted by end.
    pub fn elements_starting_at(&self, position: T::Position) -> &[T] {
        return self.inner.elements_starting_at(position);
    }

    /// Items whose end equals `position`, sorted by `(position, end)`.
    pub fn elements_stopping_at(&self, position: T::Position) -> Vec<&T> {
        let mut out = Vec::new();
        self.stopping_recurse(self.inner.avl().root(), position, &mut out);
        out.sort_by(|a, b| {
            (a.position(), a.end_position()).cmp(&(b.position(), b.end_position()))
        });
        return out;
    }

    fn stopping_recurse<'a>(&'a self, idx: NodeIdx, position: T::Position, out: &mut Vec<&'a T>) {
        if idx == NONE {
            return;
        }
        let node = self.inner.avl().node(idx);
        let ends = &node.value.aug;
        if position < ends.low || ends.high < position {
            return;
        }
        self.stopping_recurse(node.left, position, out);
        if node.position <= position {
            out.extend(node.value.payload.iter().filter(|x| x.end_position() == position));
        }
        if node.position < position {
            self.stopping_recurse(node.right, position, out);
        }
    }

    /// Items with `start < position < end`, in rank order.
    pub fn elements_overlapping(&self, position: T::Position) -> Vec<&T> {
        let mut out = Vec::new();
        self.overlapping_recurse(self.inner.avl().root(), position, &mut out);
        return out;
    }

    fn overlapping_recurse<'a>(&'a self, idx: NodeIdx, position: T::Position, out: &mut Vec<&'a T>) {
        if idx == NONE {
            return;
        }
        let node = self.inner.avl().node(idx);
        if node.value.aug.high <= position {
            return;
        }
        self.overlapping_recurse(node.left, position, out);
        if node.position < position {
            out.extend(node.value.payload.iter().filter(|x| x.end_position() > position));
            self.overlapping_recurse(node.right, position, out);
        }
    }

    /// Items intersecting the half-open range `[start, end)`, in rank order.
    ///
    /// An item `[s, e)` matches when `s < end && start < e`.
    pub fn elements_overlapping_range(&self, start: T::Position, end: T::Position) -> Vec<&T> {
        let mut out = Vec::new();
        self.range_recurse(self.inner.avl().root(), start, end, &mut out);
        return out;
    }

    fn range_recurse<'a>(&'a self, idx: NodeIdx, start: T::Position, end: T::Position, out: &mut Vec<&'a T>) {
        if idx == NONE {
            return;
        }
        let node = self.inner.avl().node(idx);
        if node.value.aug.high <= start {
            return;
        }
        self.range_recurse(node.left, start, end, out);
        if node.position < end {
            out.extend(node.value.payload.iter().filter(|x| x.end_position() > start));
            self.range_recurse(node.right, start, end, out);
        }
    }

    // --- Verticalities ---

    /// Everything starting, stopping, or sounding through `position`.
    pub fn verticality_at(&self, position: T::Position) -> Verticality<'_, T> {
        return Verticality::new(
            self,
            position,
            self.elements_starting_at(position).iter().collect(),
            self.elements_stopping_at(position),
            self.elements_overlapping(position),
        );
    }

    /// The verticality at `position` if anything sounds there, otherwise
    /// the one at the nearest start position before it.
    pub fn verticality_at_or_before(&self, position: T::Position) -> Option<Verticality<'_, T>> {
        let verticality = self.verticality_at(position);
        if !verticality.is_empty() {
            return Some(verticality);
        }
        return verticality.previous();
    }

    /// One verticality per start position, ascending (or descending).
    pub fn iter_verticalities(&self, reverse: bool) -> Verticalities<'_, T> {
        return Verticalities::new(self, reverse);
    }

    /// Sliding windows of `n` consecutive verticalities.
    pub fn iter_verticalities_nwise(&self, n: usize, reverse: bool) -> Result<VerticalitiesNwise<'_, T>, TreeError> {
        if n == 0 {
            return Err(TreeError::InvalidWindow(n));
        }
        return Ok(VerticalitiesNwise::new(self, n, reverse));
    }

    /// Verticalities at the start positions in `[start, end)`.
    pub fn verticalities_between(&self, start: T::Position, end: T::Position) -> Vec<Verticality<'_, T>> {
        let mut out = Vec::new();
        let mut next = if self.inner.elements_starting_at(start).is_empty() {
            self.position_after(start)
        } else {
            Some(start)
        };
        while let Some(position) = next {
            if position >= end {
                break;
            }
            out.push(self.verticality_at(position));
            next = self.position_after(position);
        }
        return out;
    }

    // --- Positions and aggregates ---

    pub fn position_after(&self, position: T::Position) -> Option<T::Position> {
        return self.inner.position_after(position);
    }

    pub fn position_before(&self, position: T::Position) -> Option<T::Position> {
        return self.inner.position_before(position);
    }

    pub fn lowest_offset(&self) -> Option<T::Position> {
        return self.inner.lowest_position();
    }

    pub fn highest_offset(&self) -> Option<T::Position> {
        return self.inner.highest_position();
    }

    pub fn earliest_end_time(&self) -> Option<T::Position> {
        return self.inner.root_augmentation().map(|e| e.low);
    }

    pub fn latest_end_time(&self) -> Option<T::Position> {
        return self.inner.root_augmentation().map(|e| e.high);
    }

    /// Distinct start positions, ascending.
    pub fn all_offsets(&self) -> Vec<T::Position> {
        return self.inner.positions().collect();
    }

    /// Distinct end positions, ascending.
    pub fn all_end_times(&self) -> Vec<T::Position> {
        let ends: BTreeSet<T::Position> = self.iter().map(|x| x.end_position()).collect();
        return ends.into_iter().collect();
    }

    /// Distinct start and end positions, ascending.
    pub fn all_time_points(&self) -> Vec<T::Position> {
        let mut points: BTreeSet<T::Position> = self.inner.positions().collect();
        points.extend(self.iter().map(|x| x.end_position()));
        return points.into_iter().collect();
    }

    /// The largest number of items sounding at any start position.
    pub fn maximum_overlap(&self) -> Option<usize> {
        return self.iter_verticalities(false).map(|v| v.degree_of_overlap()).max();
    }

    /// The smallest number of items sounding at any start position.
    pub fn minimum_overlap(&self) -> Option<usize> {
        return self.iter_verticalities(false).map(|v| v.degree_of_overlap()).min();
    }

    /// Height of the underlying AVL tree; -1 when empty.
    pub fn height(&self) -> i32 {
        return self.inner.height();
    }

    /// Check every cached aggregate against a recount.
    pub fn validate(&self) -> Result<(), TreeError> {
        return self.inner.validate();
    }
}

impl<T: Spanned> Index<usize> for TimespanTree<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        return &self.inner[index];
    }
}

impl<T: Spanned> FromIterator<T> for TimespanTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        return TimespanTree::from_items(iter);
    }
}

impl<T: Spanned> Extend<T> for TimespanTree<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.insert_many(iter);
    }
}

impl<T: Spanned + PartialEq> PartialEq for TimespanTree<T> {
    fn eq(&self, other: &Self) -> bool {
        return self.len() == other.len() && self.iter().eq(other.iter());
    }
}

/// A tree spans from its lowest offset to its latest end time, so trees
/// can be stored inside other trees. An empty tree sits at the default
/// position with zero length.
impl<T: Spanned> Positioned for TimespanTree<T>
where
    T::Position: Default,
{
    type Position = T::Position;

    fn position(&self) -> T::Position {
        return self.lowest_offset().unwrap_or_default();
    }
}

impl<T: Spanned> Spanned for TimespanTree<T>
where
    T::Position: Default,
{
    fn end_position(&self) -> T::Position {
        return self.latest_end_time().unwrap_or_default();
    }
}
