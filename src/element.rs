//! Element tree: an AVL tree usable as a sorted list.
//!
//! Each node holds the payload of every item sharing its position, plus
//! the global rank ranges of that payload and of the node's whole subtree:
//!
//! ```text
//!                  [3]  payload 3..5, subtree 0..7
//!                 /   \
//!   [1] payload 0..3     [8] payload 5..7
//!       subtree 0..3         subtree 5..7
//! ```
//!
//! Ranks ignore gaps between positions, so `get(i)` is a plain descent:
//! inside the payload range index the payload, below it go left, above it
//! go right.
//!
//! # Aggregates
//!
//! Rank ranges and the optional `Augment` value are not patched during
//! rotations. After every batch of edits the whole tree is re-derived:
//! first the rank pass (`update_indices`), then the augmentation pass
//! (`update_augmentation`). Queries trust the cached values only after
//! both passes have run.

use std::cmp::Ordering;
use std::fmt;
use std::fmt::Debug;
use std::ops::Bound;
use std::ops::Index;
use std::ops::RangeBounds;

use log::debug;
use log::trace;
use smallvec::SmallVec;

use crate::avl::AvlTree;
use crate::avl::NONE;
use crate::avl::NodeIdx;
use crate::error::TreeError;
use crate::position::Positioned;
use crate::position::tiebreak_order;

/// Items stored inline before a payload spills to the heap.
pub const PAYLOAD_INLINE: usize = 2;

/// Payload storage for one node.
pub type Payload<T> = SmallVec<[T; PAYLOAD_INLINE]>;

/// Extra per-subtree data recomputed after each batch of edits.
///
/// `of_item` summarizes one payload item and `combine` merges two
/// summaries; a node's value is every item of its payload combined with
/// both children's values.
pub trait Augment<T>: Clone + Debug + PartialEq {
    fn of_item(item: &T) -> Self;
    fn combine(&mut self, other: &Self);
}

impl<T> Augment<T> for () {
    #[inline(always)]
    fn of_item(_item: &T) -> Self {}

    #[inline(always)]
    fn combine(&mut self, _other: &Self) {}
}

/// The value stored at each AVL node.
#[derive(Clone, Debug)]
pub struct ElementNode<T, A> {
    pub(crate) payload: Payload<T>,
    pub(crate) payload_start: usize,
    pub(crate) payload_stop: usize,
    pub(crate) subtree_start: usize,
    pub(crate) subtree_stop: usize,
    pub(crate) aug: A,
}

impl<T, A: Augment<T>> ElementNode<T, A> {
    fn new(item: T) -> ElementNode<T, A> {
        let aug = A::of_item(&item);
        let mut payload = Payload::new();
        payload.push(item);
        return ElementNode {
            payload,
            payload_start: 0,
            payload_stop: 0,
            subtree_start: 0,
            subtree_stop: 0,
            aug,
        };
    }

    /// Items at this node's position, in payload order.
    pub fn payload(&self) -> &[T] {
        return &self.payload;
    }

    /// Half-open rank range of the payload.
    pub fn payload_range(&self) -> (usize, usize) {
        return (self.payload_start, self.payload_stop);
    }

    /// Half-open rank range of the subtree rooted here.
    pub fn subtree_range(&self) -> (usize, usize) {
        return (self.subtree_start, self.subtree_stop);
    }

    pub fn augmentation(&self) -> &A {
        return &self.aug;
    }

    fn summarize_payload(&self) -> A {
        let mut aug = A::of_item(&self.payload[0]);
        for item in &self.payload[1..] {
            aug.combine(&A::of_item(item));
        }
        return aug;
    }
}

type Tree<T, A> = AvlTree<<T as Positioned>::Position, ElementNode<T, A>>;

/// A sorted, rank-addressable collection of positioned items.
pub struct ElementTree<T: Positioned, A = ()> {
    avl: Tree<T, A>,
    order: fn(&T, &T) -> Ordering,
}

impl<T: Positioned + Clone, A: Clone> Clone for ElementTree<T, A> {
    fn clone(&self) -> Self {
        return ElementTree {
            avl: self.avl.clone(),
            order: self.order,
        };
    }
}

impl<T: Positioned + Debug, A> Debug for ElementTree<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for node in self.avl.in_order() {
            for item in node.value.payload.iter() {
                list.entry(item);
            }
        }
        return list.finish();
    }
}

impl<T: Positioned, A: Augment<T>> Default for ElementTree<T, A> {
    fn default() -> Self {
        return ElementTree::new();
    }
}

impl<T: Positioned, A: Augment<T>> ElementTree<T, A> {
    /// An empty tree ordering same-position items by `Positioned::tiebreak`.
    pub fn new() -> ElementTree<T, A> {
        return ElementTree::with_order(tiebreak_order::<T>);
    }

    /// An empty tree ordering same-position items by `order`.
    ///
    /// Items comparing equal keep insertion order.
    pub fn with_order(order: fn(&T, &T) -> Ordering) -> ElementTree<T, A> {
        return ElementTree { avl: AvlTree::new(), order };
    }

    /// Bulk-load; every item goes through `insert`.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> ElementTree<T, A> {
        let mut tree = ElementTree::new();
        tree.insert_many(items);
        return tree;
    }

    pub(crate) fn avl(&self) -> &Tree<T, A> {
        return &self.avl;
    }

    pub(crate) fn order(&self) -> fn(&T, &T) -> Ordering {
        return self.order;
    }

    /// The cached augmentation of the whole tree.
    pub fn root_augmentation(&self) -> Option<&A> {
        return self.avl.get(self.avl.root()).map(|n| &n.value.aug);
    }

    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        return match self.avl.get(self.avl.root()) {
            Some(root) => root.value.subtree_stop,
            None => 0,
        };
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.avl.is_empty();
    }

    /// Number of distinct positions.
    pub fn position_count(&self) -> usize {
        return self.avl.node_count();
    }

    pub fn clear(&mut self) {
        self.avl.clear();
    }

    // --- Mutation ---

    /// Insert `item` at its own position.
    pub fn insert(&mut self, item: T) {
        let position = item.position();
        self.insert_at(position, item);
    }

    /// Insert `item` at `position`.
    pub fn insert_at(&mut self, position: T::Position, item: T) {
        self.insert_raw(position, item);
        self.refresh();
    }

    pub fn insert_many(&mut self, items: impl IntoIterator<Item = T>) {
        let mut count = 0usize;
        for item in items {
            self.insert_raw(item.position(), item);
            count += 1;
        }
        debug!("inserted {} items", count);
        self.refresh();
    }

    /// Insert without re-deriving aggregates. Callers must `refresh`.
    pub(crate) fn insert_raw(&mut self, position: T::Position, item: T) {
        let idx = self.avl.node_by_position(position);
        if idx == NONE {
            self.avl.insert_with(position, || ElementNode::new(item));
            return;
        }
        let order = self.order;
        let payload = &mut self.avl.node_mut(idx).value.payload;
        let at = payload.partition_point(|x| order(x, &item) != Ordering::Greater);
        payload.insert(at, item);
    }

    /// Remove the first item equal to `item` at its own position.
    pub fn remove(&mut self, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        return self.remove_at(item.position(), item);
    }

    /// Remove the first item equal to `item` at `position`.
    ///
    /// Returns `None`, leaving the tree untouched, if it is not there.
    pub fn remove_at(&mut self, position: T::Position, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        let removed = self.remove_raw(position, item)?;
        self.refresh();
        return Some(removed);
    }

    /// Remove each item once; returns how many were found.
    pub fn remove_many<'i>(&mut self, items: impl IntoIterator<Item = &'i T>) -> usize
    where
        T: PartialEq + 'i,
    {
        let mut count = 0usize;
        for item in items {
            if self.remove_raw(item.position(), item).is_some() {
                count += 1;
            }
        }
        if count > 0 {
            self.refresh();
        }
        return count;
    }

    pub(crate) fn remove_raw(&mut self, position: T::Position, item: &T) -> Option<T>
    where
        T: PartialEq,
    {
        let idx = self.avl.node_by_position(position);
        if idx == NONE {
            return None;
        }
        let at = self.avl.node(idx).value.payload.iter().position(|x| x == item)?;
        return Some(self.take_from_node(idx, at));
    }

    fn take_from_node(&mut self, idx: NodeIdx, at: usize) -> T {
        let node = self.avl.node_mut(idx);
        let position = node.position;
        let item = node.value.payload.remove(at);
        if node.value.payload.is_empty() {
            self.avl.remove(position);
        }
        return item;
    }

    /// Remove and return the item at rank `index`.
    pub fn remove_nth(&mut self, index: usize) -> Result<T, TreeError> {
        let (idx, at) = self.locate(index).ok_or(TreeError::IndexOutOfRange {
            index: saturating_rank(index),
            len: self.len(),
        })?;
        let item = self.take_from_node(idx, at);
        self.refresh();
        return Ok(item);
    }

    /// Apply `f` to the item at rank `index` and re-key it by its new position.
    ///
    /// This is how a change to an owned item's position (for example a
    /// nested tree whose extent moved) reaches the tree that owns it.
    pub fn modify(&mut self, index: usize, f: impl FnOnce(&mut T)) -> Result<(), TreeError> {
        let (idx, at) = self.locate(index).ok_or(TreeError::IndexOutOfRange {
            index: saturating_rank(index),
            len: self.len(),
        })?;
        let mut item = self.take_from_node(idx, at);
        f(&mut item);
        self.insert_raw(item.position(), item);
        self.refresh();
        return Ok(());
    }

    /// Keep only the items for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut doomed = Vec::new();
        for node in self.avl.in_order() {
            for (at, item) in node.value.payload.iter().enumerate() {
                if !keep(item) {
                    doomed.push((node.position, at));
                }
            }
        }
        // Back to front so earlier payload offsets stay valid.
        for (position, at) in doomed.iter().rev() {
            let idx = self.avl.node_by_position(*position);
            self.take_from_node(idx, *at);
        }
        if !doomed.is_empty() {
            self.refresh();
        }
        return doomed.len();
    }

    // --- Aggregate passes ---

    /// Re-derive rank ranges, then augmentation.
    pub(crate) fn refresh(&mut self) {
        trace!("refresh {} nodes", self.avl.node_count());
        self.update_indices();
        self.update_augmentation();
    }

    /// In-order pass assigning rank ranges.
    pub(crate) fn update_indices(&mut self) {
        let root = self.avl.root();
        self.update_indices_recurse(root, 0);
    }

    fn update_indices_recurse(&mut self, idx: NodeIdx, parent_stop: usize) {
        if idx == NONE {
            return;
        }
        let (left, right) = (self.avl.node(idx).left, self.avl.node(idx).right);
        let (payload_start, subtree_start) = if left != NONE {
            self.update_indices_recurse(left, parent_stop);
            let l = &self.avl.node(left).value;
            (l.subtree_stop, l.subtree_start)
        } else {
            (parent_stop, parent_stop)
        };
        let payload_stop = payload_start + self.avl.node(idx).value.payload.len();
        let subtree_stop = if right != NONE {
            self.update_indices_recurse(right, payload_stop);
            self.avl.node(right).value.subtree_stop
        } else {
            payload_stop
        };
        let value = &mut self.avl.node_mut(idx).value;
        value.payload_start = payload_start;
        value.payload_stop = payload_stop;
        value.subtree_start = subtree_start;
        value.subtree_stop = subtree_stop;
    }

    /// Post-order pass recomputing augmentation from payloads and children.
    pub(crate) fn update_augmentation(&mut self) {
        let root = self.avl.root();
        self.update_augmentation_recurse(root);
    }

    fn update_augmentation_recurse(&mut self, idx: NodeIdx) {
        if idx == NONE {
            return;
        }
        let (left, right) = (self.avl.node(idx).left, self.avl.node(idx).right);
        self.update_augmentation_recurse(left);
        self.update_augmentation_recurse(right);
        let aug = self.summarize(idx);
        self.avl.node_mut(idx).value.aug = aug;
    }

    /// A node's augmentation from its payload and its children's cached values.
    fn summarize(&self, idx: NodeIdx) -> A {
        let node = self.avl.node(idx);
        let mut aug = node.value.summarize_payload();
        if let Some(left) = self.avl.get(node.left) {
            aug.combine(&left.value.aug);
        }
        if let Some(right) = self.avl.get(node.right) {
            aug.combine(&right.value.aug);
        }
        return aug;
    }

    // --- Rank access ---

    /// The node and payload offset holding rank `index`.
    fn locate(&self, index: usize) -> Option<(NodeIdx, usize)> {
        let mut idx = self.avl.root();
        while idx != NONE {
            let node = self.avl.node(idx);
            let value = &node.value;
            if index < value.payload_start {
                idx = node.left;
            } else if index >= value.payload_stop {
                idx = node.right;
            } else {
                return Some((idx, index - value.payload_start));
            }
        }
        return None;
    }

    /// The item at rank `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        let (idx, at) = self.locate(index)?;
        return Some(&self.avl.node(idx).value.payload[at]);
    }

    /// The item at rank `index`; negative ranks count from the end.
    pub fn at(&self, index: isize) -> Result<&T, TreeError> {
        let len = self.len();
        let resolved = if index < 0 { len as isize + index } else { index };
        if resolved < 0 || resolved as usize >= len {
            return Err(TreeError::IndexOutOfRange { index, len });
        }
        return self.get(resolved as usize).ok_or(TreeError::IndexOutOfRange { index, len });
    }

    pub fn first(&self) -> Option<&T> {
        return self.get(0);
    }

    pub fn last(&self) -> Option<&T> {
        return self.len().checked_sub(1).and_then(|i| self.get(i));
    }

    /// The items with ranks in `range`, in order.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Result<Vec<&T>, TreeError> {
        let len = self.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => Some(s),
            Bound::Excluded(&s) => s.checked_add(1),
            Bound::Unbounded => Some(0),
        };
        let stop = match range.end_bound() {
            Bound::Included(&s) => s.checked_add(1),
            Bound::Excluded(&s) => Some(s),
            Bound::Unbounded => Some(len),
        };
        let (Some(start), Some(stop)) = (start, stop) else {
            return Err(TreeError::RangeOutOfBounds {
                start: start.unwrap_or(usize::MAX),
                stop: stop.unwrap_or(usize::MAX),
                len,
            });
        };
        if start > stop || stop > len {
            return Err(TreeError::RangeOutOfBounds { start, stop, len });
        }
        let mut out = Vec::with_capacity(stop - start);
        self.collect_ranks(self.avl.root(), start, stop, &mut out);
        return Ok(out);
    }

    fn collect_ranks<'a>(&'a self, idx: NodeIdx, start: usize, stop: usize, out: &mut Vec<&'a T>) {
        let Some(node) = self.avl.get(idx) else {
            return;
        };
        let value = &node.value;
        if value.subtree_stop <= start || value.subtree_start >= stop {
            return;
        }
        self.collect_ranks(node.left, start, stop, out);
        let from = start.max(value.payload_start);
        let to = stop.min(value.payload_stop);
        if from < to {
            out.extend(value.payload[from - value.payload_start..to - value.payload_start].iter());
        }
        self.collect_ranks(node.right, start, stop, out);
    }

    /// Rank of `item`, looked up at its own position.
    ///
    /// A reference taken from the tree resolves to its own slot; any other
    /// reference resolves to the first equal item.
    pub fn index(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        return self.index_at(item.position(), item);
    }

    pub fn index_at(&self, position: T::Position, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        let node = self.avl.get(self.avl.node_by_position(position))?;
        let payload = &node.value.payload;
        let at = match payload.iter().position(|x| std::ptr::eq(x, item)) {
            Some(at) => at,
            None => payload.iter().position(|x| x == item)?,
        };
        return Some(node.value.payload_start + at);
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        return self.index(item).is_some();
    }

    pub fn contains_at(&self, position: T::Position, item: &T) -> bool
    where
        T: PartialEq,
    {
        return self.index_at(position, item).is_some();
    }

    // --- Position queries ---

    /// Items at exactly `position`; empty if there are none.
    pub fn elements_starting_at(&self, position: T::Position) -> &[T] {
        return match self.avl.get(self.avl.node_by_position(position)) {
            Some(node) => node.value.payload.as_slice(),
            None => &[],
        };
    }

    /// First item at the nearest position strictly after `position`.
    pub fn element_after(&self, position: T::Position) -> Option<&T> {
        return self.avl.get(self.avl.node_after(position)).and_then(|n| n.value.payload.first());
    }

    /// Last item at the nearest position strictly before `position`.
    pub fn element_before(&self, position: T::Position) -> Option<&T> {
        return self.avl.get(self.avl.node_before(position)).and_then(|n| n.value.payload.last());
    }

    pub fn position_after(&self, position: T::Position) -> Option<T::Position> {
        return self.avl.position_after(position);
    }

    pub fn position_before(&self, position: T::Position) -> Option<T::Position> {
        return self.avl.position_before(position);
    }

    pub fn lowest_position(&self) -> Option<T::Position> {
        return self.avl.get(self.avl.first()).map(|n| n.position);
    }

    pub fn highest_position(&self) -> Option<T::Position> {
        return self.avl.get(self.avl.last()).map(|n| n.position);
    }

    /// Every distinct position, ascending.
    pub fn positions(&self) -> impl Iterator<Item = T::Position> + '_ {
        return self.avl.in_order().map(|n| n.position);
    }

    /// `(position, payload)` per node, ascending.
    pub fn payloads(&self) -> impl Iterator<Item = (T::Position, &[T])> + '_ {
        return self.avl.in_order().map(|n| (n.position, n.value.payload.as_slice()));
    }

    /// Items in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        return self.avl.in_order().flat_map(|n| n.value.payload.iter());
    }

    /// Items in reverse rank order.
    pub fn iter_rev(&self) -> impl Iterator<Item = &T> + '_ {
        return self.avl.in_order_rev().flat_map(|n| n.value.payload.iter().rev());
    }

    /// Height of the underlying AVL tree; -1 when empty.
    pub fn height(&self) -> i32 {
        return self.avl.height();
    }

    // --- Invariant checking ---

    /// Check balance, ordering, rank ranges and augmentation from scratch.
    pub fn validate(&self) -> Result<(), TreeError> {
        self.avl.check_balance().map_err(TreeError::Invariant)?;
        let mut rank = 0usize;
        self.validate_subtree(self.avl.root(), &mut rank)?;
        if rank != self.len() {
            return Err(TreeError::Invariant(format!("counted {} items, len() = {}", rank, self.len())));
        }
        return Ok(());
    }

    fn validate_subtree(&self, idx: NodeIdx, rank: &mut usize) -> Result<(), TreeError> {
        let Some(node) = self.avl.get(idx) else {
            return Ok(());
        };
        let value = &node.value;
        let subtree_start = *rank;
        self.validate_subtree(node.left, rank)?;
        if value.payload.is_empty() {
            return Err(TreeError::Invariant(format!("empty payload at {:?}", node.position)));
        }
        if value.payload_start != *rank || value.payload_stop != *rank + value.payload.len() {
            return Err(TreeError::Invariant(format!(
                "payload range {}..{} at {:?}, expected {}..{}",
                value.payload_start,
                value.payload_stop,
                node.position,
                *rank,
                *rank + value.payload.len()
            )));
        }
        for pair in value.payload.windows(2) {
            if (self.order)(&pair[0], &pair[1]) == Ordering::Greater {
                return Err(TreeError::Invariant(format!("payload out of order at {:?}", node.position)));
            }
        }
        *rank += value.payload.len();
        self.validate_subtree(node.right, rank)?;
        if value.subtree_start != subtree_start || value.subtree_stop != *rank {
            return Err(TreeError::Invariant(format!(
                "subtree range {}..{} at {:?}, expected {}..{}",
                value.subtree_start, value.subtree_stop, node.position, subtree_start, *rank
            )));
        }
        if self.summarize(idx) != value.aug {
            return Err(TreeError::Invariant(format!("stale augmentation at {:?}", node.position)));
        }
        return Ok(());
    }
}

/// A rank as reported in `TreeError::IndexOutOfRange`; huge ranks clamp to `isize::MAX`.
fn saturating_rank(index: usize) -> isize {
    return isize::try_from(index).unwrap_or(isize::MAX);
}

impl<T: Positioned, A: Augment<T>> Index<usize> for ElementTree<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        return match self.get(index) {
            Some(item) => item,
            None => panic!("index {} out of range for tree of length {}", index, self.len()),
        };
    }
}

impl<T: Positioned, A: Augment<T>> FromIterator<T> for ElementTree<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        return ElementTree::from_items(iter);
    }
}

impl<T: Positioned, A: Augment<T>> Extend<T> for ElementTree<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.insert_many(iter);
    }
}
