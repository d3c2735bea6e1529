//! AVL tree over an arena of nodes.
//!
//! Structure:
//! - Nodes live in a `Vec` and link to their children by index (no raw pointers)
//! - Each position appears at most once; the node value holds whatever the
//!   layer above stores there
//! - Freed slots go on a free list and are reused by later inserts
//!
//! Heights follow the usual convention: a leaf has height 0 and a missing
//! child counts as -1, so `balance = height(right) - height(left)`.
//!
//! Operations:
//! - insert: O(log n) - recursive descent, rebalancing on the way back up
//! - remove: O(log n) - two-child nodes take their in-order successor's contents
//! - node_by_position / node_before / node_after: O(log n)
//! - in_order: lazy traversal with an explicit stack

use std::fmt::Debug;

use log::trace;

/// Index into the node arena.
pub type NodeIdx = u32;
/// Sentinel for a missing child or an empty tree.
pub const NONE: NodeIdx = u32::MAX;

/// A node keyed by `position`.
#[derive(Clone, Debug)]
pub struct AvlNode<P, V> {
    pub(crate) position: P,
    pub(crate) left: NodeIdx,
    pub(crate) right: NodeIdx,
    pub(crate) height: i32,
    pub(crate) value: V,
}

impl<P: Copy, V> AvlNode<P, V> {
    fn new(position: P, value: V) -> AvlNode<P, V> {
        return AvlNode {
            position,
            left: NONE,
            right: NONE,
            height: 0,
            value,
        };
    }

    #[inline(always)]
    pub fn position(&self) -> P {
        return self.position;
    }

    #[inline(always)]
    pub fn value(&self) -> &V {
        return &self.value;
    }

    #[inline(always)]
    pub fn left(&self) -> NodeIdx {
        return self.left;
    }

    #[inline(always)]
    pub fn right(&self) -> NodeIdx {
        return self.right;
    }

    #[inline(always)]
    pub fn height(&self) -> i32 {
        return self.height;
    }
}

/// A balanced binary search tree from positions to values.
#[derive(Clone, Debug)]
pub struct AvlTree<P, V> {
    /// Node slots. `None` marks a slot on the free list.
    nodes: Vec<Option<AvlNode<P, V>>>,
    /// Slots available for reuse.
    free: Vec<NodeIdx>,
    /// Root index, or `NONE` when empty.
    root: NodeIdx,
    /// Number of live nodes.
    count: usize,
}

impl<P, V> Default for AvlTree<P, V> {
    fn default() -> Self {
        return AvlTree {
            nodes: Vec::new(),
            free: Vec::new(),
            root: NONE,
            count: 0,
        };
    }
}

impl<P: Ord + Copy + Debug, V> AvlTree<P, V> {
    pub fn new() -> AvlTree<P, V> {
        return AvlTree::default();
    }

    #[inline(always)]
    pub fn root(&self) -> NodeIdx {
        return self.root;
    }

    /// Number of nodes (distinct positions).
    #[inline(always)]
    pub fn node_count(&self) -> usize {
        return self.count;
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        return self.root == NONE;
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = NONE;
        self.count = 0;
    }

    #[inline(always)]
    pub fn node(&self, idx: NodeIdx) -> &AvlNode<P, V> {
        return match &self.nodes[idx as usize] {
            Some(node) => node,
            None => panic!("node {} is not live", idx),
        };
    }

    #[inline(always)]
    pub fn node_mut(&mut self, idx: NodeIdx) -> &mut AvlNode<P, V> {
        return match &mut self.nodes[idx as usize] {
            Some(node) => node,
            None => panic!("node {} is not live", idx),
        };
    }

    /// The node if `idx` is not `NONE`.
    #[inline(always)]
    pub fn get(&self, idx: NodeIdx) -> Option<&AvlNode<P, V>> {
        if idx == NONE {
            return None;
        }
        return Some(self.node(idx));
    }

    #[inline(always)]
    fn height_of(&self, idx: NodeIdx) -> i32 {
        if idx == NONE {
            return -1;
        }
        return self.node(idx).height;
    }

    /// Height of the whole tree; -1 when empty.
    pub fn height(&self) -> i32 {
        return self.height_of(self.root);
    }

    /// `height(right) - height(left)` of a node.
    pub fn balance(&self, idx: NodeIdx) -> i32 {
        let node = self.node(idx);
        return self.height_of(node.right) - self.height_of(node.left);
    }

    /// Recompute a node's height from its children.
    fn update(&mut self, idx: NodeIdx) {
        let node = self.node(idx);
        let height = self.height_of(node.left).max(self.height_of(node.right)) + 1;
        self.node_mut(idx).height = height;
    }

    // --- Storage ---

    fn alloc(&mut self, position: P, value: V) -> NodeIdx {
        self.count += 1;
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = Some(AvlNode::new(position, value));
            return idx;
        }
        let idx = self.nodes.len() as NodeIdx;
        assert!(idx != NONE, "AvlTree: too many nodes");
        self.nodes.push(Some(AvlNode::new(position, value)));
        return idx;
    }

    fn release(&mut self, idx: NodeIdx) -> AvlNode<P, V> {
        self.count -= 1;
        self.free.push(idx);
        return match self.nodes[idx as usize].take() {
            Some(node) => node,
            None => panic!("node {} released twice", idx),
        };
    }

    /// Swap position and value between two live nodes, keeping their links.
    fn swap_contents(&mut self, a: NodeIdx, b: NodeIdx) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a as usize, b as usize) } else { (b as usize, a as usize) };
        let (head, tail) = self.nodes.split_at_mut(hi);
        if let (Some(x), Some(y)) = (head[lo].as_mut(), tail[0].as_mut()) {
            std::mem::swap(&mut x.position, &mut y.position);
            std::mem::swap(&mut x.value, &mut y.value);
        }
    }

    // --- Rotations ---

    /// Right child becomes the subtree root.
    fn rotate_left(&mut self, idx: NodeIdx) -> NodeIdx {
        let pivot = self.node(idx).right;
        trace!("rotate left at {:?}", self.node(idx).position);
        self.node_mut(idx).right = self.node(pivot).left;
        self.update(idx);
        self.node_mut(pivot).left = idx;
        self.update(pivot);
        return pivot;
    }

    /// Left child becomes the subtree root.
    fn rotate_right(&mut self, idx: NodeIdx) -> NodeIdx {
        let pivot = self.node(idx).left;
        trace!("rotate right at {:?}", self.node(idx).position);
        self.node_mut(idx).left = self.node(pivot).right;
        self.update(idx);
        self.node_mut(pivot).right = idx;
        self.update(pivot);
        return pivot;
    }

    /// Right child leans left: rotate it right, then rotate left here.
    fn rotate_right_left(&mut self, idx: NodeIdx) -> NodeIdx {
        let right = self.node(idx).right;
        let new_right = self.rotate_right(right);
        self.node_mut(idx).right = new_right;
        return self.rotate_left(idx);
    }

    /// Left child leans right: rotate it left, then rotate right here.
    fn rotate_left_right(&mut self, idx: NodeIdx) -> NodeIdx {
        let left = self.node(idx).left;
        let new_left = self.rotate_left(left);
        self.node_mut(idx).left = new_left;
        return self.rotate_right(idx);
    }

    /// Restore the AVL property at `idx` and return the new subtree root.
    fn rebalance(&mut self, idx: NodeIdx) -> NodeIdx {
        let balance = self.balance(idx);
        let root = if balance > 1 {
            if self.balance(self.node(idx).right) >= 0 {
                self.rotate_left(idx)
            } else {
                self.rotate_right_left(idx)
            }
        } else if balance < -1 {
            if self.balance(self.node(idx).left) <= 0 {
                self.rotate_right(idx)
            } else {
                self.rotate_left_right(idx)
            }
        } else {
            idx
        };
        let balance = self.balance(root);
        assert!(
            (-1..=1).contains(&balance),
            "AVL balance {} at {:?} after rebalance",
            balance,
            self.node(root).position
        );
        return root;
    }

    // --- Insert / remove ---

    /// Return the node at `position`, creating it with `make` if absent.
    ///
    /// The flag is true when a node was created.
    pub fn insert_with(&mut self, position: P, make: impl FnOnce() -> V) -> (NodeIdx, bool) {
        let existing = self.node_by_position(position);
        if existing != NONE {
            return (existing, false);
        }
        let idx = self.alloc(position, make());
        trace!("create node at {:?}", position);
        self.root = self.attach(self.root, idx);
        return (idx, true);
    }

    fn attach(&mut self, subtree: NodeIdx, idx: NodeIdx) -> NodeIdx {
        if subtree == NONE {
            return idx;
        }
        if self.node(idx).position < self.node(subtree).position {
            let left = self.attach(self.node(subtree).left, idx);
            self.node_mut(subtree).left = left;
        } else {
            let right = self.attach(self.node(subtree).right, idx);
            self.node_mut(subtree).right = right;
        }
        self.update(subtree);
        return self.rebalance(subtree);
    }

    /// Remove the node at `position`, returning its value.
    pub fn remove(&mut self, position: P) -> Option<V> {
        let mut removed = None;
        self.root = self.detach(self.root, position, &mut removed);
        if removed.is_some() {
            trace!("remove node at {:?}", position);
        }
        return removed;
    }

    fn detach(&mut self, subtree: NodeIdx, position: P, removed: &mut Option<V>) -> NodeIdx {
        if subtree == NONE {
            return NONE;
        }
        let (here, left, right) = {
            let node = self.node(subtree);
            (node.position, node.left, node.right)
        };
        if position < here {
            let new_left = self.detach(left, position, removed);
            self.node_mut(subtree).left = new_left;
        } else if position > here {
            let new_right = self.detach(right, position, removed);
            self.node_mut(subtree).right = new_right;
        } else if left == NONE || right == NONE {
            let node = self.release(subtree);
            *removed = Some(node.value);
            // The surviving child is already balanced.
            return if left == NONE { right } else { left };
        } else {
            // The successor's slot takes `position`, which is still the
            // smallest key in the right subtree, so detaching it there works.
            let successor = self.leftmost(right);
            self.swap_contents(subtree, successor);
            let new_right = self.detach(right, position, removed);
            self.node_mut(subtree).right = new_right;
        }
        self.update(subtree);
        return self.rebalance(subtree);
    }

    fn leftmost(&self, mut idx: NodeIdx) -> NodeIdx {
        while idx != NONE && self.node(idx).left != NONE {
            idx = self.node(idx).left;
        }
        return idx;
    }

    fn rightmost(&self, mut idx: NodeIdx) -> NodeIdx {
        while idx != NONE && self.node(idx).right != NONE {
            idx = self.node(idx).right;
        }
        return idx;
    }

    // --- Search ---

    /// Exact match, or `NONE`.
    pub fn node_by_position(&self, position: P) -> NodeIdx {
        let mut idx = self.root;
        while idx != NONE {
            let node = self.node(idx);
            if position < node.position {
                idx = node.left;
            } else if position > node.position {
                idx = node.right;
            } else {
                return idx;
            }
        }
        return NONE;
    }

    /// The node with the greatest position strictly less than `position`.
    pub fn node_before(&self, position: P) -> NodeIdx {
        let mut best = NONE;
        let mut idx = self.root;
        while idx != NONE {
            let node = self.node(idx);
            if node.position < position {
                best = idx;
                idx = node.right;
            } else {
                idx = node.left;
            }
        }
        return best;
    }

    /// The node with the least position strictly greater than `position`.
    pub fn node_after(&self, position: P) -> NodeIdx {
        let mut best = NONE;
        let mut idx = self.root;
        while idx != NONE {
            let node = self.node(idx);
            if node.position > position {
                best = idx;
                idx = node.left;
            } else {
                idx = node.right;
            }
        }
        return best;
    }

    pub fn position_before(&self, position: P) -> Option<P> {
        return self.get(self.node_before(position)).map(|n| n.position);
    }

    pub fn position_after(&self, position: P) -> Option<P> {
        return self.get(self.node_after(position)).map(|n| n.position);
    }

    /// Leftmost node, or `NONE`.
    pub fn first(&self) -> NodeIdx {
        return self.leftmost(self.root);
    }

    /// Rightmost node, or `NONE`.
    pub fn last(&self) -> NodeIdx {
        return self.rightmost(self.root);
    }

    pub fn in_order(&self) -> InOrder<'_, P, V> {
        return InOrder::new(self, false);
    }

    pub fn in_order_rev(&self) -> InOrder<'_, P, V> {
        return InOrder::new(self, true);
    }

    // --- Invariant checking ---

    /// Verify cached heights, the balance bound, and key order.
    ///
    /// Returns the height of the checked tree.
    pub fn check_balance(&self) -> Result<i32, String> {
        return self.check_subtree(self.root, None, None);
    }

    fn check_subtree(&self, idx: NodeIdx, low: Option<P>, high: Option<P>) -> Result<i32, String> {
        if idx == NONE {
            return Ok(-1);
        }
        let node = self.node(idx);
        if low.is_some_and(|low| node.position <= low) || high.is_some_and(|high| node.position >= high) {
            return Err(format!("position {:?} out of order", node.position));
        }
        let left = self.check_subtree(node.left, low, Some(node.position))?;
        let right = self.check_subtree(node.right, Some(node.position), high)?;
        let height = left.max(right) + 1;
        if height != node.height {
            return Err(format!(
                "cached height {} != {} at {:?}",
                node.height, height, node.position
            ));
        }
        if !(-1..=1).contains(&(right - left)) {
            return Err(format!("balance {} at {:?}", right - left, node.position));
        }
        return Ok(height);
    }
}

/// In-order traversal; positions strictly increase (or decrease when reversed).
pub struct InOrder<'a, P, V> {
    tree: &'a AvlTree<P, V>,
    stack: Vec<NodeIdx>,
    reverse: bool,
}

impl<'a, P: Ord + Copy + Debug, V> InOrder<'a, P, V> {
    fn new(tree: &'a AvlTree<P, V>, reverse: bool) -> InOrder<'a, P, V> {
        let mut iter = InOrder {
            tree,
            stack: Vec::with_capacity(tree.height().max(0) as usize + 1),
            reverse,
        };
        iter.descend(tree.root);
        return iter;
    }

    fn descend(&mut self, mut idx: NodeIdx) {
        while idx != NONE {
            self.stack.push(idx);
            let node = self.tree.node(idx);
            idx = if self.reverse { node.right } else { node.left };
        }
    }
}

impl<'a, P: Ord + Copy + Debug, V> Iterator for InOrder<'a, P, V> {
    type Item = &'a AvlNode<P, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let node = self.tree.node(idx);
        self.descend(if self.reverse { node.left } else { node.right });
        return Some(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(tree: &AvlTree<i32, u32>) -> Vec<i32> {
        return tree.in_order().map(|n| n.position()).collect();
    }

    #[test]
    fn empty_tree() {
        let tree: AvlTree<i32, u32> = AvlTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), -1);
        assert_eq!(tree.node_by_position(3), NONE);
        assert_eq!(tree.position_after(3), None);
        assert_eq!(tree.check_balance(), Ok(-1));
    }

    #[test]
    fn insert_returns_existing_node() {
        let mut tree = AvlTree::new();
        let (a, created_a) = tree.insert_with(5, || 1u32);
        let (b, created_b) = tree.insert_with(5, || 2u32);
        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_eq!(*tree.node(a).value(), 1);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree = AvlTree::new();
        for i in 0..1024 {
            tree.insert_with(i, || i as u32);
        }
        assert_eq!(tree.node_count(), 1024);
        // A perfectly filled AVL tree of 1024 nodes has height 10.
        assert_eq!(tree.check_balance(), Ok(10));
        assert_eq!(positions(&tree), (0..1024).collect::<Vec<_>>());
    }

    #[test]
    fn double_rotations() {
        // Right-left case.
        let mut tree = AvlTree::new();
        for p in [10, 30, 20] {
            tree.insert_with(p, || 0u32);
        }
        assert_eq!(tree.node(tree.root()).position(), 20);
        assert!(tree.check_balance().is_ok());

        // Left-right case.
        let mut tree = AvlTree::new();
        for p in [30, 10, 20] {
            tree.insert_with(p, || 0u32);
        }
        assert_eq!(tree.node(tree.root()).position(), 20);
        assert!(tree.check_balance().is_ok());
    }

    #[test]
    fn remove_leaf_inner_and_root() {
        let mut tree = AvlTree::new();
        for p in [50, 30, 70, 20, 40, 60, 80, 35] {
            tree.insert_with(p, || p as u32);
        }
        assert_eq!(tree.remove(20), Some(20));
        assert_eq!(tree.remove(30), Some(30));
        let root = tree.node(tree.root()).position();
        assert_eq!(tree.remove(root), Some(root as u32));
        assert_eq!(tree.remove(99), None);
        assert!(tree.check_balance().is_ok());
        let mut expected = vec![35, 40, 50, 60, 70, 80];
        expected.retain(|p| *p != root);
        assert_eq!(positions(&tree), expected);
        // Values follow their positions through successor splicing.
        for node in tree.in_order() {
            assert_eq!(node.position() as u32, *node.value());
        }
    }

    #[test]
    fn remove_everything_reuses_slots() {
        let mut tree = AvlTree::new();
        for i in 0..100 {
            tree.insert_with((i * 37) % 100, || i as u32);
        }
        for i in 0..100 {
            assert!(tree.remove((i * 53) % 100).is_some());
            assert!(tree.check_balance().is_ok());
        }
        assert!(tree.is_empty());
        assert_eq!(tree.root(), NONE);
        assert_eq!(tree.node_count(), 0);

        tree.insert_with(7, || 7);
        assert_eq!(tree.nodes.len(), 100);
    }

    #[test]
    fn before_and_after() {
        let mut tree = AvlTree::new();
        for p in [0, 10, 20, 30, 40] {
            tree.insert_with(p, || 0u32);
        }
        assert_eq!(tree.position_before(0), None);
        assert_eq!(tree.position_before(1), Some(0));
        assert_eq!(tree.position_before(20), Some(10));
        assert_eq!(tree.position_before(100), Some(40));
        assert_eq!(tree.position_after(-5), Some(0));
        assert_eq!(tree.position_after(20), Some(30));
        assert_eq!(tree.position_after(25), Some(30));
        assert_eq!(tree.position_after(40), None);
        assert_eq!(tree.node(tree.first()).position(), 0);
        assert_eq!(tree.node(tree.last()).position(), 40);
    }

    #[test]
    fn reverse_iteration() {
        let mut tree = AvlTree::new();
        for p in [3, 1, 4, 5, 9, 2, 6] {
            tree.insert_with(p, || 0u32);
        }
        let rev: Vec<i32> = tree.in_order_rev().map(|n| n.position()).collect();
        assert_eq!(rev, vec![9, 6, 5, 4, 3, 2, 1]);
    }
}
