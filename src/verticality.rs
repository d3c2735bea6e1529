//! Verticalities: everything happening at one instant.
//!
//! A verticality at position `p` collects the items that start at `p`,
//! stop at `p`, and sound across `p` without starting or stopping there.
//! Walking from one verticality to the next asks the tree for the next
//! start position, so iteration visits every distinct start position once.

use std::fmt::Debug;

use crate::position::Spanned;
use crate::timespan_tree::TimespanTree;

/// The items active around a single position.
pub struct Verticality<'a, T: Spanned> {
    tree: &'a TimespanTree<T>,
    offset: T::Position,
    start: Vec<&'a T>,
    stop: Vec<&'a T>,
    overlap: Vec<&'a T>,
}

impl<'a, T: Spanned> Clone for Verticality<'a, T> {
    fn clone(&self) -> Self {
        return Verticality {
            tree: self.tree,
            offset: self.offset,
            start: self.start.clone(),
            stop: self.stop.clone(),
            overlap: self.overlap.clone(),
        };
    }
}

impl<'a, T: Spanned + Debug> Debug for Verticality<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f
            .debug_struct("Verticality")
            .field("offset", &self.offset)
            .field("start", &self.start)
            .field("stop", &self.stop)
            .field("overlap", &self.overlap)
            .finish();
    }
}

impl<'a, T: Spanned> Verticality<'a, T> {
    pub(crate) fn new(
        tree: &'a TimespanTree<T>,
        offset: T::Position,
        start: Vec<&'a T>,
        stop: Vec<&'a T>,
        overlap: Vec<&'a T>,
    ) -> Verticality<'a, T> {
        return Verticality { tree, offset, start, stop, overlap };
    }

    #[inline(always)]
    pub fn offset(&self) -> T::Position {
        return self.offset;
    }

    /// Items starting here, sorted by end.
    pub fn start_timespans(&self) -> &[&'a T] {
        return &self.start;
    }

    /// Items ending here, sorted by `(position, end)`.
    pub fn stop_timespans(&self) -> &[&'a T] {
        return &self.stop;
    }

    /// Items sounding across this position.
    pub fn overlap_timespans(&self) -> &[&'a T] {
        return &self.overlap;
    }

    /// Items sounding at this position: those starting here, then those
    /// passing through.
    pub fn timespans(&self) -> Vec<&'a T> {
        let mut out = Vec::with_capacity(self.start.len() + self.overlap.len());
        out.extend(self.start.iter().copied());
        out.extend(self.overlap.iter().copied());
        return out;
    }

    /// Number of items sounding at this position.
    pub fn degree_of_overlap(&self) -> usize {
        return self.start.len() + self.overlap.len();
    }

    /// True when nothing sounds here. Items merely stopping do not count.
    pub fn is_empty(&self) -> bool {
        return self.start.is_empty() && self.overlap.is_empty();
    }

    pub fn next_start_offset(&self) -> Option<T::Position> {
        return self.tree.position_after(self.offset);
    }

    pub fn previous_start_offset(&self) -> Option<T::Position> {
        return self.tree.position_before(self.offset);
    }

    /// The verticality at the next start position.
    pub fn next(&self) -> Option<Verticality<'a, T>> {
        let offset = self.next_start_offset()?;
        return Some(self.tree.verticality_at(offset));
    }

    /// The verticality at the previous start position.
    pub fn previous(&self) -> Option<Verticality<'a, T>> {
        let offset = self.previous_start_offset()?;
        return Some(self.tree.verticality_at(offset));
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cursor<P> {
    Start,
    At(P),
    Done,
}

/// A verticality cursor that holds no borrow between steps.
///
/// Each step re-queries the tree relative to the last visited position, so
/// the tree can be edited between steps. Positions added behind the
/// cursor are not revisited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerticalityWalker<P> {
    cursor: Cursor<P>,
    reverse: bool,
}

impl<P: Ord + Copy + Debug> VerticalityWalker<P> {
    pub fn new(reverse: bool) -> VerticalityWalker<P> {
        return VerticalityWalker { cursor: Cursor::Start, reverse };
    }

    /// The position of the next step, without taking it.
    pub fn peek<T: Spanned<Position = P>>(&self, tree: &TimespanTree<T>) -> Option<P> {
        return match self.cursor {
            Cursor::Start if self.reverse => tree.highest_offset(),
            Cursor::Start => tree.lowest_offset(),
            Cursor::At(p) if self.reverse => tree.position_before(p),
            Cursor::At(p) => tree.position_after(p),
            Cursor::Done => None,
        };
    }

    /// Advance and return the verticality at the new position.
    pub fn step<'a, T: Spanned<Position = P>>(&mut self, tree: &'a TimespanTree<T>) -> Option<Verticality<'a, T>> {
        let Some(position) = self.peek(tree) else {
            self.cursor = Cursor::Done;
            return None;
        };
        self.cursor = Cursor::At(position);
        return Some(tree.verticality_at(position));
    }

    /// Start over from the first (or last) position.
    pub fn reset(&mut self) {
        self.cursor = Cursor::Start;
    }
}

/// Iterator over `TimespanTree::iter_verticalities`.
pub struct Verticalities<'a, T: Spanned> {
    tree: &'a TimespanTree<T>,
    walker: VerticalityWalker<T::Position>,
}

impl<'a, T: Spanned> Verticalities<'a, T> {
    pub(crate) fn new(tree: &'a TimespanTree<T>, reverse: bool) -> Verticalities<'a, T> {
        return Verticalities { tree, walker: VerticalityWalker::new(reverse) };
    }
}

impl<'a, T: Spanned> Iterator for Verticalities<'a, T> {
    type Item = Verticality<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        return self.walker.step(self.tree);
    }
}

/// Iterator over `TimespanTree::iter_verticalities_nwise`.
///
/// Windows come in iteration order; each window lists its verticalities
/// in ascending position order. Iteration stops at the first incomplete
/// window.
pub struct VerticalitiesNwise<'a, T: Spanned> {
    tree: &'a TimespanTree<T>,
    walker: VerticalityWalker<T::Position>,
    n: usize,
    reverse: bool,
}

impl<'a, T: Spanned> VerticalitiesNwise<'a, T> {
    pub(crate) fn new(tree: &'a TimespanTree<T>, n: usize, reverse: bool) -> VerticalitiesNwise<'a, T> {
        return VerticalitiesNwise {
            tree,
            walker: VerticalityWalker::new(reverse),
            n,
            reverse,
        };
    }
}

impl<'a, T: Spanned> Iterator for VerticalitiesNwise<'a, T> {
    type Item = Vec<Verticality<'a, T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.walker.step(self.tree)?;
        let mut window = Vec::with_capacity(self.n);
        window.push(first);
        while window.len() < self.n {
            let last = &window[window.len() - 1];
            let neighbour = if self.reverse { last.previous() } else { last.next() };
            match neighbour {
                Some(v) => window.push(v),
                None => return None,
            }
        }
        if self.reverse {
            window.reverse();
        }
        return Some(window);
    }
}
