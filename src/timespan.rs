//! A ready-made interval item.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::Add;
use std::ops::Sub;

use crate::error::TreeError;
use crate::position::Positioned;
use crate::position::Relocatable;
use crate::position::Spanned;
use crate::position::Split;
use crate::position::Splittable;

/// A value occupying `[start, end)`.
///
/// Construction rejects `end < start`, so every `Timespan` handed to a tree
/// is well formed. Zero-length spans are allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timespan<P, V = ()> {
    start: P,
    end: P,
    value: V,
}

impl<P: Ord + Copy + Debug, V> Timespan<P, V> {
    pub fn new(start: P, end: P, value: V) -> Result<Timespan<P, V>, TreeError> {
        if end < start {
            return Err(TreeError::InvalidSpan {
                start: format!("{:?}", start),
                end: format!("{:?}", end),
            });
        }
        return Ok(Timespan { start, end, value });
    }

    #[inline(always)]
    pub fn start(&self) -> P {
        return self.start;
    }

    #[inline(always)]
    pub fn end(&self) -> P {
        return self.end;
    }

    #[inline(always)]
    pub fn value(&self) -> &V {
        return &self.value;
    }

    pub fn value_mut(&mut self) -> &mut V {
        return &mut self.value;
    }

    pub fn into_value(self) -> V {
        return self.value;
    }

    /// True if `position` lies strictly inside the span.
    pub fn overlaps(&self, position: P) -> bool {
        return self.start < position && position < self.end;
    }

    /// The `(start, end)` pair.
    pub fn bounds(&self) -> (P, P) {
        return (self.start, self.end);
    }
}

impl<P: Ord + Copy + Debug> Timespan<P, ()> {
    /// A span with no attached value.
    pub fn bare(start: P, end: P) -> Result<Timespan<P, ()>, TreeError> {
        return Timespan::new(start, end, ());
    }
}

impl<P: Ord + Copy + Debug + Sub<Output = P>, V> Timespan<P, V> {
    pub fn duration(&self) -> P {
        return self.end - self.start;
    }
}

impl<P: Ord + Copy + Debug, V: Ord> Positioned for Timespan<P, V> {
    type Position = P;

    #[inline(always)]
    fn position(&self) -> P {
        return self.start;
    }

    fn tiebreak(&self, other: &Self) -> Ordering {
        return self.value.cmp(&other.value);
    }
}

impl<P: Ord + Copy + Debug, V: Ord> Spanned for Timespan<P, V> {
    #[inline(always)]
    fn end_position(&self) -> P {
        return self.end;
    }
}

impl<P, V> Relocatable for Timespan<P, V>
where
    P: Ord + Copy + Debug + Add<Output = P> + Sub<Output = P>,
    V: Ord,
{
    fn relocate(&mut self, position: P) {
        let duration = self.end - self.start;
        self.start = position;
        self.end = position + duration;
    }
}

impl<P: Ord + Copy + Debug, V: Ord + Clone> Splittable for Timespan<P, V> {
    fn split_at(self, position: P) -> Split<Self> {
        if !self.overlaps(position) {
            return Split::Unchanged(self);
        }
        let left = Timespan {
            start: self.start,
            end: position,
            value: self.value.clone(),
        };
        let right = Timespan {
            start: position,
            end: self.end,
            value: self.value,
        };
        return Split::Pieces(left, right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_span() {
        let err = Timespan::new(4, 2, ()).unwrap_err();
        assert_eq!(
            err,
            TreeError::InvalidSpan { start: "4".to_string(), end: "2".to_string() }
        );
        assert!(Timespan::bare(3, 3).is_ok());
    }

    #[test]
    fn split_inside_produces_two_pieces() {
        let span = Timespan::new(0, 9, 'a').unwrap();
        match span.split_at(3) {
            Split::Pieces(left, right) => {
                assert_eq!(left.bounds(), (0, 3));
                assert_eq!(right.bounds(), (3, 9));
                assert_eq!(*left.value(), 'a');
                assert_eq!(*right.value(), 'a');
            }
            Split::Unchanged(_) => panic!("expected a split"),
        }
    }

    #[test]
    fn split_outside_or_on_boundary_is_unchanged() {
        let span = Timespan::bare(2, 5).unwrap();
        assert_eq!(span.split_at(1), Split::Unchanged(span));
        assert_eq!(span.split_at(2), Split::Unchanged(span));
        assert_eq!(span.split_at(5), Split::Unchanged(span));
        assert_eq!(span.split_at(7), Split::Unchanged(span));
    }

    #[test]
    fn relocate_keeps_duration() {
        let mut span = Timespan::new(2, 5, 0u8).unwrap();
        span.relocate(10);
        assert_eq!(span.bounds(), (10, 13));
        assert_eq!(span.duration(), 3);
    }
}
