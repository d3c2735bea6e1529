//! AFL Fuzz harness for TimespanTree
//!
//! Every operation is applied to the tree and to a plain `Vec` of the same
//! items. After each operation the harness checks:
//! 1. Structure: `validate()` passes (balance, rank ranges, end times)
//! 2. Contents: the in-order listing equals the sorted `Vec`
//! 3. Queries: starting/stopping/overlapping agree with a linear scan

use afl::fuzz;
use offset_tree::Timespan;
use offset_tree::TimespanTree;

type Span = Timespan<i16, u16>;

/// Operation types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    /// Insert a span starting at `start` lasting `len`
    Insert { start: u8, len: u8 },
    /// Remove the item at a fraction of the current length
    Remove { rank_frac: u8 },
    /// Split every item sounding across `at`
    Split { at: u8 },
    /// Run every query at `at`
    Probe { at: u8 },
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 4;
        let rest = &bytes[1..];

        match op_type {
            0 if rest.len() >= 2 => {
                let op = FuzzOp::Insert { start: rest[0], len: rest[1] % 32 };
                Some((op, &rest[2..]))
            }
            1 if !rest.is_empty() => Some((FuzzOp::Remove { rank_frac: rest[0] }, &rest[1..])),
            2 if !rest.is_empty() => Some((FuzzOp::Split { at: rest[0] }, &rest[1..])),
            3 if !rest.is_empty() => Some((FuzzOp::Probe { at: rest[0] }, &rest[1..])),
            _ => None,
        }
    }
}

fn sorted(mut items: Vec<Span>) -> Vec<Span> {
    items.sort_by_key(|x| (x.start(), x.end(), *x.value()));
    return items;
}

fn check_queries(tree: &TimespanTree<Span>, model: &[Span], at: i16) {
    let starting: Vec<Span> = tree.elements_starting_at(at).to_vec();
    let expected: Vec<Span> = model.iter().filter(|x| x.start() == at).copied().collect();
    assert_eq!(sorted(starting), sorted(expected), "starting at {}", at);

    let stopping: Vec<Span> = tree.elements_stopping_at(at).into_iter().copied().collect();
    let expected: Vec<Span> = model.iter().filter(|x| x.end() == at).copied().collect();
    assert_eq!(sorted(stopping), sorted(expected), "stopping at {}", at);

    let overlapping: Vec<Span> = tree.elements_overlapping(at).into_iter().copied().collect();
    let expected: Vec<Span> = model.iter().filter(|x| x.overlaps(at)).copied().collect();
    assert_eq!(sorted(overlapping), sorted(expected), "overlapping {}", at);
}

fn main() {
    fuzz!(|data: &[u8]| {
        let mut tree: TimespanTree<Span> = TimespanTree::new();
        let mut model: Vec<Span> = Vec::new();
        let mut next_id = 0u16;
        let mut remaining = data;

        // Parse and execute operations
        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;

            match op {
                FuzzOp::Insert { start, len } => {
                    let start = start as i16;
                    let item = Timespan::new(start, start + len as i16, next_id).unwrap();
                    next_id = next_id.wrapping_add(1);
                    tree.insert(item);
                    model.push(item);
                }

                FuzzOp::Remove { rank_frac } => {
                    if !tree.is_empty() {
                        let rank = ((rank_frac as usize) * tree.len() / 256).min(tree.len() - 1);
                        let item = tree[rank];
                        assert_eq!(tree.remove(&item), Some(item));
                        let at = model.iter().position(|x| *x == item).unwrap();
                        model.swap_remove(at);
                    }
                }

                FuzzOp::Split { at } => {
                    let at = at as i16;
                    let cut: Vec<Span> = model.iter().filter(|x| x.overlaps(at)).copied().collect();
                    assert_eq!(tree.split_at(at), cut.len());
                    model.retain(|x| !x.overlaps(at));
                    for item in cut {
                        model.push(Timespan::new(item.start(), at, *item.value()).unwrap());
                        model.push(Timespan::new(at, item.end(), *item.value()).unwrap());
                    }
                }

                FuzzOp::Probe { at } => check_queries(&tree, &model, at as i16),
            }

            assert!(tree.validate().is_ok(), "invariants broken after {:?}", op);
            assert_eq!(tree.len(), model.len());
        }

        let listed: Vec<Span> = tree.iter().copied().collect();
        assert_eq!(sorted(listed), sorted(model.clone()));
    });
}
