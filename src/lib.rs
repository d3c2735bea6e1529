//! Offset Tree - balanced trees indexing time-stamped elements.
//!
//! Three layers, each built on the one before:
//!
//! | Layer | Type | Adds |
//! |-------|------|------|
//! | `avl` | `AvlTree` | balanced search by position, predecessor/successor |
//! | `element` | `ElementTree` | payloads per position, rank access (`tree[i]`, slices) |
//! | `timespan_tree` | `TimespanTree` | end-time bounds, overlap queries, verticalities, splitting |
//!
//! Items are opaque: the trees only read a start position (`Positioned`)
//! and, for interval queries, an end position (`Spanned`).
//!
//! # Quick Start
//!
//! ```
//! use offset_tree::Timespan;
//! use offset_tree::TimespanTree;
//!
//! let mut tree = TimespanTree::new();
//! tree.insert(Timespan::new(0, 4, "bass").unwrap());
//! tree.insert(Timespan::new(2, 3, "alto").unwrap());
//! tree.insert(Timespan::new(3, 6, "soprano").unwrap());
//!
//! assert_eq!(tree.len(), 3);
//! assert_eq!(tree[0].value(), &"bass");
//!
//! let sounding: Vec<_> = tree.elements_overlapping(3).iter().map(|x| *x.value()).collect();
//! assert_eq!(sounding, vec!["bass"]);
//!
//! let v = tree.verticality_at(3);
//! assert_eq!(v.start_timespans().len(), 1);
//! assert_eq!(v.stop_timespans().len(), 1);
//! ```

pub mod avl;
pub mod element;
pub mod error;
pub mod position;
pub mod timespan;
pub mod timespan_tree;
pub mod verticality;

pub use element::Augment;
pub use element::ElementTree;
pub use error::TreeError;
pub use position::Positioned;
pub use position::Relocatable;
pub use position::Spanned;
pub use position::Split;
pub use position::Splittable;
pub use timespan::Timespan;
pub use timespan_tree::EndTimes;
pub use timespan_tree::TimespanTree;
pub use verticality::Verticality;
pub use verticality::VerticalityWalker;
