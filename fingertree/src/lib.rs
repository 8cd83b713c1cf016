//! This crate provides the leaf layer of the persistent finger trees backing
//! Quill's sequences and arrays.
//!
//! A [`Leaf`] is an immutable run of between [`MIN_LEAF`] and [`MAX_LEAF`]
//! elements. Every edit returns fresh nodes, so every version of a sequence
//! that was ever observed stays valid and can share its untouched leaves with
//! newer versions. A [`PartialLeaf`] is the below-minimum run that shows up
//! while rebalancing; it is always absorbed by a neighbour before the edit
//! completes (or it is the only node of a tiny tree).
//!
//! The upper layers of the tree (digits and the deep spine) only talk to the
//! leaves through the operations exposed here: [`Leaf::insert`],
//! [`Leaf::remove`], [`NodeLike::append`], [`Leaf::slice`], [`Leaf::reverse`]
//! and [`Leaf::check_invariants`]. Structural changes are reported back as
//! [`Insertion`] and [`Removal`] values, so the caller knows exactly which of
//! its children were replaced, merged or split.
//!
//! The algorithms are written once, against the [`Domain`] trait. The crate
//! ships two domains: [`Items`] for sequences of atomic items and [`Values`]
//! for arrays of composite values.

pub mod domain;
pub mod error;
pub mod fringe;
pub mod leaf;
pub mod metrics;
pub mod partial;

/// Minimum size of a leaf.
pub const MIN_LEAF: usize = 8;
/// Maximum size of a leaf.
pub const MAX_LEAF: usize = 2 * MIN_LEAF - 1;
/// Minimum number of elements in a digit.
pub const MIN_DIGIT: usize = MIN_LEAF / 2;
/// Maximum number of elements in a digit.
pub const MAX_DIGIT: usize = MAX_LEAF + MIN_DIGIT;
/// Maximum size of a sequence that is stored without a tree.
pub const MAX_SMALL: usize = 2 * MIN_DIGIT - 1;

pub use domain::{Buffer, Domain, Item, Items, Value, Values};
pub use error::ArityError;
pub use fringe::{Fringe, NodeLike};
pub use leaf::{Insertion, Leaf, Removal};
pub use partial::PartialLeaf;
