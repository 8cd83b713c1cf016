//! Element domains.
//!
//! The leaf algorithms don't care what they store, but the engine keeps two
//! kinds of trees apart: sequences of [`Item`]s and arrays whose members are
//! whole [`Value`]s. Each kind is a [`Domain`], and a domain is the only place
//! that knows how to allocate buffers and wrap them up as nodes.

use std::{fmt, sync::Arc};

use smallvec::SmallVec;

use crate::{leaf::Leaf, partial::PartialLeaf, MAX_LEAF, MIN_LEAF};

/// The longest run ever assembled in one go: a partial leaf merged with a
/// full leaf.
pub const BUFFER_CAPACITY: usize = MAX_LEAF + MIN_LEAF - 1;

/// Scratch space used while an edit assembles the contents of new nodes.
pub type Buffer<E> = SmallVec<[E; BUFFER_CAPACITY]>;

/// The factories a family of nodes needs.
///
/// Implementors are usually empty marker types. Everything else (insertion,
/// removal, rebalancing, concatenation) is shared by all domains.
pub trait Domain: Sized {
    type Elem: Clone;

    /// Name used when printing nodes of this domain.
    const NAME: &'static str;

    /// Allocates an empty buffer for at least `size` elements.
    fn new_values_array(size: usize) -> Buffer<Self::Elem>;

    /// Wraps a run of `MIN_LEAF..=MAX_LEAF` elements as a leaf.
    fn new_leaf(values: Buffer<Self::Elem>) -> Leaf<Self>;

    /// Wraps a run of fewer than `MIN_LEAF` elements as a partial leaf.
    fn new_partial_leaf(values: Buffer<Self::Elem>) -> PartialLeaf<Self>;
}

/// An atomic item.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Item {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(Arc<str>),
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Boolean(b) => write!(f, "{b}"),
            Item::Integer(i) => write!(f, "{i}"),
            Item::Double(d) => write!(f, "{d}"),
            Item::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Item {
    fn from(i: i64) -> Self {
        Item::Integer(i)
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::String(s.into())
    }
}

/// A composite value: an immutable, cheaply cloned sequence of items.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Value(Arc<[Item]>);

impl Value {
    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Value {
    fn default() -> Self {
        Value(std::iter::empty().collect())
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        Value(Arc::new([item]))
    }
}

impl FromIterator<Item> for Value {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Value(iter.into_iter().collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, ")")
    }
}

/// Sequences of items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Items;

impl Domain for Items {
    type Elem = Item;

    const NAME: &'static str = "ItemLeaf";

    fn new_values_array(size: usize) -> Buffer<Item> {
        Buffer::with_capacity(size)
    }

    fn new_leaf(values: Buffer<Item>) -> Leaf<Self> {
        Leaf::from_buffer(values)
    }

    fn new_partial_leaf(values: Buffer<Item>) -> PartialLeaf<Self> {
        PartialLeaf::from_buffer(values)
    }
}

/// Array members, each of which is a whole value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Values;

impl Domain for Values {
    type Elem = Value;

    const NAME: &'static str = "ValueLeaf";

    fn new_values_array(size: usize) -> Buffer<Value> {
        Buffer::with_capacity(size)
    }

    fn new_leaf(values: Buffer<Value>) -> Leaf<Self> {
        Leaf::from_buffer(values)
    }

    fn new_partial_leaf(values: Buffer<Value>) -> PartialLeaf<Self> {
        PartialLeaf::from_buffer(values)
    }
}
