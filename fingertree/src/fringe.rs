//! The protocol between leaves and the upper layers of a tree.
//!
//! The upper layers see the bottom of a tree as a run of [`Fringe`] nodes:
//! full leaves, plus at most one partial leaf while an edit is in progress.
//! Concatenating two trees (or stitching a slice back together) is done by
//! [`append`](NodeLike::append)ing nodes one by one to a caller-owned output,
//! which merges partial leaves into their neighbours as it goes.

use crate::{
    domain::{Buffer, Domain},
    leaf::Leaf,
    partial::PartialLeaf,
    MAX_LEAF, MIN_LEAF,
};

/// Operations shared by every node that can show up in a fringe.
pub trait NodeLike<D: Domain> {
    /// The number of elements in this node.
    fn size(&self) -> usize;

    /// Appends this node to the end of `nodes`, merging it with the last
    /// node if either of them is a partial leaf.
    ///
    /// Returns the next free position in `nodes`, i.e. its new length.
    fn append(self, nodes: &mut Vec<Fringe<D>>) -> usize;
}

/// A node at the bottom of a tree: either a leaf or a partial leaf.
pub enum Fringe<D: Domain> {
    Leaf(Leaf<D>),
    Partial(PartialLeaf<D>),
}

/// Pushes a concatenated run as one partial leaf, one leaf, or (when it's too
/// long for a single leaf) two leaves of about the same size.
pub(crate) fn push_merged<D: Domain>(nodes: &mut Vec<Fringe<D>>, mut vals: Buffer<D::Elem>) {
    let n = vals.len();
    if n < MIN_LEAF {
        nodes.push(Fringe::Partial(D::new_partial_leaf(vals)));
    } else if n <= MAX_LEAF {
        nodes.push(Fringe::Leaf(D::new_leaf(vals)));
    } else {
        let ll = n / 2;
        let mut right = D::new_values_array(n - ll);
        right.extend(vals.drain(ll..));
        nodes.push(Fringe::Leaf(D::new_leaf(vals)));
        nodes.push(Fringe::Leaf(D::new_leaf(right)));
    }
}

impl<D: Domain> Fringe<D> {
    /// Chops a run of elements into a fringe.
    ///
    /// All the nodes are full leaves, except when there are fewer than
    /// `MIN_LEAF` elements in total: then the result is a single partial leaf
    /// (or nothing at all, for an empty run).
    pub fn from_elems<I: IntoIterator<Item = D::Elem>>(elems: I) -> Vec<Fringe<D>> {
        let mut nodes = Vec::new();
        let mut vals = D::new_values_array(MAX_LEAF);
        for elt in elems {
            vals.push(elt);
            if vals.len() == MAX_LEAF {
                let full = std::mem::replace(&mut vals, D::new_values_array(MAX_LEAF));
                D::new_leaf(full).append(&mut nodes);
            }
        }

        if vals.len() >= MIN_LEAF {
            D::new_leaf(vals).append(&mut nodes);
        } else if !vals.is_empty() {
            D::new_partial_leaf(vals).append(&mut nodes);
        }
        nodes
    }

    pub fn values(&self) -> &[D::Elem] {
        match self {
            Fringe::Leaf(leaf) => leaf.values(),
            Fringe::Partial(partial) => partial.values(),
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Fringe::Partial(_))
    }

    /// Panics if this node is out of bounds for its kind. Returns the number
    /// of elements otherwise.
    pub fn check_invariants(&self) -> usize {
        match self {
            Fringe::Leaf(leaf) => leaf.check_invariants(),
            Fringe::Partial(partial) => partial.check_invariants(),
        }
    }
}

impl<D: Domain> NodeLike<D> for Fringe<D> {
    fn size(&self) -> usize {
        match self {
            Fringe::Leaf(leaf) => leaf.size(),
            Fringe::Partial(partial) => partial.size(),
        }
    }

    fn append(self, nodes: &mut Vec<Fringe<D>>) -> usize {
        match self {
            Fringe::Leaf(leaf) => leaf.append(nodes),
            Fringe::Partial(partial) => partial.append(nodes),
        }
    }
}

/// Concatenates two fringes.
pub fn concat<D: Domain>(
    mut left: Vec<Fringe<D>>,
    right: impl IntoIterator<Item = Fringe<D>>,
) -> Vec<Fringe<D>> {
    for node in right {
        node.append(&mut left);
    }
    left
}

/// All the elements of a fringe, in order.
pub fn flatten<D: Domain>(nodes: &[Fringe<D>]) -> impl Iterator<Item = &D::Elem> + '_ {
    nodes.iter().flat_map(|node| node.values().iter())
}

/// Checks that a fringe is made of valid leaves, with a partial leaf allowed
/// only as the sole node. Returns the total number of elements.
pub fn check_fringe<D: Domain>(nodes: &[Fringe<D>]) -> usize {
    if let [Fringe::Partial(partial)] = nodes {
        return partial.check_invariants();
    }

    nodes
        .iter()
        .map(|node| match node {
            Fringe::Leaf(leaf) => leaf.check_invariants(),
            Fringe::Partial(partial) => {
                panic!("stray partial leaf of size {} in a fringe", partial.size())
            }
        })
        .sum()
}

impl<D: Domain> Clone for Fringe<D> {
    fn clone(&self) -> Self {
        match self {
            Fringe::Leaf(leaf) => Fringe::Leaf(leaf.clone()),
            Fringe::Partial(partial) => Fringe::Partial(partial.clone()),
        }
    }
}

impl<D: Domain> PartialEq for Fringe<D>
where
    D::Elem: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Fringe::Leaf(a), Fringe::Leaf(b)) => a == b,
            (Fringe::Partial(a), Fringe::Partial(b)) => a == b,
            _ => false,
        }
    }
}

impl<D: Domain> std::fmt::Debug for Fringe<D>
where
    D::Elem: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fringe::Leaf(leaf) => std::fmt::Debug::fmt(leaf, f),
            Fringe::Partial(partial) => std::fmt::Debug::fmt(partial, f),
        }
    }
}

impl<D: Domain> serde::Serialize for Fringe<D>
where
    D::Elem: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Fringe::Leaf(leaf) => serde::Serialize::serialize(leaf, serializer),
            Fringe::Partial(partial) => serde::Serialize::serialize(partial, serializer),
        }
    }
}

impl<'de, D: Domain> serde::Deserialize<'de> for Fringe<D>
where
    D::Elem: serde::Deserialize<'de>,
{
    fn deserialize<De>(deserializer: De) -> Result<Self, De::Error>
    where
        De: serde::Deserializer<'de>,
    {
        let vec = <Vec<D::Elem> as serde::Deserialize>::deserialize(deserializer)?;
        let node = if vec.len() < MIN_LEAF {
            PartialLeaf::try_from_elems(vec).map(Fringe::Partial)
        } else {
            Leaf::try_from_elems(vec).map(Fringe::Leaf)
        };
        node.map_err(serde::de::Error::custom)
    }
}
