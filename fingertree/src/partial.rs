use std::{fmt, sync::Arc};

use imbl_sized_chunks::Chunk;
use log::trace;

use crate::{
    domain::{Buffer, Domain},
    error::ArityError,
    fringe::{push_merged, Fringe, NodeLike},
    metrics::increment,
    MAX_SMALL, MIN_LEAF,
};

/// A run of fewer than `MIN_LEAF` elements.
///
/// Partial leaves are scaffolding: slicing or underflowing removals produce
/// them, and [`append`](NodeLike::append) absorbs them into a neighbour. The
/// only place one can survive is as the only node of a tiny tree.
pub struct PartialLeaf<D: Domain> {
    values: Arc<Chunk<D::Elem, MAX_SMALL>>,
}

impl<D: Domain> PartialLeaf<D> {
    /// Wraps a buffer holding fewer than `MIN_LEAF` elements.
    ///
    /// Panics if the buffer holds more.
    pub fn from_buffer(values: Buffer<D::Elem>) -> Self {
        assert!(
            values.len() < MIN_LEAF,
            "wrong partial {} size: {}",
            D::NAME,
            values.len()
        );
        PartialLeaf {
            values: Arc::new(values.into_iter().collect()),
        }
    }

    pub fn try_from_elems<I: IntoIterator<Item = D::Elem>>(elems: I) -> Result<Self, ArityError> {
        let mut values = D::new_values_array(MIN_LEAF);
        let mut found = 0;
        for elt in elems {
            found += 1;
            if found < MIN_LEAF {
                values.push(elt);
            }
        }

        if found < MIN_LEAF {
            Ok(D::new_partial_leaf(values))
        } else {
            Err(ArityError::Partial {
                found,
                limit: MIN_LEAF,
            })
        }
    }

    pub fn values(&self) -> &[D::Elem] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, D::Elem> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn into_values(self) -> Chunk<D::Elem, MAX_SMALL> {
        Arc::unwrap_or_clone(self.values)
    }

    /// Panics if this node isn't deficient. Returns the number of elements
    /// otherwise.
    pub fn check_invariants(&self) -> usize {
        assert!(
            self.values.len() < MIN_LEAF,
            "wrong partial {} size: {}",
            D::NAME,
            self.values.len()
        );
        self.values.len()
    }
}

impl<D: Domain> NodeLike<D> for PartialLeaf<D> {
    fn size(&self) -> usize {
        self.values.len()
    }

    /// Merges this run into the node before it, whatever that node is.
    fn append(self, nodes: &mut Vec<Fringe<D>>) -> usize {
        let Some(prev) = nodes.pop() else {
            nodes.push(Fringe::Partial(self));
            return nodes.len();
        };

        let n = prev.size() + self.size();
        trace!(
            "{}: absorbing a partial leaf of {} into its predecessor ({n} total)",
            D::NAME,
            self.size()
        );
        increment!("leaf::append::absorb_partial");

        let mut vals = D::new_values_array(n);
        match prev {
            Fringe::Leaf(leaf) => vals.extend(leaf.into_values()),
            Fringe::Partial(partial) => vals.extend(partial.into_values()),
        }
        vals.extend(self.into_values());
        push_merged(nodes, vals);
        nodes.len()
    }
}

impl<D: Domain> Clone for PartialLeaf<D> {
    fn clone(&self) -> Self {
        PartialLeaf {
            values: Arc::clone(&self.values),
        }
    }
}

impl<D: Domain> PartialEq for PartialLeaf<D>
where
    D::Elem: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.values() == other.values()
    }
}

impl<D: Domain> fmt::Debug for PartialLeaf<D>
where
    D::Elem: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Partial{}({})", D::NAME, self.values.len())?;
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl<D: Domain> serde::Serialize for PartialLeaf<D>
where
    D::Elem: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for elt in self.iter() {
            seq.serialize_element(elt)?;
        }
        seq.end()
    }
}

impl<'de, D: Domain> serde::Deserialize<'de> for PartialLeaf<D>
where
    D::Elem: serde::Deserialize<'de>,
{
    fn deserialize<De>(deserializer: De) -> Result<Self, De::Error>
    where
        De: serde::Deserializer<'de>,
    {
        let vec = <Vec<D::Elem> as serde::Deserialize>::deserialize(deserializer)?;
        PartialLeaf::try_from_elems(vec).map_err(serde::de::Error::custom)
    }
}
