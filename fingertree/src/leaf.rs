use std::{fmt, hash::Hash, ops::Index, sync::Arc};

use imbl_sized_chunks::Chunk;
use log::trace;

use crate::{
    domain::{Buffer, Domain},
    error::ArityError,
    fringe::{push_merged, Fringe, NodeLike},
    metrics::increment,
    partial::PartialLeaf,
    MAX_LEAF, MIN_LEAF,
};

/// An immutable run of `MIN_LEAF..=MAX_LEAF` elements at the fringe of a tree.
///
/// A leaf never changes after it has been built. Edits produce new leaves and
/// report them through [`Insertion`] or [`Removal`], so every tree version
/// holding on to the old leaf keeps seeing the old contents.
///
/// The elements sit behind an [`Arc`]: cloning a leaf, or handing an
/// untouched sibling back from [`Insertion::rebuild`], shares the run instead
/// of copying it.
///
/// Leaves don't know their neighbours. Operations that may rebalance across
/// leaf boundaries ([`Leaf::insert`] and [`Leaf::remove`]) take the left and
/// right siblings from the caller.
pub struct Leaf<D: Domain> {
    values: Arc<Chunk<D::Elem, MAX_LEAF>>,
}

/// How an insertion changed a leaf and its siblings.
pub enum Insertion<D: Domain> {
    /// The leaf had room: it's replaced by a single longer leaf.
    Replaced(Leaf<D>),
    /// Some elements were pushed into the left sibling; both are replaced.
    ShiftedLeft { left: Leaf<D>, node: Leaf<D> },
    /// Some elements were pushed into the right sibling; both are replaced.
    ShiftedRight { node: Leaf<D>, right: Leaf<D> },
    /// The leaf was split in two. The parent must register an extra child.
    Split { left: Leaf<D>, right: Leaf<D> },
}

/// How a removal changed a leaf and its siblings.
pub enum Removal<D: Domain> {
    /// The leaf had elements to spare: it's replaced by a shorter leaf.
    Shrunk(Leaf<D>),
    /// Elements were stolen from the left sibling; both are replaced.
    BorrowedLeft { left: Leaf<D>, node: Leaf<D> },
    /// Elements were stolen from the right sibling; both are replaced.
    BorrowedRight { node: Leaf<D>, right: Leaf<D> },
    /// The leaf and its left sibling were merged into one leaf.
    MergedLeft(Leaf<D>),
    /// The leaf and its right sibling were merged into one leaf.
    MergedRight(Leaf<D>),
    /// The leaf had no siblings at all, so it became a partial leaf. The
    /// caller has to deal with the deficient node.
    Underflow(PartialLeaf<D>),
}

impl<D: Domain> Insertion<D> {
    /// Did the insertion add a leaf?
    pub fn is_split(&self) -> bool {
        matches!(self, Insertion::Split { .. })
    }

    /// The siblings that replace `left`, the edited leaf and `right`, where
    /// `left` and `right` are the siblings that were passed to
    /// [`Leaf::insert`].
    pub fn rebuild(self, left: Option<&Leaf<D>>, right: Option<&Leaf<D>>) -> Vec<Leaf<D>> {
        let (left, nodes, right) = match self {
            Insertion::Replaced(node) => (left.cloned(), vec![node], right.cloned()),
            Insertion::ShiftedLeft { left, node } => (Some(left), vec![node], right.cloned()),
            Insertion::ShiftedRight { node, right } => (left.cloned(), vec![node], Some(right)),
            Insertion::Split {
                left: first,
                right: second,
            } => (left.cloned(), vec![first, second], right.cloned()),
        };
        left.into_iter().chain(nodes).chain(right).collect()
    }
}

impl<D: Domain> Removal<D> {
    /// Did the removal drop a leaf?
    pub fn is_merge(&self) -> bool {
        matches!(self, Removal::MergedLeft(_) | Removal::MergedRight(_))
    }

    /// The nodes that replace `left`, the edited leaf and `right`, where
    /// `left` and `right` are the siblings that were passed to
    /// [`Leaf::remove`].
    pub fn rebuild(self, left: Option<&Leaf<D>>, right: Option<&Leaf<D>>) -> Vec<Fringe<D>> {
        let old_left = || left.cloned().map(Fringe::Leaf);
        let old_right = || right.cloned().map(Fringe::Leaf);
        let (first, center, last) = match self {
            Removal::Shrunk(node) => (old_left(), Some(Fringe::Leaf(node)), old_right()),
            Removal::BorrowedLeft { left, node } => {
                (Some(Fringe::Leaf(left)), Some(Fringe::Leaf(node)), old_right())
            }
            Removal::BorrowedRight { node, right } => {
                (old_left(), Some(Fringe::Leaf(node)), Some(Fringe::Leaf(right)))
            }
            Removal::MergedLeft(merged) => (Some(Fringe::Leaf(merged)), None, old_right()),
            Removal::MergedRight(merged) => (old_left(), None, Some(Fringe::Leaf(merged))),
            Removal::Underflow(partial) => (None, Some(Fringe::Partial(partial)), None),
        };
        first.into_iter().chain(center).chain(last).collect()
    }
}

impl<D: Domain> fmt::Debug for Insertion<D>
where
    D::Elem: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insertion::Replaced(node) => f.debug_tuple("Replaced").field(node).finish(),
            Insertion::ShiftedLeft { left, node } => f
                .debug_struct("ShiftedLeft")
                .field("left", left)
                .field("node", node)
                .finish(),
            Insertion::ShiftedRight { node, right } => f
                .debug_struct("ShiftedRight")
                .field("node", node)
                .field("right", right)
                .finish(),
            Insertion::Split { left, right } => f
                .debug_struct("Split")
                .field("left", left)
                .field("right", right)
                .finish(),
        }
    }
}

impl<D: Domain> fmt::Debug for Removal<D>
where
    D::Elem: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Removal::Shrunk(node) => f.debug_tuple("Shrunk").field(node).finish(),
            Removal::BorrowedLeft { left, node } => f
                .debug_struct("BorrowedLeft")
                .field("left", left)
                .field("node", node)
                .finish(),
            Removal::BorrowedRight { node, right } => f
                .debug_struct("BorrowedRight")
                .field("node", node)
                .field("right", right)
                .finish(),
            Removal::MergedLeft(node) => f.debug_tuple("MergedLeft").field(node).finish(),
            Removal::MergedRight(node) => f.debug_tuple("MergedRight").field(node).finish(),
            Removal::Underflow(partial) => f.debug_tuple("Underflow").field(partial).finish(),
        }
    }
}

impl<D: Domain> Leaf<D> {
    /// Wraps a buffer holding `MIN_LEAF..=MAX_LEAF` elements.
    ///
    /// This is the building block for [`Domain::new_leaf`]; the rest of the
    /// crate always goes through the domain.
    ///
    /// Panics if the buffer is too short or too long.
    pub fn from_buffer(values: Buffer<D::Elem>) -> Self {
        assert!(
            (MIN_LEAF..=MAX_LEAF).contains(&values.len()),
            "wrong {} size: {}",
            D::NAME,
            values.len()
        );
        Leaf {
            values: Arc::new(values.into_iter().collect()),
        }
    }

    /// Builds a leaf out of elements coming from outside the tree, checking
    /// that there are neither too few nor too many of them.
    pub fn try_from_elems<I: IntoIterator<Item = D::Elem>>(elems: I) -> Result<Self, ArityError> {
        let mut values = D::new_values_array(MAX_LEAF);
        let mut found = 0;
        for elt in elems {
            found += 1;
            if found <= MAX_LEAF {
                values.push(elt);
            }
        }

        if (MIN_LEAF..=MAX_LEAF).contains(&found) {
            Ok(D::new_leaf(values))
        } else {
            Err(ArityError::Leaf {
                found,
                min: MIN_LEAF,
                max: MAX_LEAF,
            })
        }
    }

    /// The number of elements in this leaf.
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// The element at `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub fn get_sub(&self, index: usize) -> &D::Elem {
        &self.values[index]
    }

    pub fn get(&self, index: usize) -> Option<&D::Elem> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[D::Elem] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, D::Elem> {
        self.values.iter()
    }

    /// Do both leaves share the same run of elements?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    /// Takes the elements out, copying them only if the run is shared.
    pub(crate) fn into_values(self) -> Chunk<D::Elem, MAX_LEAF> {
        Arc::unwrap_or_clone(self.values)
    }

    /// Copies all of our elements except the one at `pos` into `buf`.
    fn extend_without(&self, buf: &mut Buffer<D::Elem>, pos: usize) {
        buf.extend(self.values[..pos].iter().cloned());
        buf.extend(self.values[pos + 1..].iter().cloned());
    }

    /// Inserts `val` before the element at `pos`, which may be equal to the
    /// arity to insert at the end.
    ///
    /// A full leaf first tries to hand elements over to a sibling with spare
    /// room, the left one first. If neither sibling has room, the leaf is
    /// split in two.
    pub fn insert(
        &self,
        left: Option<&Leaf<D>>,
        right: Option<&Leaf<D>>,
        pos: usize,
        val: D::Elem,
    ) -> Insertion<D> {
        let n = self.arity();
        let mut vals = D::new_values_array(n + 1);
        vals.extend(self.values[..pos].iter().cloned());
        vals.push(val);
        vals.extend(self.values[pos..].iter().cloned());

        if n < MAX_LEAF {
            // there is capacity
            return Insertion::Replaced(D::new_leaf(vals));
        }

        if let Some(left) = left.filter(|l| l.arity() < MAX_LEAF) {
            let l = left.arity();
            let diff = MAX_LEAF - l;
            let move_count = (diff + 1) / 2;
            trace!("{}: pushing {move_count} elements to the left sibling", D::NAME);
            increment!("leaf::insert::shift_left");

            let mut new_left = D::new_values_array(l + move_count);
            new_left.extend(left.values.iter().cloned());
            new_left.extend(vals.drain(..move_count));
            return Insertion::ShiftedLeft {
                left: D::new_leaf(new_left),
                node: D::new_leaf(vals),
            };
        }

        if let Some(right) = right.filter(|r| r.arity() < MAX_LEAF) {
            let r = right.arity();
            let diff = MAX_LEAF - r;
            let move_count = (diff + 1) / 2;
            let l = n + 1 - move_count;
            trace!("{}: pushing {move_count} elements to the right sibling", D::NAME);
            increment!("leaf::insert::shift_right");

            let mut new_right = D::new_values_array(r + move_count);
            new_right.extend(vals.drain(l..));
            new_right.extend(right.values.iter().cloned());
            return Insertion::ShiftedRight {
                node: D::new_leaf(vals),
                right: D::new_leaf(new_right),
            };
        }

        let l = vals.len() / 2;
        trace!("{}: splitting a full leaf at {l}", D::NAME);
        increment!("leaf::insert::split");

        let mut new_right = D::new_values_array(vals.len() - l);
        new_right.extend(vals.drain(l..));
        Insertion::Split {
            left: D::new_leaf(vals),
            right: D::new_leaf(new_right),
        }
    }

    /// Removes the element at `pos`.
    ///
    /// A leaf at minimum size first tries to steal elements from a sibling,
    /// then to merge with one. A leaf without any siblings underflows into a
    /// [`PartialLeaf`].
    pub fn remove(&self, left: Option<&Leaf<D>>, right: Option<&Leaf<D>>, pos: usize) -> Removal<D> {
        let n = self.arity();
        if n > MIN_LEAF {
            // we do not have to split
            let mut vals = D::new_values_array(n - 1);
            self.extend_without(&mut vals, pos);
            return Removal::Shrunk(D::new_leaf(vals));
        }

        if let Some(left) = left.filter(|l| l.arity() > MIN_LEAF) {
            let l = left.arity();
            let diff = l - MIN_LEAF;
            let move_count = (diff + 1) / 2;
            let ll = l - move_count;
            trace!("{}: stealing {move_count} elements from the left sibling", D::NAME);
            increment!("leaf::remove::borrow_left");

            let mut new_left = D::new_values_array(ll);
            new_left.extend(left.values[..ll].iter().cloned());
            let mut new_node = D::new_values_array(n - 1 + move_count);
            new_node.extend(left.values[ll..].iter().cloned());
            self.extend_without(&mut new_node, pos);
            return Removal::BorrowedLeft {
                left: D::new_leaf(new_left),
                node: D::new_leaf(new_node),
            };
        }

        if let Some(right) = right.filter(|r| r.arity() > MIN_LEAF) {
            let r = right.arity();
            let diff = r - MIN_LEAF;
            let move_count = (diff + 1) / 2;
            trace!("{}: stealing {move_count} elements from the right sibling", D::NAME);
            increment!("leaf::remove::borrow_right");

            let mut new_node = D::new_values_array(n - 1 + move_count);
            self.extend_without(&mut new_node, pos);
            new_node.extend(right.values[..move_count].iter().cloned());
            let mut new_right = D::new_values_array(r - move_count);
            new_right.extend(right.values[move_count..].iter().cloned());
            return Removal::BorrowedRight {
                node: D::new_leaf(new_node),
                right: D::new_leaf(new_right),
            };
        }

        if let Some(left) = left {
            trace!("{}: merging with the left sibling", D::NAME);
            increment!("leaf::remove::merge_left");

            let mut vals = D::new_values_array(left.arity() + n - 1);
            vals.extend(left.values.iter().cloned());
            self.extend_without(&mut vals, pos);
            return Removal::MergedLeft(D::new_leaf(vals));
        }

        if let Some(right) = right {
            trace!("{}: merging with the right sibling", D::NAME);
            increment!("leaf::remove::merge_right");

            let mut vals = D::new_values_array(n - 1 + right.arity());
            self.extend_without(&mut vals, pos);
            vals.extend(right.values.iter().cloned());
            return Removal::MergedRight(D::new_leaf(vals));
        }

        trace!("{}: underflow of a lone leaf", D::NAME);
        increment!("leaf::remove::underflow");
        let mut vals = D::new_values_array(n - 1);
        self.extend_without(&mut vals, pos);
        Removal::Underflow(D::new_partial_leaf(vals))
    }

    /// The elements in `[offset, offset + size)`.
    ///
    /// Short slices come back as a [`PartialLeaf`], which the caller is
    /// expected to [`append`](NodeLike::append) to a neighbour.
    pub fn slice(&self, offset: usize, size: usize) -> Fringe<D> {
        let mut out = D::new_values_array(size);
        out.extend(self.values[offset..offset + size].iter().cloned());
        if size < MIN_LEAF {
            Fringe::Partial(D::new_partial_leaf(out))
        } else {
            Fringe::Leaf(D::new_leaf(out))
        }
    }

    pub fn reverse(&self) -> Leaf<D> {
        let mut out = D::new_values_array(self.arity());
        out.extend(self.values.iter().rev().cloned());
        D::new_leaf(out)
    }

    /// Replaces the element at `pos`.
    pub fn set(&self, pos: usize, val: D::Elem) -> Leaf<D> {
        let mut vals = D::new_values_array(self.arity());
        vals.extend(self.values.iter().cloned());
        vals[pos] = val;
        D::new_leaf(vals)
    }

    /// Panics if this leaf is too short or too long. Returns the number of
    /// elements otherwise.
    pub fn check_invariants(&self) -> usize {
        assert!(
            (MIN_LEAF..=MAX_LEAF).contains(&self.arity()),
            "wrong {} size: {}",
            D::NAME,
            self.arity()
        );
        self.arity()
    }
}

impl<D: Domain> NodeLike<D> for Leaf<D> {
    fn size(&self) -> usize {
        self.arity()
    }

    fn append(self, nodes: &mut Vec<Fringe<D>>) -> usize {
        match nodes.pop() {
            Some(Fringe::Partial(partial)) => {
                let n = partial.size() + self.arity();
                let mut vals = D::new_values_array(n);
                vals.extend(partial.into_values());
                vals.extend(self.into_values());
                push_merged(nodes, vals);
            }
            Some(prev) => {
                nodes.push(prev);
                nodes.push(Fringe::Leaf(self));
            }
            None => nodes.push(Fringe::Leaf(self)),
        }
        nodes.len()
    }
}

impl<D: Domain> Clone for Leaf<D> {
    fn clone(&self) -> Self {
        Leaf {
            values: Arc::clone(&self.values),
        }
    }
}

impl<D: Domain> PartialEq for Leaf<D>
where
    D::Elem: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.values() == other.values()
    }
}

impl<D: Domain> Eq for Leaf<D> where D::Elem: Eq {}

impl<D: Domain> Hash for Leaf<D>
where
    D::Elem: Hash,
{
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.values().hash(state);
    }
}

impl<D: Domain> fmt::Debug for Leaf<D>
where
    D::Elem: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", D::NAME, self.arity())?;
        f.debug_list().entries(self.values.iter()).finish()
    }
}

impl<D: Domain> Index<usize> for Leaf<D> {
    type Output = D::Elem;

    fn index(&self, index: usize) -> &Self::Output {
        self.get_sub(index)
    }
}

impl<'a, D: Domain> IntoIterator for &'a Leaf<D> {
    type Item = &'a D::Elem;
    type IntoIter = std::slice::Iter<'a, D::Elem>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<D: Domain> serde::Serialize for Leaf<D>
where
    D::Elem: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.arity()))?;
        for elt in self.iter() {
            seq.serialize_element(elt)?;
        }
        seq.end()
    }
}

impl<'de, D: Domain> serde::Deserialize<'de> for Leaf<D>
where
    D::Elem: serde::Deserialize<'de>,
{
    fn deserialize<De>(deserializer: De) -> Result<Self, De::Error>
    where
        De: serde::Deserializer<'de>,
    {
        let vec = <Vec<D::Elem> as serde::Deserialize>::deserialize(deserializer)?;
        Leaf::try_from_elems(vec).map_err(serde::de::Error::custom)
    }
}
