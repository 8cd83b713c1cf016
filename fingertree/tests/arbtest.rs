use arbitrary::Unstructured;
use arbtest::{arbitrary, arbtest};
use quill_fingertree::{
    fringe::{check_fringe, concat, flatten},
    Buffer, Domain, Fringe, Insertion, Leaf, NodeLike, PartialLeaf, Removal, MAX_LEAF, MIN_LEAF,
};

struct Ints;

impl Domain for Ints {
    type Elem = u32;

    const NAME: &'static str = "IntLeaf";

    fn new_values_array(size: usize) -> Buffer<u32> {
        Buffer::with_capacity(size)
    }

    fn new_leaf(values: Buffer<u32>) -> Leaf<Self> {
        Leaf::from_buffer(values)
    }

    fn new_partial_leaf(values: Buffer<u32>) -> PartialLeaf<Self> {
        PartialLeaf::from_buffer(values)
    }
}

type Nodes = Vec<Fringe<Ints>>;

fn elems(nodes: &[Fringe<Ints>]) -> Vec<u32> {
    flatten(nodes).copied().collect()
}

fn as_leaf(node: &Fringe<Ints>) -> &Leaf<Ints> {
    match node {
        Fringe::Leaf(leaf) => leaf,
        Fringe::Partial(_) => panic!("partial leaf next to other nodes"),
    }
}

/// Tiny trees (a single partial leaf, or nothing) have no leaf to edit, so
/// they get rebuilt from scratch.
fn is_tiny(nodes: &[Fringe<Ints>]) -> bool {
    matches!(nodes, [] | [Fringe::Partial(_)])
}

/// Finds the node containing the global position `pos`, and the offset of
/// `pos` inside that node. Insertions may point just past the end of a node.
fn locate(nodes: &[Fringe<Ints>], pos: usize, for_insert: bool) -> (usize, usize) {
    let mut acc = 0;
    for (i, node) in nodes.iter().enumerate() {
        let size = node.size();
        if pos < acc + size || (for_insert && pos == acc + size) {
            return (i, pos - acc);
        }
        acc += size;
    }
    panic!("position {pos} out of bounds");
}

/// Replaces the node at `idx` and the neighbours that were handed to it.
fn splice(nodes: &mut Nodes, idx: usize, replacement: Nodes) {
    let start = idx.saturating_sub(1);
    let end = (idx + 2).min(nodes.len());
    nodes.splice(start..end, replacement);
}

fn insert(nodes: &mut Nodes, pos: usize, val: u32) {
    if is_tiny(nodes) {
        let mut all = elems(nodes);
        all.insert(pos, val);
        *nodes = Fringe::from_elems(all);
        return;
    }

    let (idx, off) = locate(nodes, pos, true);
    let left = idx.checked_sub(1).map(|i| as_leaf(&nodes[i]));
    let right = nodes.get(idx + 1).map(as_leaf);
    let ins = as_leaf(&nodes[idx]).insert(left, right, off, val);
    let replacement = ins
        .rebuild(left, right)
        .into_iter()
        .map(Fringe::Leaf)
        .collect();
    splice(nodes, idx, replacement);
}

fn remove(nodes: &mut Nodes, pos: usize) {
    if is_tiny(nodes) {
        let mut all = elems(nodes);
        all.remove(pos);
        *nodes = Fringe::from_elems(all);
        return;
    }

    let (idx, off) = locate(nodes, pos, false);
    let left = idx.checked_sub(1).map(|i| as_leaf(&nodes[i]));
    let right = nodes.get(idx + 1).map(as_leaf);
    let replacement = as_leaf(&nodes[idx])
        .remove(left, right, off)
        .rebuild(left, right);
    splice(nodes, idx, replacement);
}

fn set(nodes: &mut Nodes, pos: usize, val: u32) {
    if is_tiny(nodes) {
        let mut all = elems(nodes);
        all[pos] = val;
        *nodes = Fringe::from_elems(all);
        return;
    }

    let (idx, off) = locate(nodes, pos, false);
    let new = as_leaf(&nodes[idx]).set(off, val);
    nodes[idx] = Fringe::Leaf(new);
}

fn slice(nodes: &[Fringe<Ints>], from: usize, len: usize) -> Nodes {
    if is_tiny(nodes) {
        return Fringe::from_elems(elems(nodes).into_iter().skip(from).take(len));
    }

    let to = from + len;
    let mut pieces = Vec::new();
    let mut acc = 0;
    for node in nodes {
        let size = node.size();
        let start = from.max(acc);
        let end = to.min(acc + size);
        if start < end {
            pieces.push(as_leaf(node).slice(start - acc, end - start));
        }
        acc += size;
    }
    concat(Vec::new(), pieces)
}

fn reverse(nodes: &[Fringe<Ints>]) -> Nodes {
    nodes
        .iter()
        .rev()
        .map(|node| match node {
            Fringe::Leaf(leaf) => Fringe::Leaf(leaf.reverse()),
            Fringe::Partial(partial) => {
                Fringe::Partial(PartialLeaf::try_from_elems(partial.iter().rev().copied()).unwrap())
            }
        })
        .collect()
}

#[derive(arbitrary::Arbitrary, Debug)]
enum Op {
    Insert(usize, u32),
    Remove(usize),
    Set(usize, u32),
    Slice(usize, usize),
    Reverse,
    Concat(Vec<u32>),
    Snapshot,
}

impl Op {
    fn apply_to_vec(&self, vec: &mut Vec<u32>) {
        match self {
            Op::Insert(pos, x) => vec.insert(pos % (vec.len() + 1), *x),
            Op::Remove(pos) => {
                if !vec.is_empty() {
                    vec.remove(pos % vec.len());
                }
            }
            Op::Set(pos, x) => {
                if !vec.is_empty() {
                    let len = vec.len();
                    vec[pos % len] = *x;
                }
            }
            Op::Slice(start, len) => {
                if !vec.is_empty() {
                    let start = start % vec.len();
                    vec.drain(0..start);
                    vec.truncate(*len);
                }
            }
            Op::Reverse => vec.reverse(),
            Op::Concat(xs) => vec.extend_from_slice(xs),
            Op::Snapshot => {}
        }
    }

    fn apply_to_fringe(&self, nodes: &mut Nodes, len: usize, snapshots: &mut Vec<Nodes>) {
        match self {
            Op::Insert(pos, x) => insert(nodes, pos % (len + 1), *x),
            Op::Remove(pos) => {
                if len > 0 {
                    remove(nodes, pos % len);
                }
            }
            Op::Set(pos, x) => {
                if len > 0 {
                    set(nodes, pos % len, *x);
                }
            }
            Op::Slice(start, count) => {
                if len > 0 {
                    let start = start % len;
                    let count = (*count).min(len - start);
                    *nodes = slice(nodes, start, count);
                }
            }
            Op::Reverse => *nodes = reverse(nodes),
            Op::Concat(xs) => {
                let tail = Fringe::from_elems(xs.iter().copied());
                *nodes = concat(std::mem::take(nodes), tail);
            }
            Op::Snapshot => snapshots.push(nodes.clone()),
        }
    }
}

// u.arbitrary() generates very short vecs by default:
// https://github.com/matklad/arbtest/issues/8
fn arb_vec(u: &mut Unstructured<'_>) -> arbitrary::Result<Vec<u32>> {
    let len = u.arbitrary_len::<u32>()?;
    std::iter::from_fn(|| Some(u.arbitrary::<u32>()))
        .take(len)
        .collect()
}

#[test]
fn mutations() {
    arbtest(|u| {
        let mut vec: Vec<u32> = arb_vec(u)?;
        let mut nodes = Fringe::<Ints>::from_elems(vec.iter().copied());
        let mut snapshots = Vec::new();
        let mut expected_snapshots = Vec::new();
        let ops: Vec<Op> = u.arbitrary()?;

        for op in ops {
            let len = vec.len();
            if let Op::Snapshot = op {
                expected_snapshots.push(vec.clone());
            }
            op.apply_to_vec(&mut vec);
            op.apply_to_fringe(&mut nodes, len, &mut snapshots);

            assert_eq!(check_fringe(&nodes), vec.len());
            assert_eq!(vec, elems(&nodes));
        }

        // Older versions never see later edits.
        for (snapshot, expected) in snapshots.iter().zip(&expected_snapshots) {
            assert_eq!(&elems(snapshot), expected);
        }

        Ok(())
    });
}

fn arb_leaf(u: &mut Unstructured<'_>, base: u32) -> arbitrary::Result<Leaf<Ints>> {
    let len: u32 = u.int_in_range(MIN_LEAF as u32..=MAX_LEAF as u32)?;
    Ok(Leaf::try_from_elems(base..base + len).unwrap())
}

fn arb_sibling(u: &mut Unstructured<'_>, base: u32) -> arbitrary::Result<Option<Leaf<Ints>>> {
    if u.arbitrary()? {
        Ok(Some(arb_leaf(u, base)?))
    } else {
        Ok(None)
    }
}

fn flat<'a>(leaves: impl IntoIterator<Item = Option<&'a Leaf<Ints>>>) -> Vec<u32> {
    leaves
        .into_iter()
        .flatten()
        .flat_map(|leaf| leaf.iter().copied())
        .collect()
}

#[test]
fn insert_keeps_order_and_bounds() {
    arbtest(|u| {
        let left = arb_sibling(u, 1000)?;
        let node = arb_leaf(u, 0)?;
        let right = arb_sibling(u, 2000)?;
        let pos = u.int_in_range(0..=node.arity())?;

        let mut expected = flat([left.as_ref()]);
        let mut middle = flat([Some(&node)]);
        middle.insert(pos, 99);
        expected.extend(middle);
        expected.extend(flat([right.as_ref()]));

        let ins = node.insert(left.as_ref(), right.as_ref(), pos, 99);
        let split = ins.is_split();
        if split {
            assert_eq!(node.arity(), MAX_LEAF);
        }
        let rebuilt = ins.rebuild(left.as_ref(), right.as_ref());
        let siblings = usize::from(left.is_some()) + usize::from(right.is_some());
        assert_eq!(rebuilt.len(), siblings + 1 + usize::from(split));
        for leaf in &rebuilt {
            leaf.check_invariants();
        }
        assert_eq!(flat(rebuilt.iter().map(Some)), expected);

        Ok(())
    });
}

#[test]
fn remove_keeps_order_and_bounds() {
    arbtest(|u| {
        let left = arb_sibling(u, 1000)?;
        let node = arb_leaf(u, 0)?;
        let right = arb_sibling(u, 2000)?;
        let pos = u.int_in_range(0..=node.arity() - 1)?;

        // Merges only happen between minimal leaves, which is what a valid
        // tree guarantees when no sibling has elements to spare.
        let mut expected = flat([left.as_ref()]);
        let mut middle = flat([Some(&node)]);
        middle.remove(pos);
        expected.extend(middle);
        expected.extend(flat([right.as_ref()]));

        let rem = node.remove(left.as_ref(), right.as_ref(), pos);
        if let Removal::Underflow(partial) = &rem {
            assert!(left.is_none() && right.is_none());
            assert_eq!(partial.check_invariants(), MIN_LEAF - 1);
        }
        let rebuilt = rem.rebuild(left.as_ref(), right.as_ref());
        if !matches!(&rebuilt[..], [Fringe::Partial(_)]) {
            for node in &rebuilt {
                node.check_invariants();
            }
        }
        assert_eq!(elems(&rebuilt), expected);

        Ok(())
    });
}

#[test]
fn insert_then_remove_round_trips() {
    arbtest(|u| {
        let left = arb_sibling(u, 1000)?;
        let node = arb_leaf(u, 0)?;
        let right = arb_sibling(u, 2000)?;
        let pos = u.int_in_range(0..=node.arity())?;

        let before = flat([left.as_ref(), Some(&node), right.as_ref()]);
        let Insertion::Replaced(grown) = node.insert(left.as_ref(), right.as_ref(), pos, 99) else {
            return Ok(());
        };
        let after = grown
            .remove(left.as_ref(), right.as_ref(), pos)
            .rebuild(left.as_ref(), right.as_ref());
        assert_eq!(elems(&after), before);

        Ok(())
    });
}

#[test]
fn reverse_and_slice() {
    arbtest(|u| {
        let node = arb_leaf(u, 0)?;
        assert_eq!(node.reverse().reverse(), node);

        let offset = u.int_in_range(0..=node.arity())?;
        let size = u.int_in_range(0..=node.arity() - offset)?;
        let piece = node.slice(offset, size);
        assert_eq!(piece.check_invariants(), size);
        assert_eq!(piece.is_partial(), size < MIN_LEAF);
        assert_eq!(piece.values(), &node.values()[offset..offset + size]);

        assert_eq!(node.slice(0, node.arity()).values(), node.values());
        assert_eq!(node.slice(offset, 0).size(), 0);

        Ok(())
    });
}
