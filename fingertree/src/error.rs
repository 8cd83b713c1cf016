/// A run of elements could not become a node because its length is outside
/// the bounds allowed for that kind of node.
///
/// Nodes produced by the tree operations never trigger this: it is only
/// returned when building nodes from outside input, e.g. when deserializing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ArityError {
    #[error("a leaf must hold between {min} and {max} elements, got {found}")]
    Leaf {
        found: usize,
        min: usize,
        max: usize,
    },
    #[error("a partial leaf must hold fewer than {limit} elements, got {found}")]
    Partial { found: usize, limit: usize },
}

impl ArityError {
    /// The length of the rejected run.
    pub fn found(&self) -> usize {
        match self {
            ArityError::Leaf { found, .. } | ArityError::Partial { found, .. } => *found,
        }
    }
}
