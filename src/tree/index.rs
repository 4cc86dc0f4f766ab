//! Index newtypes for the left-balanced binary tree.
//!
//! `LeafIndex` counts leaves, `NodeIndex` counts slots in the flat node
//! array (`NodeIndex = 2 * LeafIndex` for leaves). `LeafCount` and
//! `NodeCount` are the corresponding size types; a tree of `n > 0` leaves
//! occupies `2n - 1` node slots.

use std::convert::TryFrom;

use tls_codec::{TlsDeserialize, TlsSerialize, TlsSize};

/// Index into the leaves of a tree.
#[derive(
    Debug, Default, Ord, PartialOrd, Hash, Eq, PartialEq, Copy, Clone, TlsSerialize,
    TlsDeserialize, TlsSize,
)]
pub struct LeafIndex(pub(crate) u32);

impl LeafIndex {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for LeafIndex {
    fn from(i: u32) -> LeafIndex {
        LeafIndex(i)
    }
}

impl From<usize> for LeafIndex {
    fn from(i: usize) -> LeafIndex {
        LeafIndex(i as u32)
    }
}

/// Index into the node array of a tree, covering both leaf and parent
/// slots.
#[derive(
    Debug, Default, Ord, PartialOrd, Hash, Eq, PartialEq, Copy, Clone, TlsSerialize,
    TlsDeserialize, TlsSize,
)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn is_leaf(&self) -> bool {
        self.0 % 2 == 0
    }

    pub fn is_parent(&self) -> bool {
        self.0 % 2 == 1
    }
}

impl From<u32> for NodeIndex {
    fn from(i: u32) -> NodeIndex {
        NodeIndex(i)
    }
}

impl From<usize> for NodeIndex {
    fn from(i: usize) -> NodeIndex {
        NodeIndex(i as u32)
    }
}

impl From<LeafIndex> for NodeIndex {
    fn from(leaf_index: LeafIndex) -> NodeIndex {
        NodeIndex(leaf_index.as_u32() * 2)
    }
}

impl TryFrom<NodeIndex> for LeafIndex {
    type Error = &'static str;

    fn try_from(node_index: NodeIndex) -> Result<Self, Self::Error> {
        // Odd indices are parent slots and have no leaf counterpart.
        if node_index.is_parent() {
            Err("Cannot convert a parent node index to a leaf index.")
        } else {
            Ok(LeafIndex(node_index.as_u32() / 2))
        }
    }
}

/// Number of leaves in a tree.
#[derive(Debug, Default, Ord, PartialOrd, Hash, Eq, PartialEq, Copy, Clone)]
pub struct LeafCount(pub(crate) u32);

impl LeafCount {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for LeafCount {
    fn from(i: u32) -> LeafCount {
        LeafCount(i)
    }
}

impl From<usize> for LeafCount {
    fn from(i: usize) -> LeafCount {
        LeafCount(i as u32)
    }
}

impl From<NodeCount> for LeafCount {
    fn from(node_count: NodeCount) -> LeafCount {
        LeafCount((node_count.0 + 1) / 2)
    }
}

/// Number of occupied node slots in a tree.
#[derive(Debug, Default, Ord, PartialOrd, Hash, Eq, PartialEq, Copy, Clone)]
pub struct NodeCount(pub(crate) u32);

impl NodeCount {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeCount {
    fn from(i: u32) -> NodeCount {
        NodeCount(i)
    }
}

impl From<usize> for NodeCount {
    fn from(i: usize) -> NodeCount {
        NodeCount(i as u32)
    }
}

impl From<LeafCount> for NodeCount {
    fn from(leaf_count: LeafCount) -> NodeCount {
        if leaf_count.0 == 0 {
            NodeCount(0)
        } else {
            NodeCount(2 * leaf_count.0 - 1)
        }
    }
}
