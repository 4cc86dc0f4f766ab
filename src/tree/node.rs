//! Ratchet tree nodes. A slot in the tree's node array is an
//! [`OptionalNode`]: either blank or a [`Node`], plus the cached subtree
//! hash for that position.

use std::convert::TryFrom;
use std::io::{Read, Write};

use tls_codec::{
    Deserialize as TlsDeserializeTrait, Serialize as TlsSerializeTrait, Size, TlsByteVecU8,
    TlsDeserialize, TlsSerialize, TlsSize, TlsVecU32,
};

use super::hashes::{LeafNodeHashInput, ParentNodeHashInput};
use super::index::{LeafIndex, NodeIndex};
use crate::ciphersuite::{CipherSuite, HpkePublicKey};
use crate::key_packages::KeyPackage;

/// Node type. Dispatches the [`Node`] union on the wire.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TlsSerialize, TlsDeserialize, TlsSize)]
#[repr(u8)]
pub enum NodeType {
    Leaf = 1,
    Parent = 2,
}

impl TryFrom<u8> for NodeType {
    type Error = tls_codec::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(NodeType::Leaf),
            2 => Ok(NodeType::Parent),
            _ => Err(tls_codec::Error::DecodingError(format!(
                "{} is not a valid node type",
                value
            ))),
        }
    }
}

/// Content of a non-blank parent node.
///
/// `unmerged_leaves` lists the leaves added below this node since its last
/// path update, in insertion order; they hold no key at this node and are
/// therefore part of its resolution.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct ParentNode {
    pub(crate) public_key: HpkePublicKey,
    pub(crate) parent_hash: TlsByteVecU8,
    pub(crate) unmerged_leaves: TlsVecU32<LeafIndex>,
}

impl ParentNode {
    pub(crate) fn new(
        public_key: HpkePublicKey,
        parent_hash: &[u8],
        unmerged_leaves: &[LeafIndex],
    ) -> Self {
        Self {
            public_key,
            parent_hash: parent_hash.into(),
            unmerged_leaves: unmerged_leaves.into(),
        }
    }

    pub fn public_key(&self) -> &HpkePublicKey {
        &self.public_key
    }

    pub fn unmerged_leaves(&self) -> &[LeafIndex] {
        self.unmerged_leaves.as_slice()
    }

    pub(crate) fn add_unmerged_leaf(&mut self, leaf: LeafIndex) {
        self.unmerged_leaves.push(leaf);
    }
}

/// A non-blank tree node: a leaf holding a [`KeyPackage`] or a parent
/// holding a [`ParentNode`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Node {
    Leaf(KeyPackage),
    Parent(ParentNode),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Leaf(_) => NodeType::Leaf,
            Node::Parent(_) => NodeType::Parent,
        }
    }

    /// The HPKE public key of either node kind.
    pub fn public_key(&self) -> &HpkePublicKey {
        match self {
            Node::Leaf(kp) => kp.hpke_init_key(),
            Node::Parent(parent) => parent.public_key(),
        }
    }

    pub(crate) fn key_package(&self) -> Option<&KeyPackage> {
        match self {
            Node::Leaf(kp) => Some(kp),
            Node::Parent(_) => None,
        }
    }

    pub(crate) fn parent_node(&self) -> Option<&ParentNode> {
        match self {
            Node::Leaf(_) => None,
            Node::Parent(parent) => Some(parent),
        }
    }

    pub(crate) fn parent_node_mut(&mut self) -> Option<&mut ParentNode> {
        match self {
            Node::Leaf(_) => None,
            Node::Parent(parent) => Some(parent),
        }
    }
}

impl Size for Node {
    fn tls_serialized_len(&self) -> usize {
        self.node_type().tls_serialized_len()
            + match self {
                Node::Leaf(kp) => kp.tls_serialized_len(),
                Node::Parent(parent) => parent.tls_serialized_len(),
            }
    }
}

impl TlsSerializeTrait for Node {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        let mut written = self.node_type().tls_serialize(writer)?;
        written += match self {
            Node::Leaf(kp) => kp.tls_serialize(writer)?,
            Node::Parent(parent) => parent.tls_serialize(writer)?,
        };
        Ok(written)
    }
}

impl TlsDeserializeTrait for Node {
    fn tls_deserialize<R: Read>(bytes: &mut R) -> Result<Self, tls_codec::Error> {
        match NodeType::tls_deserialize(bytes)? {
            NodeType::Leaf => Ok(Node::Leaf(KeyPackage::tls_deserialize(bytes)?)),
            NodeType::Parent => Ok(Node::Parent(ParentNode::tls_deserialize(bytes)?)),
        }
    }
}

/// A slot in the tree's node array. The cached hash is empty when stale
/// and never leaves the process.
#[derive(Debug, Clone, Default)]
pub struct OptionalNode {
    pub(crate) node: Option<Node>,
    pub(crate) hash: Vec<u8>,
}

impl PartialEq for OptionalNode {
    // The hash is a cache, not part of the node's identity.
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for OptionalNode {}

impl OptionalNode {
    pub(crate) fn blank() -> Self {
        Self::default()
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.node.is_none()
    }

    /// Public key of the node, if the slot is non-blank.
    pub(crate) fn public_key(&self) -> Option<&HpkePublicKey> {
        self.node.as_ref().map(Node::public_key)
    }

    pub(crate) fn key_package(&self) -> Option<&KeyPackage> {
        self.node.as_ref().and_then(Node::key_package)
    }

    pub(crate) fn parent_node(&self) -> Option<&ParentNode> {
        self.node.as_ref().and_then(Node::parent_node)
    }

    /// Cache the hash for a leaf position.
    pub(crate) fn set_leaf_hash(
        &mut self,
        suite: CipherSuite,
        index: NodeIndex,
    ) -> Result<(), tls_codec::Error> {
        let key_package = self.key_package().cloned();
        self.hash = LeafNodeHashInput {
            node_index: index.as_u32(),
            key_package: &key_package,
        }
        .hash(suite)?;
        Ok(())
    }

    /// Cache the hash for a parent position from its children's hashes.
    pub(crate) fn set_parent_hash(
        &mut self,
        suite: CipherSuite,
        index: NodeIndex,
        left_hash: &[u8],
        right_hash: &[u8],
    ) -> Result<(), tls_codec::Error> {
        let parent_node = self.parent_node().cloned();
        self.hash = ParentNodeHashInput {
            node_index: index.as_u32(),
            parent_node: &parent_node,
            left_hash: left_hash.into(),
            right_hash: right_hash.into(),
        }
        .hash(suite)?;
        Ok(())
    }
}

// Only the node itself travels on the wire; the hash cache is rebuilt by
// the receiver.

impl Size for OptionalNode {
    fn tls_serialized_len(&self) -> usize {
        self.node.tls_serialized_len()
    }
}

impl TlsSerializeTrait for OptionalNode {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        self.node.tls_serialize(writer)
    }
}

impl TlsDeserializeTrait for OptionalNode {
    fn tls_deserialize<R: Read>(bytes: &mut R) -> Result<Self, tls_codec::Error> {
        Ok(Self {
            node: Option::<Node>::tls_deserialize(bytes)?,
            hash: vec![],
        })
    }
}
