//! The TreeKEM ratchet tree.
//!
//! The tree is a dense array of [`OptionalNode`] slots indexed by
//! [`NodeIndex`]; all parent/child relationships are computed by
//! `treemath`, no pointers exist. [`TreeKEMPublicKey`] is the shared
//! public half every member agrees on bit-exactly;
//! [`TreeKEMPrivateKey`] holds one member's path secrets.

use std::io::{Read, Write};

use tls_codec::{
    Deserialize as TlsDeserializeTrait, Serialize as TlsSerializeTrait, Size, TlsDeserialize,
    TlsSerialize, TlsSize, TlsSliceU32, TlsVecU16, TlsVecU32,
};

pub(crate) mod hashes;
pub mod index;
mod node;
mod private_tree;
pub mod sender_ratchet;
pub(crate) mod treemath;

pub use node::{Node, NodeType, OptionalNode, ParentNode};
pub use private_tree::TreeKEMPrivateKey;

use crate::ciphersuite::{CipherSuite, HpkeCiphertext, HpkePublicKey, Secret, SignaturePrivateKey};
use crate::error::Error;
use crate::key_packages::KeyPackage;
use index::{LeafCount, LeafIndex, NodeCount, NodeIndex};

/// One step of a [`DirectPath`]: the new public key of a path node and the
/// path secret encrypted to each member of the copath node's resolution,
/// in resolution order.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct DirectPathNode {
    pub(crate) public_key: HpkePublicKey,
    pub(crate) node_secrets: TlsVecU16<HpkeCiphertext>,
}

/// The public output of an `encap`: the sender's re-signed leaf
/// [`KeyPackage`] and one [`DirectPathNode`] per direct-path node.
#[derive(Debug, PartialEq, Eq, Clone, TlsSerialize, TlsDeserialize, TlsSize)]
pub struct DirectPath {
    pub(crate) leaf_key_package: KeyPackage,
    pub(crate) nodes: TlsVecU16<DirectPathNode>,
}

impl DirectPath {
    pub fn leaf_key_package(&self) -> &KeyPackage {
        &self.leaf_key_package
    }
}

/// The public half of a TreeKEM tree.
///
/// Invariants: the node array is empty or holds `2n - 1` slots; the last
/// slot is never blank after `truncate`; every non-blank parent's
/// `unmerged_leaves` lie strictly below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeKEMPublicKey {
    pub(crate) suite: CipherSuite,
    pub(crate) nodes: Vec<OptionalNode>,
}

impl TreeKEMPublicKey {
    /// An empty tree.
    pub fn new(suite: CipherSuite) -> Self {
        Self {
            suite,
            nodes: vec![],
        }
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Number of leaves the node array spans.
    pub fn size(&self) -> LeafCount {
        LeafCount::from(NodeCount::from(self.nodes.len()))
    }

    fn node_width(&self) -> NodeCount {
        NodeCount::from(self.nodes.len())
    }

    pub(crate) fn node_at(&self, index: NodeIndex) -> &OptionalNode {
        &self.nodes[index.as_usize()]
    }

    fn node_at_mut(&mut self, index: NodeIndex) -> &mut OptionalNode {
        &mut self.nodes[index.as_usize()]
    }

    /// Add a leaf at the leftmost blank slot, extending the tree if none
    /// is free. Records the new leaf as unmerged on every non-blank parent
    /// above it.
    pub fn add_leaf(&mut self, key_package: KeyPackage) -> Result<LeafIndex, Error> {
        // Find the leftmost free leaf
        let mut index = LeafIndex::from(0u32);
        while index.as_usize() < self.size().as_usize()
            && !self.node_at(NodeIndex::from(index)).is_blank()
        {
            index = LeafIndex::from(index.as_u32() + 1);
        }

        // Extend the tree if necessary
        let ni = NodeIndex::from(index);
        if index.as_usize() >= self.size().as_usize() {
            self.nodes
                .resize_with(ni.as_usize() + 1, OptionalNode::blank);
        }

        self.node_at_mut(ni).node = Some(Node::Leaf(key_package));

        // Update the unmerged list along the direct path
        for n in treemath::dirpath(ni, self.node_width())? {
            if let Some(node) = self.node_at_mut(n).node.as_mut() {
                if let Some(parent) = node.parent_node_mut() {
                    parent.add_unmerged_leaf(index);
                }
            }
        }

        self.clear_hash_path(index)?;
        Ok(index)
    }

    /// Replace a leaf's key package and blank its direct path.
    pub fn update_leaf(&mut self, index: LeafIndex, key_package: KeyPackage) -> Result<(), Error> {
        self.blank_path(index)?;
        self.node_at_mut(NodeIndex::from(index)).node = Some(Node::Leaf(key_package));
        self.clear_hash_path(index)
    }

    /// Blank a leaf and every parent on its direct path.
    pub fn blank_path(&mut self, index: LeafIndex) -> Result<(), Error> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let ni = NodeIndex::from(index);
        self.node_at_mut(ni).node = None;
        for n in treemath::dirpath(ni, self.node_width())? {
            self.node_at_mut(n).node = None;
        }

        self.clear_hash_path(index)
    }

    /// Overwrite the sender's leaf and direct path with the contents of a
    /// [`DirectPath`], then recompute all hashes.
    pub fn merge(&mut self, from: LeafIndex, path: &DirectPath) -> Result<(), Error> {
        let ni = NodeIndex::from(from);
        self.node_at_mut(ni).node = Some(Node::Leaf(path.leaf_key_package.clone()));

        let dp = treemath::dirpath(ni, self.node_width())?;
        if dp.len() != path.nodes.len() {
            return Err(Error::Protocol("malformed direct path"));
        }

        for (n, path_node) in dp.into_iter().zip(path.nodes.iter()) {
            self.node_at_mut(n).node = Some(Node::Parent(ParentNode::new(
                path_node.public_key.clone(),
                &[],
                &[],
            )));
        }

        self.clear_hash_path(from)?;
        self.set_hash_all()
    }

    /// The resolution of a node: the minimal ordered set of non-blank
    /// nodes covering it, with a parent's unmerged leaves appended in
    /// insertion order.
    pub fn resolve(&self, index: NodeIndex) -> Vec<NodeIndex> {
        if let Some(node) = &self.node_at(index).node {
            let mut out = vec![index];
            match node {
                Node::Leaf(_) => out,
                Node::Parent(parent) => {
                    out.extend(
                        parent
                            .unmerged_leaves()
                            .iter()
                            .map(|&leaf| NodeIndex::from(leaf)),
                    );
                    out
                }
            }
        } else if treemath::level(index) == 0 {
            vec![]
        } else {
            // Blank parent: concatenate the children's resolutions.
            let mut left = self.resolve(treemath::left(index).expect("parent has children"));
            let right = self.resolve(
                treemath::right(index, self.node_width()).expect("parent has children"),
            );
            left.extend(right);
            left
        }
    }

    /// Locate the leaf holding `key_package`.
    pub fn find(&self, key_package: &KeyPackage) -> Option<LeafIndex> {
        (0..self.size().as_u32()).map(LeafIndex::from).find(|&i| {
            self.node_at(NodeIndex::from(i))
                .key_package()
                .map(|kp| kp == key_package)
                .unwrap_or(false)
        })
    }

    /// The key package at a leaf, if the slot is non-blank.
    pub fn key_package(&self, index: LeafIndex) -> Option<&KeyPackage> {
        self.node_at(NodeIndex::from(index)).key_package()
    }

    /// Drop trailing blank slots so the tree ends in a non-blank node.
    pub fn truncate(&mut self) {
        while self
            .nodes
            .last()
            .map(|node| node.is_blank())
            .unwrap_or(false)
        {
            self.nodes.pop();
        }
    }

    /// Generate a fresh path from `from`, encrypting each path secret to
    /// the resolution of the corresponding copath node under
    /// `context` as AAD. Re-signs the sender's leaf with `sig_priv`,
    /// merges the result and returns the new private state.
    pub fn encap(
        &mut self,
        from: LeafIndex,
        context: &[u8],
        leaf_secret: &Secret,
        sig_priv: &SignaturePrivateKey,
    ) -> Result<(TreeKEMPrivateKey, DirectPath), Error> {
        let mut leaf_key_package = self
            .key_package(from)
            .ok_or(Error::InvalidParameter("cannot encap from a blank leaf"))?
            .clone();

        // Generate path secrets
        let private_key = TreeKEMPrivateKey::create(self.suite, self.size(), from, leaf_secret);

        // Package into a DirectPath
        let mut nodes = Vec::new();
        let mut last = NodeIndex::from(from);
        for n in treemath::dirpath(NodeIndex::from(from), self.node_width())? {
            let path_secret = private_key
                .path_secret(n)
                .ok_or(Error::InvalidParameter("missing path secret"))?;
            let node_keypair = private_key
                .private_key(n)
                .ok_or(Error::InvalidParameter("missing path secret"))?;

            let copath = treemath::sibling(last, self.node_width())?;
            let node_secrets = self
                .resolve(copath)
                .into_iter()
                .map(|nr| {
                    let node_pub = self
                        .node_at(nr)
                        .public_key()
                        .expect("resolution contains only non-blank nodes");
                    self.suite
                        .hpke_seal(node_pub, &[], context, path_secret.as_slice())
                })
                .collect::<Result<Vec<_>, _>>()?;

            nodes.push(DirectPathNode {
                public_key: node_keypair.public_key().clone(),
                node_secrets: node_secrets.into(),
            });
            last = n;
        }

        // Re-sign the leaf with its new init key
        let leaf_keypair = private_key
            .private_key(NodeIndex::from(from))
            .ok_or(Error::InvalidParameter("missing leaf secret"))?;
        leaf_key_package.update_init_key(leaf_keypair.public_key().clone(), sig_priv)?;

        let path = DirectPath {
            leaf_key_package,
            nodes: nodes.into(),
        };

        // Update the public tree itself
        self.merge(from, &path)?;
        Ok((private_key, path))
    }

    // === Tree hashing ===

    /// Recompute every stale cached hash, from the root down.
    pub fn set_hash_all(&mut self) -> Result<(), Error> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        let root = treemath::root(self.node_width());
        self.get_hash(root)?;
        Ok(())
    }

    /// The cached hash of the root. `set_hash_all` must have run since the
    /// last mutation.
    pub fn root_hash(&self) -> Result<Vec<u8>, Error> {
        let root = treemath::root(self.node_width());
        let hash = &self.node_at(root).hash;
        if hash.is_empty() {
            return Err(Error::InvalidParameter("root hash not set"));
        }
        Ok(hash.clone())
    }

    fn get_hash(&mut self, index: NodeIndex) -> Result<Vec<u8>, Error> {
        if !self.node_at(index).hash.is_empty() {
            return Ok(self.node_at(index).hash.clone());
        }

        let suite = self.suite;
        if treemath::level(index) == 0 {
            self.node_at_mut(index)
                .set_leaf_hash(suite, index)
                .map_err(Error::from)?;
            return Ok(self.node_at(index).hash.clone());
        }

        let left_hash = self.get_hash(treemath::left(index)?)?;
        let right_hash = self.get_hash(treemath::right(index, self.node_width())?)?;
        self.node_at_mut(index)
            .set_parent_hash(suite, index, &left_hash, &right_hash)
            .map_err(Error::from)?;
        Ok(self.node_at(index).hash.clone())
    }

    fn clear_hash_path(&mut self, index: LeafIndex) -> Result<(), Error> {
        let ni = NodeIndex::from(index);
        self.node_at_mut(ni).hash.clear();
        for n in treemath::dirpath(ni, self.node_width())? {
            self.node_at_mut(n).hash.clear();
        }
        Ok(())
    }
}

impl Size for TreeKEMPublicKey {
    fn tls_serialized_len(&self) -> usize {
        self.suite.tls_serialized_len() + TlsSliceU32(&self.nodes).tls_serialized_len()
    }
}

impl TlsSerializeTrait for TreeKEMPublicKey {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        let mut written = self.suite.tls_serialize(writer)?;
        written += TlsSliceU32(&self.nodes).tls_serialize(writer)?;
        Ok(written)
    }
}

impl TlsDeserializeTrait for TreeKEMPublicKey {
    fn tls_deserialize<R: Read>(bytes: &mut R) -> Result<Self, tls_codec::Error> {
        let suite = CipherSuite::tls_deserialize(bytes)?;
        let nodes = TlsVecU32::<OptionalNode>::tls_deserialize(bytes)?;
        Ok(Self {
            suite,
            nodes: nodes.as_slice().to_vec(),
        })
    }
}

impl Size for &TreeKEMPublicKey {
    fn tls_serialized_len(&self) -> usize {
        Size::tls_serialized_len(*self)
    }
}

impl TlsSerializeTrait for &TreeKEMPublicKey {
    fn tls_serialize<W: Write>(&self, writer: &mut W) -> Result<usize, tls_codec::Error> {
        TlsSerializeTrait::tls_serialize(*self, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialBundle;
    use crate::key_packages::KeyPackageBundle;

    const SUITE: CipherSuite = CipherSuite::X25519_SHA256_AES128GCM;

    fn fresh_key_package(identity: &[u8], seed: u8) -> (KeyPackage, SignaturePrivateKey, Secret) {
        let bundle = CredentialBundle::new(identity, SUITE.signature_scheme()).unwrap();
        let (credential, identity_priv) = bundle.into_parts();
        let leaf_secret = Secret::from_slice(SUITE, &[seed; 32]);
        let kp = KeyPackageBundle::from_leaf_secret(
            SUITE,
            leaf_secret.clone(),
            credential,
            &identity_priv,
        )
        .unwrap()
        .key_package()
        .clone();
        (kp, identity_priv, leaf_secret)
    }

    fn tree_of(n: u8) -> TreeKEMPublicKey {
        let mut tree = TreeKEMPublicKey::new(SUITE);
        for i in 0..n {
            let (kp, _, _) = fresh_key_package(&[b'a' + i], i + 1);
            tree.add_leaf(kp).unwrap();
        }
        tree
    }

    #[test]
    fn add_leaf_grows_and_fills_blanks() {
        let mut tree = tree_of(3);
        assert_eq!(tree.size().as_u32(), 3);
        assert_eq!(tree.nodes.len(), 5);

        tree.blank_path(LeafIndex::from(1u32)).unwrap();
        let (kp, _, _) = fresh_key_package(b"dora", 9);
        // The blanked slot is re-used before the tree grows.
        assert_eq!(tree.add_leaf(kp).unwrap(), LeafIndex::from(1u32));
        assert_eq!(tree.nodes.len(), 5);
    }

    #[test]
    fn unmerged_leaves_appear_in_resolution() {
        let (kp_a, sig_a, _) = fresh_key_package(b"alice", 1);
        let (kp_b, _, _) = fresh_key_package(b"bob", 2);
        let (kp_c, _, _) = fresh_key_package(b"carol", 3);
        let mut tree = TreeKEMPublicKey::new(SUITE);
        tree.add_leaf(kp_a).unwrap();
        tree.add_leaf(kp_b).unwrap();
        tree.add_leaf(kp_c).unwrap();

        // A path from leaf 0 populates parent nodes 1 and 3.
        let secret = Secret::from_slice(SUITE, &[8u8; 32]);
        tree.encap(LeafIndex::from(0u32), b"ctx", &secret, &sig_a)
            .unwrap();

        let (kp_d, _, _) = fresh_key_package(b"dave", 9);
        let added = tree.add_leaf(kp_d).unwrap();
        assert_eq!(added, LeafIndex::from(3u32));

        // The new leaf is unmerged at the old root and so shows up at the
        // end of its resolution.
        let old_root = NodeIndex::from(3u32);
        assert_eq!(
            tree.resolve(old_root),
            vec![old_root, NodeIndex::from(added)]
        );
    }

    #[test]
    fn truncate_drops_trailing_blanks() {
        let mut tree = tree_of(5);
        assert_eq!(tree.nodes.len(), 9);
        tree.blank_path(LeafIndex::from(4u32)).unwrap();
        tree.truncate();
        assert_eq!(tree.nodes.len(), 7);
        assert!(!tree.nodes.last().unwrap().is_blank());
    }

    #[test]
    fn resolve_of_blank_parent_concatenates_children() {
        let mut tree = tree_of(3);
        tree.blank_path(LeafIndex::from(1u32)).unwrap();
        let root = treemath::root(NodeCount::from(tree.nodes.len()));
        assert_eq!(
            tree.resolve(root),
            vec![NodeIndex::from(0u32), NodeIndex::from(4u32)]
        );
    }

    #[test]
    fn root_hash_is_stable_across_serialization() {
        let mut tree = tree_of(4);
        tree.set_hash_all().unwrap();
        let hash = tree.root_hash().unwrap();

        let encoded = tree.tls_serialize_detached().unwrap();
        let mut decoded =
            TreeKEMPublicKey::tls_deserialize(&mut encoded.as_slice()).unwrap();
        decoded.set_hash_all().unwrap();
        assert_eq!(decoded.root_hash().unwrap(), hash);
        assert_eq!(decoded, tree);
    }

    #[test]
    fn root_hash_changes_with_content() {
        let mut tree = tree_of(4);
        tree.set_hash_all().unwrap();
        let before = tree.root_hash().unwrap();

        let (kp, _, _) = fresh_key_package(b"erin", 17);
        tree.update_leaf(LeafIndex::from(2u32), kp).unwrap();
        tree.set_hash_all().unwrap();
        assert_ne!(tree.root_hash().unwrap(), before);
    }
}
