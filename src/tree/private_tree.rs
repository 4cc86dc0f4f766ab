//! The private half of a TreeKEM tree: one member's view of the path
//! secrets it knows, keyed by node index.
//!
//! Secrets are overwritten when a new path is implanted and dropped when
//! the corresponding public node is blanked or truncated away, so the map
//! never outlives the keys in the public tree.

use std::collections::BTreeMap;

use super::index::{LeafCount, LeafIndex, NodeCount, NodeIndex};
use super::treemath;
use super::TreeKEMPublicKey;
use crate::ciphersuite::{CipherSuite, HpkeKeypair, Secret};
use crate::error::Error;
use crate::tree::DirectPath;

/// One member's path secrets and the HPKE keys derived from them.
#[derive(Debug, Clone)]
pub struct TreeKEMPrivateKey {
    suite: CipherSuite,
    own_index: LeafIndex,
    // The root path secret of the last implant; the commit secret of the
    // epoch being created.
    update_secret: Option<Secret>,
    path_secrets: BTreeMap<NodeIndex, Secret>,
    private_key_cache: BTreeMap<NodeIndex, HpkeKeypair>,
}

impl TreeKEMPrivateKey {
    fn empty(suite: CipherSuite, own_index: LeafIndex) -> Self {
        Self {
            suite,
            own_index,
            update_secret: None,
            path_secrets: BTreeMap::new(),
            private_key_cache: BTreeMap::new(),
        }
    }

    /// Fresh private state for a member about to send a path: stores
    /// `leaf_secret` at the member's leaf and implants up to the root.
    pub fn create(
        suite: CipherSuite,
        size: LeafCount,
        index: LeafIndex,
        leaf_secret: &Secret,
    ) -> Self {
        let mut private_key = Self::empty(suite, index);
        private_key.implant(NodeIndex::from(index), size, leaf_secret.clone());
        private_key
    }

    /// Private state for a new joiner: its own leaf secret, plus an
    /// implant from the intersection with the committer's path if the
    /// Welcome carried one.
    pub fn joiner(
        suite: CipherSuite,
        size: LeafCount,
        index: LeafIndex,
        leaf_secret: &Secret,
        intersect: NodeIndex,
        path_secret: Option<Secret>,
    ) -> Self {
        let mut private_key = Self::empty(suite, index);
        private_key
            .path_secrets
            .insert(NodeIndex::from(index), leaf_secret.clone());
        if let Some(path_secret) = path_secret {
            private_key.implant(intersect, size, path_secret);
        }
        private_key
    }

    pub fn own_index(&self) -> LeafIndex {
        self.own_index
    }

    /// The commit secret: the root path secret of the last implant.
    pub(crate) fn update_secret(&self) -> Option<&Secret> {
        self.update_secret.as_ref()
    }

    fn path_step(&self, path_secret: &Secret) -> Result<Secret, Error> {
        Ok(path_secret.kdf_expand_label("path", &[], self.suite.hash_length())?)
    }

    /// Walk from `start` to the root, writing a fresh path secret at every
    /// node. Cached keys along the way are invalidated.
    fn implant(&mut self, start: NodeIndex, size: LeafCount, path_secret: Secret) {
        let width = NodeCount::from(size);
        let root = treemath::root(width);
        let mut n = start;
        let mut secret = path_secret;

        while n != root {
            self.path_secrets.insert(n, secret.clone());
            self.private_key_cache.remove(&n);

            n = treemath::parent(n, width).expect("non-root node has a parent");
            secret = self
                .path_step(&secret)
                .expect("kdf expand at hash length cannot fail");
        }

        self.path_secrets.insert(root, secret.clone());
        self.private_key_cache.remove(&root);
        self.update_secret = Some(secret);
    }

    pub(crate) fn path_secret(&self, n: NodeIndex) -> Option<&Secret> {
        self.path_secrets.get(&n)
    }

    /// The HPKE key pair at `n`, from the cache or derived from the path
    /// secret stored there.
    pub(crate) fn private_key(&self, n: NodeIndex) -> Option<HpkeKeypair> {
        if let Some(keypair) = self.private_key_cache.get(&n) {
            return Some(keypair.clone());
        }
        let secret = self.path_secrets.get(&n)?;
        match HpkeKeypair::derive(self.suite, secret) {
            Ok(keypair) => Some(keypair),
            Err(e) => {
                log::error!("HPKE key derivation failed: {e}");
                None
            }
        }
    }

    fn memoize_private_key(&mut self, n: NodeIndex) -> Option<HpkeKeypair> {
        let keypair = self.private_key(n)?;
        self.private_key_cache.insert(n, keypair.clone());
        Some(keypair)
    }

    /// The lowest common ancestor with leaf `to`, its path secret and
    /// whether we hold one.
    pub(crate) fn shared_path_secret(&self, to: LeafIndex) -> (NodeIndex, Option<&Secret>) {
        let n = treemath::ancestor(self.own_index, to);
        (n, self.path_secrets.get(&n))
    }

    /// Process a [`DirectPath`] sent by `from`: find the first node of the
    /// sender's direct path above our own leaf, decrypt the path secret
    /// addressed to us with the matching resolution key, and implant it
    /// upward. The public tree must still be in its pre-merge state.
    pub fn decap(
        &mut self,
        from: LeafIndex,
        pub_tree: &TreeKEMPublicKey,
        context: &[u8],
        path: &DirectPath,
    ) -> Result<(), Error> {
        let own_node = NodeIndex::from(self.own_index);
        let width = treemath::node_width(pub_tree.size());
        let dp = treemath::dirpath(NodeIndex::from(from), width)?;
        if dp.len() != path.nodes.len() {
            return Err(Error::Protocol("malformed direct path"));
        }

        // Identify the overlap node and the copath node below it
        let mut overlap = None;
        let mut last = NodeIndex::from(from);
        for (dpi, &n) in dp.iter().enumerate() {
            if treemath::in_path(own_node, n) {
                overlap = Some((dpi, n, treemath::sibling(last, width)?));
                break;
            }
            last = n;
        }
        let (dpi, overlap_node, copath_node) =
            overlap.ok_or(Error::Protocol("no overlap with the sender's path"))?;

        // Identify which node of the copath resolution we can decrypt with
        let resolution = pub_tree.resolve(copath_node);
        let path_node = &path.nodes.as_slice()[dpi];
        if resolution.len() != path_node.node_secrets.len() {
            return Err(Error::Protocol("malformed direct path node"));
        }
        let resi = resolution
            .iter()
            .position(|n| self.path_secrets.contains_key(n))
            .ok_or(Error::Protocol("no private key to decrypt path secret"))?;

        // Decrypt and implant
        let keypair = self
            .memoize_private_key(resolution[resi])
            .ok_or(Error::Protocol("no private key to decrypt path secret"))?;
        let path_secret = self.suite.hpke_open(
            &path_node.node_secrets.as_slice()[resi],
            keypair.private_key(),
            &[],
            context,
        )?;
        self.implant(
            overlap_node,
            pub_tree.size(),
            Secret::from_slice(self.suite, &path_secret),
        );
        Ok(())
    }

    /// Replace our own leaf secret, as when a commit applies our Update.
    pub(crate) fn set_leaf_secret(&mut self, secret: &Secret) {
        let leaf = NodeIndex::from(self.own_index);
        self.path_secrets.insert(leaf, secret.clone());
        self.private_key_cache.remove(&leaf);
    }

    /// Drop secrets for a node that was blanked in the public tree.
    pub(crate) fn erase(&mut self, n: NodeIndex) {
        self.path_secrets.remove(&n);
        self.private_key_cache.remove(&n);
    }

    /// Drop every entry beyond the last node of a shrunk tree.
    pub(crate) fn truncate(&mut self, size: LeafCount) {
        let last = NodeIndex::from(LeafIndex::from(size.as_u32() - 1));
        self.path_secrets.retain(|n, _| n.as_u32() <= last.as_u32());
        self.private_key_cache
            .retain(|n, _| n.as_u32() <= last.as_u32());
    }

    /// Check that every known path secret matches the public key the tree
    /// holds at that node.
    pub fn consistent(&self, public_tree: &TreeKEMPublicKey) -> bool {
        if self.suite != public_tree.suite() {
            return false;
        }

        self.path_secrets.keys().all(|&n| {
            if n.as_usize() >= public_tree.nodes.len() {
                return false;
            }
            let keypair = match self.private_key(n) {
                Some(keypair) => keypair,
                None => return false,
            };
            match public_tree.node_at(n).public_key() {
                Some(public_key) => public_key == keypair.public_key(),
                None => false,
            }
        })
    }

    /// Check secret agreement with another member's private state: every
    /// node known to both must carry the same path secret.
    pub fn consistent_with(&self, other: &TreeKEMPrivateKey) -> bool {
        if self.suite != other.suite {
            return false;
        }

        self.path_secrets.iter().all(|(n, secret)| {
            other
                .path_secrets
                .get(n)
                .map(|other_secret| secret == other_secret)
                .unwrap_or(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialBundle;
    use crate::key_packages::{KeyPackage, KeyPackageBundle};
    use crate::ciphersuite::SignaturePrivateKey;

    const SUITE: CipherSuite = CipherSuite::X25519_SHA256_AES128GCM;

    fn member(identity: &[u8], seed: u8) -> (KeyPackage, SignaturePrivateKey, Secret) {
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

    #[test]
    fn create_implants_up_to_the_root() {
        let private_key = TreeKEMPrivateKey::create(
            SUITE,
            LeafCount::from(4u32),
            LeafIndex::from(0u32),
            &Secret::from_slice(SUITE, &[1u8; 32]),
        );
        // Leaf 0 of a 4-leaf tree knows nodes 0, 1 and 3.
        for n in [0u32, 1, 3] {
            assert!(private_key.path_secret(NodeIndex::from(n)).is_some());
            assert!(private_key.private_key(NodeIndex::from(n)).is_some());
        }
        assert!(private_key.path_secret(NodeIndex::from(5u32)).is_none());
        assert!(private_key.update_secret().is_some());
    }

    #[test]
    fn encap_decap_agree_on_the_commit_secret() {
        let members: Vec<_> = (0..4u8)
            .map(|i| member(&[b'a' + i], i + 1))
            .collect();
        let mut tree = TreeKEMPublicKey::new(SUITE);
        let mut privs = vec![];
        for (i, (kp, _, leaf_secret)) in members.iter().enumerate() {
            let index = tree.add_leaf(kp.clone()).unwrap();
            assert_eq!(index.as_usize(), i);
            privs.push(TreeKEMPrivateKey::joiner(
                SUITE,
                LeafCount::from(4u32),
                index,
                leaf_secret,
                NodeIndex::from(index),
                None,
            ));
        }

        let context = b"group context";
        let commit_secret = Secret::from_slice(SUITE, &[0x55; 32]);
        let pre_merge = tree.clone();
        let (sender_priv, path) = tree
            .encap(LeafIndex::from(0u32), context, &commit_secret, &members[0].1)
            .unwrap();
        assert!(sender_priv.consistent(&tree));

        for (i, private_key) in privs.iter_mut().enumerate().skip(1) {
            private_key
                .decap(LeafIndex::from(0u32), &pre_merge, context, &path)
                .unwrap();
            assert!(
                private_key.consistent(&tree),
                "member {i} inconsistent after decap"
            );
            assert!(private_key.consistent_with(&sender_priv));
            assert_eq!(
                private_key.update_secret().unwrap(),
                sender_priv.update_secret().unwrap()
            );
        }
    }

    #[test]
    fn decap_rejects_malformed_paths() {
        let (kp_a, sig_a, secret_a) = member(b"alice", 1);
        let (kp_b, _, secret_b) = member(b"bob", 2);
        let mut tree = TreeKEMPublicKey::new(SUITE);
        tree.add_leaf(kp_a).unwrap();
        let b_index = tree.add_leaf(kp_b).unwrap();

        let mut b_priv = TreeKEMPrivateKey::joiner(
            SUITE,
            LeafCount::from(2u32),
            b_index,
            &secret_b,
            NodeIndex::from(b_index),
            None,
        );
        drop(secret_a);

        let pre_merge = tree.clone();
        let (_, path) = tree
            .encap(
                LeafIndex::from(0u32),
                b"ctx",
                &Secret::from_slice(SUITE, &[9u8; 32]),
                &sig_a,
            )
            .unwrap();

        // Truncated path
        let mut short_path = path.clone();
        short_path.nodes = Vec::new().into();
        assert_eq!(
            b_priv
                .decap(LeafIndex::from(0u32), &pre_merge, b"ctx", &short_path)
                .unwrap_err(),
            Error::Protocol("malformed direct path")
        );

        // Wrong AAD
        assert!(matches!(
            b_priv
                .decap(LeafIndex::from(0u32), &pre_merge, b"other ctx", &path)
                .unwrap_err(),
            Error::Crypto(_)
        ));

        // Intact path decrypts
        b_priv
            .decap(LeafIndex::from(0u32), &pre_merge, b"ctx", &path)
            .unwrap();
    }

    #[test]
    fn truncate_drops_out_of_range_secrets() {
        let mut private_key = TreeKEMPrivateKey::create(
            SUITE,
            LeafCount::from(4u32),
            LeafIndex::from(3u32),
            &Secret::from_slice(SUITE, &[1u8; 32]),
        );
        // Shrinking to two leaves keeps only nodes 0..=2.
        private_key.truncate(LeafCount::from(2u32));
        assert!(private_key.path_secret(NodeIndex::from(6u32)).is_none());
        assert!(private_key.path_secret(NodeIndex::from(5u32)).is_none());
        assert!(private_key.path_secret(NodeIndex::from(3u32)).is_none());
    }
}
